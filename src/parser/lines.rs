//! Line stream with one line of pushback.

/// Lines of an input text, read one at a time.
///
/// A section parser that reads a line belonging to its parent pushes it back,
/// and the parent sees it again on its next read. Only the most recent line
/// can be pushed back.
#[derive(Debug)]
pub struct LineSource<'a> {
    lines: std::str::Lines<'a>,
    pushed: Option<&'a str>,
    last: Option<&'a str>,
    line_number: usize,
}

impl<'a> LineSource<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines(),
            pushed: None,
            last: None,
            line_number: 0,
        }
    }

    /// Read the next line, or `None` at end of input.
    pub fn next_line(&mut self) -> Option<&'a str> {
        let line = match self.pushed.take() {
            Some(line) => line,
            None => self.lines.next()?,
        };
        self.line_number += 1;
        self.last = Some(line);
        Some(line)
    }

    /// Return the line just read to the stream.
    pub fn push_back(&mut self) {
        if let Some(line) = self.last.take() {
            debug_assert!(self.pushed.is_none());
            self.pushed = Some(line);
            self.line_number -= 1;
        }
    }

    /// The line last read, empty after a push back.
    pub fn current(&self) -> &'a str {
        self.last.unwrap_or("")
    }

    /// 1-based number of the line last read.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_replays_line() {
        let mut lines = LineSource::new("a\nb\r\nc");
        assert_eq!(lines.next_line(), Some("a"));
        assert_eq!(lines.next_line(), Some("b"));
        assert_eq!(lines.line_number(), 2);

        lines.push_back();
        assert_eq!(lines.line_number(), 1);
        assert_eq!(lines.next_line(), Some("b"));
        assert_eq!(lines.next_line(), Some("c"));
        assert_eq!(lines.next_line(), None);
    }

    #[test]
    fn test_push_back_is_single_line() {
        let mut lines = LineSource::new("a\nb");
        lines.next_line();
        lines.push_back();
        lines.push_back();
        assert_eq!(lines.next_line(), Some("a"));
        assert_eq!(lines.next_line(), Some("b"));
    }
}
