//! Value primitives shared by the model graph.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

/// Process/temperature corner of a typ/min/max column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Speed {
    #[default]
    Typical,
    Minimum,
    Maximum,
}

impl Speed {
    /// All corners in column order.
    pub const ALL: [Speed; 3] = [Speed::Typical, Speed::Minimum, Speed::Maximum];
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speed::Typical => write!(f, "typ"),
            Speed::Minimum => write!(f, "min"),
            Speed::Maximum => write!(f, "max"),
        }
    }
}

impl FromStr for Speed {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "typ" | "typical" => Ok(Speed::Typical),
            "min" | "minimum" | "slow" => Ok(Speed::Minimum),
            "max" | "maximum" | "fast" => Ok(Speed::Maximum),
            other => Err(format!("unknown speed '{}'", other)),
        }
    }
}

/// Switching direction of a driver edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Rising,
    Falling,
}

impl Direction {
    /// Both directions, rising first.
    pub const ALL: [Direction; 2] = [Direction::Rising, Direction::Falling];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rising => write!(f, "rising"),
            Direction::Falling => write!(f, "falling"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rising" | "rise" | "up" => Ok(Direction::Rising),
            "falling" | "fall" | "down" => Ok(Direction::Falling),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// How an I/O buffer is used by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IoRole {
    Input,
    #[default]
    Output,
}

impl FromStr for IoRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "input" | "in" => Ok(IoRole::Input),
            "output" | "out" => Ok(IoRole::Output),
            other => Err(format!("unknown io role '{}'", other)),
        }
    }
}

/// A value given per corner.
///
/// IBIS writes these as `typ min max` columns. When a column is left out or
/// written as `NA` the parser copies the typical entry into it, so all three
/// entries are always usable downstream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypMinMax<T> {
    pub typ: T,
    pub min: T,
    pub max: T,
}

impl<T> TypMinMax<T> {
    pub fn new(typ: T, min: T, max: T) -> Self {
        Self { typ, min, max }
    }

    /// Get the entry for a corner.
    pub fn get(&self, speed: Speed) -> &T {
        match speed {
            Speed::Typical => &self.typ,
            Speed::Minimum => &self.min,
            Speed::Maximum => &self.max,
        }
    }

    /// Mutable entry for a corner.
    pub fn get_mut(&mut self, speed: Speed) -> &mut T {
        match speed {
            Speed::Typical => &mut self.typ,
            Speed::Minimum => &mut self.min,
            Speed::Maximum => &mut self.max,
        }
    }

    /// Iterate over (corner, entry) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Speed, &T)> {
        Speed::ALL.into_iter().map(move |speed| (speed, self.get(speed)))
    }
}

impl<T: Clone> TypMinMax<T> {
    /// The same entry for every corner.
    pub fn uniform(value: T) -> Self {
        Self {
            typ: value.clone(),
            min: value.clone(),
            max: value,
        }
    }
}

impl<T> Index<Speed> for TypMinMax<T> {
    type Output = T;

    fn index(&self, speed: Speed) -> &T {
        self.get(speed)
    }
}

/// A scalar typ/min/max triplet.
pub type RangeValue = TypMinMax<f64>;

impl RangeValue {
    /// Build a triplet, filling missing min/max from typ.
    pub fn fill(typ: f64, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            typ,
            min: min.unwrap_or(typ),
            max: max.unwrap_or(typ),
        }
    }
}

/// Ordered (x, y) samples.
pub type Table = Vec<(f64, f64)>;

impl TypMinMax<Table> {
    /// True when no rows were read.
    pub fn is_empty(&self) -> bool {
        self.typ.is_empty()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.typ.len()
    }

    /// Append one row across the three corners.
    pub fn push(&mut self, x: f64, row: RangeValue) {
        self.typ.push((x, row.typ));
        self.min.push((x, row.min));
        self.max.push((x, row.max));
    }

    /// Sort every column by x. Rows sharing an x keep the one read last.
    pub fn normalize(&mut self) {
        for speed in Speed::ALL {
            let column = self.get_mut(speed);
            column.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut merged: Table = Vec::with_capacity(column.len());
            for &(x, y) in column.iter() {
                match merged.last_mut() {
                    Some(last) if last.0 == x => last.1 = y,
                    _ => merged.push((x, y)),
                }
            }
            *column = merged;
        }
    }
}

/// A value given per switching direction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ByDirection<T> {
    pub rising: T,
    pub falling: T,
}

impl<T> ByDirection<T> {
    pub fn get(&self, direction: Direction) -> &T {
        match direction {
            Direction::Rising => &self.rising,
            Direction::Falling => &self.falling,
        }
    }

    pub fn get_mut(&mut self, direction: Direction) -> &mut T {
        match direction {
            Direction::Rising => &mut self.rising,
            Direction::Falling => &mut self.falling,
        }
    }
}

impl<T> Index<Direction> for ByDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        self.get(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_forward() {
        let r = RangeValue::fill(1.5, None, Some(2.0));
        assert_eq!(r.typ, 1.5);
        assert_eq!(r.min, 1.5);
        assert_eq!(r.max, 2.0);
        assert_eq!(r[Speed::Minimum], 1.5);
    }

    #[test]
    fn test_normalize_last_row_wins() {
        let mut t = TypMinMax::<Table>::default();
        t.push(1.0, RangeValue::fill(10.0, None, None));
        t.push(0.0, RangeValue::fill(0.0, None, None));
        t.push(1.0, RangeValue::fill(11.0, Some(12.0), None));
        t.normalize();

        assert_eq!(t.typ, vec![(0.0, 0.0), (1.0, 11.0)]);
        assert_eq!(t.min, vec![(0.0, 0.0), (1.0, 12.0)]);
        assert_eq!(t.max, vec![(0.0, 0.0), (1.0, 11.0)]);
    }

    #[test]
    fn test_speed_from_str() {
        assert_eq!("TYP".parse::<Speed>().unwrap(), Speed::Typical);
        assert_eq!("max".parse::<Speed>().unwrap(), Speed::Maximum);
        assert!("fastest".parse::<Speed>().is_err());
        assert_eq!("falling".parse::<Direction>().unwrap(), Direction::Falling);
    }
}
