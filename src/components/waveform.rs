//! Time and transfer functions used by sources.

/// Behaviour of a piecewise-linear function outside its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extrapolation {
    /// Keep the first/last value.
    Hold,
    /// Continue the first/last segment.
    Linear,
}

/// Piecewise-linear function through `(x, y)` samples sorted by x.
#[derive(Debug, Clone, PartialEq)]
pub struct Pwl {
    pub points: Vec<(f64, f64)>,
    pub extrapolation: Extrapolation,
}

impl Pwl {
    pub fn new(points: Vec<(f64, f64)>, extrapolation: Extrapolation) -> Self {
        Self {
            points,
            extrapolation,
        }
    }

    /// Samples as a time function, held constant before and after.
    pub fn hold(points: Vec<(f64, f64)>) -> Self {
        Self::new(points, Extrapolation::Hold)
    }

    /// Samples as a transfer function, extended linearly.
    pub fn linear(points: Vec<(f64, f64)>) -> Self {
        Self::new(points, Extrapolation::Linear)
    }

    /// Index of the segment `[i, i + 1]` used for `x`.
    fn segment(&self, x: f64) -> usize {
        let last = self.points.len() - 2;
        // First sample with a larger x ends the segment
        let upper = self.points.partition_point(|&(px, _)| px <= x);
        upper.saturating_sub(1).min(last)
    }

    /// Value at `x`. An empty function is zero.
    pub fn eval(&self, x: f64) -> f64 {
        match self.points.len() {
            0 => 0.0,
            1 => self.points[0].1,
            _ => {
                let (x0, y0) = self.points[0];
                let (xn, yn) = self.points[self.points.len() - 1];
                if self.extrapolation == Extrapolation::Hold {
                    if x <= x0 {
                        return y0;
                    }
                    if x >= xn {
                        return yn;
                    }
                }
                let i = self.segment(x);
                let (xa, ya) = self.points[i];
                let (xb, yb) = self.points[i + 1];
                if xb == xa {
                    return yb;
                }
                ya + (yb - ya) * (x - xa) / (xb - xa)
            }
        }
    }

    /// Derivative at `x`, taken from the segment `x` falls in.
    pub fn slope(&self, x: f64) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        if self.extrapolation == Extrapolation::Hold {
            let x0 = self.points[0].0;
            let xn = self.points[self.points.len() - 1].0;
            if x <= x0 || x >= xn {
                return 0.0;
            }
        }
        let i = self.segment(x);
        let (xa, ya) = self.points[i];
        let (xb, yb) = self.points[i + 1];
        if xb == xa {
            0.0
        } else {
            (yb - ya) / (xb - xa)
        }
    }
}

/// Smooth edge from `v1` to `v2` shaped by the error function.
///
/// The edge starts at `td` and is centred at `td + 2 tr`, so it has settled
/// after `4 tr`. `tr` is the 20% to 80% transition time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussEdge {
    pub v1: f64,
    pub v2: f64,
    pub td: f64,
    pub tr: f64,
}

impl GaussEdge {
    pub fn new(v1: f64, v2: f64, td: f64, tr: f64) -> Self {
        Self { v1, v2, td, tr }
    }

    pub fn value_at(&self, t: f64) -> f64 {
        let width = self.tr / 0.672 * 0.281 * 2.0;
        if width <= 0.0 {
            return if t < self.td { self.v1 } else { self.v2 };
        }
        let x = (t - (width / 0.281) * 0.672 - self.td) / width;
        self.v1 + (self.v2 - self.v1) / 2.0 * (1.0 + erf(x))
    }
}

/// Value of an independent source over time.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceWaveform {
    Dc(f64),
    Pwl(Pwl),
    Gauss(GaussEdge),
}

impl SourceWaveform {
    /// `(time, value)` samples, held before the first and after the last.
    pub fn pwl(points: Vec<(f64, f64)>) -> Self {
        SourceWaveform::Pwl(Pwl::hold(points))
    }

    pub fn value_at(&self, t: f64) -> f64 {
        match self {
            SourceWaveform::Dc(value) => *value,
            SourceWaveform::Pwl(pwl) => pwl.eval(t),
            SourceWaveform::Gauss(edge) => edge.value_at(t),
        }
    }
}

impl From<f64> for SourceWaveform {
    fn from(value: f64) -> Self {
        SourceWaveform::Dc(value)
    }
}

/// Error function, Abramowitz and Stegun 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
