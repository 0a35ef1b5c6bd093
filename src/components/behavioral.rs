//! Behavioral voltage source.
//!
//! The source voltage is an [`Expr`] over node voltages and device
//! currents, evaluated from the previous Newton iterate. When the
//! expression evaluates to a non-finite number (a division by zero, say)
//! the source keeps its last finite value.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::circuit::{BranchId, ComponentId, NodeId};

/// Arithmetic over circuit signals.
///
/// Built with [`v`], [`i`], constants and the usual operators:
/// `(i("vmeas") - i("pu")) / (i("pu") - i("pd"))`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// Voltage of a node to ground
    Voltage(String),
    /// Current n+ -> n- through a device
    Current(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

/// Node voltage `v(node)`.
pub fn v(node: impl Into<String>) -> Expr {
    Expr::Voltage(node.into())
}

/// Device current `i(device)`.
pub fn i(device: impl Into<String>) -> Expr {
    Expr::Current(device.into())
}

/// A name an expression reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<'e> {
    Voltage(&'e str),
    Current(&'e str),
}

/// Values of the signals an expression may reference.
pub trait Signals {
    fn voltage(&self, node: &str) -> Option<f64>;
    fn current(&self, device: &str) -> Option<f64>;
}

impl Expr {
    /// Evaluate against `signals`. Unknown names give NaN.
    pub fn eval<S: Signals + ?Sized>(&self, signals: &S) -> f64 {
        match self {
            Expr::Const(value) => *value,
            Expr::Voltage(node) => signals.voltage(node).unwrap_or(f64::NAN),
            Expr::Current(device) => signals.current(device).unwrap_or(f64::NAN),
            Expr::Add(a, b) => a.eval(signals) + b.eval(signals),
            Expr::Sub(a, b) => a.eval(signals) - b.eval(signals),
            Expr::Mul(a, b) => a.eval(signals) * b.eval(signals),
            Expr::Div(a, b) => a.eval(signals) / b.eval(signals),
            Expr::Neg(a) => -a.eval(signals),
        }
    }

    /// Every signal read by the expression, in evaluation order.
    pub fn signals(&self) -> Vec<Signal<'_>> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'e>(&'e self, out: &mut Vec<Signal<'e>>) {
        match self {
            Expr::Const(_) => {}
            Expr::Voltage(node) => out.push(Signal::Voltage(node)),
            Expr::Current(device) => out.push(Signal::Current(device)),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect(out);
                b.collect(out);
            }
            Expr::Neg(a) => a.collect(out),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::$variant(Box::new(self), Box::new(rhs.into()))
            }
        }
    };
}

binary_op!(Add, add, Add);
binary_op!(Sub, sub, Sub);
binary_op!(Mul, mul, Mul);
binary_op!(Div, div, Div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

#[derive(Debug, Clone)]
pub struct BehavioralSource {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2],
    pub expr: Expr,
    pub branch: BranchId,
    /// Last finite value, used while the expression is non-finite
    pub last_value: f64,
}

impl BehavioralSource {
    pub fn new(id: ComponentId, name: String, nodes: [NodeId; 2], expr: Expr, branch: BranchId) -> Self {
        Self {
            id,
            name,
            nodes,
            expr,
            branch,
            last_value: 0.0,
        }
    }

    /// Source voltage for the given signal values.
    pub fn voltage<S: Signals + ?Sized>(&self, signals: &S) -> f64 {
        let value = self.expr.eval(signals);
        if value.is_finite() {
            value
        } else {
            self.last_value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Table(HashMap<&'static str, f64>);

    impl Signals for Table {
        fn voltage(&self, node: &str) -> Option<f64> {
            self.0.get(node).copied()
        }

        fn current(&self, device: &str) -> Option<f64> {
            self.0.get(device).copied()
        }
    }

    #[test]
    fn test_expression_evaluates() {
        let signals = Table(HashMap::from([("a", 2.0), ("vx", 0.5)]));
        let expr = (i("vx") * 4.0 - v("a")) / 2.0 + -Expr::Const(1.0);
        assert_eq!(expr.eval(&signals), -1.0);
        assert_eq!(
            expr.signals(),
            vec![Signal::Current("vx"), Signal::Voltage("a")]
        );
    }

    #[test]
    fn test_non_finite_holds_last_value() {
        let signals = Table(HashMap::from([("a", 1.0), ("b", 0.0)]));
        let mut source = BehavioralSource::new(
            ComponentId(0),
            "bk".to_string(),
            [NodeId(1), NodeId(0)],
            v("a") / v("b"),
            BranchId(0),
        );
        source.last_value = 0.25;
        assert_eq!(source.voltage(&signals), 0.25);
    }
}
