use crate::symbol::Symbol;
use std::collections::HashMap;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// An algebraic expression over [`Symbol`]s and constants. Every component relation is `Expr = 0`.
///
/// This is deliberately not a general CAS: there is no simplification, no symbolic
/// differentiation, no canonicalization. It exists only to let a component author its relation
/// once, in shift-invariant form (§9 of the design notes), and hand the resulting tree to the
/// Newton solver, which evaluates it numerically and differentiates it by finite differences.
#[derive(Debug, Clone)]
pub enum Expr {
    Const(f64),
    Sym(Symbol),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Powf(Box<Expr>, f64),
    /// Clamp the operand from below before anything downstream evaluates it. Only the battery
    /// relations use this, to keep a Newton iterate's fractional-power terms real-valued.
    MaxFloor(Box<Expr>, f64),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn sym(symbol: Symbol) -> Self {
        Expr::Sym(symbol)
    }

    pub fn powf(self, exponent: f64) -> Self {
        Expr::Powf(Box::new(self), exponent)
    }

    pub fn max_floor(self, floor: f64) -> Self {
        Expr::MaxFloor(Box::new(self), floor)
    }

    pub fn recip(self) -> Self {
        Expr::Div(Box::new(Expr::Const(1.0)), Box::new(self))
    }

    pub fn eval(&self, values: &HashMap<Symbol, f64>) -> f64 {
        match self {
            Expr::Const(v) => *v,
            Expr::Sym(s) => *values.get(s).unwrap_or(&0.0),
            Expr::Add(a, b) => a.eval(values) + b.eval(values),
            Expr::Sub(a, b) => a.eval(values) - b.eval(values),
            Expr::Mul(a, b) => a.eval(values) * b.eval(values),
            Expr::Div(a, b) => a.eval(values) / b.eval(values),
            Expr::Neg(a) => -a.eval(values),
            Expr::Powf(a, p) => a.eval(values).powf(*p),
            Expr::MaxFloor(a, floor) => a.eval(values).max(*floor),
        }
    }
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}
