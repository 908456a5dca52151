use crate::expr::Expr;
use crate::symbol::Symbol;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Formats a `(symbols, relations, partial result)` triple the way a caller needs to see it to
/// fix a malformed circuit: what was asked for, what was assembled, and what the solver got to.
pub struct SolverDiagnostic {
    pub symbols: Vec<Symbol>,
    pub relations: Vec<Expr>,
    pub partial: HashMap<Symbol, f64>,
}

impl fmt::Debug for SolverDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "symbols ({}):", self.symbols.len())?;
        for s in &self.symbols {
            writeln!(f, "  {}", s.name())?;
        }
        writeln!(f, "relations ({}):", self.relations.len())?;
        for r in &self.relations {
            writeln!(f, "  {r:?} = 0")?;
        }
        writeln!(f, "partial result ({}):", self.partial.len())?;
        for (s, v) in &self.partial {
            writeln!(f, "  {} = {v}", s.name())?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(
        "total_time is not a multiple of dt within tolerance; nearest valid total_time is {nearest}"
    )]
    TotalTimeNotMultiple { nearest: f64 },

    #[error("node requires derivative_order >= {required}, simulation provides {provided}")]
    DerivativeOrderTooLow { required: usize, provided: usize },

    #[error("solver expected {expected} determined symbols, got {got}:\n{diagnostic:?}")]
    SolverFailure {
        expected: usize,
        got: usize,
        diagnostic: Box<SolverDiagnostic>,
    },

    #[error("Newton iteration did not converge after {iterations} iterations (residual norm {residual_norm}):\n{diagnostic:?}")]
    DidNotConverge {
        iterations: usize,
        residual_norm: f64,
        diagnostic: Box<SolverDiagnostic>,
    },

    #[error("history_relations requested at t={t} but derivative_order is {derivative_order}")]
    Usage { t: usize, derivative_order: usize },

    #[error("unresolved port handle {0:?} referenced by a link")]
    UnresolvedPort(crate::port::PortId),

    #[error("simulation stepped before initialize(): {0}")]
    Configuration(String),

    #[error(transparent)]
    LinearAlgebra(#[from] ndarray_linalg::error::LinalgError),
}
