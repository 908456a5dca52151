use std::collections::HashMap;

use ndarray::{Array1, Array2};
use ndarray_linalg::{FactorizeInto, Solve};

use crate::config::SolverConfig;
use crate::error::{SimulationError, SolverDiagnostic};
use crate::expr::Expr;
use crate::symbol::Symbol;

/// Solves `relations[i](symbols) = 0` for every symbol, via Newton–Raphson with a numeric
/// central-difference Jacobian. `initial_guess` seeds the iterate for symbols it knows about;
/// symbols missing from it start at `config.initial_guess_floor`.
///
/// A purely linear system's residual is exactly affine, so the very first Newton step lands on
/// the exact root — this one driver covers both the linear and nonlinear networks the
/// orchestration layer hands it.
pub fn solve(
    relations: &[Expr],
    symbols: &[Symbol],
    initial_guess: &HashMap<Symbol, f64>,
    config: &SolverConfig,
) -> Result<HashMap<Symbol, f64>, SimulationError> {
    let n = symbols.len();
    if relations.len() != n {
        return Err(SimulationError::SolverFailure {
            expected: n,
            got: relations.len(),
            diagnostic: Box::new(SolverDiagnostic {
                symbols: symbols.to_vec(),
                relations: relations.to_vec(),
                partial: initial_guess.clone(),
            }),
        });
    }

    let mut x = Array1::<f64>::zeros(n);
    for (k, sym) in symbols.iter().enumerate() {
        x[k] = match initial_guess.get(sym) {
            Some(v) if *v != 0.0 => *v,
            _ => config.initial_guess_floor,
        };
    }

    let mut residual_norm = f64::INFINITY;
    for iteration in 0..config.max_iterations {
        let values = assignment(symbols, &x);
        let f = residual(relations, symbols, &values);
        residual_norm = f.dot(&f).sqrt();
        if residual_norm <= config.tolerance {
            log::trace!("newton converged in {iteration} iterations, residual {residual_norm}");
            return Ok(values);
        }

        let jacobian = numeric_jacobian(relations, symbols, &x, config.finite_difference_step);
        let lu = jacobian.factorize_into()?;
        let delta = lu.solve(&(-&f))?;
        x = x + delta;
    }

    let values = assignment(symbols, &x);
    log::debug!("newton did not converge after {} iterations", config.max_iterations);
    Err(SimulationError::DidNotConverge {
        iterations: config.max_iterations,
        residual_norm,
        diagnostic: Box::new(SolverDiagnostic {
            symbols: symbols.to_vec(),
            relations: relations.to_vec(),
            partial: values,
        }),
    })
}

fn assignment(symbols: &[Symbol], x: &Array1<f64>) -> HashMap<Symbol, f64> {
    symbols.iter().cloned().zip(x.iter().copied()).collect()
}

fn residual(relations: &[Expr], symbols: &[Symbol], values: &HashMap<Symbol, f64>) -> Array1<f64> {
    let _ = symbols;
    Array1::from_vec(relations.iter().map(|r| r.eval(values)).collect())
}

fn numeric_jacobian(
    relations: &[Expr],
    symbols: &[Symbol],
    x: &Array1<f64>,
    step: f64,
) -> Array2<f64> {
    let n = symbols.len();
    let mut jacobian = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut forward = x.clone();
        let mut backward = x.clone();
        forward[j] += step;
        backward[j] -= step;

        let f_forward = residual(relations, symbols, &assignment(symbols, &forward));
        let f_backward = residual(relations, symbols, &assignment(symbols, &backward));
        let column = (f_forward - f_backward) / (2.0 * step);
        jacobian.column_mut(j).assign(&column);
    }
    jacobian
}
