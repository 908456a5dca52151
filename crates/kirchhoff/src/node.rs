use std::collections::HashMap;

use crate::error::{SimulationError, SolverDiagnostic};
use crate::expr::Expr;
use crate::port::Port;
use crate::symbol::Symbol;
use crate::variable::Variable;

/// The contract every concrete component implements.
///
/// A component owns its internal variables and ports; the simulation only ever asks it for
/// relations, for the variables/ports it is responsible for, or to commit a solved step.
pub trait Node {
    /// The lowest `derivative_order` this component can run under (e.g. a capacitor needs at
    /// least 1, so it has a `t - 1` charge to difference against).
    fn min_derivative_order(&self) -> usize;

    /// Rejects `derivative_order < min_derivative_order()`; otherwise stores `dt` and
    /// initializes every internal variable and port.
    fn initialize(
        &mut self,
        dt: f64,
        derivative_order: usize,
        total_steps: usize,
    ) -> Result<(), SimulationError>;

    /// This component's constitutive relations at step `t`, each implicitly equated to zero.
    fn relations(&self, t: usize) -> Result<Vec<Expr>, SimulationError>;

    /// Every variable whose step-`t` value this component is responsible for determining.
    fn variables(&self) -> Vec<&Variable>;

    fn variables_mut(&mut self) -> Vec<&mut Variable>;

    /// Every port this component owns (used to build the link port-symbol registry).
    fn ports(&self) -> Vec<&Port>;

    /// Writes the solved step-`t` value of every variable's current-step symbol back into its
    /// history. The default walks `variables_mut()`; components should not need to override it.
    fn commit(&mut self, t: usize, results: &HashMap<Symbol, f64>) -> Result<(), SimulationError> {
        let expected: Vec<Symbol> = self
            .variables()
            .iter()
            .map(|v| v.symbols()[0].clone())
            .collect();
        for var in self.variables_mut() {
            let sym = var.symbols()[0].clone();
            match results.get(&sym) {
                Some(value) => var.commit(t, *value),
                None => {
                    return Err(SimulationError::SolverFailure {
                        expected: expected.len(),
                        got: results.len(),
                        diagnostic: Box::new(SolverDiagnostic {
                            symbols: expected,
                            relations: Vec::new(),
                            partial: results.clone(),
                        }),
                    });
                }
            }
        }
        Ok(())
    }

    /// Access to an internal named variable (e.g. a capacitor's `"q"`, a battery's `"soc"`), for
    /// history seeding. Components with no internal variables leave the default.
    fn named_variable_mut(&mut self, _name: &str) -> Option<&mut Variable> {
        None
    }
}
