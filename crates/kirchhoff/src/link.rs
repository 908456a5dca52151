use std::collections::HashMap;

use crate::error::SimulationError;
use crate::expr::Expr;
use crate::port::PortId;
use crate::symbol::Symbol;

/// A Kirchhoff node: every connected port shares one voltage and their currents sum to zero.
///
/// Built from stable [`PortId`] handles so a link can be assembled before any of its ports'
/// owning nodes are added to a [`crate::simulation::Simulation`]. `bind` resolves those handles
/// exactly once, at `Simulation::initialize` time, into the ports' current-step symbol pairs —
/// legal because a `Variable`'s symbols never change identity after `initialize` runs.
#[derive(Debug, Clone, Default)]
pub struct ElectricalLink {
    ports: Vec<PortId>,
    bound: Vec<(Symbol, Symbol)>,
}

impl ElectricalLink {
    pub fn new(ports: Vec<PortId>) -> Self {
        Self {
            ports,
            bound: Vec::new(),
        }
    }

    /// Resolves each `PortId` against `registry` (current-step `(v, i)` symbol pairs), caching
    /// the result for every subsequent `relations` call.
    pub fn bind(
        &mut self,
        registry: &HashMap<PortId, (Symbol, Symbol)>,
    ) -> Result<(), SimulationError> {
        self.bound = self
            .ports
            .iter()
            .map(|id| registry.get(id).cloned().ok_or(SimulationError::UnresolvedPort(*id)))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Equal voltage across every connected port, and zero net current. Produces `n - 1` voltage
    /// equalities and one current-sum equation for `n` bound ports; empty for `n <= 1`.
    pub fn relations(&self) -> Vec<Expr> {
        let mut relations = Vec::new();
        if self.bound.is_empty() {
            return relations;
        }
        let (v0, _) = &self.bound[0];
        for (v, _) in &self.bound[1..] {
            relations.push(Expr::sym(v.clone()) - Expr::sym(v0.clone()));
        }
        let mut current_sum = Expr::constant(0.0);
        for (_, i) in &self.bound {
            current_sum = current_sum + Expr::sym(i.clone());
        }
        relations.push(current_sum);
        relations
    }

    /// A link contributes no variables of its own — it only constrains symbols already owned by
    /// the nodes its ports belong to.
    pub fn variables(&self) -> Vec<&Symbol> {
        Vec::new()
    }
}
