use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SimulationError;
use crate::expr::Expr;
use crate::variable::Variable;

static NEXT_PORT_ID: AtomicU64 = AtomicU64::new(0);

/// Stable, `Copy` handle to a [`Port`], mintable before the owning node is ever added to a
/// [`crate::simulation::Simulation`]. `ElectricalLink`s are built from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(u64);

impl PortId {
    #[cfg(test)]
    pub(crate) fn new_for_test(id: u64) -> Self {
        PortId(id)
    }
}

/// An electrical terminal: a current variable and a voltage variable.
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    pub i: Variable,
    pub v: Variable,
    init_current: f64,
    init_voltage: f64,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_initial(name, 0.0, 0.0)
    }

    pub fn with_initial(name: impl Into<String>, init_current: f64, init_voltage: f64) -> Self {
        let name = name.into();
        let id = PortId(NEXT_PORT_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            i: Variable::new(format!("{name}.i")),
            v: Variable::new(format!("{name}.v")),
            init_current,
            init_voltage,
        }
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn initialize(&mut self, derivative_order: usize, total_steps: usize) {
        self.i
            .initialize(derivative_order, total_steps, self.init_current);
        self.v
            .initialize(derivative_order, total_steps, self.init_voltage);
    }

    pub fn relations(&self, t: usize) -> Result<Vec<Expr>, SimulationError> {
        let mut relations = self.i.history_relations(t)?;
        relations.extend(self.v.history_relations(t)?);
        Ok(relations)
    }

    pub fn variables(&self) -> Vec<&Variable> {
        vec![&self.i, &self.v]
    }

    pub fn variables_mut(&mut self) -> Vec<&mut Variable> {
        vec![&mut self.i, &mut self.v]
    }
}
