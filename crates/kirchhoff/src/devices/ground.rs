use crate::error::SimulationError;
use crate::expr::Expr;
use crate::node::Node;
use crate::port::Port;
use crate::variable::Variable;

/// Single-port reference node: pins its port voltage to zero.
#[derive(Debug, Clone)]
pub struct Ground {
    name: String,
    port: Port,
}

impl Ground {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            port: Port::new(format!("{name}.p0")),
            name,
        }
    }

    pub fn port(&self) -> &Port {
        &self.port
    }
}

impl Node for Ground {
    fn min_derivative_order(&self) -> usize {
        0
    }

    fn initialize(
        &mut self,
        _dt: f64,
        derivative_order: usize,
        total_steps: usize,
    ) -> Result<(), SimulationError> {
        self.port.initialize(derivative_order, total_steps);
        log::debug!("ground {} initialized", self.name);
        Ok(())
    }

    fn relations(&self, t: usize) -> Result<Vec<Expr>, SimulationError> {
        let mut relations = vec![Expr::sym(self.port.v.symbol(0).clone())];
        relations.extend(self.port.relations(t)?);
        Ok(relations)
    }

    fn variables(&self) -> Vec<&Variable> {
        vec![&self.port.i, &self.port.v]
    }

    fn variables_mut(&mut self) -> Vec<&mut Variable> {
        vec![&mut self.port.i, &mut self.port.v]
    }

    fn ports(&self) -> Vec<&Port> {
        vec![&self.port]
    }
}
