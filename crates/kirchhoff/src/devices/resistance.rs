use crate::error::SimulationError;
use crate::expr::Expr;
use crate::node::Node;
use crate::port::Port;
use crate::variable::Variable;

/// Ideal two-terminal resistor: `v1 - v0 = -R * i1`.
#[derive(Debug, Clone)]
pub struct Resistance {
    name: String,
    resistance: f64,
    ports: [Port; 2],
}

impl Resistance {
    pub fn new(name: impl Into<String>, resistance: f64) -> Self {
        let name = name.into();
        Self {
            ports: [Port::new(format!("{name}.p0")), Port::new(format!("{name}.p1"))],
            name,
            resistance,
        }
    }

    pub fn port(&self, index: usize) -> &Port {
        &self.ports[index]
    }
}

impl Node for Resistance {
    fn min_derivative_order(&self) -> usize {
        0
    }

    fn initialize(
        &mut self,
        _dt: f64,
        derivative_order: usize,
        total_steps: usize,
    ) -> Result<(), SimulationError> {
        for port in &mut self.ports {
            port.initialize(derivative_order, total_steps);
        }
        log::debug!("resistance {} initialized: R={}", self.name, self.resistance);
        Ok(())
    }

    fn relations(&self, t: usize) -> Result<Vec<Expr>, SimulationError> {
        let i0 = self.ports[0].i.symbol(0).clone();
        let i1 = self.ports[1].i.symbol(0).clone();
        let v0 = self.ports[0].v.symbol(0).clone();
        let v1 = self.ports[1].v.symbol(0).clone();

        let mut relations = vec![
            Expr::sym(i0) + Expr::sym(i1.clone()),
            (Expr::sym(v1) - Expr::sym(v0)) + Expr::constant(self.resistance) * Expr::sym(i1),
        ];
        relations.extend(self.ports[0].relations(t)?);
        relations.extend(self.ports[1].relations(t)?);
        Ok(relations)
    }

    fn variables(&self) -> Vec<&Variable> {
        vec![&self.ports[0].i, &self.ports[0].v, &self.ports[1].i, &self.ports[1].v]
    }

    fn variables_mut(&mut self) -> Vec<&mut Variable> {
        vec![
            &mut self.ports[0].i,
            &mut self.ports[0].v,
            &mut self.ports[1].i,
            &mut self.ports[1].v,
        ]
    }

    fn ports(&self) -> Vec<&Port> {
        vec![&self.ports[0], &self.ports[1]]
    }
}
