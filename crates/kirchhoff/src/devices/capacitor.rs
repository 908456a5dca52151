use indexmap::IndexMap;

use crate::error::SimulationError;
use crate::expr::Expr;
use crate::node::Node;
use crate::port::Port;
use crate::variable::Variable;

const Q: &str = "q";

/// Ideal two-terminal capacitor, backward-difference discretized against its own charge history.
#[derive(Debug, Clone)]
pub struct Capacitor {
    name: String,
    capacitance: f64,
    dt: f64,
    init_charge: f64,
    // Internal variables kept in an `IndexMap` rather than a bare field so a component with more
    // than one internal state variable (see `FabsBattery`) has deterministic, insertion-ordered
    // iteration regardless of hash seed.
    internal: IndexMap<String, Variable>,
    ports: [Port; 2],
}

impl Capacitor {
    pub fn new(name: impl Into<String>, capacitance: f64, init_charge: f64) -> Self {
        let name = name.into();
        let mut internal = IndexMap::new();
        internal.insert(Q.to_string(), Variable::new(format!("{name}.q")));
        Self {
            ports: [Port::new(format!("{name}.p0")), Port::new(format!("{name}.p1"))],
            internal,
            name,
            capacitance,
            dt: 0.0,
            init_charge,
        }
    }

    pub fn port(&self, index: usize) -> &Port {
        &self.ports[index]
    }

    pub fn q_values(&self) -> &[f64] {
        self.internal[Q].values()
    }

    fn q(&self) -> &Variable {
        &self.internal[Q]
    }
}

impl Node for Capacitor {
    fn min_derivative_order(&self) -> usize {
        1
    }

    fn initialize(
        &mut self,
        dt: f64,
        derivative_order: usize,
        total_steps: usize,
    ) -> Result<(), SimulationError> {
        if derivative_order < self.min_derivative_order() {
            return Err(SimulationError::DerivativeOrderTooLow {
                required: self.min_derivative_order(),
                provided: derivative_order,
            });
        }
        self.dt = dt;
        self.internal[Q].initialize(derivative_order, total_steps, self.init_charge);
        for port in &mut self.ports {
            port.initialize(derivative_order, total_steps);
        }
        log::debug!("capacitor {} initialized: C={}", self.name, self.capacitance);
        Ok(())
    }

    fn relations(&self, t: usize) -> Result<Vec<Expr>, SimulationError> {
        let q = self.q();
        let i0 = self.ports[0].i.symbol(0).clone();
        let i1 = self.ports[1].i.symbol(0).clone();
        let q0 = q.symbol(0).clone();
        let q_prev = q.symbol(-1).clone();
        let v0 = self.ports[0].v.symbol(0).clone();
        let v1 = self.ports[1].v.symbol(0).clone();

        let mut relations = vec![
            Expr::sym(i0.clone()) - (Expr::sym(q0.clone()) - Expr::sym(q_prev)) / Expr::constant(self.dt),
            Expr::sym(i0) + Expr::sym(i1),
            Expr::sym(q0) - Expr::constant(self.capacitance) * (Expr::sym(v1) - Expr::sym(v0)),
        ];
        relations.extend(q.history_relations(t)?);
        relations.extend(self.ports[0].relations(t)?);
        relations.extend(self.ports[1].relations(t)?);
        Ok(relations)
    }

    fn variables(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = self.internal.values().collect();
        vars.extend([&self.ports[0].i, &self.ports[0].v, &self.ports[1].i, &self.ports[1].v]);
        vars
    }

    fn variables_mut(&mut self) -> Vec<&mut Variable> {
        let mut vars: Vec<&mut Variable> = self.internal.values_mut().collect();
        vars.extend([
            &mut self.ports[0].i,
            &mut self.ports[0].v,
            &mut self.ports[1].i,
            &mut self.ports[1].v,
        ]);
        vars
    }

    fn ports(&self) -> Vec<&Port> {
        vec![&self.ports[0], &self.ports[1]]
    }

    fn named_variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.internal.get_mut(name)
    }
}
