use indexmap::IndexMap;

use crate::error::SimulationError;
use crate::expr::Expr;
use crate::node::Node;
use crate::port::Port;
use crate::variable::Variable;

const CURRENT_FLOOR: f64 = 1e-6;
const SOC: &str = "soc";

/// Peukert capacity / Shepherd terminal-voltage battery model.
///
/// `Q_prev` is computed from `i_prev` rather than from the present step's current, matching the
/// distilled original's formulation literally rather than the arguably more consistent
/// `Q100(i0)` throughout — see the design notes on this.
#[derive(Debug, Clone)]
pub struct FabsBattery {
    name: String,
    t_ref: f64,
    q_nom_t_ref: f64,
    k: f64,
    ri_oc: f64,
    voc100_ref: f64,
    bat_series: f64,
    bat_parallel: f64,
    soc_init: f64,
    derivative_order: usize,
    dt: f64,
    internal: IndexMap<String, Variable>,
    ports: [Port; 2],
}

#[allow(clippy::too_many_arguments)]
impl FabsBattery {
    pub fn new(
        name: impl Into<String>,
        t_ref: f64,
        q_nom_t_ref: f64,
        k: f64,
        ri_oc: f64,
        voc100_ref: f64,
        bat_series: f64,
        bat_parallel: f64,
        soc_init: f64,
    ) -> Self {
        let name = name.into();
        let mut internal = IndexMap::new();
        internal.insert(SOC.to_string(), Variable::new(format!("{name}.soc")));
        Self {
            ports: [Port::new(format!("{name}.p0")), Port::new(format!("{name}.p1"))],
            internal,
            name,
            t_ref,
            q_nom_t_ref,
            k,
            ri_oc,
            voc100_ref,
            bat_series,
            bat_parallel,
            soc_init,
            derivative_order: 0,
            dt: 0.0,
        }
    }

    pub fn port(&self, index: usize) -> &Port {
        &self.ports[index]
    }

    pub fn soc_values(&self) -> &[f64] {
        self.internal[SOC].values()
    }

    fn soc(&self) -> &Variable {
        &self.internal[SOC]
    }

    /// `t100(i) = (Tref / i^k) * (bat_parallel * QnomTref / Tref)^k`, with `i` floored from
    /// below so the fractional power never sees a non-positive base during Newton iteration.
    fn t100(&self, i: Expr) -> Expr {
        let factor = (self.bat_parallel * self.q_nom_t_ref / self.t_ref).powf(self.k);
        let i = i.max_floor(CURRENT_FLOOR);
        Expr::constant(self.t_ref) * i.powf(-self.k) * Expr::constant(factor)
    }

    fn q100(&self, i: Expr) -> Expr {
        let i = i.max_floor(CURRENT_FLOOR);
        i.clone() * self.t100(i)
    }

    fn ri(&self) -> f64 {
        self.ri_oc * self.bat_series
    }

    fn ki(&self) -> f64 {
        self.ri() / 2.0
    }

    fn voc100(&self) -> f64 {
        self.voc100_ref * self.bat_series
    }
}

impl Node for FabsBattery {
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
        self.derivative_order = derivative_order;
        self.internal[SOC].initialize(derivative_order, total_steps, self.soc_init);
        for port in &mut self.ports {
            port.initialize(derivative_order, total_steps);
        }
        log::debug!("fabs battery {} initialized: series={}, parallel={}", self.name, self.bat_series, self.bat_parallel);
        Ok(())
    }

    fn relations(&self, t: usize) -> Result<Vec<Expr>, SimulationError> {
        let soc = self.soc();
        let soc0 = soc.symbol(0).clone();
        let soc_prev = soc.symbol(-1).clone();
        let i0 = self.ports[0].i.symbol(0).clone();
        let i_prev = self.ports[0].i.symbol(-1).clone();
        let v0 = self.ports[0].v.symbol(0).clone();
        let v1 = self.ports[1].v.symbol(0).clone();

        let first_step = t == self.derivative_order;
        let q100_i0 = self.q100(Expr::sym(i0.clone()));
        let charge_basis = if first_step {
            q100_i0
        } else {
            Expr::sym(soc_prev.clone()) * self.q100(Expr::sym(i_prev))
        };

        let discharge_fraction =
            (Expr::sym(i0.clone()) * Expr::constant(self.dt)) / charge_basis;

        let soc_update = if first_step {
            -Expr::sym(soc0.clone()) + Expr::constant(self.soc_init) - discharge_fraction.clone()
        } else {
            -Expr::sym(soc0.clone()) + Expr::sym(soc_prev) - discharge_fraction.clone()
        };

        let u0 = Expr::sym(v1) - Expr::sym(v0);
        let terminal_voltage = -u0 + Expr::constant(self.voc100())
            - Expr::constant(self.ri()) * Expr::sym(i0.clone())
            - Expr::constant(self.ki()) / (Expr::constant(1.0) - discharge_fraction);

        let mut relations = vec![
            soc_update,
            terminal_voltage,
            Expr::sym(i0) + Expr::sym(self.ports[1].i.symbol(0).clone()),
        ];
        relations.extend(soc.history_relations(t)?);
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
