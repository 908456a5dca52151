use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::SolverConfig;
use crate::error::{SimulationError, SolverDiagnostic};
use crate::expr::Expr;
use crate::link::ElectricalLink;
use crate::node::Node;
use crate::port::PortId;
use crate::solver;
use crate::symbol::Symbol;

const TOTAL_TIME_TOLERANCE: f64 = 1e-4;

/// Owns every node and link in the network and drives the step loop.
pub struct Simulation {
    nodes: Vec<Rc<RefCell<dyn Node>>>,
    links: Vec<ElectricalLink>,
    derivative_order: usize,
    dt: f64,
    total_time_steps: usize,
    config: SolverConfig,
    initialized: bool,
}

impl Simulation {
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            derivative_order: 0,
            dt: 0.0,
            total_time_steps: 0,
            config,
            initialized: false,
        }
    }

    /// Whether `initialize` (directly, or via `simulate`) has run on this simulation.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Appends nodes and raises `derivative_order` to cover the strictest one added so far.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = Rc<RefCell<dyn Node>>>) {
        for node in nodes {
            self.derivative_order = self
                .derivative_order
                .max(node.borrow().min_derivative_order());
            self.nodes.push(node);
        }
    }

    pub fn add_links(&mut self, links: impl IntoIterator<Item = ElectricalLink>) {
        self.links.extend(links);
    }

    pub fn derivative_order(&self) -> usize {
        self.derivative_order
    }

    /// Initializes every node at the negotiated `derivative_order`, then binds every link's
    /// port handles against the resulting current-step symbol registry.
    pub fn initialize(&mut self, dt: f64, total_time_steps: usize) -> Result<(), SimulationError> {
        self.dt = dt;
        self.total_time_steps = total_time_steps;

        for node in &self.nodes {
            let required = node.borrow().min_derivative_order();
            if required > self.derivative_order {
                return Err(SimulationError::DerivativeOrderTooLow {
                    required,
                    provided: self.derivative_order,
                });
            }
            node.borrow_mut()
                .initialize(dt, self.derivative_order, total_time_steps)?;
        }

        let mut registry: HashMap<PortId, (Symbol, Symbol)> = HashMap::new();
        for node in &self.nodes {
            for port in node.borrow().ports() {
                registry.insert(port.id(), (port.v.symbol(0).clone(), port.i.symbol(0).clone()));
            }
        }
        for link in &mut self.links {
            link.bind(&registry)?;
        }

        self.initialized = true;
        log::debug!(
            "simulation initialized: {} nodes, {} links, derivative_order {}, dt {}",
            self.nodes.len(),
            self.links.len(),
            self.derivative_order,
            dt
        );
        Ok(())
    }

    /// `total_time` must be an integer multiple of `dt` within `TOTAL_TIME_TOLERANCE`. Runs
    /// `initialize` then steps from `derivative_order` through the last fully-determined step.
    pub fn simulate(&mut self, dt: f64, total_time: f64) -> Result<(), SimulationError> {
        let steps = total_time / dt;
        let rounded = steps.round();
        if (steps - rounded).abs() > TOTAL_TIME_TOLERANCE {
            return Err(SimulationError::TotalTimeNotMultiple {
                nearest: rounded * dt,
            });
        }
        let total_time_steps = rounded as usize;
        self.initialize(dt, total_time_steps)?;
        self.simulate_from_initialized()
    }

    /// Continues stepping an already-`initialize`d simulation, letting a caller seed history
    /// (via a retained `Rc<RefCell<_>>`) before the loop begins.
    pub fn simulate_from_initialized(&mut self) -> Result<(), SimulationError> {
        if !self.initialized {
            return Err(SimulationError::Configuration(
                "simulate_from_initialized called before initialize".to_string(),
            ));
        }
        for t in self.derivative_order..self.total_time_steps {
            self.solve(t)?;
        }
        Ok(())
    }

    /// Assembles relations from every node and link at step `t`, solves, and commits.
    ///
    /// The symbol set solved for each step is every symbol of every variable across every node —
    /// not just the current-step ones. Lagged symbols are "unknowns" too, but each is pinned to
    /// its already-known history value by that variable's own `history_relations`, which keeps
    /// the whole system exactly square (total symbols == total relations across nodes + links).
    pub fn solve(&mut self, t: usize) -> Result<(), SimulationError> {
        if !self.initialized {
            return Err(SimulationError::Configuration(
                "solve called before initialize".to_string(),
            ));
        }
        let mut relations: Vec<Expr> = Vec::new();
        let mut symbols: Vec<Symbol> = Vec::new();
        let mut initial_guess: HashMap<Symbol, f64> = HashMap::new();

        for node in &self.nodes {
            let node_ref = node.borrow();
            relations.extend(node_ref.relations(t)?);
            for var in node_ref.variables() {
                for (lag, sym) in var.symbols().iter().enumerate() {
                    let guess = if lag == 0 {
                        if t > 0 { var.values()[t - 1] } else { 0.0 }
                    } else {
                        var.values()[t - lag]
                    };
                    initial_guess.insert(sym.clone(), guess);
                    symbols.push(sym.clone());
                }
            }
        }
        for link in &self.links {
            relations.extend(link.relations());
        }

        log::trace!("solving step {t}: {} symbols, {} relations", symbols.len(), relations.len());
        let results = solver::solve(&relations, &symbols, &initial_guess, &self.config)?;

        if results.len() != symbols.len() {
            return Err(SimulationError::SolverFailure {
                expected: symbols.len(),
                got: results.len(),
                diagnostic: Box::new(SolverDiagnostic {
                    symbols,
                    relations,
                    partial: results,
                }),
            });
        }

        for node in &self.nodes {
            node.borrow_mut().commit(t, &results)?;
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Rc<RefCell<dyn Node>>] {
        &self.nodes
    }

    pub fn links(&self) -> &[ElectricalLink] {
        &self.links
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
