use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SimulationError;
use crate::expr::Expr;
use crate::symbol::Symbol;

/// Process-wide monotonic counter backing [`Variable::new`]'s id allocation.
///
/// Scoped to the process rather than to a `Simulation` instance — see the "Global counters"
/// decision in the design notes: components are constructed standalone, before ever touching a
/// `Simulation`, so there is nowhere to thread a per-instance allocator through.
static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(0);

/// A named scalar time series plus the sliding window of algebraic symbols standing in for its
/// value at the current step and up to `d` steps back.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    id: u64,
    derivative_order: usize,
    symbols: Vec<Symbol>,
    values: Vec<f64>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        let id = NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            name: name.into(),
            id,
            derivative_order: 0,
            symbols: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn derivative_order(&self) -> usize {
        self.derivative_order
    }

    /// Allocates `d + 1` fresh symbols and a zeroed history of length `total_steps`, seeding
    /// `[0, d)` with `init_value` when it is non-zero.
    pub fn initialize(&mut self, derivative_order: usize, total_steps: usize, init_value: f64) {
        self.derivative_order = derivative_order;
        self.values = vec![0.0; total_steps];
        if init_value != 0.0 {
            for slot in self.values.iter_mut().take(derivative_order) {
                *slot = init_value;
            }
        }
        self.symbols = (0..=derivative_order)
            .map(|k| Symbol::new(format!("{}_{}_{}", self.name, self.id, k)))
            .collect();
    }

    /// All `d + 1` symbols, `symbols()[0]` is the current step, `symbols()[k]` is `t - k`.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// `symbol(0)` is the current step; `symbol(-k)` is the value `k` steps back, matching the
    /// original design's negative-indexing convention for lagged symbols.
    pub fn symbol(&self, lag: isize) -> &Symbol {
        &self.symbols[lag.unsigned_abs()]
    }

    /// One equation per historical lag `k`, pinning `symbols[k]` to the already-committed numeric
    /// value `values[t - k]`. Requires `t >= derivative_order`.
    pub fn history_relations(&self, t: usize) -> Result<Vec<Expr>, SimulationError> {
        if t < self.derivative_order {
            return Err(SimulationError::Usage {
                t,
                derivative_order: self.derivative_order,
            });
        }
        let mut relations = Vec::with_capacity(self.derivative_order);
        for k in 1..=self.derivative_order {
            let pinned = Expr::sym(self.symbols[k].clone()) - Expr::constant(self.values[t - k]);
            relations.push(pinned);
        }
        Ok(relations)
    }

    pub fn commit(&mut self, t: usize, value: f64) {
        self.values[t] = value;
    }

    /// Writes into `values[0..seed.len().min(derivative_order))`; the preferred alternative to
    /// poking `values_mut()` directly (design notes §9).
    pub fn seed_history(&mut self, seed: &[f64]) {
        let n = seed.len().min(self.derivative_order);
        self.values[..n].copy_from_slice(&seed[..n]);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}
