/// Tunables for the per-step Newton–Raphson solve.
///
/// Mirrors the shape of the teacher's `SimulationConfig`: a small, cheaply-cloned struct with a
/// sane `Default`, threaded through the orchestration layer instead of being hardcoded constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Hard cap on Newton iterations per step before giving up with `DidNotConverge`.
    pub max_iterations: usize,
    /// Convergence threshold on the residual 2-norm.
    pub tolerance: f64,
    /// Step used for the central-difference numeric Jacobian.
    pub finite_difference_step: f64,
    /// Floor applied to an initial Newton guess that would otherwise be exactly zero, so
    /// fractional-exponent relations (the battery's Peukert terms) don't start on a singularity.
    pub initial_guess_floor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-9,
            finite_difference_step: 1e-6,
            initial_guess_floor: 1e-6,
        }
    }
}
