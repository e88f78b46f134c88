//! # Wheel demand ramp limiter
//!
//! Bounds the rate of change of the wheel duty cycle targets to limit mechanical jerk and
//! current spikes. The limiter is stateful and runs every cycle against wall-clock elapsed
//! time, since the cycle cadence is paced by the loop rather than a fixed hardware tick.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rate limiter over a (left, right) wheel demand pair.
pub struct RampLimiter {
    /// Maximum change per second in normalised duty cycle
    max_rate: f64,

    /// Output of the previous cycle
    previous: (f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RampLimiter {
    fn default() -> Self {
        Self::new(super::Params::default().ramp_rate)
    }
}

impl RampLimiter {
    /// Create a new limiter at rest with the given maximum rate (full range per second).
    pub fn new(max_rate: f64) -> Self {
        Self {
            max_rate,
            previous: (0.0, 0.0),
        }
    }

    /// Step the limiter towards the target, given the wall-clock seconds since the last step.
    ///
    /// Each side moves by at most `max_rate * elapsed_s` and is clamped into [-1, +1]. The
    /// result is stored as the new previous output.
    pub fn apply(&mut self, target: (f64, f64), elapsed_s: f64) -> (f64, f64) {
        let budget = self.max_rate * elapsed_s;

        self.previous = (
            limit_step(self.previous.0, target.0, budget),
            limit_step(self.previous.1, target.1, budget),
        );

        self.previous
    }

    /// Reset the limiter to rest, so the next demand ramps up from zero.
    pub fn reset(&mut self) {
        self.previous = (0.0, 0.0);
    }

    /// The output of the previous cycle.
    pub fn previous(&self) -> (f64, f64) {
        self.previous
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Move one side from its previous value towards the target within the given budget.
fn limit_step(previous: f64, target: f64, budget: f64) -> f64 {
    let delta = clamp(&(target - previous), &-budget, &budget);
    clamp(&(previous + delta), &-1.0, &1.0)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_step_bounded_by_budget() {
        let mut ramp = RampLimiter::new(1.0);

        // 20 ms cycles permit steps of 0.02
        let (left, right) = ramp.apply((1.0, -1.0), 0.02);
        assert!((left - 0.02).abs() < 1e-12);
        assert!((right + 0.02).abs() < 1e-12);

        // A second cycle moves another step, from the stored previous output
        let (left, right) = ramp.apply((1.0, -1.0), 0.02);
        assert!((left - 0.04).abs() < 1e-12);
        assert!((right + 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_converges_monotonically() {
        let mut ramp = RampLimiter::new(1.0);
        let mut previous = 0.0;

        for _ in 0..100 {
            let (left, _) = ramp.apply((0.75, 0.0), 0.02);
            assert!(left >= previous, "output moved away from target");
            assert!(left <= 0.75, "output overshot target");
            previous = left;
        }

        assert!((previous - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_full_budget_reaches_target() {
        // With the default rate of one full range per second, a one second
        // cycle reaches full throttle in a single step
        let mut ramp = RampLimiter::new(1.0);
        assert_eq!(ramp.apply((1.0, 1.0), 1.0), (1.0, 1.0));
    }

    #[test]
    fn test_output_clamped() {
        let mut ramp = RampLimiter::new(1000.0);
        let (left, right) = ramp.apply((5.0, -5.0), 1.0);
        assert_eq!(left, 1.0);
        assert_eq!(right, -1.0);
    }

    #[test]
    fn test_reset_returns_to_rest() {
        let mut ramp = RampLimiter::new(1.0);
        ramp.apply((1.0, 1.0), 1.0);
        assert_eq!(ramp.previous(), (1.0, 1.0));

        ramp.reset();
        assert_eq!(ramp.previous(), (0.0, 0.0));

        // Post-reset motion ramps up from zero again
        let (left, _) = ramp.apply((1.0, 1.0), 0.02);
        assert!((left - 0.02).abs() < 1e-12);
    }
}
