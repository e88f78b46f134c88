//! # Arcade drive inverse kinematics
//!
//! Maps a (forward, rotation) demand onto (left, right) wheel duty cycles. The shaping and
//! normalisation below match the behaviour the drivetrain was tuned against, so the order of
//! operations matters:
//!
//! 1. Clamp both inputs into [-1, +1].
//! 2. Square each input while keeping its sign, which softens the response around the stick
//!    centre without giving up full-scale authority.
//! 3. Mix into per-wheel values, `left = fwd - rot`, `right = fwd + rot`.
//! 4. Normalise both wheels by `(greater + lesser) / greater`, where `greater` and `lesser` are
//!    the larger and smaller magnitudes of the shaped inputs. This keeps the dominant axis inside
//!    unit range while preserving the ratio of forward to rotational authority, where a naive
//!    clamp would distort turns at the edge of the stick range.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::clamp;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute (left, right) wheel duty cycles for the given forward and rotation demands.
///
/// A positive rotation turns the robot anticlockwise (right wheel faster). Both outputs are
/// guaranteed to be in [-1, +1] for any finite input.
pub fn arcade_ik(forward: f64, rotation: f64) -> (f64, f64) {
    // Clamp, then square the inputs keeping their signs
    let fwd = clamp(&forward, &-1.0, &1.0);
    let rot = clamp(&rotation, &-1.0, &1.0);

    let fwd = (fwd * fwd).copysign(fwd);
    let rot = (rot * rot).copysign(rot);

    let left = fwd - rot;
    let right = fwd + rot;

    // Normalise so the dominant axis stays within unit range
    let greater = fwd.abs().max(rot.abs());
    let lesser = fwd.abs().min(rot.abs());

    if greater == 0.0 {
        return (0.0, 0.0);
    }

    let saturated = (greater + lesser) / greater;

    (left / saturated, right / saturated)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Outputs must stay within [-1, +1] across the whole input square.
    #[test]
    fn test_outputs_in_range() {
        let samples = [-1.0, -0.75, -0.5, -0.25, 0.0, 0.25, 0.5, 0.75, 1.0];

        for &fwd in samples.iter() {
            for &rot in samples.iter() {
                let (left, right) = arcade_ik(fwd, rot);
                assert!(
                    left.abs() <= 1.0 && right.abs() <= 1.0,
                    "ik({}, {}) out of range: ({}, {})",
                    fwd,
                    rot,
                    left,
                    right
                );
            }
        }
    }

    #[test]
    fn test_zero_demand_is_zero() {
        assert_eq!(arcade_ik(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_pure_forward_and_back() {
        assert_eq!(arcade_ik(1.0, 0.0), (1.0, 1.0));
        assert_eq!(arcade_ik(-1.0, 0.0), (-1.0, -1.0));
    }

    /// A pure rotation drives the wheels in equal and opposite directions.
    #[test]
    fn test_pure_rotation() {
        let (left, right) = arcade_ik(0.0, 1.0);
        assert_eq!(left, -right);
        assert_eq!(right, 1.0);

        let (left, right) = arcade_ik(0.0, -1.0);
        assert_eq!(left, -right);
        assert_eq!(right, -1.0);

        let (left, right) = arcade_ik(0.0, 0.5);
        assert_eq!(left, -right);
    }

    #[test]
    fn test_mixed_demand() {
        // Shaped inputs are (0.25, 0.25), mix gives (0, 0.5), and the
        // normalisation factor is 2
        let (left, right) = arcade_ik(0.5, 0.5);
        assert!((left - 0.0).abs() < 1e-12);
        assert!((right - 0.25).abs() < 1e-12);

        // The inverted-drive case: reversing away with a right turn
        let (left, right) = arcade_ik(-0.5, 0.5);
        assert!((left - -0.25).abs() < 1e-12);
        assert!((right - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_demands_clamped() {
        assert_eq!(arcade_ik(5.0, 0.0), (1.0, 1.0));
        assert_eq!(arcade_ik(0.0, -5.0), arcade_ik(0.0, -1.0));
    }
}
