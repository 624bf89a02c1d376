//! Forward And Backward Reaching IK for chains of 4+ joints.
//!
//! No closed form exists for these chains, so the solver iterates: each
//! pass pins the tip to the goal and re-anchors every joint at its bone
//! length toward its neighbor (backward sweep), then pins the origin and
//! re-anchors outward (forward sweep). Two heuristics keep the result
//! stable at pose extremes:
//!
//! - [`compress_points`] pre-bends the rest pose toward an estimate of the
//!   total bend the goal distance calls for, so the sweeps start near the
//!   answer instead of at the raw rest pose.
//! - The sweeps target an *alternate* goal projected along the vector from
//!   the chain origin through the current tip, at the real goal's
//!   distance. This keeps the pose's orientation stable while still
//!   converging on the correct reach.

use armature_math::{Axis, AxisTarget, aim_matrix, axis_roll};
use glam::{Mat4, Quat, Vec3};
use std::f32::consts::PI;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::chain::{JointChain, world_scale};
use crate::error::SolveError;
use crate::upvector::guess_up_vector;

/// Cross products with squared length below this are treated as vanished.
const CROSS_EPS: f32 = 1e-10;

/// Configuration for the FABRIK solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FabrikConfig {
    /// Reaching passes per solve. FABRIK converges within a handful of
    /// passes for typical rig chain lengths; this is a tunable, not a
    /// hard limit.
    pub iterations: u32,
    /// Tip-to-goal distance below which iteration stops early.
    pub tolerance: f32,
}

impl Default for FabrikConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            tolerance: 1e-3,
        }
    }
}

/// Signed turning angles at each interior point of a point chain, with a
/// cross-product sign-consistency check: the first non-vanishing cross
/// product fixes the reference bend direction, and bends whose cross
/// points the other way count negative.
fn signed_turning_angles(points: &[Vec3]) -> (Vec<f32>, Vec3) {
    let bones: Vec<Vec3> = points.windows(2).map(|w| w[1] - w[0]).collect();

    let mut reference = Vec3::ZERO;
    let mut angles = Vec::with_capacity(bones.len().saturating_sub(1));
    for pair in bones.windows(2) {
        let cross = pair[0].cross(pair[1]);
        let mut sign = 1.0;
        if cross.length_squared() >= CROSS_EPS {
            if reference == Vec3::ZERO {
                reference = cross.normalize();
            } else if cross.dot(reference) < 0.0 {
                sign = -1.0;
            }
        }
        angles.push(sign * pair[0].angle_between(pair[1]));
    }
    (angles, reference)
}

/// Degree-2 Lagrange interpolation through three (distance, angle-sum)
/// samples, evaluated at `x`. Falls back to linear interpolation when two
/// sample abscissae coincide (a straight or fully collapsed rest pose).
fn interpolate_angle_sum(samples: [(f32, f32); 3], x: f32) -> f32 {
    const NODE_EPS: f32 = 1e-5;
    let [(x0, y0), (x1, y1), (x2, y2)] = samples;

    // Duplicate nodes: drop the rest-pose sample and go linear through the
    // envelope endpoints.
    if (x0 - x1).abs() < NODE_EPS || (x0 - x2).abs() < NODE_EPS {
        if (x1 - x2).abs() < NODE_EPS {
            return y0;
        }
        let t = (x - x1) / (x2 - x1);
        return y1 + (y2 - y1) * t;
    }

    let l0 = ((x - x1) * (x - x2)) / ((x0 - x1) * (x0 - x2));
    let l1 = ((x - x0) * (x - x2)) / ((x1 - x0) * (x1 - x2));
    let l2 = ((x - x0) * (x - x1)) / ((x2 - x0) * (x2 - x1));
    y0 * l0 + y1 * l1 + y2 * l2
}

/// Pre-compresses a rest-pose point set toward the bend appropriate for
/// `goal_distance`.
///
/// The signed total turning angle of the rest chain, together with an
/// envelope of the achievable (distance, angle-sum) pairs, gives a
/// quadratic estimate of the angle sum the goal distance calls for. The
/// difference is redistributed over the interior joints in proportion to
/// each joint's share of the original turning, via quaternion rotations of
/// everything downstream about the joint's local bend axis.
///
/// Returns the points unchanged when fewer than 3 are supplied.
pub fn compress_points(points: &[Vec3], goal_distance: f32) -> Vec<Vec3> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let (rest_angles, reference) = signed_turning_angles(points);
    let rest_sum: f32 = rest_angles.iter().sum();
    let alternating = rest_angles.iter().any(|&a| a < 0.0);

    let bone_lengths: Vec<f32> = points.windows(2).map(|w| (w[1] - w[0]).length()).collect();
    let bone_count = bone_lengths.len();
    let total: f32 = bone_lengths.iter().sum();
    let longest = bone_lengths.iter().cloned().fold(0.0, f32::max);

    let rest_distance = (points[n - 1] - points[0]).length();
    let max_distance = total;
    let min_distance = (2.0 * longest - total).max(0.0);

    // Envelope of achievable angle sums: a straight chain (least bend) at
    // maximum reach, a fully coiled one at minimum reach. Alternating bend
    // directions push the least-bend end negative.
    let min_angle_sum = if alternating {
        -(bone_count as f32 - 2.0) * PI
    } else {
        0.0
    };
    let max_angle_sum = bone_count as f32 * PI;

    // A rest pose near either end of the distance range makes the quadratic
    // steep; clamp the estimate back into the achievable envelope.
    let target_sum = interpolate_angle_sum(
        [
            (rest_distance, rest_sum),
            (min_distance, max_angle_sum),
            (max_distance, min_angle_sum),
        ],
        goal_distance.clamp(min_distance, max_distance),
    )
    .clamp(min_angle_sum.min(rest_sum), max_angle_sum.max(rest_sum));

    let total_turning: f32 = rest_angles.iter().map(|a| a.abs()).sum();
    let joint_count = rest_angles.len() as f32;

    let mut out = points.to_vec();
    for (k, rest_angle) in rest_angles.iter().enumerate() {
        let share = if total_turning > 1e-6 {
            rest_angle.abs() / total_turning
        } else {
            1.0 / joint_count
        };
        let delta = target_sum * share - rest_angle;
        if delta.abs() < 1e-6 {
            continue;
        }

        // Interior point index for this turning angle.
        let pivot = k + 1;
        let v_in = out[pivot] - out[pivot - 1];
        let v_out = out[pivot + 1] - out[pivot];
        let mut axis = v_in.cross(v_out);
        if axis.length_squared() < CROSS_EPS {
            axis = if reference != Vec3::ZERO {
                reference
            } else {
                v_in.try_normalize()
                    .map(|v| v.any_orthonormal_vector())
                    .unwrap_or(Vec3::Z)
            };
        } else if axis.dot(reference) < 0.0 && reference != Vec3::ZERO {
            // Keep the rotation axis consistent with the reference bend
            // direction so signed deltas bend the expected way.
            axis = -axis;
        }
        let axis = axis.normalize();

        let rotation = Quat::from_axis_angle(axis, delta);
        let origin = out[pivot];
        for point in out.iter_mut().skip(pivot + 1) {
            *point = origin + rotation * (*point - origin);
        }
    }
    out
}

/// Solves an N-bone chain with FABRIK.
///
/// Chains of 0 or 1 joints have nothing to solve and return their input
/// world matrices. When `up` is `None` the up vector is estimated from the
/// solved points with [`guess_up_vector`]; a supplied up vector that ends
/// up parallel to a bone surfaces as a degenerate-basis error rather than
/// being silently replaced.
pub fn solve_fabrik(
    chain: &JointChain,
    goal: Vec3,
    up: Option<Vec3>,
    swivel: f32,
    config: &FabrikConfig,
) -> Result<Vec<Mat4>, SolveError> {
    let n = chain.len();
    if n < 2 {
        return Ok(chain.world_matrices());
    }

    let rest = chain.positions();
    let lengths: Vec<f32> = rest.windows(2).map(|w| (w[1] - w[0]).length()).collect();
    let origin = rest[0];
    let goal_distance = (goal - origin).length();

    let mut points = compress_points(&rest, goal_distance);

    // Project the goal along the compressed pose's own reach direction so
    // the solve keeps the pose's orientation instead of snapping the whole
    // chain toward the literal goal.
    let reach_dir = (points[n - 1] - origin)
        .try_normalize()
        .or_else(|| (goal - origin).try_normalize());
    let target = match reach_dir {
        Some(dir) => origin + dir * goal_distance,
        None => origin,
    };

    let rest_dirs: Vec<Vec3> = rest
        .windows(2)
        .map(|w| (w[1] - w[0]).try_normalize().unwrap_or(Vec3::X))
        .collect();

    for _ in 0..config.iterations {
        // Backward: pin the tip, re-anchor toward the origin.
        points[n - 1] = target;
        for i in (0..n - 1).rev() {
            let dir = (points[i] - points[i + 1])
                .try_normalize()
                .unwrap_or(-rest_dirs[i]);
            points[i] = points[i + 1] + dir * lengths[i];
        }
        // Forward: pin the origin, re-anchor outward.
        points[0] = origin;
        for i in 0..n - 1 {
            let dir = (points[i + 1] - points[i])
                .try_normalize()
                .unwrap_or(rest_dirs[i]);
            points[i + 1] = points[i] + dir * lengths[i];
        }

        if (points[n - 1] - target).length() <= config.tolerance {
            break;
        }
    }

    orient_points(chain, &points, up, swivel)
}

/// Builds world matrices through a solved point sequence: an aim basis per
/// segment (the last joint reuses the final segment's direction), rolled
/// by the swivel angle, with each input joint's scale re-applied.
fn orient_points(
    chain: &JointChain,
    points: &[Vec3],
    up: Option<Vec3>,
    swivel: f32,
) -> Result<Vec<Mat4>, SolveError> {
    let n = points.len();
    let up = up.unwrap_or_else(|| guess_up_vector(points));

    let mut matrices = Vec::with_capacity(n);
    for (i, joint) in chain.joints().iter().enumerate() {
        let forward = if i < n - 1 {
            points[i + 1] - points[i]
        } else {
            points[i] - points[i - 1]
        };
        let basis = aim_matrix(
            AxisTarget::new(forward, Axis::X),
            AxisTarget::new(up, Axis::Y),
            points[i],
        )? * axis_roll(Axis::X, swivel);
        matrices.push(basis * Mat4::from_scale(world_scale(&joint.world)));
    }
    Ok(matrices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::JointChain;

    fn chain_from_points(points: &[Vec3]) -> JointChain {
        let mut locals = Vec::with_capacity(points.len());
        let mut prev = Vec3::ZERO;
        for &p in points {
            locals.push(Mat4::from_translation(p - prev));
            prev = p;
        }
        JointChain::from_locals(Mat4::IDENTITY, &locals)
    }

    fn positions(matrices: &[Mat4]) -> Vec<Vec3> {
        matrices.iter().map(|m| m.w_axis.truncate()).collect()
    }

    fn assert_lengths_preserved(points: &[Vec3], expected: &[f32], tol: f32) {
        for (i, pair) in points.windows(2).enumerate() {
            let actual = (pair[1] - pair[0]).length();
            assert!(
                (actual - expected[i]).abs() <= tol,
                "bone {i}: length {actual} vs expected {}",
                expected[i]
            );
        }
    }

    #[test]
    fn test_compress_points_short_chain_unchanged() {
        let points = [Vec3::ZERO, Vec3::X];
        assert_eq!(compress_points(&points, 0.5), points.to_vec());
    }

    #[test]
    fn test_compress_points_straight_chain_at_full_reach_unchanged() {
        let points: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let out = compress_points(&points, 3.0);
        for (a, b) in out.iter().zip(points.iter()) {
            assert!((*a - *b).length() < 1e-4);
        }
    }

    #[test]
    fn test_compress_points_preserves_bone_lengths() {
        let points = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.2, 0.0),
            Vec3::new(2.0, 0.5, 0.0),
            Vec3::new(3.0, 0.2, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
        ];
        let expected: Vec<f32> = points.windows(2).map(|w| (w[1] - w[0]).length()).collect();
        let out = compress_points(&points, 2.0);
        assert_lengths_preserved(&out, &expected, 1e-4);
    }

    #[test]
    fn test_compress_points_shortens_reach_for_near_goal() {
        let points = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.2, 0.0),
            Vec3::new(2.0, 0.5, 0.0),
            Vec3::new(3.0, 0.2, 0.0),
        ];
        let rest_reach = (points[3] - points[0]).length();
        let out = compress_points(&points, rest_reach * 0.5);
        let compressed_reach = (out[3] - out[0]).length();
        assert!(
            compressed_reach < rest_reach,
            "compression should pull the tip inward: {compressed_reach} vs {rest_reach}"
        );
    }

    #[test]
    fn test_fabrik_reaches_goal_along_rest_axis() {
        // 4 joints, equal bone lengths L, goal at 3L straight down the rest
        // chain's forward axis: the tip must land on the goal.
        let points: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let chain = chain_from_points(&points);
        let goal = Vec3::new(3.0, 0.0, 0.0);

        let solved = solve_fabrik(&chain, goal, None, 0.0, &FabrikConfig::default()).unwrap();
        let p = positions(&solved);
        assert!((p[3] - goal).length() <= 1e-3);
        assert_lengths_preserved(&p, &[1.0, 1.0, 1.0], 1e-3);
    }

    #[test]
    fn test_fabrik_reachable_goal_off_axis() {
        let points = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.3, 0.0),
            Vec3::new(2.0, 0.6, 0.0),
            Vec3::new(3.0, 0.3, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
        ];
        let chain = chain_from_points(&points);
        let goal = Vec3::new(2.0, 1.5, 0.0);

        let solved = solve_fabrik(&chain, goal, None, 0.0, &FabrikConfig::default()).unwrap();
        let p = positions(&solved);
        let expected: Vec<f32> = points.windows(2).map(|w| (w[1] - w[0]).length()).collect();
        assert_lengths_preserved(&p, &expected, 1e-3);
        // Reach distance matches the goal distance (the alternate-goal
        // projection preserves distance, not direction).
        let reach = (p[4] - p[0]).length();
        assert!((reach - goal.length()).abs() < 1e-2);
    }

    #[test]
    fn test_fabrik_unreachable_goal_extends_chain() {
        let points = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.5, 0.0),
        ];
        let chain = chain_from_points(&points);
        let total: f32 = chain.total_length();
        let goal = Vec3::new(100.0, 0.0, 0.0);

        let solved = solve_fabrik(&chain, goal, None, 0.0, &FabrikConfig::default()).unwrap();
        let p = positions(&solved);
        // Tip ends at full reach along some direction.
        assert!(((p[3] - p[0]).length() - total).abs() < 1e-2);
    }

    #[test]
    fn test_fabrik_short_chain_is_noop() {
        let chain = chain_from_points(&[Vec3::ZERO]);
        let solved = solve_fabrik(
            &chain,
            Vec3::new(5.0, 0.0, 0.0),
            None,
            0.0,
            &FabrikConfig::default(),
        )
        .unwrap();
        assert_eq!(solved, chain.world_matrices());
    }

    #[test]
    fn test_fabrik_idempotent() {
        let points: Vec<Vec3> = (0..5).map(|i| Vec3::new(i as f32, (i % 2) as f32 * 0.3, 0.0)).collect();
        let chain = chain_from_points(&points);
        let goal = Vec3::new(3.0, 1.0, 0.5);
        let a = solve_fabrik(&chain, goal, None, 0.2, &FabrikConfig::default()).unwrap();
        let b = solve_fabrik(&chain, goal, None, 0.2, &FabrikConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fabrik_parallel_up_propagates_degenerate_basis() {
        let points: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let chain = chain_from_points(&points);
        // Chain solves along +X; forcing the up vector onto the same axis
        // must surface the degenerate basis, not default it away.
        let result = solve_fabrik(
            &chain,
            Vec3::new(3.0, 0.0, 0.0),
            Some(Vec3::X),
            0.0,
            &FabrikConfig::default(),
        );
        assert!(matches!(result, Err(SolveError::Geometry(_))));
    }

    #[test]
    fn test_lagrange_interpolation_hits_samples() {
        let samples = [(1.0, 2.0), (0.0, 10.0), (3.0, 0.0)];
        for (x, y) in samples {
            assert!((interpolate_angle_sum(samples, x) - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_lagrange_duplicate_nodes_fall_back_to_linear() {
        // Straight rest chain: rest distance equals max distance.
        let samples = [(3.0, 0.0), (0.0, 9.0), (3.0, 0.0)];
        let mid = interpolate_angle_sum(samples, 1.5);
        assert!((mid - 4.5).abs() < 1e-5);
    }
}
