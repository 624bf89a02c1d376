//! Spline IK: joints distributed along a curve at their bone lengths.
//!
//! The solve runs in three stages over a throwaway sample table:
//! cumulative-length placement ([`build_samples`]), a per-joint distance
//! search that walks each sample until consecutive points sit one bone
//! length apart ([`refine_solution`]), and a final snap that forces exact
//! bone lengths along each locally estimated forward direction
//! ([`solution_points`]). Orientation is then an aim basis per point with
//! a twist angle interpolated from root to tip.

use armature_curve::Curve;
use armature_math::{Axis, AxisTarget, aim_matrix, axis_roll};
use glam::{Mat4, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::chain::{JointChain, world_scale};
use crate::error::SolveError;
use crate::upvector::guess_up_vector;

/// Arc-length distance of the first sample. Offset from zero so the root
/// joint's tangent query never sits exactly on a curve endpoint.
const START_OFFSET: f32 = 1e-3;

/// Configuration for the spline solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplineConfig {
    /// Acceptable error between a refined inter-sample distance and the
    /// bone length it targets.
    pub tolerance: f32,
    /// Refinement steps per joint before accepting the current sample.
    pub iteration_limit: u32,
}

impl Default for SplineConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            iteration_limit: 20,
        }
    }
}

/// One joint's position on the curve during a solve. Rebuilt from scratch
/// every call; nothing here survives between solves.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplineSample {
    /// Curve parameter in `[0, 1]`.
    param: f32,
    /// Arc length from the curve start.
    distance: f32,
    /// Bone length this sample must sit from its predecessor.
    bone_length: f32,
    /// Curve position at `param`.
    point: Vec3,
}

/// Initial placement: each joint at its cumulative bone distance along the
/// curve, clamped to the curve's total length.
fn build_samples<C: Curve>(
    chain: &JointChain,
    curve: &C,
    config: &SplineConfig,
) -> Result<Vec<SplineSample>, SolveError> {
    let total = curve.total_length(config.tolerance);
    let mut samples = Vec::with_capacity(chain.len());
    let mut distance = START_OFFSET;

    for joint in chain.joints() {
        distance = (distance + joint.length).min(total);
        let param = curve.param_at_length(distance)?;
        let point = curve.position_at(param)?;
        samples.push(SplineSample {
            param,
            distance,
            bone_length: joint.length,
            point,
        });
    }
    Ok(samples)
}

/// Walks each sample along the curve until its straight-line distance from
/// the previous sample matches its bone length.
///
/// The step is the signed error itself: chord distance short of the bone
/// length pushes the sample further along, overshoot pulls it back (never
/// behind its predecessor). A trial distance past the curve end is an
/// early termination, not an error; the chain simply overhangs the curve.
fn refine_solution<C: Curve>(
    samples: &mut [SplineSample],
    curve: &C,
    config: &SplineConfig,
) -> Result<(), SolveError> {
    let total = curve.total_length(config.tolerance);

    for i in 1..samples.len() {
        for _ in 0..config.iteration_limit {
            let chord = (samples[i].point - samples[i - 1].point).length();
            let error = samples[i].bone_length - chord;
            if error.abs() <= config.tolerance {
                break;
            }

            let trial = samples[i].distance + error;
            if trial >= total {
                samples[i].distance = total;
                samples[i].param = curve.param_at_length(total)?;
                samples[i].point = curve.position_at(samples[i].param)?;
                break;
            }

            samples[i].distance = trial.max(samples[i - 1].distance);
            samples[i].param = curve.param_at_length(samples[i].distance)?;
            samples[i].point = curve.position_at(samples[i].param)?;
        }
    }
    Ok(())
}

/// Converts refined samples to final joint positions with exact bone
/// lengths: each point snaps to its bone length along the direction from
/// the previous output point toward its refined sample.
///
/// When that direction degenerates (sample stuck at the curve end within
/// snap error of the previous point, as happens when the chain overhangs
/// the curve), the previous bone's direction is reused; with fewer than
/// two prior points there is no such direction and the solve fails with
/// insufficient geometry.
fn solution_points(
    samples: &[SplineSample],
    config: &SplineConfig,
) -> Result<Vec<Vec3>, SolveError> {
    let mut points = Vec::with_capacity(samples.len());
    points.push(samples[0].point);

    for (i, sample) in samples.iter().enumerate().skip(1) {
        let prev: Vec3 = points[i - 1];
        let chord = sample.point - prev;
        // The snap itself can overshoot a clamped sample by up to the
        // tolerance, leaving a tiny (possibly backward) chord.
        let direction = if chord.length() > config.tolerance * 2.0 {
            chord.normalize()
        } else {
            if i < 2 {
                return Err(SolveError::InsufficientGeometry { needed: 2, got: i });
            }
            let fallback: Vec3 = points[i - 1] - points[i - 2];
            match fallback.try_normalize() {
                Some(d) => d,
                None => return Err(SolveError::InsufficientGeometry { needed: 2, got: i }),
            }
        };
        points.push(prev + direction * sample.bone_length);
    }
    Ok(points)
}

/// Solves a chain along a curve.
///
/// Joints are placed at their bone lengths along the curve and oriented
/// with an aim basis per point (+X toward the next point, up estimated
/// with [`guess_up_vector`] when none is supplied). The twist angle rolls
/// each basis about its forward axis, interpolated linearly from
/// `start_twist` at the root to `end_twist` at the tip.
///
/// Chains of 0 or 1 joints return their input world matrices. Curve query
/// failures propagate as [`SolveError::Curve`]; nothing is retried.
pub fn solve_spline<C: Curve>(
    chain: &JointChain,
    curve: &C,
    up: Option<Vec3>,
    start_twist: f32,
    end_twist: f32,
    config: &SplineConfig,
) -> Result<Vec<Mat4>, SolveError> {
    let n = chain.len();
    if n < 2 {
        return Ok(chain.world_matrices());
    }

    let mut samples = build_samples(chain, curve, config)?;
    refine_solution(&mut samples, curve, config)?;
    let points = solution_points(&samples, config)?;

    let up = up.unwrap_or_else(|| guess_up_vector(&points));
    let last = n - 1;

    let mut matrices = Vec::with_capacity(n);
    for (i, joint) in chain.joints().iter().enumerate() {
        let forward = if i < last {
            points[i + 1] - points[i]
        } else {
            points[i] - points[i - 1]
        };
        let twist = start_twist + (end_twist - start_twist) * (i as f32 / last as f32);
        let basis = aim_matrix(
            AxisTarget::new(forward, Axis::X),
            AxisTarget::new(up, Axis::Y),
            points[i],
        )? * axis_roll(Axis::X, twist);
        matrices.push(basis * Mat4::from_scale(world_scale(&joint.world)));
    }
    Ok(matrices)
}
