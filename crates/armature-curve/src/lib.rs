//! Arc-length curve interface for the armature spline solver.
//!
//! The spline IK solver only needs four primitive queries from a curve:
//! total length, parameter-from-arc-length, position, and tangent. This
//! crate defines that contract as the [`Curve`] trait plus [`Polyline`], a
//! piecewise-linear implementation with cached cumulative lengths used by
//! solver tests and as a cheap runtime curve.

use glam::Vec3;
use thiserror::Error;

/// Errors from curve queries.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CurveError {
    /// The curve has no extent (fewer than two distinct points).
    #[error("curve is empty")]
    Empty,
    /// Parameter outside the curve's domain.
    #[error("parameter {param} outside curve domain [0, {max}]")]
    ParamOutOfRange {
        /// The offending parameter.
        param: f32,
        /// Upper bound of the domain.
        max: f32,
    },
}

/// The curve contract consumed by the spline IK solver.
///
/// Parameters live in `[0, 1]`. Arc-length queries clamp their input to the
/// curve's length; parametric queries error on out-of-domain parameters
/// instead, since a bad parameter indicates a solver bug rather than an
/// overlong chain.
pub trait Curve {
    /// Total arc length. `tolerance` bounds the approximation error for
    /// curves measured by adaptive sampling; exact curves may ignore it.
    fn total_length(&self, tolerance: f32) -> f32;

    /// Parameter whose arc length from the curve start equals `length`.
    /// `length` is clamped to `[0, total_length]`.
    fn param_at_length(&self, length: f32) -> Result<f32, CurveError>;

    /// Point on the curve at `param`.
    fn position_at(&self, param: f32) -> Result<Vec3, CurveError>;

    /// Tangent direction (normalized) at `param`.
    fn tangent_at(&self, param: f32) -> Result<Vec3, CurveError>;
}

/// A piecewise-linear curve with arc-length parameterization.
///
/// Cumulative segment lengths are cached at construction, so every query is
/// a binary search plus a lerp.
#[derive(Debug, Clone)]
pub struct Polyline {
    points: Vec<Vec3>,
    /// cumulative[i] is the arc length from the start to points[i].
    cumulative: Vec<f32>,
}

impl Polyline {
    /// Builds a polyline through `points`.
    pub fn new(points: Vec<Vec3>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += (*p - points[i - 1]).length();
            }
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    /// Control points.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn check(&self) -> Result<(), CurveError> {
        if self.points.len() < 2 || self.length() <= 0.0 {
            return Err(CurveError::Empty);
        }
        Ok(())
    }

    /// Index of the segment containing arc length `s`, and the local
    /// fraction within it.
    fn segment_at(&self, s: f32) -> (usize, f32) {
        let s = s.clamp(0.0, self.length());
        // First point with cumulative >= s; segment ends there.
        let idx = self
            .cumulative
            .partition_point(|&c| c < s)
            .clamp(1, self.points.len() - 1);
        let seg_start = self.cumulative[idx - 1];
        let seg_len = self.cumulative[idx] - seg_start;
        let t = if seg_len > 0.0 {
            (s - seg_start) / seg_len
        } else {
            0.0
        };
        (idx - 1, t)
    }
}

impl Curve for Polyline {
    fn total_length(&self, _tolerance: f32) -> f32 {
        self.length()
    }

    fn param_at_length(&self, length: f32) -> Result<f32, CurveError> {
        self.check()?;
        Ok(length.clamp(0.0, self.length()) / self.length())
    }

    fn position_at(&self, param: f32) -> Result<Vec3, CurveError> {
        self.check()?;
        if !(0.0..=1.0).contains(&param) {
            return Err(CurveError::ParamOutOfRange { param, max: 1.0 });
        }
        let (i, t) = self.segment_at(param * self.length());
        Ok(self.points[i].lerp(self.points[i + 1], t))
    }

    fn tangent_at(&self, param: f32) -> Result<Vec3, CurveError> {
        self.check()?;
        if !(0.0..=1.0).contains(&param) {
            return Err(CurveError::ParamOutOfRange { param, max: 1.0 });
        }
        let (i, _) = self.segment_at(param * self.length());
        (self.points[i + 1] - self.points[i])
            .try_normalize()
            .ok_or(CurveError::Empty)
    }
}
