//! Basis and transform composition.

use glam::{Mat4, Vec3};

use crate::error::GeometryError;
use crate::rotate::Axis;

/// Squared length below which a cross product is considered vanished.
const CROSS_EPS: f32 = 1e-10;

/// Identity transform with its translation set to `v`.
pub fn position_matrix(v: Vec3) -> Mat4 {
    Mat4::from_translation(v)
}

/// Builds a transform from three basis axes and a position.
///
/// Callers are responsible for supplying unit-length, mutually orthogonal
/// axes; no re-orthogonalization is performed here.
pub fn compose_matrix(x_axis: Vec3, y_axis: Vec3, z_axis: Vec3, position: Vec3) -> Mat4 {
    Mat4::from_cols(
        x_axis.extend(0.0),
        y_axis.extend(0.0),
        z_axis.extend(0.0),
        position.extend(1.0),
    )
}

/// A world-space direction bound to a local basis axis.
///
/// `flip` negates the direction after normalization, so a joint whose
/// modeling-time forward points down -X can still aim its +X axis.
#[derive(Debug, Clone, Copy)]
pub struct AxisTarget {
    /// World-space direction (need not be normalized).
    pub direction: Vec3,
    /// Local axis that should point along `direction`.
    pub axis: Axis,
    /// Negate the direction after normalization.
    pub flip: bool,
}

impl AxisTarget {
    /// Binds `direction` to `axis` without flipping.
    pub fn new(direction: Vec3, axis: Axis) -> Self {
        Self {
            direction,
            axis,
            flip: false,
        }
    }

    /// Binds `direction` to `axis`, negated.
    pub fn flipped(direction: Vec3, axis: Axis) -> Self {
        Self {
            direction,
            axis,
            flip: true,
        }
    }

    fn resolve(&self) -> Result<Vec3, GeometryError> {
        let dir = self
            .direction
            .try_normalize()
            .ok_or(GeometryError::DegenerateBasis)?;
        Ok(if self.flip { -dir } else { dir })
    }
}

/// Builds an orthonormal aim basis at `origin`.
///
/// The forward target's local axis points exactly along its direction; the
/// up target's local axis is derived from its direction via cross products
/// (projected into the plane orthogonal to forward). The remaining axis is
/// chosen so the basis stays right-handed.
///
/// # Errors
///
/// [`GeometryError::DegenerateBasis`] when either direction is zero or the
/// two directions are parallel. This is never defaulted away: an arbitrary
/// substitute basis would produce an unpredictable orientation pop.
pub fn aim_matrix(
    forward: AxisTarget,
    up: AxisTarget,
    origin: Vec3,
) -> Result<Mat4, GeometryError> {
    if forward.axis == up.axis {
        return Err(GeometryError::DegenerateBasis);
    }

    let f = forward.resolve()?;
    let u_hint = up.resolve()?;

    let cross = f.cross(u_hint);
    if cross.length_squared() < CROSS_EPS {
        return Err(GeometryError::DegenerateBasis);
    }
    let cross = cross.normalize();
    // Component of the up hint orthogonal to forward, unit length.
    let u = cross.cross(f);

    let fwd_idx = forward.axis.index();
    let up_idx = up.axis.index();
    let third_idx = 3 - fwd_idx - up_idx;

    let mut axes = [Vec3::ZERO; 3];
    axes[fwd_idx] = f;
    axes[up_idx] = u;
    // forward x up == cross; negate when the axis triple is left-handed.
    axes[third_idx] = if even_triple(fwd_idx, up_idx, third_idx) {
        cross
    } else {
        -cross
    };

    Ok(compose_matrix(axes[0], axes[1], axes[2], origin))
}

fn even_triple(a: usize, b: usize, c: usize) -> bool {
    matches!((a, b, c), (0, 1, 2) | (1, 2, 0) | (2, 0, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_matrix() {
        let m = position_matrix(Vec3::new(1.0, 2.0, 3.0));
        let p = m.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn test_aim_matrix_forward_axis_points_at_target() {
        let dir = Vec3::new(1.0, 2.0, -0.5);
        let m = aim_matrix(
            AxisTarget::new(dir, Axis::X),
            AxisTarget::new(Vec3::Y, Axis::Y),
            Vec3::ZERO,
        )
        .unwrap();
        let x = m.x_axis.truncate();
        assert!((x - dir.normalize()).length() < 1e-6);
    }

    #[test]
    fn test_aim_matrix_is_orthonormal_right_handed() {
        let m = aim_matrix(
            AxisTarget::new(Vec3::new(0.2, 0.9, 0.1), Axis::X),
            AxisTarget::new(Vec3::Z, Axis::Y),
            Vec3::new(5.0, 0.0, 0.0),
        )
        .unwrap();
        let x = m.x_axis.truncate();
        let y = m.y_axis.truncate();
        let z = m.z_axis.truncate();
        assert!((x.length() - 1.0).abs() < 1e-6);
        assert!((y.length() - 1.0).abs() < 1e-6);
        assert!((z.length() - 1.0).abs() < 1e-6);
        assert!(x.dot(y).abs() < 1e-6);
        assert!((x.cross(y) - z).length() < 1e-6);
    }

    #[test]
    fn test_aim_matrix_other_axis_pairs_stay_right_handed() {
        // Odd permutation pair (forward Z, up Y) must negate the third axis.
        let m = aim_matrix(
            AxisTarget::new(Vec3::new(0.3, 0.1, 1.0), Axis::Z),
            AxisTarget::new(Vec3::Y, Axis::Y),
            Vec3::ZERO,
        )
        .unwrap();
        let x = m.x_axis.truncate();
        let y = m.y_axis.truncate();
        let z = m.z_axis.truncate();
        assert!((x.cross(y) - z).length() < 1e-6);
    }

    #[test]
    fn test_aim_matrix_flip() {
        let m = aim_matrix(
            AxisTarget::flipped(Vec3::X, Axis::X),
            AxisTarget::new(Vec3::Y, Axis::Y),
            Vec3::ZERO,
        )
        .unwrap();
        assert!((m.x_axis.truncate() + Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_aim_matrix_rejects_parallel_vectors() {
        let result = aim_matrix(
            AxisTarget::new(Vec3::Y, Axis::X),
            AxisTarget::new(Vec3::Y * 3.0, Axis::Y),
            Vec3::ZERO,
        );
        assert_eq!(result, Err(GeometryError::DegenerateBasis));
    }

    #[test]
    fn test_aim_matrix_rejects_zero_forward() {
        let result = aim_matrix(
            AxisTarget::new(Vec3::ZERO, Axis::X),
            AxisTarget::new(Vec3::Y, Axis::Y),
            Vec3::ZERO,
        );
        assert_eq!(result, Err(GeometryError::DegenerateBasis));
    }
}
