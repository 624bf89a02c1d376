//! Rotation orders, per-axis composition, and Euler decomposition.
//!
//! Rotation matrices are composed so that the first axis listed in a
//! [`RotateOrder`] is the first rotation applied to a column vector:
//! order `Xyz` builds `Rz * Ry * Rx`.

use glam::{Mat3, Mat4, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Threshold past which the middle-axis sine/cosine term is treated as
/// saturated and the gimbal-lock branch is taken.
const GIMBAL_EPS: f32 = 1e-6;

/// A single basis axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Axis {
    /// The +X axis.
    #[default]
    X,
    /// The +Y axis.
    Y,
    /// The +Z axis.
    Z,
}

impl Axis {
    /// Index of this axis (0, 1, or 2).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector along this axis.
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Euler rotation order.
///
/// Six Tait-Bryan orders (all axes distinct) plus the three repeated-axis
/// orders. For repeated-axis orders the three angle components map to the
/// sequence slots: `x` drives the first rotation, `y` the middle, `z` the
/// last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RotateOrder {
    /// X, then Y, then Z.
    #[default]
    Xyz,
    /// X, then Z, then Y.
    Xzy,
    /// Y, then Z, then X.
    Yzx,
    /// Y, then X, then Z.
    Yxz,
    /// Z, then X, then Y.
    Zxy,
    /// Z, then Y, then X.
    Zyx,
    /// X, then Y, then X again.
    Xyx,
    /// Y, then Z, then Y again.
    Yzy,
    /// Z, then X, then Z again.
    Zxz,
}

impl RotateOrder {
    /// Axis indices in application order.
    pub fn sequence(self) -> [usize; 3] {
        match self {
            RotateOrder::Xyz => [0, 1, 2],
            RotateOrder::Xzy => [0, 2, 1],
            RotateOrder::Yzx => [1, 2, 0],
            RotateOrder::Yxz => [1, 0, 2],
            RotateOrder::Zxy => [2, 0, 1],
            RotateOrder::Zyx => [2, 1, 0],
            RotateOrder::Xyx => [0, 1, 0],
            RotateOrder::Yzy => [1, 2, 1],
            RotateOrder::Zxz => [2, 0, 2],
        }
    }

    /// Whether the first and last rotations share an axis.
    pub fn is_repeated(self) -> bool {
        matches!(self, RotateOrder::Xyx | RotateOrder::Yzy | RotateOrder::Zxz)
    }
}

/// Rotation about a single basis axis, as a `Mat4`.
///
/// This is the matrix-twist utility: solvers use it for swivel rolls around
/// the chain's forward axis and for spline twist interpolation.
pub fn axis_roll(axis: Axis, angle: f32) -> Mat4 {
    match axis {
        Axis::X => Mat4::from_rotation_x(angle),
        Axis::Y => Mat4::from_rotation_y(angle),
        Axis::Z => Mat4::from_rotation_z(angle),
    }
}

fn single_axis(index: usize, angle: f32) -> Mat4 {
    match index {
        0 => Mat4::from_rotation_x(angle),
        1 => Mat4::from_rotation_y(angle),
        _ => Mat4::from_rotation_z(angle),
    }
}

/// Builds a rotation matrix from per-axis angles composed in `order`.
///
/// For Tait-Bryan orders each component of `angles` is the rotation about
/// the matching world axis (`angles.x` about X, and so on). For repeated-axis
/// orders the components map to sequence slots (first, middle, last).
pub fn rotation_matrix(angles: Vec3, order: RotateOrder) -> Mat4 {
    let seq = order.sequence();
    let slot_angles = if order.is_repeated() {
        [angles.x, angles.y, angles.z]
    } else {
        [angles[seq[0]], angles[seq[1]], angles[seq[2]]]
    };

    single_axis(seq[2], slot_angles[2])
        * single_axis(seq[1], slot_angles[1])
        * single_axis(seq[0], slot_angles[0])
}

fn elem(m: &Mat3, row: usize, col: usize) -> f32 {
    m.col(col)[row]
}

fn is_even_permutation(a: usize, b: usize, c: usize) -> bool {
    matches!((a, b, c), (0, 1, 2) | (1, 2, 0) | (2, 0, 1))
}

/// Decomposes the rotation part of `matrix` into Euler angles for `order`.
///
/// Scale is stripped before decomposition. Gimbal-lock configurations (the
/// middle-axis term saturated to ±1) fall back to a one-degree-of-freedom
/// solution with the redundant third angle forced to zero.
///
/// Angle components are assigned the same way [`rotation_matrix`] reads
/// them, so `rotation_matrix(matrix_to_euler(m, o), o)` reproduces the
/// rotation of `m` for every order.
pub fn matrix_to_euler(matrix: &Mat4, order: RotateOrder) -> Vec3 {
    let m = Mat3::from_cols(
        matrix.x_axis.truncate().normalize_or_zero(),
        matrix.y_axis.truncate().normalize_or_zero(),
        matrix.z_axis.truncate().normalize_or_zero(),
    );

    let seq = order.sequence();
    if order.is_repeated() {
        euler_repeated(&m, seq[0], seq[1])
    } else {
        euler_tait_bryan(&m, seq)
    }
}

/// Tait-Bryan extraction for `M = Rc(gamma) * Rb(beta) * Ra(alpha)`.
fn euler_tait_bryan(m: &Mat3, seq: [usize; 3]) -> Vec3 {
    let [a, b, c] = seq;
    let sign = if is_even_permutation(a, b, c) { 1.0 } else { -1.0 };

    let s_beta = (-sign * elem(m, c, a)).clamp(-1.0, 1.0);
    let beta = s_beta.asin();

    let (alpha, gamma) = if s_beta.abs() < 1.0 - GIMBAL_EPS {
        (
            f32::atan2(sign * elem(m, c, b), elem(m, c, c)),
            f32::atan2(sign * elem(m, b, a), elem(m, a, a)),
        )
    } else {
        // Locked: only alpha ± gamma is observable. Keep alpha, zero gamma.
        (f32::atan2(-sign * elem(m, b, c), elem(m, b, b)), 0.0)
    };

    let mut out = Vec3::ZERO;
    out[a] = alpha;
    out[b] = beta;
    out[c] = gamma;
    out
}

/// Repeated-axis extraction for `M = Ra(gamma) * Rb(beta) * Ra(alpha)`.
///
/// All three supported repeated orders (XYX, YZY, ZXZ) are even
/// permutations, so no parity correction is needed.
fn euler_repeated(m: &Mat3, a: usize, b: usize) -> Vec3 {
    let c = 3 - a - b;

    let c_beta = elem(m, a, a).clamp(-1.0, 1.0);
    let beta = c_beta.acos();

    let (alpha, gamma) = if c_beta.abs() < 1.0 - GIMBAL_EPS {
        (
            f32::atan2(elem(m, a, b), elem(m, a, c)),
            f32::atan2(elem(m, b, a), -elem(m, c, a)),
        )
    } else if c_beta > 0.0 {
        // beta == 0: the two same-axis rotations fuse into one.
        (f32::atan2(elem(m, c, b), elem(m, b, b)), 0.0)
    } else {
        // beta == pi.
        (f32::atan2(-elem(m, c, b), elem(m, b, b)), 0.0)
    };

    Vec3::new(alpha, beta, gamma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const ORDERS: [RotateOrder; 9] = [
        RotateOrder::Xyz,
        RotateOrder::Xzy,
        RotateOrder::Yzx,
        RotateOrder::Yxz,
        RotateOrder::Zxy,
        RotateOrder::Zyx,
        RotateOrder::Xyx,
        RotateOrder::Yzy,
        RotateOrder::Zxz,
    ];

    fn assert_mat4_close(a: &Mat4, b: &Mat4, eps: f32) {
        for col in 0..4 {
            for row in 0..4 {
                assert!(
                    (a.col(col)[row] - b.col(col)[row]).abs() < eps,
                    "matrices differ at [{row}][{col}]: {a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_euler_roundtrip_all_orders() {
        let angles = Vec3::new(0.3, -0.4, 0.5);
        for order in ORDERS {
            let m = rotation_matrix(angles, order);
            let decomposed = matrix_to_euler(&m, order);
            let rebuilt = rotation_matrix(decomposed, order);
            assert_mat4_close(&m, &rebuilt, 1e-5);
        }
    }

    #[test]
    fn test_euler_roundtrip_negative_angles() {
        let angles = Vec3::new(-1.2, 0.7, -2.1);
        for order in ORDERS {
            let m = rotation_matrix(angles, order);
            let rebuilt = rotation_matrix(matrix_to_euler(&m, order), order);
            assert_mat4_close(&m, &rebuilt, 1e-5);
        }
    }

    #[test]
    fn test_gimbal_lock_tait_bryan() {
        // Middle axis at +-90 degrees saturates the sine term.
        for middle in [FRAC_PI_2, -FRAC_PI_2] {
            let m = rotation_matrix(Vec3::new(0.3, middle, 0.0), RotateOrder::Xyz);
            let decomposed = matrix_to_euler(&m, RotateOrder::Xyz);
            assert_eq!(decomposed.z, 0.0);
            let rebuilt = rotation_matrix(decomposed, RotateOrder::Xyz);
            assert_mat4_close(&m, &rebuilt, 1e-5);
        }
    }

    #[test]
    fn test_gimbal_lock_repeated_axis() {
        // Middle angle 0 and pi fuse the two same-axis rotations.
        for middle in [0.0, PI] {
            let m = rotation_matrix(Vec3::new(0.4, middle, 0.2), RotateOrder::Zxz);
            let decomposed = matrix_to_euler(&m, RotateOrder::Zxz);
            assert_eq!(decomposed.z, 0.0);
            let rebuilt = rotation_matrix(decomposed, RotateOrder::Zxz);
            assert_mat4_close(&m, &rebuilt, 1e-5);
        }
    }

    #[test]
    fn test_rotation_matrix_strips_nothing() {
        // Xyz with only an X angle is a plain X rotation.
        let m = rotation_matrix(Vec3::new(0.8, 0.0, 0.0), RotateOrder::Xyz);
        assert_mat4_close(&m, &Mat4::from_rotation_x(0.8), 1e-6);
    }

    #[test]
    fn test_matrix_to_euler_ignores_scale() {
        let rot = rotation_matrix(Vec3::new(0.2, 0.5, -0.3), RotateOrder::Zyx);
        let scaled = rot * Mat4::from_scale(Vec3::new(2.0, 0.5, 3.0));
        let decomposed = matrix_to_euler(&scaled, RotateOrder::Zyx);
        let rebuilt = rotation_matrix(decomposed, RotateOrder::Zyx);
        assert_mat4_close(&rot, &rebuilt, 1e-5);
    }

    #[test]
    fn test_axis_roll_matches_single_axis() {
        assert_mat4_close(&axis_roll(Axis::Y, 1.1), &Mat4::from_rotation_y(1.1), 1e-6);
    }
}
