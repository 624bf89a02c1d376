//! Spherical interpolation and weighted transform blending.

use glam::{Mat4, Quat, Vec3};

/// Below this `sin(theta)` the slerp denominator is unstable and plain
/// linear weights are used instead.
const SLERP_SIN_EPS: f32 = 1e-3;

/// Spherical linear interpolation between two quaternions.
///
/// Takes the short arc (negates `b` when the dot product is negative).
/// Degrades to linear interpolation of the blend weights when `sin(theta)`
/// falls below `1e-3`.
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let mut dot = a.dot(b);
    let b = if dot < 0.0 {
        dot = -dot;
        -b
    } else {
        b
    };

    let dot = dot.clamp(-1.0, 1.0);
    let theta = dot.acos();
    let sin_theta = theta.sin();

    let (wa, wb) = if sin_theta < SLERP_SIN_EPS {
        (1.0 - t, t)
    } else {
        (
            ((1.0 - t) * theta).sin() / sin_theta,
            (t * theta).sin() / sin_theta,
        )
    };

    Quat::from_xyzw(
        a.x * wa + b.x * wb,
        a.y * wa + b.y * wb,
        a.z * wa + b.z * wb,
        a.w * wa + b.w * wb,
    )
    .normalize()
}

/// Matrix overload of [`slerp`].
///
/// Decomposes both transforms, slerps the rotations, and linearly
/// interpolates translation and scale.
pub fn slerp_matrix(a: &Mat4, b: &Mat4, t: f32) -> Mat4 {
    let (scale_a, rot_a, trans_a) = a.to_scale_rotation_translation();
    let (scale_b, rot_b, trans_b) = b.to_scale_rotation_translation();
    Mat4::from_scale_rotation_translation(
        scale_a.lerp(scale_b, t),
        slerp(rot_a, rot_b, t),
        trans_a.lerp(trans_b, t),
    )
}

/// Weight-normalized blend of several target transforms.
///
/// Translation and scale are weighted averages; rotation is accumulated
/// through successive [`slerp`] calls so the result stays a valid rotation
/// regardless of target count. Returns `None` when `targets` is empty or
/// the weights sum to zero.
pub fn blend_matrices(targets: &[(Mat4, f32)]) -> Option<Mat4> {
    let total: f32 = targets.iter().map(|(_, w)| w.max(0.0)).sum();
    if targets.is_empty() || total <= 0.0 {
        return None;
    }

    let mut translation = Vec3::ZERO;
    let mut scale = Vec3::ZERO;
    let mut rotation = Quat::IDENTITY;
    let mut accumulated = 0.0;

    for (matrix, weight) in targets {
        let weight = weight.max(0.0);
        if weight == 0.0 {
            continue;
        }
        let (s, r, p) = matrix.to_scale_rotation_translation();
        let norm = weight / total;
        translation += p * norm;
        scale += s * norm;

        accumulated += weight;
        if accumulated == weight {
            rotation = r;
        } else {
            rotation = slerp(rotation, r, weight / accumulated);
        }
    }

    Some(Mat4::from_scale_rotation_translation(
        scale, rotation, translation,
    ))
}
