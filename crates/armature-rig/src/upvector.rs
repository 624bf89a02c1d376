//! Up-vector estimation for chains without an explicit pole target.

use glam::Vec3;

/// Scene-wide up direction, used when a chain is too short to estimate
/// anything from its own geometry.
pub const SCENE_UP: Vec3 = Vec3::Y;

/// Cross products with squared length below this are treated as vanished.
const CROSS_EPS: f32 = 1e-10;

/// Estimates a stable up vector from a chain's point geometry.
///
/// Branches by point count:
/// - 0 or 1 points: [`SCENE_UP`].
/// - 2 points: the world axis least aligned with the bone, orthogonalized
///   against it.
/// - 3 points: normal of the two bone vectors (falling back to the 2-point
///   branch when they are colinear).
/// - 4+ points: end-to-end forward vector crossed against every interior
///   joint offset, accumulated with a sign-consistency correction so a
///   chain that curves back on itself does not cancel its own estimate;
///   the result is `average_right x forward`, normalized.
///
/// The returned vector is always unit length and orthogonal to the chain's
/// dominant direction.
pub fn guess_up_vector(points: &[Vec3]) -> Vec3 {
    match points.len() {
        0 | 1 => SCENE_UP,
        2 => orthogonal_axis(points[1] - points[0]),
        3 => {
            let v0 = points[1] - points[0];
            let v1 = points[2] - points[1];
            let right = v0.cross(v1);
            if right.length_squared() < CROSS_EPS {
                return orthogonal_axis(points[2] - points[0]);
            }
            let forward = points[2] - points[0];
            match right.cross(forward).try_normalize() {
                Some(up) => up,
                None => orthogonal_axis(points[2] - points[0]),
            }
        }
        n => {
            let span = points[n - 1] - points[0];
            let forward = match span.try_normalize() {
                Some(f) => f,
                // Closed loop: fall back to the first bone's direction.
                None => return orthogonal_axis(points[1] - points[0]),
            };

            let mut average_right = Vec3::ZERO;
            for point in &points[1..n - 1] {
                let mut right = forward.cross(*point - points[0]);
                if right.length_squared() < CROSS_EPS {
                    continue;
                }
                // Flip candidates that disagree with the running average so
                // an S-shaped chain does not cancel itself out.
                if right.dot(average_right) < 0.0 {
                    right = -right;
                }
                average_right += right;
            }

            match average_right.cross(forward).try_normalize() {
                Some(up) => up,
                // Every interior joint sat on the chain axis.
                None => orthogonal_axis(span),
            }
        }
    }
}

/// Unit vector orthogonal to `direction`, derived from the world axis least
/// aligned with it.
fn orthogonal_axis(direction: Vec3) -> Vec3 {
    let dir = match direction.try_normalize() {
        Some(d) => d,
        None => return SCENE_UP,
    };

    let dots = [dir.x.abs(), dir.y.abs(), dir.z.abs()];
    let mut axis_index = 0;
    for i in 1..3 {
        if dots[i] < dots[axis_index] {
            axis_index = i;
        }
    }
    let axis = [Vec3::X, Vec3::Y, Vec3::Z][axis_index];

    // Project out the chain direction; the least-aligned axis can never be
    // parallel to it, so this normalize cannot fail.
    (axis - dir * axis.dot(dir)).normalize()
}
