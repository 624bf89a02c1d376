//! Solver selection by joint count.
//!
//! Hosts describe a solve with an [`IkGoal`] and hand over a chain; the
//! right algorithm is picked from the chain length alone. Chains too short
//! to bend pass through unchanged, 2 and 3 joints get the closed-form
//! solvers, and anything longer iterates with FABRIK.

use glam::{Mat4, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analytic::{solve_one_bone, solve_two_bone};
use crate::chain::JointChain;
use crate::error::SolveError;
use crate::fabrik::{FabrikConfig, solve_fabrik};
use crate::upvector::guess_up_vector;

/// A host-supplied IK target.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkGoal {
    /// World transform of the goal; only its translation drives reaching.
    pub goal: Mat4,
    /// Pole/up direction. `None` lets the solver estimate one from the
    /// chain's own geometry.
    pub up: Option<Vec3>,
    /// Roll around each solved joint's forward axis, in radians.
    pub swivel: f32,
}

impl IkGoal {
    /// A goal at `position` with no explicit up vector and zero swivel.
    pub fn at(position: Vec3) -> Self {
        Self {
            goal: Mat4::from_translation(position),
            up: None,
            swivel: 0.0,
        }
    }

    /// World position of the goal.
    pub fn position(&self) -> Vec3 {
        self.goal.w_axis.truncate()
    }
}

/// Solves `chain` toward `goal`, choosing the algorithm by joint count:
/// 0 or 1 joints pass through, 2 joints aim, 3 joints use the two-bone
/// closed form, 4 or more use FABRIK.
///
/// The analytic solvers need a concrete up vector, so a missing one is
/// estimated from the chain's rest positions before dispatch; FABRIK does
/// its own estimation from the solved points.
pub fn solve(
    chain: &JointChain,
    goal: &IkGoal,
    config: &FabrikConfig,
) -> Result<Vec<Mat4>, SolveError> {
    let target = goal.position();
    match chain.len() {
        0 | 1 => Ok(chain.world_matrices()),
        2 => {
            let up = goal.up.unwrap_or_else(|| guess_up_vector(&chain.positions()));
            Ok(solve_one_bone(chain, target, up, goal.swivel)?.to_vec())
        }
        3 => {
            let up = goal.up.unwrap_or_else(|| guess_up_vector(&chain.positions()));
            Ok(solve_two_bone(chain, target, up, goal.swivel)?.to_vec())
        }
        _ => solve_fabrik(chain, target, goal.up, goal.swivel, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(n: usize) -> JointChain {
        let locals: Vec<Mat4> = (0..n)
            .map(|i| {
                if i == 0 {
                    Mat4::IDENTITY
                } else {
                    Mat4::from_translation(Vec3::X)
                }
            })
            .collect();
        JointChain::from_locals(Mat4::IDENTITY, &locals)
    }

    fn tip(matrices: &[Mat4]) -> Vec3 {
        matrices.last().unwrap().w_axis.truncate()
    }

    #[test]
    fn test_dispatch_short_chain_passthrough() {
        for n in 0..2 {
            let chain = chain_of(n);
            let solved = solve(&chain, &IkGoal::at(Vec3::ONE), &FabrikConfig::default()).unwrap();
            assert_eq!(solved, chain.world_matrices());
        }
    }

    #[test]
    fn test_dispatch_two_joints_aims() {
        let chain = chain_of(2);
        let goal = Vec3::new(0.0, 0.0, 2.0);
        let solved = solve(&chain, &IkGoal::at(goal), &FabrikConfig::default()).unwrap();
        assert_eq!(solved.len(), 2);
        // One bone of length 1 aiming at the goal.
        assert!((tip(&solved) - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_dispatch_three_joints_reaches_goal() {
        let chain = chain_of(3);
        let goal = Vec3::new(1.2, 0.8, 0.0);
        let solved = solve(&chain, &IkGoal::at(goal), &FabrikConfig::default()).unwrap();
        assert_eq!(solved.len(), 3);
        assert!((tip(&solved) - goal).length() < 1e-4);
    }

    #[test]
    fn test_dispatch_long_chain_uses_fabrik() {
        let chain = chain_of(5);
        let goal = Vec3::new(2.0, 2.0, 0.0);
        let solved = solve(&chain, &IkGoal::at(goal), &FabrikConfig::default()).unwrap();
        assert_eq!(solved.len(), 5);
        // Reach distance converges to the goal distance.
        let reach = (tip(&solved) - solved[0].w_axis.truncate()).length();
        assert!((reach - goal.length()).abs() < 1e-2);
    }

    #[test]
    fn test_goal_orientation_is_ignored() {
        let chain = chain_of(3);
        let position = Vec3::new(1.0, 1.0, 0.0);
        let plain = IkGoal::at(position);
        let rotated = IkGoal {
            goal: Mat4::from_translation(position) * Mat4::from_rotation_y(1.2),
            ..plain
        };
        let a = solve(&chain, &plain, &FabrikConfig::default()).unwrap();
        let b = solve(&chain, &rotated, &FabrikConfig::default()).unwrap();
        assert_eq!(a, b);
    }
}
