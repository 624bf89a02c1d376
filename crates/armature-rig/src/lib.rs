//! IK chain solving for animation rigs.
//!
//! A host feeds a [`JointChain`] (built from its joints' local matrices)
//! and a goal into [`solve`], which picks the algorithm from the chain
//! length: a 1-bone aim, the 2-bone closed form, or FABRIK for longer
//! chains. [`solve_spline`] distributes a chain along an
//! [`armature_curve::Curve`] instead of reaching for a point. Solvers
//! return world matrices; [`localize`] converts them back to the host's
//! parent-relative form with each joint's offset rotation re-applied.
//!
//! All solvers are pure functions: same inputs, bit-identical outputs,
//! no retained state, and every failure surfaces as a [`SolveError`].

pub mod analytic;
pub mod chain;
mod error;
pub mod fabrik;
pub mod solver;
pub mod spline;
pub mod upvector;

pub use analytic::{solve_one_bone, solve_two_bone};
pub use chain::{EulerRotation, JointChain, JointSpec, localize};
pub use error::SolveError;
pub use fabrik::{FabrikConfig, compress_points, solve_fabrik};
pub use solver::{IkGoal, solve};
pub use spline::{SplineConfig, solve_spline};
pub use upvector::{SCENE_UP, guess_up_vector};
