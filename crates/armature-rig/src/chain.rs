//! The joint chain model consumed by every solver.
//!
//! A [`JointChain`] is an ordered sequence of [`JointSpec`] entries derived
//! from host-supplied local matrices: each joint's world matrix is the
//! running parent-world product, and each bone length is the distance
//! between consecutive world positions. Lengths are the invariant every
//! solver must reproduce in its output.

use armature_math::{RotateOrder, rotation_matrix};
use glam::{Mat4, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Euler angles paired with their rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EulerRotation {
    /// Per-axis angles in radians.
    pub angles: Vec3,
    /// Order the axis rotations are applied in.
    pub order: RotateOrder,
}

impl EulerRotation {
    /// Creates a rotation from angles and an order.
    pub fn new(angles: Vec3, order: RotateOrder) -> Self {
        Self { angles, order }
    }

    /// The rotation as a matrix.
    pub fn to_matrix(&self) -> Mat4 {
        rotation_matrix(self.angles, self.order)
    }
}

/// One joint in a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSpec {
    /// Fallback orientation used when IK is disabled upstream. Carried for
    /// the caller; never mutated here.
    pub preferred_rotation: EulerRotation,
    /// Fixed local offset re-applied after solving, accounting for
    /// modeling-time axis misalignment. Immutable for the life of a solve.
    pub offset_rotation: EulerRotation,
    /// Transform relative to the parent joint, as received from the host.
    pub local: Mat4,
    /// `parent_world * local`; computed once per solve, read-only after.
    pub world: Mat4,
    /// World matrix of this joint's parent (the chain's root parent for
    /// joint 0).
    pub parent_world: Mat4,
    /// Distance from the previous joint's world position (0 for the root).
    pub length: f32,
}

/// An ordered joint chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointChain {
    joints: Vec<JointSpec>,
}

impl JointChain {
    /// Wraps pre-built joints.
    pub fn new(joints: Vec<JointSpec>) -> Self {
        Self { joints }
    }

    /// Builds a chain from local matrices under a root parent transform.
    ///
    /// World matrices are the running product `parent_world * local`; bone
    /// lengths are measured between consecutive world positions, with the
    /// root joint's length fixed at 0. Preferred and offset rotations
    /// default to identity; use [`JointChain::joints_mut`] to attach host
    /// values.
    pub fn from_locals(root_parent: Mat4, locals: &[Mat4]) -> Self {
        let mut joints = Vec::with_capacity(locals.len());
        let mut parent_world = root_parent;
        let mut prev_position: Option<Vec3> = None;

        for local in locals {
            let world = parent_world * *local;
            let position = world.w_axis.truncate();
            let length = prev_position.map_or(0.0, |p| (position - p).length());

            joints.push(JointSpec {
                preferred_rotation: EulerRotation::default(),
                offset_rotation: EulerRotation::default(),
                local: *local,
                world,
                parent_world,
                length,
            });

            parent_world = world;
            prev_position = Some(position);
        }

        Self { joints }
    }

    /// Number of joints.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// True when the chain has no joints.
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// The joints in order.
    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    /// Mutable access to the joints, for attaching host rotations.
    pub fn joints_mut(&mut self) -> &mut [JointSpec] {
        &mut self.joints
    }

    /// World positions of every joint, in order.
    pub fn positions(&self) -> Vec<Vec3> {
        self.joints
            .iter()
            .map(|j| j.world.w_axis.truncate())
            .collect()
    }

    /// World matrices of every joint, in order.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        self.joints.iter().map(|j| j.world).collect()
    }

    /// Bone lengths, in joint order (root entry is 0).
    pub fn lengths(&self) -> Vec<f32> {
        self.joints.iter().map(|j| j.length).collect()
    }

    /// Sum of all bone lengths.
    pub fn total_length(&self) -> f32 {
        self.joints.iter().map(|j| j.length).sum()
    }
}

/// Localizes solved world matrices back into each joint's parent space and
/// re-applies the joint's offset rotation.
///
/// This is the post-processing step between the solver core and the host:
/// the solvers return world-space matrices, the host wants parent-relative
/// ones with the modeling-time offset folded back in.
///
/// # Panics
///
/// Panics if `world.len()` differs from the chain's joint count.
pub fn localize(world: &[Mat4], chain: &JointChain) -> Vec<Mat4> {
    assert_eq!(world.len(), chain.len(), "one world matrix per joint");
    world
        .iter()
        .zip(chain.joints())
        .map(|(w, joint)| joint.parent_world.inverse() * *w * joint.offset_rotation.to_matrix())
        .collect()
}

/// Scale component of a world matrix, used by solvers to re-apply each
/// input joint's scale to its solved output.
pub(crate) fn world_scale(m: &Mat4) -> Vec3 {
    m.to_scale_rotation_translation().0
}
