use crate::data::{Pose, Quaternion};
use crate::scene::{Renderable, Transform};
use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a sensor orientation is mapped into the scene frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseStrategy {
    /// Device frame has Y and Z swapped and mirrored handedness in the XY plane.
    ///
    /// Builds `(x, z, y, w)`, inverts it and negates the resulting `z` and `w`.
    /// The inverse is taken as the conjugate, the way a scene graph inverts
    /// rotations it assumes to be unit length.
    AxisRemapped,
    /// Components are used as received.
    Direct,
}

impl Default for PoseStrategy {
    fn default() -> Self {
        PoseStrategy::AxisRemapped
    }
}

impl PoseStrategy {
    pub fn orientation(self, [x, y, z, w]: Quaternion) -> na::Quaternion<f32> {
        match self {
            PoseStrategy::AxisRemapped => {
                let swapped = na::Quaternion::new(w, x, z, y);
                let inverted = swapped.conjugate();
                na::Quaternion::new(-inverted.w, inverted.i, inverted.j, -inverted.k)
            }
            PoseStrategy::Direct => na::Quaternion::new(w, x, y, z),
        }
    }
}

impl FromStr for PoseStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "axis_remapped" => Ok(PoseStrategy::AxisRemapped),
            "direct" => Ok(PoseStrategy::Direct),
            other => Err(format!("unknown pose strategy {:?}", other)),
        }
    }
}

/// Writes decoded poses onto renderables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseApplier {
    pub strategy: PoseStrategy,
    pub position_scale: f32,
}

impl Default for PoseApplier {
    fn default() -> Self {
        Self::new(PoseStrategy::default(), 1.0)
    }
}

impl PoseApplier {
    pub fn new(strategy: PoseStrategy, position_scale: f32) -> Self {
        Self {
            strategy,
            position_scale,
        }
    }

    pub fn transform(&self, pose: &Pose) -> Transform {
        let [x, y, z] = pose.position;
        let position = na::Point3::new(x, y, z) * self.position_scale;
        Transform {
            position,
            orientation: self.strategy.orientation(pose.orientation),
        }
    }

    pub fn apply<R: Renderable + ?Sized>(&self, pose: &Pose, handle: &mut R) {
        handle.set_transform(&self.transform(pose));
    }
}
