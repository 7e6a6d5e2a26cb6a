use crate::participant::ParticipantKind;
use nalgebra as na;
use thiserror::Error;

/// Placement written onto a scene object or the camera.
///
/// The orientation is kept as a raw quaternion, senders do not normalize it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: na::Point3<f32>,
    pub orientation: na::Quaternion<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: na::Point3::origin(),
            orientation: na::Quaternion::identity(),
        }
    }

    pub fn isometry(&self) -> na::Isometry3<f32> {
        na::Isometry3::from_parts(
            na::Translation3::from(self.position.coords),
            na::UnitQuaternion::new_unchecked(self.orientation),
        )
    }

    /// Point one unit in front of the transform, looking down local `-Z`.
    pub fn look_target(&self) -> na::Point3<f32> {
        let rotation = na::UnitQuaternion::from_quaternion(self.orientation);
        self.position + rotation * na::Vector3::new(0.0, 0.0, -1.0)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("no mesh template for {0} participants")]
    NoTemplate(ParticipantKind),
    #[error("mesh asset {0:?} not found")]
    MissingAsset(std::path::PathBuf),
    #[error("failed to load mesh asset {path:?}: {source}")]
    AssetLoad {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Visual proxy of one participant.
pub trait Renderable {
    fn set_transform(&mut self, transform: &Transform);
}

/// Scene graph the observer session draws into.
pub trait Scene {
    type Handle: Renderable;

    fn has_template(&self, kind: ParticipantKind) -> bool;

    /// Instantiates the template for `kind` and adds it to the scene graph.
    fn spawn(&mut self, kind: ParticipantKind) -> Result<Self::Handle, SceneError>;

    fn despawn(&mut self, handle: &mut Self::Handle);

    fn set_camera(&mut self, transform: &Transform);
}
