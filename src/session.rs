use crate::applier::PoseApplier;
use crate::data::{decode_batch, DecodeError, Identity, Payload, PoseBatch};
use crate::participant::ParticipantKind;
use crate::registry::IdentityRegistry;
use crate::scene::{Scene, SceneError};
use crate::transport::TransportEvent;
use log::*;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("dropping message: {0}")]
    Decode(#[from] DecodeError),
    #[error("no mesh template for id [{id}] ({kind}), observers do not publish poses")]
    UnknownParticipant { id: Identity, kind: ParticipantKind },
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Outcome of one applied batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub created: Vec<Identity>,
    pub updated: usize,
    pub camera_updated: bool,
    pub retired: Vec<Identity>,
}

/// Observer side of the pose stream.
///
/// Every message is decoded and applied synchronously on the caller's
/// thread, the render loop then reads whatever the scene holds.
pub struct ObserverSession<S: Scene> {
    scene: S,
    registry: IdentityRegistry<S::Handle>,
    applier: PoseApplier,
    own_identity: Option<Identity>,
    retire_absent: bool,
    state: ConnectionState,
}

impl<S: Scene> ObserverSession<S> {
    pub fn new(scene: S, applier: PoseApplier, own_identity: Option<Identity>) -> Self {
        Self {
            scene,
            registry: IdentityRegistry::new(),
            applier,
            own_identity,
            retire_absent: false,
            state: ConnectionState::Disconnected,
        }
    }

    /// Retire handles whose identity is missing from a full-state batch.
    pub fn retire_absent(mut self, enabled: bool) -> Self {
        self.retire_absent = enabled;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn registry(&self) -> &IdentityRegistry<S::Handle> {
        &self.registry
    }

    pub fn handle_event(&mut self, event: TransportEvent) -> Result<(), SessionError> {
        match event {
            TransportEvent::Connecting => self.transition(ConnectionState::Connecting),
            TransportEvent::Connected => self.transition(ConnectionState::Connected),
            TransportEvent::Closed(reason) => {
                info!("observer connection closed [{:?}]", reason);
                self.transition(ConnectionState::Closed);
            }
            TransportEvent::Error(error) => {
                error!("observer connection error [{}]", error);
                self.transition(ConnectionState::Closed);
            }
            TransportEvent::Message(payload) => {
                if self.state != ConnectionState::Connected {
                    warn!("dropping message received while {:?}", self.state);
                    return Ok(());
                }
                let report = self.handle_payload(&payload)?;
                trace!("applied batch {:?}", report);
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: ConnectionState) {
        use ConnectionState::*;
        let allowed = matches!(
            (self.state, next),
            (Disconnected, Connecting)
                | (Disconnected, Connected)
                | (Connecting, Connected)
                | (Disconnected, Closed)
                | (Connecting, Closed)
                | (Connected, Closed)
        );
        if allowed {
            debug!("observer session {:?} -> {:?}", self.state, next);
            self.state = next;
        } else {
            warn!("ignoring transition {:?} -> {:?}", self.state, next);
        }
    }

    pub fn handle_payload(&mut self, payload: &Payload) -> Result<BatchReport, SessionError> {
        let batch = decode_batch(payload)?;
        self.apply_batch(&batch)
    }

    pub fn apply_batch(&mut self, batch: &PoseBatch) -> Result<BatchReport, SessionError> {
        // reject the whole batch before touching the scene
        for &id in batch.keys() {
            if Some(id) == self.own_identity || self.registry.contains(id) {
                continue;
            }
            let kind = ParticipantKind::for_identity(id);
            if !self.scene.has_template(kind) {
                return Err(SessionError::UnknownParticipant { id, kind });
            }
        }

        let mut report = BatchReport::default();
        for (&id, pose) in batch {
            if Some(id) == self.own_identity {
                // watching through our own sensor
                self.scene.set_camera(&self.applier.transform(pose));
                report.camera_updated = true;
                continue;
            }
            let is_new = !self.registry.contains(id);
            let kind = ParticipantKind::for_identity(id);
            let handle = self.registry.ensure(id, kind, &mut self.scene)?;
            self.applier.apply(pose, handle);
            if is_new {
                report.created.push(id);
            } else {
                report.updated += 1;
            }
        }

        if self.retire_absent {
            let absent: Vec<Identity> = self
                .registry
                .identities()
                .filter(|id| !batch.contains_key(id))
                .collect();
            for id in absent {
                if self.registry.retire(id, &mut self.scene) {
                    report.retired.push(id);
                }
            }
        }
        Ok(report)
    }

    pub fn retire(&mut self, id: Identity) -> bool {
        self.registry.retire(id, &mut self.scene)
    }
}
