use crate::data::Identity;
use crate::participant::ParticipantKind;
use crate::scene::{Scene, SceneError};
use log::*;
use std::collections::HashMap;

/// Owns one scene handle per participant identity.
///
/// Handles are created on first sight and mutated in place afterwards,
/// they only leave through [`IdentityRegistry::retire`].
pub struct IdentityRegistry<H> {
    handles: HashMap<Identity, H>,
}

impl<H> Default for IdentityRegistry<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<H> IdentityRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure<S>(
        &mut self,
        id: Identity,
        kind: ParticipantKind,
        scene: &mut S,
    ) -> Result<&mut H, SceneError>
    where
        S: Scene<Handle = H>,
    {
        use std::collections::hash_map::Entry;
        match self.handles.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let handle = scene.spawn(kind)?;
                info!("created {} mesh for id [{}]", kind, id);
                Ok(entry.insert(handle))
            }
        }
    }

    pub fn get(&self, id: Identity) -> Option<&H> {
        self.handles.get(&id)
    }

    pub fn get_mut(&mut self, id: Identity) -> Option<&mut H> {
        self.handles.get_mut(&id)
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.handles.contains_key(&id)
    }

    /// Removes the handle from the scene graph and forgets the identity.
    pub fn retire<S>(&mut self, id: Identity, scene: &mut S) -> bool
    where
        S: Scene<Handle = H>,
    {
        match self.handles.remove(&id) {
            Some(mut handle) => {
                scene.despawn(&mut handle);
                info!("retired mesh for id [{}]", id);
                true
            }
            None => false,
        }
    }

    pub fn identities(&self) -> impl Iterator<Item = Identity> + '_ {
        self.handles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
