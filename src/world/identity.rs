//! Agent id <-> local id bookkeeping
//!
//! The registry only stores keys. Entities live in the scene, so a lookup
//! that outlives its entity simply misses when the scene is asked.

use crate::world::{ActorIdentity, LocalEntityId};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    local_by_actor: HashMap<ActorIdentity, LocalEntityId>,
    actor_by_local: HashMap<LocalEntityId, ActorIdentity>,
    /// Appearance addresses received before the avatar was created
    pending_appearances: HashMap<ActorIdentity, String>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an agent to a local id, replacing any earlier mapping for either side
    pub fn register_full_id(&mut self, actor_id: ActorIdentity, local_id: LocalEntityId) {
        if let Some(old_local) = self.local_by_actor.insert(actor_id, local_id) {
            if old_local != local_id {
                debug!("Agent {} moved from local id {} to {}", actor_id, old_local, local_id);
                self.actor_by_local.remove(&old_local);
            }
        }
        if let Some(old_actor) = self.actor_by_local.insert(local_id, actor_id) {
            if old_actor != actor_id {
                self.local_by_actor.remove(&old_actor);
            }
        }
    }

    pub fn unregister_full_id(&mut self, actor_id: &ActorIdentity) {
        if let Some(local_id) = self.local_by_actor.remove(actor_id) {
            self.actor_by_local.remove(&local_id);
        }
    }

    pub fn lookup_local_id(&self, actor_id: &ActorIdentity) -> Option<LocalEntityId> {
        self.local_by_actor.get(actor_id).copied()
    }

    pub fn lookup_actor_id(&self, local_id: LocalEntityId) -> Option<ActorIdentity> {
        self.actor_by_local.get(&local_id).copied()
    }

    pub fn queue_pending_appearance(&mut self, actor_id: ActorIdentity, address: impl Into<String>) {
        self.pending_appearances.insert(actor_id, address.into());
    }

    pub fn take_pending_appearance(&mut self, actor_id: &ActorIdentity) -> Option<String> {
        self.pending_appearances.remove(actor_id)
    }

    pub fn has_pending_appearance(&self, actor_id: &ActorIdentity) -> bool {
        self.pending_appearances.contains_key(actor_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_appearances.len()
    }

    /// Logout: forget queued appearances. Live mappings go with scene teardown.
    pub fn clear_all(&mut self) {
        self.pending_appearances.clear();
    }

    pub fn len(&self) -> usize {
        self.local_by_actor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_by_actor.is_empty()
    }
}
