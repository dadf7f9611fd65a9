use crate::world::avatar::AvatarCapabilities;
use crate::world::{ActorIdentity, LocalEntityId};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::time::SystemTime;
use tracing::debug;

/// Notifications raised by the avatar core for input, camera, UI and
/// attachment systems. These are clean, application-friendly data structures.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// A remote user's avatar appeared in the scene
    UserConnected(UserConnectivityEvent),
    /// A remote user's avatar left the scene
    UserDisconnected(UserConnectivityEvent),
    /// The session's own avatar entity is now known and controllable
    ControllableEntityAssigned {
        local_id: LocalEntityId,
        agent_id: ActorIdentity,
    },
    /// Attachment graph should (re)link this entity with its parent/children
    ResolveParent { local_id: LocalEntityId },
    /// Name tag visibility for an avatar
    NameOverlay { local_id: LocalEntityId, visible: bool },
    /// Hovering text, highlight and touch widgets to attach to a new avatar
    OverlaysRequested {
        local_id: LocalEntityId,
        overlays: AvatarCapabilities,
    },
}

/// User arriving or leaving
#[derive(Debug, Clone, PartialEq)]
pub struct UserConnectivityEvent {
    pub agent_id: ActorIdentity,
    pub full_name: String,
    pub local_id: LocalEntityId,
    pub timestamp: SystemTime,
}

impl UserConnectivityEvent {
    pub fn new(agent_id: ActorIdentity, full_name: String, local_id: LocalEntityId) -> Self {
        Self {
            agent_id,
            full_name,
            local_id,
            timestamp: SystemTime::now(),
        }
    }
}

/// Outbound side of the notification channel. Sending never blocks and a
/// dropped receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<WorldEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<WorldEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink plus the receiver to read notifications from
    pub fn channel() -> (Self, Receiver<WorldEvent>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }

    /// A sink that drops everything
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: WorldEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                debug!("World event receiver dropped");
            }
        }
    }
}
