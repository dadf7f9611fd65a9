//! Inbound events consumed by the avatar dispatcher

pub mod avatar;

pub use avatar::{
    AnimationControl, AnimationSequence, AppearanceChanged, FullObjectUpdate, GenericMessage,
    ObjectUpdateEntry,
};

use crate::networking::{InboundMessage, NetworkResult};
use crate::world::LocalEntityId;
use bytes::Bytes;
use tracing::debug;

/// Generic message method names handled by the avatar core
pub const METHOD_REX_APPEARANCE: &str = "RexAppearance";
pub const METHOD_REX_ANIM: &str = "RexAnim";

/// ObjectUpdate PCode of avatars; prims and trees are handled elsewhere
pub const PCODE_AVATAR: u8 = 0x2f;

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    FullObjectUpdate(FullObjectUpdate),
    /// A single 30- or 60-byte terse buffer
    CompactUpdate(Bytes),
    AppearanceChanged(AppearanceChanged),
    AnimationControl(AnimationControl),
    AnimationSequenceStarted(AnimationSequence),
    KillObject { local_id: LocalEntityId },
    Logout,
}

/// Translate an assembled message into avatar events by message name.
/// Messages the avatar core does not care about produce no events.
pub fn events_from_message(msg: &mut InboundMessage) -> NetworkResult<Vec<InboundEvent>> {
    let name = msg.name().to_string();
    let events = match name.as_str() {
        "ObjectUpdate" => {
            let mut update = FullObjectUpdate::read_from(msg)?;
            update.entries.retain(|entry| entry.pcode == PCODE_AVATAR);
            if update.entries.is_empty() {
                Vec::new()
            } else {
                vec![InboundEvent::FullObjectUpdate(update)]
            }
        }
        "ImprovedTerseObjectUpdate" => avatar::read_terse_object_update(msg)?
            .into_iter()
            .map(InboundEvent::CompactUpdate)
            .collect(),
        "KillObject" => avatar::read_kill_object(msg)?
            .into_iter()
            .map(|local_id| InboundEvent::KillObject { local_id })
            .collect(),
        "AvatarAnimation" => vec![InboundEvent::AnimationSequenceStarted(AnimationSequence::read_from(msg)?)],
        "GenericMessage" => {
            let generic = GenericMessage::read_from(msg)?;
            match generic.method.as_str() {
                METHOD_REX_APPEARANCE => AppearanceChanged::from_params(&generic.params)
                    .map(InboundEvent::AppearanceChanged)
                    .into_iter()
                    .collect(),
                METHOD_REX_ANIM => AnimationControl::from_params(&generic.params)
                    .map(InboundEvent::AnimationControl)
                    .into_iter()
                    .collect(),
                other => {
                    debug!("Ignoring generic message {}", other);
                    Vec::new()
                }
            }
        }
        "LogoutReply" => vec![InboundEvent::Logout],
        other => {
            debug!("No avatar handling for {}", other);
            Vec::new()
        }
    };
    Ok(events)
}
