//! Avatar-related inbound messages
//!
//! Each type knows how to pull itself out of an assembled template message
//! (or, for generic messages, out of the parameter list).

use crate::networking::{MessageReader, NetworkResult};
use crate::utils::math::parsing::{parse_bool, parse_f32_or, parse_i32_or};
use crate::world::{ActorIdentity, LocalEntityId};
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

/// One ObjectData instance of an ObjectUpdate
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUpdateEntry {
    pub local_id: LocalEntityId,
    pub actor_id: ActorIdentity,
    pub pcode: u8,
    pub object_data: Bytes,
    pub parent_id: LocalEntityId,
    pub name_value: String,
}

/// Full ObjectUpdate for avatar prims
#[derive(Debug, Clone, PartialEq)]
pub struct FullObjectUpdate {
    pub region_handle: u64,
    pub entries: Vec<ObjectUpdateEntry>,
}

impl FullObjectUpdate {
    /// Read the RegionData block and every ObjectData instance. Instances that
    /// fail to parse are dropped; the rest are kept in message order.
    pub fn read_from(msg: &mut dyn MessageReader) -> NetworkResult<Self> {
        msg.reset_reading();

        let region_handle = msg.read_u64()?;
        msg.skip_to_next_variable()?; // TimeDilation

        let instance_count = msg.read_current_block_instance_count();
        let mut entries = Vec::with_capacity(instance_count);
        for index in 0..instance_count {
            match ObjectUpdateEntry::read_from(msg) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed ObjectData instance {}: {}", index, e),
            }
            msg.skip_to_next_instance_start();
        }

        Ok(Self { region_handle, entries })
    }
}

impl ObjectUpdateEntry {
    fn read_from(msg: &mut dyn MessageReader) -> NetworkResult<Self> {
        let local_id = msg.read_u32()?;
        msg.skip_to_next_variable()?; // State
        let actor_id = msg.read_uuid()?;
        msg.skip_to_next_variable()?; // CRC
        let pcode = msg.read_u8()?;

        msg.skip_to_first_variable_by_name("ObjectData")?;
        let object_data = msg.read_buffer()?;

        msg.skip_to_first_variable_by_name("ParentID")?;
        let parent_id = msg.read_u32()?;

        msg.skip_to_first_variable_by_name("NameValue")?;
        let name_value = msg.read_string()?;

        Ok(Self { local_id, actor_id, pcode, object_data, parent_id, name_value })
    }
}

/// AvatarAnimation: the full set of animations an avatar is now playing
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSequence {
    pub actor_id: ActorIdentity,
    pub animation_ids: Vec<Uuid>,
}

impl AnimationSequence {
    pub fn read_from(msg: &mut dyn MessageReader) -> NetworkResult<Self> {
        msg.reset_reading();
        let actor_id = msg.read_uuid()?;

        let count = msg.read_current_block_instance_count();
        let mut animation_ids = Vec::with_capacity(count);
        for _ in 0..count {
            let anim_id = msg.read_uuid()?;
            let _sequence = msg.read_s32()?;
            animation_ids.push(anim_id);
        }

        // AnimationSourceList and PhysicalAvatarEventList are not used
        Ok(Self { actor_id, animation_ids })
    }
}

/// KillObject: ids of objects leaving the scene
pub fn read_kill_object(msg: &mut dyn MessageReader) -> NetworkResult<Vec<LocalEntityId>> {
    msg.reset_reading();
    let count = msg.read_current_block_instance_count();
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(msg.read_u32()?);
    }
    Ok(ids)
}

/// ImprovedTerseObjectUpdate: raw terse buffers, one per ObjectData instance
pub fn read_terse_object_update(msg: &mut dyn MessageReader) -> NetworkResult<Vec<Bytes>> {
    msg.reset_reading();
    msg.skip_to_next_variable()?; // RegionHandle
    msg.skip_to_next_variable()?; // TimeDilation

    let count = msg.read_current_block_instance_count();
    let mut buffers = Vec::with_capacity(count);
    for _ in 0..count {
        buffers.push(msg.read_buffer()?);
        msg.skip_to_next_instance_start(); // TextureEntry
    }
    Ok(buffers)
}

/// GenericMessage envelope: method name plus ordered string parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenericMessage {
    pub method: String,
    pub params: Vec<String>,
}

impl GenericMessage {
    pub fn read_from(msg: &mut dyn MessageReader) -> NetworkResult<Self> {
        msg.reset_reading();
        msg.skip_to_next_variable()?; // AgentID
        msg.skip_to_next_variable()?; // SessionID
        msg.skip_to_next_variable()?; // TransactionID
        let method = msg.read_string()?;
        msg.skip_to_next_variable()?; // Invoice

        let count = msg.read_current_block_instance_count();
        let mut params = Vec::with_capacity(count);
        for _ in 0..count {
            params.push(msg.read_string()?);
        }
        Ok(Self { method, params })
    }
}

/// RexAppearance generic message: `[address, actor, override?]`
#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceChanged {
    pub actor_id: ActorIdentity,
    pub address: String,
    pub override_appearance: bool,
}

impl AppearanceChanged {
    pub fn from_params(params: &[String]) -> Option<Self> {
        if params.len() < 2 {
            debug!("RexAppearance with {} parameters ignored", params.len());
            return None;
        }
        let actor_id = Uuid::parse_str(params[1].trim()).ok()?;
        let override_appearance = params.get(2).map(|p| parse_bool(p)).unwrap_or(false);

        Some(Self { actor_id, address: params[0].clone(), override_appearance })
    }
}

/// RexAnim generic message:
/// `[actor, animation, rate, fadein, fadeout, repeats, stop]`
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationControl {
    pub actor_id: ActorIdentity,
    pub animation_name: String,
    pub rate: f32,
    pub fade_in: f32,
    pub fade_out: f32,
    pub repeats: u32,
    pub stop: bool,
}

impl AnimationControl {
    pub const PARAM_COUNT: usize = 7;

    pub fn from_params(params: &[String]) -> Option<Self> {
        if params.len() < Self::PARAM_COUNT {
            debug!("RexAnim with {} parameters ignored", params.len());
            return None;
        }

        let actor_id = Uuid::parse_str(params[0].trim()).ok()?;
        let repeats = parse_i32_or(&params[5], 1).max(0) as u32;

        Some(Self {
            actor_id,
            animation_name: params[1].clone(),
            rate: parse_f32_or(&params[2], 1.0),
            fade_in: parse_f32_or(&params[3], 0.0),
            fade_out: parse_f32_or(&params[4], 0.0),
            repeats,
            stop: parse_bool(&params[6]),
        })
    }
}
