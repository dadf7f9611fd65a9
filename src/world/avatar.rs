//! Avatar entities and the capability traits the avatar core works through

use crate::networking::serialization::CompactUpdate;
use crate::utils::math::horizontal_speed;
use crate::world::animation::AnimationBlender;
use crate::world::appearance::{definition_by_name, AnimationDefinition, AnimationDefinitionMap, AppearanceRecord};
use crate::world::{ActorIdentity, LocalEntityId};
use bitflags::bitflags;
use std::collections::HashMap;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

/// Locomotion animation speed per m/s of horizontal movement
const VELOCITY_ANIMATION_SCALE: f32 = 0.5;

bitflags! {
    /// Optional presentation features attached to avatars at creation time
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AvatarCapabilities: u32 {
        const NAME_OVERLAY  = 0b0001;
        const HOVERING_TEXT = 0b0010;
        const HIGHLIGHT     = 0b0100;
        const TOUCH_CURSOR  = 0b1000;
    }
}

impl Default for AvatarCapabilities {
    fn default() -> Self {
        Self::NAME_OVERLAY
    }
}

impl AvatarCapabilities {
    /// Widgets the UI layer attaches once when the avatar is created.
    /// The name overlay is driven per update instead.
    pub fn creation_overlays(self) -> Self {
        self & (Self::HOVERING_TEXT | Self::HIGHLIGHT | Self::TOUCH_CURSOR)
    }
}

/// Coarse stance derived from the posture animations the server reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Posture {
    #[default]
    Stand,
    Walk,
    Fly,
    Sit,
    Hover,
}

/// Identity and display data of an avatar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presence {
    pub local_id: LocalEntityId,
    pub agent_id: ActorIdentity,
    pub parent_id: LocalEntityId,
    pub region_handle: u64,
    pub first_name: String,
    pub last_name: String,
}

impl Presence {
    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Last transform received from the network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkPosition {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub orientation: Quat,
    pub rotation_velocity: Vec3,
    /// Set on every network write, cleared by whoever interpolates
    pub updated: bool,
}

impl Default for NetworkPosition {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            rotation_velocity: Vec3::ZERO,
            updated: false,
        }
    }
}

impl NetworkPosition {
    pub fn mark_updated(&mut self) {
        self.updated = true;
    }

    pub fn take_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }
}

pub trait HasPresence {
    fn presence(&self) -> &Presence;
    fn presence_mut(&mut self) -> &mut Presence;

    fn set_identity(&mut self, local_id: LocalEntityId, agent_id: ActorIdentity) {
        let presence = self.presence_mut();
        presence.local_id = local_id;
        presence.agent_id = agent_id;
    }

    /// Names from a parsed NameValue block; missing entries clear the name
    fn apply_name_values(&mut self, names: &HashMap<String, String>) {
        let presence = self.presence_mut();
        presence.first_name = names.get("FirstName").cloned().unwrap_or_default();
        presence.last_name = names.get("LastName").cloned().unwrap_or_default();
    }

    fn full_name(&self) -> String {
        self.presence().full_name()
    }
}

pub trait HasNetworkPosition {
    fn network_position(&self) -> &NetworkPosition;
    fn network_position_mut(&mut self) -> &mut NetworkPosition;

    /// Whether this client predicts the entity's motion itself
    fn is_locally_controlled(&self) -> bool;

    /// Write an orientation unless the entity is locally controlled
    fn set_network_orientation(&mut self, orientation: Quat) -> bool {
        if self.is_locally_controlled() {
            return false;
        }
        self.network_position_mut().orientation = orientation;
        true
    }

    /// Apply a decoded terse update. Orientation is left alone for locally
    /// controlled entities; everything else is overwritten.
    fn apply_remote_update(&mut self, update: &CompactUpdate) {
        let netpos = self.network_position_mut();
        netpos.position = update.position;
        netpos.velocity = update.velocity;
        netpos.acceleration = update.acceleration;
        netpos.rotation_velocity = update.rotation_velocity;
        self.set_network_orientation(update.rotation);
        self.network_position_mut().mark_updated();
    }
}

pub trait HasAnimationTrack {
    fn animation_blender(&self) -> &AnimationBlender;
    fn animation_blender_mut(&mut self) -> &mut AnimationBlender;
    fn animation_definitions(&self) -> &AnimationDefinitionMap;

    /// Make exactly `animation_ids` play. Ids without a definition are dropped.
    /// Running animations outside the set fade out with their own fade-out time.
    /// If the set holds an exclusive definition, the last one takes over and
    /// everything else fades out.
    fn apply_animation_set(&mut self, animation_ids: &[Uuid]) {
        let defs = self.animation_definitions();

        let mut to_start: Vec<AnimationDefinition> = Vec::with_capacity(animation_ids.len());
        for id in animation_ids {
            match defs.get(id) {
                Some(def) if !to_start.iter().any(|d| d.animation_name == def.animation_name) => {
                    to_start.push(def.clone())
                }
                Some(_) => {}
                None => trace!("No animation definition for {}", id),
            }
        }

        let to_stop: Vec<AnimationDefinition> = self
            .animation_blender()
            .running_animations()
            .into_iter()
            .filter(|name| !to_start.iter().any(|d| &d.animation_name == name))
            .map(|name| definition_by_name(defs, &name))
            .collect();

        let blender = self.animation_blender_mut();
        if let Some(def) = to_start.iter().rev().find(|d| d.exclusive) {
            if blender.enable_exclusive_animation(&def.animation_name, def.looped, def.fade_in, def.fade_out) {
                apply_definition(blender, def);
            }
            return;
        }

        for def in &to_start {
            if blender.enable_animation(&def.animation_name, def.looped, def.fade_in) {
                apply_definition(blender, def);
            }
        }
        for def in &to_stop {
            blender.disable_animation(&def.animation_name, def.fade_out);
        }
    }

    /// Scale velocity-driven animations by horizontal movement speed
    fn update_velocity_animations(&mut self, velocity: Vec3) {
        let speed = horizontal_speed(velocity) * VELOCITY_ANIMATION_SCALE;
        let defs = self.animation_definitions();
        let adjusted: Vec<(String, f32)> = self
            .animation_blender()
            .running_animations()
            .into_iter()
            .filter_map(|name| {
                let def = definition_by_name(defs, &name);
                def.use_velocity.then(|| (name, def.speed_factor * speed))
            })
            .collect();

        let blender = self.animation_blender_mut();
        for (name, speed) in adjusted {
            blender.set_animation_speed(&name, speed);
        }
    }
}

fn apply_definition(blender: &mut AnimationBlender, def: &AnimationDefinition) {
    blender.set_animation_speed(&def.animation_name, def.speed_factor);
    blender.set_animation_weight(&def.animation_name, def.weight_factor);
    if def.always_restart {
        blender.set_animation_time_position(&def.animation_name, 0.0);
    }
}

/// Scene object for one avatar, local or remote
#[derive(Debug, Clone, Default)]
pub struct AvatarEntity {
    pub presence: Presence,
    pub network_position: NetworkPosition,
    pub appearance: AppearanceRecord,
    pub animation: AnimationBlender,
    pub posture: Posture,
    pub capabilities: AvatarCapabilities,
    locally_controlled: bool,
}

impl AvatarEntity {
    pub fn new(local_id: LocalEntityId, capabilities: AvatarCapabilities) -> Self {
        Self {
            presence: Presence { local_id, ..Presence::default() },
            capabilities,
            ..Self::default()
        }
    }

    pub fn local_id(&self) -> LocalEntityId {
        self.presence.local_id
    }

    pub fn agent_id(&self) -> ActorIdentity {
        self.presence.agent_id
    }

    /// Add the locally-controlled marker. Returns false if it was already present.
    pub fn mark_locally_controlled(&mut self) -> bool {
        !std::mem::replace(&mut self.locally_controlled, true)
    }

    pub fn has_capability(&self, capability: AvatarCapabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// Per-frame animation step: velocity-driven speeds first, then the blend
    pub fn update_animations(&mut self, dt: f32) {
        let velocity = self.network_position.velocity;
        self.update_velocity_animations(velocity);
        self.animation.advance(dt);
    }
}

impl HasPresence for AvatarEntity {
    fn presence(&self) -> &Presence {
        &self.presence
    }

    fn presence_mut(&mut self) -> &mut Presence {
        &mut self.presence
    }
}

impl HasNetworkPosition for AvatarEntity {
    fn network_position(&self) -> &NetworkPosition {
        &self.network_position
    }

    fn network_position_mut(&mut self) -> &mut NetworkPosition {
        &mut self.network_position
    }

    fn is_locally_controlled(&self) -> bool {
        self.locally_controlled
    }
}

impl HasAnimationTrack for AvatarEntity {
    fn animation_blender(&self) -> &AnimationBlender {
        &self.animation
    }

    fn animation_blender_mut(&mut self) -> &mut AnimationBlender {
        &mut self.animation
    }

    fn animation_definitions(&self) -> &AnimationDefinitionMap {
        &self.appearance.animations
    }
}
