//! Inbound avatar events -> scene, registry and animation changes
//!
//! Everything runs on the caller's thread. Each handler returns whether the
//! event was processed; malformed or unknown input is logged and skipped.

use crate::networking::packets::{AnimationControl, FullObjectUpdate, InboundEvent};
use crate::networking::serialization::{decode_compact_update, decode_full_update_position, is_valid_position};
use crate::utils::math::parsing::parse_name_value_map;
use crate::world::appearance::{AppearanceLoader, AppearanceRequest};
use crate::world::avatar::{AvatarCapabilities, AvatarEntity, HasAnimationTrack, HasNetworkPosition, HasPresence};
use crate::world::events::{EventSink, UserConnectivityEvent, WorldEvent};
use crate::world::identity::IdentityRegistry;
use crate::world::posture::PostureTable;
use crate::world::resolver::EntityResolver;
use crate::world::scene::Scene;
use crate::world::{ActorIdentity, LocalEntityId};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Largest absolute coordinate accepted from the network
pub const DEFAULT_WORLD_BOUND: f32 = 10_000.0;

/// What the dispatcher knows about its own login session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    pub agent_id: ActorIdentity,
    /// Appearance address used for the own avatar when the server sends none
    pub avatar_storage_url: String,
}

pub struct UpdateDispatcher {
    session: SessionInfo,
    scene: Option<Scene>,
    registry: IdentityRegistry,
    resolver: EntityResolver,
    postures: PostureTable,
    appearance: Box<dyn AppearanceLoader>,
    events: EventSink,
    world_bound: f32,
}

impl UpdateDispatcher {
    pub fn new(
        session: SessionInfo,
        resolver: EntityResolver,
        appearance: Box<dyn AppearanceLoader>,
        events: EventSink,
    ) -> Self {
        Self {
            session,
            scene: None,
            registry: IdentityRegistry::new(),
            resolver,
            postures: PostureTable::standard(),
            appearance,
            events,
            world_bound: DEFAULT_WORLD_BOUND,
        }
    }

    pub fn with_postures(mut self, postures: PostureTable) -> Self {
        self.postures = postures;
        self
    }

    pub fn with_world_bound(mut self, world_bound: f32) -> Self {
        self.world_bound = world_bound;
        self
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn set_session(&mut self, session: SessionInfo) {
        self.session = session;
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn resolver_mut(&mut self) -> &mut EntityResolver {
        &mut self.resolver
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Make `scene` the active scene, returning the previous one
    pub fn attach_scene(&mut self, scene: Scene) -> Option<Scene> {
        info!("Attaching scene {}", scene.name());
        let previous = self.detach_scene();
        self.scene = Some(scene);
        previous
    }

    /// Tear down the active scene. Its avatars leave the identity registry.
    pub fn detach_scene(&mut self) -> Option<Scene> {
        let scene = self.scene.take()?;
        for entity in scene.iter() {
            if self.registry.lookup_local_id(&entity.agent_id()) == Some(entity.local_id()) {
                self.registry.unregister_full_id(&entity.agent_id());
            }
        }
        debug!("Detached scene {} with {} avatars", scene.name(), scene.len());
        Some(scene)
    }

    pub fn avatar(&self, local_id: LocalEntityId) -> Option<&AvatarEntity> {
        self.scene.as_ref()?.get(local_id)
    }

    pub fn avatar_by_actor(&self, actor_id: &ActorIdentity) -> Option<&AvatarEntity> {
        let local_id = self.registry.lookup_local_id(actor_id)?;
        self.avatar(local_id)
    }

    fn avatar_by_actor_mut(&mut self, actor_id: &ActorIdentity) -> Option<&mut AvatarEntity> {
        let local_id = self.registry.lookup_local_id(actor_id)?;
        self.scene.as_mut()?.get_mut(local_id)
    }

    /// Local id of the session's own avatar, if it is in the scene
    pub fn user_avatar(&self) -> Option<LocalEntityId> {
        self.avatar_by_actor(&self.session.agent_id).map(AvatarEntity::local_id)
    }

    pub fn dispatch(&mut self, event: &InboundEvent) -> bool {
        match event {
            InboundEvent::FullObjectUpdate(update) => self.handle_full_object_update(update),
            InboundEvent::CompactUpdate(bytes) => self.handle_compact_update(bytes),
            InboundEvent::AppearanceChanged(changed) => {
                self.handle_appearance_changed(changed.actor_id, &changed.address, changed.override_appearance)
            }
            InboundEvent::AnimationControl(control) => self.handle_animation_control(control),
            InboundEvent::AnimationSequenceStarted(sequence) => {
                self.handle_animation_sequence(sequence.actor_id, &sequence.animation_ids)
            }
            InboundEvent::KillObject { local_id } => self.handle_kill_object(*local_id),
            InboundEvent::Logout => {
                self.handle_logout();
                true
            }
        }
    }

    /// Create or refresh every avatar in the update, in message order.
    ///
    /// If an avatar cannot be created the rest of the update is abandoned and
    /// `false` is returned.
    pub fn handle_full_object_update(&mut self, update: &FullObjectUpdate) -> bool {
        if update.entries.is_empty() {
            return false;
        }

        for entry in &update.entries {
            let Some((entity, existing)) = self.resolver.get_or_create_avatar_entity(
                self.scene.as_mut(),
                &mut self.registry,
                self.appearance.as_ref(),
                entry.local_id,
                entry.actor_id,
            ) else {
                warn!("Could not resolve avatar {}, dropping object update", entry.local_id);
                return false;
            };

            entity.presence.region_handle = update.region_handle;

            if let Some(position) = decode_full_update_position(&entry.object_data) {
                if is_valid_position(position, self.world_bound) {
                    entity.network_position.position = position;
                    entity.network_position.mark_updated();
                } else {
                    warn!("Avatar {} got invalid position {:?}, ignored", entry.local_id, position);
                }
            }

            entity.presence.parent_id = entry.parent_id;

            entity.apply_name_values(&parse_name_value_map(&entry.name_value));

            let local_id = entity.local_id();
            let agent_id = entity.agent_id();
            let is_own = agent_id == self.session.agent_id;

            let overlays = entity.capabilities.creation_overlays();
            if !existing && !overlays.is_empty() {
                self.events.emit(WorldEvent::OverlaysRequested { local_id, overlays });
            }

            if entity.has_capability(AvatarCapabilities::NAME_OVERLAY) {
                self.events.emit(WorldEvent::NameOverlay { local_id, visible: !is_own });
            }

            if is_own && entity.mark_locally_controlled() {
                info!("Own avatar is entity {}", local_id);
                self.events.emit(WorldEvent::ControllableEntityAssigned { local_id, agent_id });

                if entity.appearance.address.is_empty() && !self.session.avatar_storage_url.is_empty() {
                    entity.appearance.set_address(self.session.avatar_storage_url.clone(), false);
                    self.appearance.download_appearance(AppearanceRequest {
                        local_id,
                        agent_id,
                        address: self.session.avatar_storage_url.clone(),
                        override_appearance: false,
                    });
                }
            }

            if !existing && !is_own {
                let full_name = entity.full_name();
                info!("User {} ({}) entered the scene", full_name, agent_id);
                self.events
                    .emit(WorldEvent::UserConnected(UserConnectivityEvent::new(agent_id, full_name, local_id)));
            }

            self.events.emit(WorldEvent::ResolveParent { local_id });
        }

        true
    }

    /// Apply a 30- or 60-byte terse update to a tracked avatar
    pub fn handle_compact_update(&mut self, bytes: &[u8]) -> bool {
        let update = match decode_compact_update(bytes) {
            Ok(update) => update,
            Err(e) => {
                debug!("Undecodable terse update: {}", e);
                return false;
            }
        };

        let Some(entity) = self.scene.as_mut().and_then(|scene| scene.get_mut(update.local_id)) else {
            trace!("Terse update for untracked object {}", update.local_id);
            return false;
        };

        if !is_valid_position(update.position, self.world_bound) {
            warn!("Avatar {} got invalid position {:?}, update dropped", update.local_id, update.position);
            return false;
        }

        entity.apply_remote_update(&update);
        true
    }

    /// Point an avatar at a new appearance, or remember it until the avatar shows up
    pub fn handle_appearance_changed(&mut self, actor_id: ActorIdentity, address: &str, override_appearance: bool) -> bool {
        let Some(entity) = self.avatar_by_actor_mut(&actor_id) else {
            debug!("Queueing appearance for unknown agent {}", actor_id);
            self.registry.queue_pending_appearance(actor_id, address);
            return true;
        };

        entity.appearance.set_address(address, override_appearance);
        let request = AppearanceRequest {
            local_id: entity.local_id(),
            agent_id: actor_id,
            address: address.to_string(),
            override_appearance,
        };
        self.appearance.download_appearance(request);
        true
    }

    pub fn handle_animation_control(&mut self, control: &AnimationControl) -> bool {
        let Some(entity) = self.avatar_by_actor_mut(&control.actor_id) else {
            debug!("Animation control for unknown agent {}", control.actor_id);
            return false;
        };

        let blender = &mut entity.animation;
        let name = control.animation_name.as_str();
        if control.stop {
            return blender.disable_animation(name, control.fade_out);
        }

        if !blender.enable_animation(name, false, control.fade_in) {
            debug!("Avatar {} has no animation {}", entity.presence.local_id, name);
            return false;
        }
        blender.set_animation_speed(name, control.rate);
        blender.set_animation_auto_stop(name, true);
        blender.set_animation_num_loops(name, control.repeats);
        true
    }

    /// Server-side animation list: update posture, then play exactly this set
    pub fn handle_animation_sequence(&mut self, actor_id: ActorIdentity, animation_ids: &[Uuid]) -> bool {
        let posture = self.postures.resolve(animation_ids);
        let Some(entity) = self.avatar_by_actor_mut(&actor_id) else {
            debug!("Animations for unknown agent {}", actor_id);
            return false;
        };

        if let Some(posture) = posture {
            entity.posture = posture;
        }
        entity.apply_animation_set(animation_ids);
        true
    }

    pub fn handle_kill_object(&mut self, local_id: LocalEntityId) -> bool {
        let Some(entity) = self.scene.as_mut().and_then(|scene| scene.remove(local_id)) else {
            trace!("Kill for untracked object {}", local_id);
            return false;
        };

        let agent_id = entity.agent_id();
        if agent_id != self.session.agent_id {
            let full_name = entity.full_name();
            info!("User {} ({}) left the scene", full_name, agent_id);
            self.events
                .emit(WorldEvent::UserDisconnected(UserConnectivityEvent::new(agent_id, full_name, local_id)));
        }

        if self.registry.lookup_local_id(&agent_id) == Some(local_id) {
            self.registry.unregister_full_id(&agent_id);
        }
        true
    }

    pub fn handle_logout(&mut self) {
        info!("Logout, dropping {} queued appearances", self.registry.pending_count());
        self.registry.clear_all();
    }

    /// Frame step for every avatar in the scene
    pub fn update(&mut self, dt: f32) {
        if let Some(scene) = self.scene.as_mut() {
            for entity in scene.iter_mut() {
                entity.update_animations(dt);
            }
        }
    }

    /// Download the own avatar's appearance again
    pub fn reload_user_avatar(&mut self) -> bool {
        let agent_id = self.session.agent_id;
        let Some(entity) = self.avatar_by_actor_mut(&agent_id) else {
            return false;
        };
        if entity.appearance.address.is_empty() {
            debug!("Own avatar has no appearance address to reload");
            return false;
        }

        let request = AppearanceRequest {
            local_id: entity.local_id(),
            agent_id,
            address: entity.appearance.address.clone(),
            override_appearance: entity.appearance.override_appearance,
        };
        self.appearance.download_appearance(request);
        true
    }
}
