//! Local id -> avatar entity resolution, creating avatars on first sight

use crate::world::appearance::{AnimationDefinitionMap, AppearanceLoader, AppearanceRequest};
use crate::world::avatar::{AvatarCapabilities, AvatarEntity, HasPresence};
use crate::world::identity::IdentityRegistry;
use crate::world::scene::Scene;
use crate::world::skeleton::RenderEngine;
use crate::world::{ActorIdentity, LocalEntityId};
use tracing::{debug, info, warn};

/// Builds fully formed avatar entities. The only place avatars are created.
pub struct EntityResolver {
    engine: Option<Box<dyn RenderEngine>>,
    capabilities: AvatarCapabilities,
    default_animations: AnimationDefinitionMap,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("has_engine", &self.engine.is_some())
            .field("capabilities", &self.capabilities)
            .field("default_animations", &self.default_animations.len())
            .finish()
    }
}

impl EntityResolver {
    pub fn new(engine: Option<Box<dyn RenderEngine>>, capabilities: AvatarCapabilities) -> Self {
        Self {
            engine,
            capabilities,
            default_animations: AnimationDefinitionMap::new(),
        }
    }

    /// Animation definitions every new avatar starts with until its own appearance arrives
    pub fn with_default_animations(mut self, definitions: AnimationDefinitionMap) -> Self {
        self.default_animations = definitions;
        self
    }

    pub fn set_engine(&mut self, engine: Option<Box<dyn RenderEngine>>) {
        self.engine = engine;
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn capabilities(&self) -> AvatarCapabilities {
        self.capabilities
    }

    /// Return the avatar for `local_id`, creating it if needed.
    ///
    /// The flag is `true` when the entity already existed. `None` means the
    /// scene or the renderer is unavailable and nothing was created.
    pub fn get_or_create_avatar_entity<'s>(
        &mut self,
        scene: Option<&'s mut Scene>,
        registry: &mut IdentityRegistry,
        appearance: &dyn AppearanceLoader,
        local_id: LocalEntityId,
        actor_id: ActorIdentity,
    ) -> Option<(&'s mut AvatarEntity, bool)> {
        let Some(scene) = scene else {
            warn!("No scene, cannot create avatar {}", local_id);
            return None;
        };
        if scene.contains(local_id) {
            return scene.get_mut(local_id).map(|entity| (entity, true));
        }

        let Some(engine) = self.engine.as_mut() else {
            warn!("Renderer gone, cannot create avatar {}", local_id);
            return None;
        };
        if !engine.can_create_placeable() {
            warn!("Renderer cannot place avatar {}", local_id);
            return None;
        }

        let mut entity = AvatarEntity::new(local_id, self.capabilities);
        let skeleton = engine.create_avatar_skeleton(local_id);
        if skeleton.is_none() {
            debug!("Avatar {} has no skeleton, animations disabled", local_id);
        }
        entity.animation.set_skeleton(skeleton);
        entity.appearance.animations = self.default_animations.clone();

        registry.register_full_id(actor_id, local_id);
        entity.set_identity(local_id, actor_id);

        if let Some(address) = registry.take_pending_appearance(&actor_id) {
            debug!("Applying queued appearance {} to avatar {}", address, local_id);
            entity.appearance.set_address(address.clone(), false);
            appearance.download_appearance(AppearanceRequest {
                local_id,
                agent_id: actor_id,
                address,
                override_appearance: false,
            });
        }

        info!("Created avatar entity {} for agent {}", local_id, actor_id);
        Some((scene.insert(entity), false))
    }
}
