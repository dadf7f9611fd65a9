pub mod animation;
pub mod appearance;
pub mod avatar;
pub mod dispatcher;
pub mod events;
pub mod identity;
pub mod posture;
pub mod resolver;
pub mod scene;
pub mod skeleton;

/// Transient per-session id of a scene entity (the simulator's local id)
pub type LocalEntityId = u32;

/// Persistent id of an agent across sessions
pub type ActorIdentity = uuid::Uuid;

// Re-export the types most callers need
pub use animation::{AnimationBlender, AnimationPhase, AnimationState};
pub use appearance::{AnimationDefinition, AnimationDefinitionMap, AppearanceLoader, AppearanceRequest};
pub use avatar::{
    AvatarCapabilities, AvatarEntity, HasAnimationTrack, HasNetworkPosition, HasPresence,
    NetworkPosition, Posture, Presence,
};
pub use dispatcher::{SessionInfo, UpdateDispatcher};
pub use events::*;
pub use identity::IdentityRegistry;
pub use posture::PostureTable;
pub use resolver::EntityResolver;
pub use scene::Scene;
pub use skeleton::{DefaultRig, RenderEngine, SkeletonTracks};
