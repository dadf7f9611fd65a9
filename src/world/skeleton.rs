//! Renderer-side skeletal animation state
//!
//! The avatar core never talks to the GPU. What it needs from the renderer is
//! the per-track playback state of the avatar's skeleton (length, time,
//! weight, enabled, loop) and a way to get a skeleton for a new avatar.

use crate::world::LocalEntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Playback state of one skeletal animation track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    pub length: f32,
    pub time_position: f32,
    pub weight: f32,
    pub enabled: bool,
    pub looped: bool,
}

impl TrackState {
    pub fn new(length: f32) -> Self {
        Self {
            length: length.max(0.0),
            time_position: 0.0,
            weight: 1.0,
            enabled: false,
            looped: true,
        }
    }

    /// Looping tracks wrap into [0, length); others clamp to [0, length]
    pub fn set_time_position(&mut self, time: f32) {
        if self.looped && self.length > 0.0 {
            self.time_position = time.rem_euclid(self.length);
        } else {
            self.time_position = time.clamp(0.0, self.length);
        }
    }

    pub fn add_time(&mut self, offset: f32) {
        self.set_time_position(self.time_position + offset);
    }

    pub fn at_end(&self, speed: f32) -> bool {
        if speed >= 0.0 {
            self.time_position >= self.length
        } else {
            self.time_position <= 0.0
        }
    }
}

/// All animation tracks of one instantiated avatar mesh
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonTracks {
    mesh_name: String,
    tracks: BTreeMap<String, TrackState>,
}

impl SkeletonTracks {
    pub fn new(mesh_name: impl Into<String>) -> Self {
        Self { mesh_name: mesh_name.into(), tracks: BTreeMap::new() }
    }

    pub fn with_track(mut self, name: impl Into<String>, length: f32) -> Self {
        self.tracks.insert(name.into(), TrackState::new(length));
        self
    }

    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    pub fn has_track(&self, name: &str) -> bool {
        self.tracks.contains_key(name)
    }

    pub fn track(&self, name: &str) -> Option<&TrackState> {
        self.tracks.get(name)
    }

    pub fn track_mut(&mut self, name: &str) -> Option<&mut TrackState> {
        self.tracks.get_mut(name)
    }

    pub fn track_names(&self) -> impl Iterator<Item = &str> {
        self.tracks.keys().map(String::as_str)
    }
}

/// Rendering collaborator used when avatars are created
pub trait RenderEngine {
    /// Whether placeable scene nodes can be created at all
    fn can_create_placeable(&self) -> bool;

    /// Instantiate the avatar mesh for a new entity and return its skeleton
    fn create_avatar_skeleton(&mut self, local_id: LocalEntityId) -> Option<SkeletonTracks>;
}

/// One track of the default avatar rig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigTrack {
    pub name: String,
    pub length: f32,
}

/// Engine that gives every avatar a copy of one default rig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRig {
    pub mesh_name: String,
    pub tracks: Vec<RigTrack>,
}

impl Default for DefaultRig {
    fn default() -> Self {
        let track = |name: &str, length: f32| RigTrack { name: name.to_string(), length };
        Self {
            mesh_name: "default_avatar.mesh".to_string(),
            tracks: vec![
                track("Stand", 4.0),
                track("Walk", 1.2),
                track("Run", 0.8),
                track("Fly", 1.0),
                track("Hover", 2.0),
                track("Sit", 2.0),
                track("SitOnGround", 2.0),
                track("Wave", 2.0),
            ],
        }
    }
}

impl DefaultRig {
    pub fn skeleton(&self) -> SkeletonTracks {
        self.tracks
            .iter()
            .fold(SkeletonTracks::new(&self.mesh_name), |skel, t| skel.with_track(&t.name, t.length))
    }
}

impl RenderEngine for DefaultRig {
    fn can_create_placeable(&self) -> bool {
        true
    }

    fn create_avatar_skeleton(&mut self, local_id: LocalEntityId) -> Option<SkeletonTracks> {
        debug!("Instantiating {} for avatar {}", self.mesh_name, local_id);
        Some(self.skeleton())
    }
}
