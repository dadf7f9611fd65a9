//! Avatar appearance data consumed by the animation side
//!
//! Appearance assets carry an `<animation>` element per known animation.
//! Downloading and applying the rest of the appearance (meshes, materials,
//! attachments) is somebody else's job; this module only hands out download
//! requests and reads the animation table.

use crate::utils::math::parsing::{parse_bool, parse_f32_or};
use crate::world::{ActorIdentity, LocalEntityId};
use crossbeam_channel::Sender;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// How one animation id maps onto a skeleton track and how it should be played
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDefinition {
    pub id: Uuid,
    /// Skeleton track name
    pub animation_name: String,
    /// Human readable name
    pub name: String,
    pub looped: bool,
    pub exclusive: bool,
    pub use_velocity: bool,
    pub always_restart: bool,
    pub fade_in: f32,
    pub fade_out: f32,
    pub speed_factor: f32,
    pub weight_factor: f32,
}

impl Default for AnimationDefinition {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            animation_name: String::new(),
            name: String::new(),
            looped: true,
            exclusive: false,
            use_velocity: false,
            always_restart: false,
            fade_in: 0.0,
            fade_out: 0.0,
            speed_factor: 1.0,
            weight_factor: 1.0,
        }
    }
}

pub type AnimationDefinitionMap = HashMap<Uuid, AnimationDefinition>;

#[derive(Debug, Error)]
pub enum AppearanceError {
    #[error("Malformed appearance XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Failed to read appearance file: {0}")]
    Io(#[from] std::io::Error),
}

/// Read every `<animation>` element of an appearance document.
///
/// Elements without an id or a track name are skipped. Attribute defaults:
/// looped, not exclusive, fades of zero, speed and weight factors of one.
pub fn parse_animation_definitions(xml: &str) -> Result<AnimationDefinitionMap, AppearanceError> {
    let doc = Document::parse(xml)?;

    let definitions: AnimationDefinitionMap = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "animation")
        .filter_map(read_animation_definition)
        .map(|def| (def.id, def))
        .collect();

    debug!("Read {} animation definitions", definitions.len());
    Ok(definitions)
}

pub fn load_animation_definitions(path: &std::path::Path) -> Result<AnimationDefinitionMap, AppearanceError> {
    let xml = std::fs::read_to_string(path)?;
    parse_animation_definitions(&xml)
}

fn read_animation_definition(elem: Node) -> Option<AnimationDefinition> {
    let attr = |name: &str| elem.attribute(name).filter(|v| !v.is_empty());

    let Some(id) = attr("id").or_else(|| attr("uuid")) else {
        warn!("Animation definition without identifier skipped");
        return None;
    };
    let id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(e) => {
            warn!("Animation definition with bad id {}: {}", id, e);
            return None;
        }
    };
    let Some(animation_name) = attr("internal_name").or_else(|| attr("ogrename")) else {
        warn!("Animation definition {} without track name skipped", id);
        return None;
    };

    let flag = |name: &str, default: bool| attr(name).map(parse_bool).unwrap_or(default);
    let number = |name: &str, default: f32| attr(name).map(|v| parse_f32_or(v, default)).unwrap_or(default);

    Some(AnimationDefinition {
        id,
        animation_name: animation_name.to_string(),
        name: elem.attribute("name").unwrap_or_default().to_string(),
        looped: flag("looped", true),
        exclusive: flag("exclusive", false),
        use_velocity: flag("usevelocity", false),
        always_restart: flag("alwaysrestart", false),
        fade_in: number("fadein", 0.0),
        fade_out: number("fadeout", 0.0),
        speed_factor: number("speedfactor", 1.0),
        weight_factor: number("weightfactor", 1.0),
    })
}

/// Definition for a skeleton track name, or defaults when none is listed
pub fn definition_by_name(definitions: &AnimationDefinitionMap, animation_name: &str) -> AnimationDefinition {
    definitions
        .values()
        .find(|def| def.animation_name == animation_name)
        .cloned()
        .unwrap_or_else(|| AnimationDefinition {
            animation_name: animation_name.to_string(),
            ..AnimationDefinition::default()
        })
}

/// Appearance record carried by every avatar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppearanceRecord {
    pub address: String,
    pub override_appearance: bool,
    pub animations: AnimationDefinitionMap,
}

impl AppearanceRecord {
    pub fn set_address(&mut self, address: impl Into<String>, override_appearance: bool) {
        self.address = address.into();
        self.override_appearance = override_appearance;
    }
}

/// Request to fetch and apply an avatar's appearance
#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceRequest {
    pub local_id: LocalEntityId,
    pub agent_id: ActorIdentity,
    pub address: String,
    pub override_appearance: bool,
}

/// Appearance download collaborator
pub trait AppearanceLoader {
    fn download_appearance(&self, request: AppearanceRequest);
}

impl AppearanceLoader for Sender<AppearanceRequest> {
    fn download_appearance(&self, request: AppearanceRequest) {
        debug!("Queueing appearance download for {} from {}", request.agent_id, request.address);
        if self.send(request).is_err() {
            debug!("Appearance download queue closed");
        }
    }
}

/// Loader that drops every request
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAppearanceLoader;

impl AppearanceLoader for NoAppearanceLoader {
    fn download_appearance(&self, _request: AppearanceRequest) {}
}
