use anyhow::{bail, Context, Result};
use base64::prelude::*;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

use slv_avatar_sync::config::AvatarSyncSettings;
use slv_avatar_sync::networking::packets::{
    AnimationControl, AnimationSequence, AppearanceChanged, FullObjectUpdate, InboundEvent, ObjectUpdateEntry,
    PCODE_AVATAR,
};
use slv_avatar_sync::utils::logging::init_logging;
use slv_avatar_sync::world::appearance::{load_animation_definitions, AppearanceRequest};
use slv_avatar_sync::world::{EntityResolver, EventSink, Scene, SessionInfo, UpdateDispatcher};

const DEFAULT_FRAME_STEP: f32 = 1.0 / 30.0;

/// Most frames a single advance record may run
const MAX_ADVANCE_FRAMES: u64 = 1 << 20;

/// One line of a capture file
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayRecord {
    Session {
        agent_id: Uuid,
        #[serde(default)]
        avatar_storage_url: String,
    },
    ObjectUpdate {
        #[serde(default)]
        region_handle: u64,
        entries: Vec<ReplayEntry>,
    },
    /// Base64 terse buffer
    Terse { data: String },
    RexAppearance { params: Vec<String> },
    RexAnim { params: Vec<String> },
    AvatarAnimation { actor_id: Uuid, animation_ids: Vec<Uuid> },
    Kill { local_id: u32 },
    /// Run frames covering `seconds`
    Advance { seconds: f32 },
    Logout,
}

#[derive(Debug, Deserialize)]
struct ReplayEntry {
    local_id: u32,
    actor_id: Uuid,
    /// Base64 ObjectData block
    #[serde(default)]
    object_data: String,
    #[serde(default)]
    parent_id: u32,
    #[serde(default)]
    name_value: String,
}

struct Args {
    capture: PathBuf,
    config: Option<PathBuf>,
    frame_step: f32,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut capture = None;
    let mut config = None;
    let mut frame_step = DEFAULT_FRAME_STEP;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().context("--config needs a path")?)),
            "--frame-step" => {
                let value = args.next().context("--frame-step needs seconds")?;
                frame_step = value.parse().with_context(|| format!("Bad frame step: {}", value))?;
                if !(frame_step > 0.0) {
                    bail!("Frame step must be positive");
                }
            }
            "-h" | "--help" => {
                println!("Usage: avatar-replay <capture.jsonl> [--config settings.toml] [--frame-step seconds]");
                std::process::exit(0);
            }
            other if capture.is_none() => capture = Some(PathBuf::from(other)),
            other => bail!("Unexpected argument: {}", other),
        }
    }

    Ok(Args {
        capture: capture.context("Missing capture file. Try --help")?,
        config,
        frame_step,
    })
}

/// Frame deltas covering `seconds`; the last one takes the remainder
fn frame_steps(seconds: f32, frame_step: f32) -> impl Iterator<Item = f32> {
    let (total, step) = (f64::from(seconds), f64::from(frame_step));
    let frames = if total.is_finite() && total > 0.0 {
        (total / step).ceil() as u64
    } else {
        0
    };
    if frames > MAX_ADVANCE_FRAMES {
        warn!("Advance of {}s capped at {} frames", seconds, MAX_ADVANCE_FRAMES);
    }

    (0..frames.min(MAX_ADVANCE_FRAMES)).map(move |i| (total - i as f64 * step).min(step) as f32)
}

fn decode_base64(data: &str) -> Result<Bytes> {
    let bytes = BASE64_STANDARD.decode(data.trim()).context("Invalid base64 payload")?;
    Ok(Bytes::from(bytes))
}

fn to_event(record: ReplayRecord) -> Result<Option<InboundEvent>> {
    let event = match record {
        ReplayRecord::Session { .. } | ReplayRecord::Advance { .. } => return Ok(None),
        ReplayRecord::ObjectUpdate { region_handle, entries } => {
            let entries = entries
                .into_iter()
                .map(|e| {
                    Ok(ObjectUpdateEntry {
                        local_id: e.local_id,
                        actor_id: e.actor_id,
                        pcode: PCODE_AVATAR,
                        object_data: decode_base64(&e.object_data)?,
                        parent_id: e.parent_id,
                        name_value: e.name_value,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            InboundEvent::FullObjectUpdate(FullObjectUpdate { region_handle, entries })
        }
        ReplayRecord::Terse { data } => InboundEvent::CompactUpdate(decode_base64(&data)?),
        ReplayRecord::RexAppearance { params } => match AppearanceChanged::from_params(&params) {
            Some(changed) => InboundEvent::AppearanceChanged(changed),
            None => return Ok(None),
        },
        ReplayRecord::RexAnim { params } => match AnimationControl::from_params(&params) {
            Some(control) => InboundEvent::AnimationControl(control),
            None => return Ok(None),
        },
        ReplayRecord::AvatarAnimation { actor_id, animation_ids } => {
            InboundEvent::AnimationSequenceStarted(AnimationSequence { actor_id, animation_ids })
        }
        ReplayRecord::Kill { local_id } => InboundEvent::KillObject { local_id },
        ReplayRecord::Logout => InboundEvent::Logout,
    };
    Ok(Some(event))
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let settings = AvatarSyncSettings::load(args.config.as_deref()).context("Failed to load settings")?;
    init_logging(&settings.log_level, settings.log_file.as_deref());

    let mut resolver = EntityResolver::new(
        Some(Box::new(settings.default_rig.clone())),
        settings.capabilities.to_capabilities(),
    );
    if let Some(path) = &settings.default_animations_file {
        let definitions = load_animation_definitions(path)
            .with_context(|| format!("Failed to read animations from {}", path.display()))?;
        resolver = resolver.with_default_animations(definitions);
    }

    let (events, event_rx) = EventSink::channel();
    let (appearance_tx, appearance_rx) = crossbeam_channel::unbounded::<AppearanceRequest>();
    let session = SessionInfo {
        agent_id: Uuid::nil(),
        avatar_storage_url: settings.default_avatar_storage_url.clone(),
    };
    let mut dispatcher = UpdateDispatcher::new(session, resolver, Box::new(appearance_tx), events)
        .with_world_bound(settings.world_bound);
    dispatcher.attach_scene(Scene::new("replay"));

    let file = File::open(&args.capture)
        .with_context(|| format!("Failed to open capture {}", args.capture.display()))?;
    let mut processed = 0usize;
    let mut skipped = 0usize;

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("Failed to read capture")?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ReplayRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Line {}: {}", index + 1, e);
                skipped += 1;
                continue;
            }
        };

        match record {
            ReplayRecord::Session { agent_id, ref avatar_storage_url } => {
                info!("Replaying as agent {}", agent_id);
                let url = if avatar_storage_url.is_empty() {
                    settings.default_avatar_storage_url.clone()
                } else {
                    avatar_storage_url.clone()
                };
                dispatcher.set_session(SessionInfo { agent_id, avatar_storage_url: url });
            }
            ReplayRecord::Advance { seconds } => {
                for dt in frame_steps(seconds, args.frame_step) {
                    dispatcher.update(dt);
                }
            }
            other => match to_event(other) {
                Ok(Some(event)) => {
                    if dispatcher.dispatch(&event) {
                        processed += 1;
                    } else {
                        debug!("Line {}: event not processed", index + 1);
                        skipped += 1;
                    }
                }
                Ok(None) => skipped += 1,
                Err(e) => {
                    warn!("Line {}: {:#}", index + 1, e);
                    skipped += 1;
                }
            },
        }
    }

    for event in event_rx.try_iter() {
        debug!("World event: {:?}", event);
    }
    let downloads: Vec<_> = appearance_rx.try_iter().map(|r| r.address).collect();

    let avatars: Vec<_> = dispatcher
        .scene()
        .map(|scene| {
            scene
                .ids()
                .into_iter()
                .filter_map(|id| scene.get(id))
                .map(|avatar| {
                    let pos = avatar.network_position.position;
                    json!({
                        "local_id": avatar.local_id(),
                        "agent_id": avatar.agent_id().to_string(),
                        "name": avatar.presence.full_name(),
                        "posture": format!("{:?}", avatar.posture),
                        "position": [pos.x, pos.y, pos.z],
                        "appearance": avatar.appearance.address,
                        "animations": avatar.animation.running_animations(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let summary = json!({
        "processed": processed,
        "skipped": skipped,
        "user_avatar": dispatcher.user_avatar(),
        "appearance_downloads": downloads,
        "avatars": avatars,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
