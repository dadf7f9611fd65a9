//! Per-avatar animation blending
//!
//! Every active animation runs through a small phase machine:
//!
//! ```text
//! FadeIn --(weight reaches 1)--> Play --(last repeat ends)--> FadeOut --(weight reaches 0)--> Stopped
//! ```
//!
//! `advance` is called once per frame. It moves weights along, pushes
//! `weight * weight_factor` and `speed_factor * dt` into the skeleton tracks
//! and evicts records that reached `Stopped`.

use crate::world::skeleton::SkeletonTracks;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Weight closer than this to the target counts as reached
const WEIGHT_EPSILON: f32 = 1e-4;

/// Fade periods come off the wire; negative or non-finite means instant
fn fade_seconds(period: f32) -> f32 {
    if period.is_finite() {
        period.max(0.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    FadeIn,
    Play,
    FadeOut,
    Stopped,
}

/// Blend bookkeeping for one named animation on one avatar
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub phase: AnimationPhase,
    pub weight: f32,
    pub weight_factor: f32,
    pub speed_factor: f32,
    pub fade_period: f32,
    /// 0 loops forever, 1 plays once, N plays N times
    pub num_repeats: u32,
    pub auto_stop: bool,
}

impl AnimationState {
    fn new(looped: bool, fade_in: f32) -> Self {
        Self {
            phase: AnimationPhase::FadeIn,
            weight: 0.0,
            weight_factor: 1.0,
            speed_factor: 1.0,
            fade_period: fade_seconds(fade_in),
            num_repeats: if looped { 0 } else { 1 },
            auto_stop: !looped,
        }
    }

    fn step_weight(&mut self, dt: f32) {
        match self.phase {
            AnimationPhase::FadeIn => {
                if self.fade_period == 0.0 {
                    self.weight = 1.0;
                    self.phase = AnimationPhase::Play;
                } else {
                    self.weight = (self.weight + dt / self.fade_period).clamp(0.0, 1.0);
                    if self.weight >= 1.0 - WEIGHT_EPSILON {
                        self.weight = 1.0;
                        self.phase = AnimationPhase::Play;
                    }
                }
            }
            AnimationPhase::FadeOut => {
                if self.fade_period == 0.0 {
                    self.weight = 0.0;
                    self.phase = AnimationPhase::Stopped;
                } else {
                    self.weight = (self.weight - dt / self.fade_period).clamp(0.0, 1.0);
                    if self.weight <= WEIGHT_EPSILON {
                        self.weight = 0.0;
                        self.phase = AnimationPhase::Stopped;
                    }
                }
            }
            AnimationPhase::Play | AnimationPhase::Stopped => {}
        }
    }

    fn fade_out(&mut self, fade_out: f32) {
        self.phase = AnimationPhase::FadeOut;
        self.fade_period = fade_seconds(fade_out);
    }
}

/// Active animation table of one avatar plus the skeleton it drives
#[derive(Debug, Clone, Default)]
pub struct AnimationBlender {
    skeleton: Option<SkeletonTracks>,
    animations: BTreeMap<String, AnimationState>,
}

impl AnimationBlender {
    pub fn new(skeleton: Option<SkeletonTracks>) -> Self {
        Self { skeleton, animations: BTreeMap::new() }
    }

    pub fn skeleton(&self) -> Option<&SkeletonTracks> {
        self.skeleton.as_ref()
    }

    /// Swap in a new skeleton. A different mesh invalidates every running animation.
    pub fn set_skeleton(&mut self, skeleton: Option<SkeletonTracks>) {
        let old_mesh = self.skeleton.as_ref().map(|s| s.mesh_name().to_string());
        let new_mesh = skeleton.as_ref().map(|s| s.mesh_name().to_string());
        if old_mesh != new_mesh {
            debug!("Avatar mesh changed ({:?} -> {:?}), resetting animations", old_mesh, new_mesh);
            self.animations.clear();
        }
        self.skeleton = skeleton;
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.animations.get(name)
    }

    pub fn active_count(&self) -> usize {
        self.animations.len()
    }

    /// Track names of the underlying skeleton
    pub fn available_animations(&self) -> Vec<String> {
        self.skeleton
            .as_ref()
            .map(|s| s.track_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Names of animations currently in the active table
    pub fn running_animations(&self) -> Vec<String> {
        self.animations
            .iter()
            .filter(|(_, state)| state.phase != AnimationPhase::Stopped)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn enable_animation(&mut self, name: &str, looped: bool, fade_in: f32) -> bool {
        let Some(track) = self.skeleton.as_mut().and_then(|s| s.track_mut(name)) else {
            trace!("No animation track {}", name);
            return false;
        };
        track.looped = looped;

        if let Some(state) = self.animations.get_mut(name) {
            state.phase = AnimationPhase::FadeIn;
            state.num_repeats = if looped { 0 } else { 1 };
            state.auto_stop = !looped;
            state.fade_period = fade_seconds(fade_in);
            return true;
        }

        track.set_time_position(0.0);
        self.animations.insert(name.to_string(), AnimationState::new(looped, fade_in));
        true
    }

    /// Fade out everything except `name`, then enable `name`
    pub fn enable_exclusive_animation(&mut self, name: &str, looped: bool, fade_in: f32, fade_out: f32) -> bool {
        for (other, state) in self.animations.iter_mut() {
            if other != name {
                state.fade_out(fade_out);
            }
        }
        self.enable_animation(name, looped, fade_in)
    }

    pub fn disable_animation(&mut self, name: &str, fade_out: f32) -> bool {
        match self.animations.get_mut(name) {
            Some(state) => {
                state.fade_out(fade_out);
                true
            }
            None => false,
        }
    }

    pub fn disable_all_animations(&mut self, fade_out: f32) {
        for state in self.animations.values_mut() {
            state.fade_out(fade_out);
        }
    }

    pub fn set_animation_speed(&mut self, name: &str, speed_factor: f32) -> bool {
        self.with_state(name, |state| state.speed_factor = speed_factor)
    }

    pub fn set_animation_weight(&mut self, name: &str, weight_factor: f32) -> bool {
        self.with_state(name, |state| state.weight_factor = weight_factor)
    }

    pub fn set_animation_auto_stop(&mut self, name: &str, auto_stop: bool) -> bool {
        self.with_state(name, |state| state.auto_stop = auto_stop)
    }

    pub fn set_animation_num_loops(&mut self, name: &str, repeats: u32) -> bool {
        self.with_state(name, |state| state.num_repeats = repeats)
    }

    pub fn set_animation_time_position(&mut self, name: &str, time: f32) -> bool {
        if !self.animations.contains_key(name) {
            return false;
        }
        match self.skeleton.as_mut().and_then(|s| s.track_mut(name)) {
            Some(track) => {
                track.set_time_position(time);
                true
            }
            None => false,
        }
    }

    /// Jump to the last frame of an active animation
    pub fn set_animation_to_end(&mut self, name: &str) -> bool {
        match self.skeleton.as_ref().and_then(|s| s.track(name)).map(|t| t.length) {
            Some(length) => self.set_animation_time_position(name, length),
            None => false,
        }
    }

    /// A non-looping animation that reached its end, or one that is not active at all
    pub fn has_animation_finished(&self, name: &str) -> bool {
        let Some(state) = self.animations.get(name) else {
            return true;
        };
        match self.skeleton.as_ref().and_then(|s| s.track(name)) {
            Some(track) => !track.looped && track.at_end(state.speed_factor),
            None => true,
        }
    }

    pub fn is_animation_active(&self, name: &str, include_fade_out: bool) -> bool {
        match self.animations.get(name) {
            Some(state) => include_fade_out || state.phase != AnimationPhase::FadeOut,
            None => false,
        }
    }

    /// Step every active animation by `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        let Some(skeleton) = self.skeleton.as_mut() else {
            return;
        };

        let mut stopped = Vec::new();
        for (name, state) in self.animations.iter_mut() {
            let Some(track) = skeleton.track_mut(name) else {
                continue;
            };

            state.step_weight(dt);

            if state.phase == AnimationPhase::Stopped {
                track.enabled = false;
                stopped.push(name.clone());
                continue;
            }

            track.weight = state.weight * state.weight_factor;
            let advance = state.speed_factor * dt;
            if advance != 0.0 {
                track.add_time(advance);
            }
            track.enabled = true;

            if state.phase == AnimationPhase::Play
                && (state.auto_stop || state.num_repeats != 1)
                && track.at_end(state.speed_factor)
            {
                if state.num_repeats == 1 {
                    state.phase = AnimationPhase::FadeOut;
                } else {
                    if state.num_repeats > 1 {
                        state.num_repeats -= 1;
                    }
                    let rewind = if state.speed_factor >= 0.0 {
                        track.time_position - track.length
                    } else {
                        track.length
                    };
                    track.set_time_position(rewind);
                }
            }
        }

        for name in stopped {
            trace!("Animation {} stopped", name);
            self.animations.remove(&name);
        }
    }

    fn with_state(&mut self, name: &str, f: impl FnOnce(&mut AnimationState)) -> bool {
        match self.animations.get_mut(name) {
            Some(state) => {
                f(state);
                true
            }
            None => false,
        }
    }
}
