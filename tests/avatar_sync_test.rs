use crossbeam_channel::Receiver;
use glam::{Quat, Vec3};
use slv_avatar_sync::networking::packets::{events_from_message, AnimationControl, FullObjectUpdate, ObjectUpdateEntry};
use slv_avatar_sync::networking::MessageBuilder;
use slv_avatar_sync::world::appearance::{AnimationDefinitionMap, AppearanceRequest};
use slv_avatar_sync::world::{
    AnimationBlender, AnimationDefinition, AnimationPhase, AvatarCapabilities, DefaultRig, EntityResolver, EventSink,
    Posture, Scene, SessionInfo, SkeletonTracks, UpdateDispatcher, WorldEvent,
};
use uuid::{uuid, Uuid};

const WALK: Uuid = uuid!("6ed24bd8-91aa-4b12-ccc7-c97c857ab4e0");
const STAND: Uuid = uuid!("2408fe9e-df1d-1d7d-f4ff-1384fa7b350f");
const FLY: Uuid = uuid!("aec4610c-757f-bc4e-c092-c6e9caf18daf");
const WAVE: Uuid = uuid!("c541c47f-e0c0-058b-ad1a-d6ae3a4584d9");

struct Harness {
    dispatcher: UpdateDispatcher,
    events: Receiver<WorldEvent>,
    downloads: Receiver<AppearanceRequest>,
}

impl Harness {
    fn new(own_agent: Uuid) -> Self {
        let resolver = EntityResolver::new(Some(Box::new(DefaultRig::default())), AvatarCapabilities::NAME_OVERLAY)
            .with_default_animations(definitions());
        Self::with_resolver(own_agent, resolver)
    }

    fn with_resolver(own_agent: Uuid, resolver: EntityResolver) -> Self {
        let (events, event_rx) = EventSink::channel();
        let (download_tx, download_rx) = crossbeam_channel::unbounded();
        let session = SessionInfo {
            agent_id: own_agent,
            avatar_storage_url: "http://storage/own".to_string(),
        };
        let mut dispatcher = UpdateDispatcher::new(session, resolver, Box::new(download_tx), events);
        dispatcher.attach_scene(Scene::new("test"));
        Self { dispatcher, events: event_rx, downloads: download_rx }
    }

    fn drain_events(&self) -> Vec<WorldEvent> {
        self.events.try_iter().collect()
    }

    fn drain_downloads(&self) -> Vec<AppearanceRequest> {
        self.downloads.try_iter().collect()
    }

    fn add_avatar(&mut self, local_id: u32, actor_id: Uuid, name_value: &str) -> bool {
        let update = FullObjectUpdate {
            region_handle: 1099511628032000,
            entries: vec![entry(local_id, actor_id, name_value, Vec3::new(128.0, 128.0, 25.0))],
        };
        self.dispatcher.handle_full_object_update(&update)
    }
}

fn definition(id: Uuid, name: &str, looped: bool, use_velocity: bool) -> AnimationDefinition {
    AnimationDefinition {
        id,
        animation_name: name.to_string(),
        name: name.to_string(),
        looped,
        use_velocity,
        fade_out: 0.25,
        ..AnimationDefinition::default()
    }
}

fn definitions() -> AnimationDefinitionMap {
    [
        definition(WALK, "Walk", true, true),
        definition(STAND, "Stand", true, false),
        definition(FLY, "Fly", true, false),
        definition(WAVE, "Wave", false, false),
    ]
    .into_iter()
    .map(|d| (d.id, d))
    .collect()
}

fn object_data(position: Vec3) -> Vec<u8> {
    let mut data = vec![0u8; 16];
    for c in position.to_array() {
        data.extend_from_slice(&c.to_le_bytes());
    }
    data.resize(60, 0);
    data
}

fn entry(local_id: u32, actor_id: Uuid, name_value: &str, position: Vec3) -> ObjectUpdateEntry {
    ObjectUpdateEntry {
        local_id,
        actor_id,
        pcode: 47,
        object_data: object_data(position).into(),
        parent_id: 0,
        name_value: name_value.to_string(),
    }
}

fn put_u16s(buf: &mut Vec<u8>, values: &[u16]) {
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

fn terse_30(local_id: u32, position: [f32; 3], velocity: [u16; 3], rotation: [u16; 4]) -> Vec<u8> {
    let mut buf = local_id.to_le_bytes().to_vec();
    for c in position {
        buf.extend_from_slice(&c.to_le_bytes());
    }
    put_u16s(&mut buf, &velocity);
    put_u16s(&mut buf, &rotation);
    assert_eq!(buf.len(), 30);
    buf
}

fn terse_60(local_id: u32, position: [f32; 3], rotation: [u16; 4]) -> Vec<u8> {
    let mut buf = local_id.to_le_bytes().to_vec();
    buf.resize(22, 0);
    for c in position {
        buf.extend_from_slice(&c.to_le_bytes());
    }
    put_u16s(&mut buf, &[40960, 32768, 32768]);
    put_u16s(&mut buf, &[32768, 32768, 32768]);
    put_u16s(&mut buf, &rotation);
    put_u16s(&mut buf, &[32768, 32768, 32768]);
    assert_eq!(buf.len(), 60);
    buf
}

const NAMES: &str = "FirstName STRING RW SV Ada\nLastName STRING RW SV Lovelace";
const HALF_TURN_Z: [u16; 4] = [32768, 32768, 65535, 32768];
const IDENTITY_ROT: [u16; 4] = [32768, 32768, 32768, 65535];

#[test]
fn test_remote_avatar_announced_on_first_update() {
    let mut h = Harness::new(Uuid::new_v4());
    let remote = Uuid::new_v4();

    assert!(h.add_avatar(10, remote, NAMES));

    let avatar = h.dispatcher.avatar(10).expect("avatar created");
    assert_eq!(avatar.agent_id(), remote);
    assert_eq!(avatar.presence.full_name(), "Ada Lovelace");
    assert_eq!(avatar.presence.region_handle, 1099511628032000);
    assert_eq!(avatar.network_position.position, Vec3::new(128.0, 128.0, 25.0));
    assert_eq!(h.dispatcher.registry().lookup_local_id(&remote), Some(10));

    let events = h.drain_events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], WorldEvent::NameOverlay { local_id: 10, visible: true });
    match &events[1] {
        WorldEvent::UserConnected(user) => {
            assert_eq!(user.agent_id, remote);
            assert_eq!(user.full_name, "Ada Lovelace");
            assert_eq!(user.local_id, 10);
        }
        other => panic!("expected UserConnected, got {:?}", other),
    }
    assert_eq!(events[2], WorldEvent::ResolveParent { local_id: 10 });

    // Second update: no new announcement
    assert!(h.add_avatar(10, remote, NAMES));
    assert!(!h
        .drain_events()
        .iter()
        .any(|e| matches!(e, WorldEvent::UserConnected(_))));
}

#[test]
fn test_own_avatar_promoted_once() {
    let own = Uuid::new_v4();
    let mut h = Harness::new(own);

    assert!(h.add_avatar(1, own, NAMES));
    assert!(h.add_avatar(1, own, NAMES));

    let events = h.drain_events();
    let assigned = events
        .iter()
        .filter(|e| matches!(e, WorldEvent::ControllableEntityAssigned { local_id: 1, agent_id } if *agent_id == own))
        .count();
    assert_eq!(assigned, 1);
    assert!(events.contains(&WorldEvent::NameOverlay { local_id: 1, visible: false }));
    assert!(!events.iter().any(|e| matches!(e, WorldEvent::UserConnected(_))));

    let downloads = h.drain_downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].address, "http://storage/own");
    assert!(!downloads[0].override_appearance);

    assert_eq!(h.dispatcher.user_avatar(), Some(1));
    assert!(h.dispatcher.reload_user_avatar());
    assert_eq!(h.drain_downloads().len(), 1);
}

#[test]
fn test_compact_update_moves_remote_avatar() {
    let mut h = Harness::new(Uuid::new_v4());
    h.add_avatar(10, Uuid::new_v4(), NAMES);
    h.dispatcher.scene_mut().unwrap().get_mut(10).unwrap().network_position.updated = false;

    let buf = terse_30(10, [128.5, 64.25, 22.0], [40960, 32768, 32768], HALF_TURN_Z);
    assert!(h.dispatcher.handle_compact_update(&buf));

    let netpos = h.dispatcher.avatar(10).unwrap().network_position;
    assert_eq!(netpos.position.x.to_bits(), 128.5f32.to_bits());
    assert_eq!(netpos.position.y.to_bits(), 64.25f32.to_bits());
    assert_eq!(netpos.position.z.to_bits(), 22.0f32.to_bits());
    assert_eq!(netpos.velocity, Vec3::new(32.0, 0.0, 0.0));
    assert_eq!(netpos.acceleration, Vec3::ZERO);
    assert!((netpos.orientation.z.abs() - 1.0).abs() < 1e-3);
    assert!(netpos.updated);

    // Untracked objects are ignored
    assert!(!h.dispatcher.handle_compact_update(&terse_30(99, [1.0, 1.0, 1.0], [32768; 3], IDENTITY_ROT)));
}

#[test]
fn test_own_avatar_orientation_never_overwritten() {
    let own = Uuid::new_v4();
    let mut h = Harness::new(own);
    h.add_avatar(1, own, NAMES);

    for step in 0..5 {
        let x = 100.0 + step as f32;
        assert!(h.dispatcher.handle_compact_update(&terse_30(1, [x, 50.0, 20.0], [40960, 32768, 32768], HALF_TURN_Z)));
        assert!(h.dispatcher.handle_compact_update(&terse_60(1, [x, 60.0, 20.0], HALF_TURN_Z)));

        let netpos = h.dispatcher.avatar(1).unwrap().network_position;
        assert_eq!(netpos.orientation, Quat::IDENTITY);
        assert_eq!(netpos.position, Vec3::new(x, 60.0, 20.0));
        assert_eq!(netpos.velocity, Vec3::new(32.0, 0.0, 0.0));
    }
}

#[test]
fn test_invalid_positions_leave_record_untouched() {
    let mut h = Harness::new(Uuid::new_v4());
    h.add_avatar(10, Uuid::new_v4(), NAMES);
    let before = h.dispatcher.avatar(10).unwrap().network_position;

    for bad in [
        [f32::NAN, 1.0, 1.0],
        [1.0, f32::INFINITY, 1.0],
        [1.0, 1.0, f32::NEG_INFINITY],
        [1.0e7, 1.0, 1.0],
    ] {
        assert!(!h.dispatcher.handle_compact_update(&terse_30(10, bad, [40960, 32768, 32768], HALF_TURN_Z)));
        assert!(!h.dispatcher.handle_compact_update(&terse_60(10, bad, HALF_TURN_Z)));
        assert_eq!(h.dispatcher.avatar(10).unwrap().network_position, before);
    }

    // Truncated buffers are not updates at all
    assert!(!h.dispatcher.handle_compact_update(&[0u8; 29]));
}

#[test]
fn test_short_object_data_keeps_position() {
    let mut h = Harness::new(Uuid::new_v4());
    let remote = Uuid::new_v4();
    h.add_avatar(10, remote, NAMES);

    let mut short = entry(10, remote, NAMES, Vec3::ZERO);
    short.object_data = vec![0u8; 20].into();
    assert!(h.dispatcher.handle_full_object_update(&FullObjectUpdate { region_handle: 2, entries: vec![short] }));

    let avatar = h.dispatcher.avatar(10).unwrap();
    assert_eq!(avatar.network_position.position, Vec3::new(128.0, 128.0, 25.0));
    assert_eq!(avatar.presence.region_handle, 2);
}

#[test]
fn test_pending_appearance_applied_once() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();

    assert!(h.dispatcher.handle_appearance_changed(actor, "http://x/av", false));
    assert!(h.dispatcher.registry().has_pending_appearance(&actor));
    assert!(h.drain_downloads().is_empty());

    h.add_avatar(42, actor, NAMES);
    let avatar = h.dispatcher.avatar(42).unwrap();
    assert_eq!(avatar.appearance.address, "http://x/av");
    assert!(!avatar.appearance.override_appearance);
    assert!(!h.dispatcher.registry().has_pending_appearance(&actor));

    let downloads = h.drain_downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].local_id, 42);

    // Same agent under a new local id: nothing left to apply
    h.add_avatar(43, actor, NAMES);
    assert_eq!(h.dispatcher.avatar(43).unwrap().appearance.address, "");
    assert!(h.drain_downloads().is_empty());
}

#[test]
fn test_appearance_change_for_known_avatar_downloads() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    h.add_avatar(8, actor, NAMES);

    assert!(h.dispatcher.handle_appearance_changed(actor, "http://x/new", true));
    let avatar = h.dispatcher.avatar(8).unwrap();
    assert_eq!(avatar.appearance.address, "http://x/new");
    assert!(avatar.appearance.override_appearance);
    assert_eq!(h.drain_downloads().len(), 1);
    assert_eq!(h.dispatcher.registry().pending_count(), 0);
}

#[test]
fn test_kill_object_disconnects_remote_user() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    h.add_avatar(7, actor, NAMES);
    h.drain_events();

    assert!(h.dispatcher.handle_kill_object(7));

    let events = h.drain_events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        WorldEvent::UserDisconnected(user) => {
            assert_eq!(user.full_name, "Ada Lovelace");
            assert_eq!(user.local_id, 7);
            assert_eq!(user.agent_id, actor);
        }
        other => panic!("expected UserDisconnected, got {:?}", other),
    }
    assert_eq!(h.dispatcher.registry().lookup_local_id(&actor), None);
    assert!(h.dispatcher.avatar(7).is_none());

    // Unknown: no-op
    assert!(!h.dispatcher.handle_kill_object(7));
    assert!(h.drain_events().is_empty());
}

#[test]
fn test_kill_own_avatar_is_silent() {
    let own = Uuid::new_v4();
    let mut h = Harness::new(own);
    h.add_avatar(1, own, NAMES);
    h.drain_events();

    assert!(h.dispatcher.handle_kill_object(1));
    assert!(h.drain_events().is_empty());
    assert_eq!(h.dispatcher.user_avatar(), None);
}

#[test]
fn test_animation_sequence_reconciles_and_sets_posture() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    h.add_avatar(5, actor, NAMES);

    assert!(h.dispatcher.handle_animation_sequence(actor, &[STAND, FLY]));
    assert_eq!(h.dispatcher.avatar(5).unwrap().posture, Posture::Fly);
    h.dispatcher.update(0.5);

    let stand_time = |h: &Harness| {
        h.dispatcher.avatar(5).unwrap().animation.skeleton().unwrap().track("Stand").unwrap().time_position
    };
    let before = stand_time(&h);

    assert!(h.dispatcher.handle_animation_sequence(actor, &[WALK, STAND, Uuid::new_v4()]));

    let avatar = h.dispatcher.avatar(5).unwrap();
    assert_eq!(avatar.posture, Posture::Stand);
    let blender = &avatar.animation;
    assert_eq!(blender.state("Fly").map(|s| s.phase), Some(AnimationPhase::FadeOut));
    assert_eq!(blender.state("Walk").map(|s| s.phase), Some(AnimationPhase::FadeIn));
    assert!(blender.is_animation_active("Stand", false));
    assert_eq!(stand_time(&h), before);
    assert_eq!(blender.active_count(), 3);
}

#[test]
fn test_animation_control_plays_and_stops() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    h.add_avatar(5, actor, NAMES);

    let control = |name: &str, stop: bool| AnimationControl {
        actor_id: actor,
        animation_name: name.to_string(),
        rate: 2.0,
        fade_in: 0.0,
        fade_out: 0.5,
        repeats: 3,
        stop,
    };

    assert!(h.dispatcher.handle_animation_control(&control("Wave", false)));
    let state = h.dispatcher.avatar(5).unwrap().animation.state("Wave").cloned().unwrap();
    assert_eq!(state.speed_factor, 2.0);
    assert!(state.auto_stop);
    assert_eq!(state.num_repeats, 3);

    assert!(h.dispatcher.handle_animation_control(&control("Wave", true)));
    let state = h.dispatcher.avatar(5).unwrap().animation.state("Wave").cloned().unwrap();
    assert_eq!(state.phase, AnimationPhase::FadeOut);
    assert_eq!(state.fade_period, 0.5);

    assert!(!h.dispatcher.handle_animation_control(&control("Moonwalk", false)));
    let mut unknown = control("Wave", false);
    unknown.actor_id = Uuid::new_v4();
    assert!(!h.dispatcher.handle_animation_control(&unknown));
}

#[test]
fn test_frame_update_scales_velocity_animations() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    h.add_avatar(5, actor, NAMES);
    h.dispatcher.handle_animation_sequence(actor, &[WALK, STAND]);

    // 32 m/s along x
    h.dispatcher.handle_compact_update(&terse_30(5, [10.0, 10.0, 10.0], [40960, 32768, 32768], IDENTITY_ROT));
    h.dispatcher.update(0.1);

    let blender = &h.dispatcher.avatar(5).unwrap().animation;
    assert_eq!(blender.state("Walk").unwrap().speed_factor, 16.0);
    assert_eq!(blender.state("Stand").unwrap().speed_factor, 1.0);
}

#[test]
fn test_logout_drops_pending_appearances_only() {
    let mut h = Harness::new(Uuid::new_v4());
    let (known, unknown) = (Uuid::new_v4(), Uuid::new_v4());
    h.add_avatar(3, known, NAMES);
    h.dispatcher.handle_appearance_changed(unknown, "http://x/av", false);

    assert!(h.dispatcher.dispatch(&slv_avatar_sync::InboundEvent::Logout));
    assert_eq!(h.dispatcher.registry().pending_count(), 0);
    assert_eq!(h.dispatcher.registry().lookup_local_id(&known), Some(3));
}

#[test]
fn test_unavailable_renderer_leaves_update_unprocessed() {
    let resolver = EntityResolver::new(None, AvatarCapabilities::empty());
    let mut h = Harness::with_resolver(Uuid::new_v4(), resolver);

    assert!(!h.add_avatar(10, Uuid::new_v4(), NAMES));
    assert!(h.dispatcher.scene().unwrap().is_empty());
    assert!(h.dispatcher.registry().is_empty());
    assert!(h.drain_events().is_empty());

    let mut h = Harness::new(Uuid::new_v4());
    h.dispatcher.detach_scene();
    assert!(!h.add_avatar(10, Uuid::new_v4(), NAMES));
}

#[test]
fn test_detach_scene_forgets_registrations() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    h.add_avatar(4, actor, NAMES);

    let scene = h.dispatcher.detach_scene().unwrap();
    assert_eq!(scene.len(), 1);
    assert!(h.dispatcher.registry().is_empty());
    assert!(!h.dispatcher.handle_compact_update(&terse_30(4, [1.0, 1.0, 1.0], [32768; 3], IDENTITY_ROT)));
}

#[test]
fn test_object_update_message_end_to_end() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    let mut msg = MessageBuilder::new("ObjectUpdate")
        .block("RegionData")
        .add_u64("RegionHandle", 77)
        .add_u16("TimeDilation", 0)
        .variable_block("ObjectData")
        .instance()
        .add_u32("ID", 12)
        .add_u8("State", 0)
        .add_uuid("FullID", actor)
        .add_u32("CRC", 0)
        .add_u8("PCode", 47)
        .add_buffer("ObjectData", &object_data(Vec3::new(5.0, 6.0, 7.0)))
        .add_u32("ParentID", 0)
        .add_string("NameValue", "FirstName = Grace\nLastName = Hopper")
        .build();

    let events = events_from_message(&mut msg).unwrap();
    assert_eq!(events.len(), 1);
    assert!(events.iter().all(|e| h.dispatcher.dispatch(e)));

    let avatar = h.dispatcher.avatar_by_actor(&actor).unwrap();
    assert_eq!(avatar.local_id(), 12);
    assert_eq!(avatar.presence.full_name(), "Grace Hopper");
    assert_eq!(avatar.network_position.position, Vec3::new(5.0, 6.0, 7.0));
}

fn wave_blender() -> AnimationBlender {
    AnimationBlender::new(Some(
        SkeletonTracks::new("avatar.mesh").with_track("walk", 1.0).with_track("wave", 2.0),
    ))
}

#[test]
fn test_fade_in_reaches_full_weight_then_plays() {
    let mut blender = wave_blender();
    assert!(blender.enable_animation("walk", true, 0.5));

    blender.advance(0.25);
    let state = blender.state("walk").unwrap();
    assert_eq!(state.phase, AnimationPhase::FadeIn);
    assert!((state.weight - 0.5).abs() < 1e-4);

    blender.advance(0.25);
    let state = blender.state("walk").unwrap();
    assert_eq!(state.phase, AnimationPhase::Play);
    assert_eq!(state.weight, 1.0);
}

#[test]
fn test_one_shot_fades_out_at_track_end() {
    let mut blender = wave_blender();
    assert!(blender.enable_animation("wave", false, 0.0));
    assert!(blender.set_animation_speed("wave", 1.0));

    for _ in 0..3 {
        blender.advance(0.5);
        assert_eq!(blender.state("wave").unwrap().phase, AnimationPhase::Play);
    }
    blender.advance(0.5);
    assert_eq!(blender.skeleton().unwrap().track("wave").unwrap().time_position, 2.0);
    assert_eq!(blender.state("wave").unwrap().phase, AnimationPhase::FadeOut);
}

#[test]
fn test_fade_weight_conservation() {
    let mut blender = wave_blender();
    let period = 0.4;
    blender.enable_animation("walk", true, period);
    for _ in 0..8 {
        blender.advance(period / 8.0);
    }
    let state = blender.state("walk").unwrap();
    assert_eq!(state.phase, AnimationPhase::Play);
    assert!((state.weight - 1.0).abs() < 1e-4);

    blender.disable_animation("walk", period);
    for _ in 0..7 {
        blender.advance(period / 8.0);
    }
    assert!(blender.is_animation_active("walk", true));
    blender.advance(period / 8.0);
    assert!(!blender.is_animation_active("walk", true));
    assert!(blender.has_animation_finished("walk"));
}

#[test]
fn test_enable_is_idempotent() {
    let mut blender = wave_blender();
    assert!(blender.enable_animation("walk", true, 0.2));
    assert!(blender.enable_animation("walk", true, 0.6));
    assert_eq!(blender.active_count(), 1);
    assert_eq!(blender.state("walk").unwrap().fade_period, 0.6);
    assert_eq!(blender.running_animations(), vec!["walk".to_string()]);
}

#[test]
fn test_negative_rex_anim_fades_play_instantly() {
    let mut h = Harness::new(Uuid::new_v4());
    let actor = Uuid::new_v4();
    assert!(h.add_avatar(7, actor, NAMES));

    let params = |stop: &str| -> Vec<String> {
        [actor.to_string().as_str(), "Wave", "1", "-0.5", "-0.5", "1", stop]
            .iter()
            .map(|s| s.to_string())
            .collect()
    };
    let start = AnimationControl::from_params(&params("false")).unwrap();
    assert!(h.dispatcher.handle_animation_control(&start));

    h.dispatcher.update(1.0);
    let avatar = h.dispatcher.avatar(7).unwrap();
    let state = avatar.animation.state("Wave").unwrap();
    assert_eq!(state.phase, AnimationPhase::Play);
    assert_eq!(state.weight, 1.0);
    assert_eq!(avatar.animation.skeleton().unwrap().track("Wave").unwrap().weight, 1.0);

    let stop = AnimationControl::from_params(&params("true")).unwrap();
    assert!(h.dispatcher.handle_animation_control(&stop));
    h.dispatcher.update(0.1);
    assert!(h.dispatcher.avatar(7).unwrap().animation.state("Wave").is_none());
}

#[test]
fn test_creation_overlays_requested_once() {
    let caps = AvatarCapabilities::NAME_OVERLAY | AvatarCapabilities::HIGHLIGHT | AvatarCapabilities::TOUCH_CURSOR;
    let resolver = EntityResolver::new(Some(Box::new(DefaultRig::default())), caps);
    let mut h = Harness::with_resolver(Uuid::new_v4(), resolver);

    let actor = Uuid::new_v4();
    assert!(h.add_avatar(12, actor, NAMES));
    assert!(h.add_avatar(12, actor, NAMES));

    let requested: Vec<_> = h
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            WorldEvent::OverlaysRequested { local_id, overlays } => Some((local_id, overlays)),
            _ => None,
        })
        .collect();
    assert_eq!(requested, vec![(12, AvatarCapabilities::HIGHLIGHT | AvatarCapabilities::TOUCH_CURSOR)]);
}
