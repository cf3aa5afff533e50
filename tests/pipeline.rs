// tests/pipeline.rs - Frames in, shoot events out, through the public session API
use std::time::Instant;

use pinch_hunt::app::{AppEvent, GameSession};
use pinch_hunt::config::{ClientConfig, Preferences, SlotAssignment};
use pinch_hunt::effects::TerminalBell;
use pinch_hunt::render::FrameRenderer;
use pinch_hunt::shoot::ShootEvent;
use pinch_hunt::tracking::{landmarks, HandObservation, Landmark, LandmarkFrame};
use pinch_hunt::world::{Duck, Heading, WorldState};

fn session_with(config: &ClientConfig) -> GameSession<Vec<ShootEvent>> {
    GameSession::new(
        FrameRenderer::new(config, None),
        Vec::new(),
        Box::new(TerminalBell),
        Preferences {
            sound_enabled: false,
        },
    )
}

fn session() -> GameSession<Vec<ShootEvent>> {
    session_with(&ClientConfig::default())
}

fn hand(x: f32, y: f32, pinched: bool) -> HandObservation {
    let mut points = vec![Landmark::new(x, y + 0.2); landmarks::COUNT];
    points[landmarks::INDEX_FINGER_TIP] = Landmark::new(x, y);
    // 0.1 of a 1280px canvas is 128px apart: clearly open.
    let thumb_x = if pinched { x } else { x + 0.1 };
    points[landmarks::THUMB_TIP] = Landmark::new(thumb_x, y);
    HandObservation::new(points)
}

fn frame(hands: Vec<HandObservation>) -> AppEvent {
    AppEvent::FrameReady(LandmarkFrame { image: None, hands })
}

fn feed(session: &mut GameSession<Vec<ShootEvent>>, frames: Vec<AppEvent>) -> Vec<usize> {
    frames
        .into_iter()
        .map(|event| session.dispatch(event, Instant::now()).len())
        .collect()
}

#[test]
fn shot_position_is_mirrored_for_the_server() {
    let mut session = session();
    feed(&mut session, vec![frame(vec![hand(0.2, 0.5, true)])]);
    assert_eq!(session.sink(), &vec![ShootEvent { x: 1024.0, y: 360.0 }]);
}

#[test]
fn held_pinch_fires_once_and_release_rearms() {
    let mut session = session();
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.5, 0.5, false)]),
            frame(vec![hand(0.5, 0.5, true)]),
            frame(vec![hand(0.5, 0.5, true)]),
            frame(vec![hand(0.5, 0.5, false)]),
            frame(vec![hand(0.5, 0.5, true)]),
        ],
    );
    assert_eq!(fired, vec![0, 1, 0, 0, 1]);
    assert_eq!(session.shots_fired(), 2);
}

#[test]
fn pinched_hand_moving_slowly_fires_once() {
    let mut session = session();
    // 0.05 of the width is 64px per frame, inside the match radius.
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.20, 0.5, true)]),
            frame(vec![hand(0.25, 0.5, true)]),
            frame(vec![hand(0.30, 0.5, true)]),
            frame(vec![hand(0.35, 0.5, true)]),
        ],
    );
    assert_eq!(fired, vec![1, 0, 0, 0]);
}

#[test]
fn pinched_hand_moving_fast_fires_once() {
    let mut session = session();
    // 0.15 of the width is 192px per frame, beyond the match radius.
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.20, 0.5, true)]),
            frame(vec![hand(0.35, 0.5, true)]),
            frame(vec![hand(0.50, 0.5, true)]),
            frame(vec![hand(0.65, 0.5, true)]),
        ],
    );
    assert_eq!(fired, vec![1, 0, 0, 0]);
    assert_eq!(session.sink().len(), 1);
}

#[test]
fn fast_moving_pinch_fires_again_only_after_release() {
    let mut session = session();
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.1, 0.5, true)]),
            frame(vec![hand(0.4, 0.3, true)]),
            frame(vec![hand(0.7, 0.6, false)]),
            frame(vec![hand(0.9, 0.2, true)]),
        ],
    );
    assert_eq!(fired, vec![1, 0, 0, 1]);
}

#[test]
fn two_pinched_hands_crossing_quickly_do_not_refire() {
    let mut session = session();
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.2, 0.5, true), hand(0.8, 0.5, true)]),
            frame(vec![hand(0.35, 0.5, true), hand(0.65, 0.5, true)]),
        ],
    );
    assert_eq!(fired, vec![2, 0]);
}

#[test]
fn hand_that_leaves_and_returns_pinched_fires_again() {
    let mut session = session();
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.5, 0.5, true)]),
            frame(Vec::new()),
            frame(vec![hand(0.5, 0.5, true)]),
        ],
    );
    assert_eq!(fired, vec![1, 0, 1]);
}

#[test]
fn hands_fire_independently() {
    let mut session = session();
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.2, 0.5, true), hand(0.8, 0.5, true)]),
            frame(vec![hand(0.2, 0.5, false), hand(0.8, 0.5, true)]),
            frame(vec![hand(0.2, 0.5, true), hand(0.8, 0.5, true)]),
        ],
    );
    assert_eq!(fired, vec![2, 0, 1]);
    assert_eq!(session.sink()[2], ShootEvent { x: 1024.0, y: 360.0 });
}

#[test]
fn reordered_hands_keep_their_state_with_nearest_slots() {
    let mut session = session();
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.2, 0.5, false), hand(0.8, 0.5, true)]),
            frame(vec![hand(0.8, 0.5, true), hand(0.2, 0.5, false)]),
        ],
    );
    assert_eq!(fired, vec![1, 0]);
}

#[test]
fn reordered_hands_swap_state_with_positional_slots() {
    let mut config = ClientConfig::default();
    config.slot_assignment = SlotAssignment::Positional;
    let mut session = session_with(&config);
    let fired = feed(
        &mut session,
        vec![
            frame(vec![hand(0.2, 0.5, false), hand(0.8, 0.5, true)]),
            frame(vec![hand(0.8, 0.5, true), hand(0.2, 0.5, false)]),
        ],
    );
    assert_eq!(fired, vec![1, 1]);
}

#[test]
fn repeated_snapshot_redraws_the_same_scene_without_events() {
    let mut session = session();
    let state = WorldState {
        ducks: vec![
            Duck::new(100.0, 300.0, 80.0, Heading::Forward),
            Duck::new(900.0, 200.0, 60.0, Heading::Reversed),
        ],
        score: 4,
    };

    session.dispatch(AppEvent::StateUpdate(state.clone()), Instant::now());
    feed(&mut session, vec![frame(Vec::new())]);
    let first = session.scene().commands().to_vec();

    session.dispatch(AppEvent::StateUpdate(state), Instant::now());
    feed(&mut session, vec![frame(Vec::new())]);

    assert_eq!(session.scene().commands(), first.as_slice());
    assert_eq!(first.len(), 2);
    assert!(session.sink().is_empty());
    assert_eq!(session.score(), 4);
    assert_eq!(session.world().updates_received(), 2);
}

#[test]
fn state_updates_alone_never_shoot() {
    let mut session = session();
    for score in 0..5 {
        let fired = session.dispatch(
            AppEvent::StateUpdate(WorldState {
                ducks: Vec::new(),
                score,
            }),
            Instant::now(),
        );
        assert!(fired.is_empty());
    }
    assert!(session.sink().is_empty());
    assert_eq!(session.frames_rendered(), 0);
}
