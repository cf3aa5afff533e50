// src/app.rs
use std::time::Instant;

use eframe::egui;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::channel::{ChannelStatus, ShootSink};
use crate::config::Preferences;
use crate::effects::{CuePlayer, EffectLayer};
use crate::render::{FiredShot, FrameRenderer, Scene};
use crate::tracking::LandmarkFrame;
use crate::ui::{CanvasViewport, SceneTextures};
use crate::world::{WorldState, WorldStateCache};

/// Everything the application loop reacts to, in arrival order.
#[derive(Debug)]
pub enum AppEvent {
    FrameReady(LandmarkFrame),
    StateUpdate(WorldState),
    Channel(ChannelStatus),
    SourceEnded,
}

/// All mutable game-client state. Only ever touched from the loop thread.
pub struct GameSession<S> {
    world: WorldStateCache,
    renderer: FrameRenderer,
    scene: Scene,
    effects: EffectLayer,
    sink: S,
    cue: Box<dyn CuePlayer>,
    prefs: Preferences,
    status: ChannelStatus,
    frames_rendered: u64,
    shots_fired: u64,
    source_ended: bool,
}

impl<S: ShootSink> GameSession<S> {
    pub fn new(renderer: FrameRenderer, sink: S, cue: Box<dyn CuePlayer>, prefs: Preferences) -> Self {
        let scene = Scene::new(renderer.mapper().size());
        Self {
            world: WorldStateCache::new(),
            renderer,
            scene,
            effects: EffectLayer::new(),
            sink,
            cue,
            prefs,
            status: ChannelStatus::Connecting,
            frames_rendered: 0,
            shots_fired: 0,
            source_ended: false,
        }
    }

    /// Returns the shots fired by this event (only frames can fire).
    pub fn dispatch(&mut self, event: AppEvent, now: Instant) -> Vec<FiredShot> {
        match event {
            AppEvent::FrameReady(frame) => return self.on_frame(&frame, now),
            AppEvent::StateUpdate(state) => self.world.update(state),
            AppEvent::Channel(status) => {
                info!(%status, "event channel status");
                self.status = status;
            }
            AppEvent::SourceEnded => self.source_ended = true,
        }
        Vec::new()
    }

    fn on_frame(&mut self, frame: &LandmarkFrame, now: Instant) -> Vec<FiredShot> {
        // Headless runs never repaint, so expired effects are dropped here too.
        self.effects.prune(now);

        let world = self.world.read();
        let fired = self.renderer.render(frame, &world, &mut self.scene);
        self.frames_rendered += 1;

        for shot in &fired {
            info!(slot = %shot.slot, x = shot.event.x, y = shot.event.y, "shot fired");
            if let Err(e) = self.sink.emit(shot.event) {
                warn!(error = %e, "failed to emit shoot event");
            }
            self.effects.spawn_shot(shot.event.point(), now);
            if self.prefs.sound_enabled {
                if let Err(e) = self.cue.play_shot() {
                    warn!(error = %e, "failed to play shot cue");
                }
            }
        }
        self.shots_fired += fired.len() as u64;
        fired
    }

    pub fn prune_effects(&mut self, now: Instant) {
        self.effects.prune(now);
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.prefs.sound_enabled = enabled;
        self.prefs.save();
        debug!(enabled, "sound preference changed");
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn world(&self) -> &WorldStateCache {
        &self.world
    }

    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    pub fn effects(&self) -> &EffectLayer {
        &self.effects
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    pub fn status(&self) -> &ChannelStatus {
        &self.status
    }

    pub fn score(&self) -> i64 {
        self.world.read().score
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn shots_fired(&self) -> u64 {
        self.shots_fired
    }

    pub fn source_ended(&self) -> bool {
        self.source_ended
    }
}

/// Runs the loop without a window until the landmark source ends.
pub fn run_headless<S: ShootSink>(mut session: GameSession<S>, mut events: UnboundedReceiver<AppEvent>) {
    info!("running headless");
    while let Some(event) = events.blocking_recv() {
        session.dispatch(event, Instant::now());
        if session.source_ended() {
            break;
        }
    }
    info!(
        frames = session.frames_rendered(),
        shots = session.shots_fired(),
        score = session.score(),
        "headless session finished"
    );
}

pub struct PinchHuntApp<S> {
    session: GameSession<S>,
    events: UnboundedReceiver<AppEvent>,
    textures: SceneTextures,
}

impl<S: ShootSink> PinchHuntApp<S> {
    pub fn new(session: GameSession<S>, events: UnboundedReceiver<AppEvent>) -> Self {
        Self {
            session,
            events,
            textures: SceneTextures::default(),
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("Pinch Hunt");
                ui.separator();
                ui.label(
                    egui::RichText::new(format!("Score: {}", self.session.score()))
                        .size(20.0)
                        .strong(),
                );
                ui.separator();
                ui.label(self.session.status().to_string());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mut sound = self.session.preferences().sound_enabled;
                    if ui.checkbox(&mut sound, "Sound").changed() {
                        self.session.set_sound_enabled(sound);
                    }
                });
            });
            ui.add_space(6.0);
        });
    }

    fn render_canvas(&mut self, ctx: &egui::Context, now: Instant) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let canvas = self.session.scene().size();
            let aspect = canvas.aspect_ratio();
            let available = ui.available_size();
            let size = if available.x / available.y > aspect {
                egui::vec2(available.y * aspect, available.y)
            } else {
                egui::vec2(available.x, available.x / aspect)
            };

            ui.centered_and_justified(|ui| {
                let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
                let viewport = CanvasViewport::new(rect, canvas);
                let painter = ui.painter_at(rect);

                self.textures
                    .paint_scene(ctx, &painter, &viewport, self.session.scene(), self.session.renderer().sprite());
                crate::ui::paint_effects(&painter, &viewport, self.session.effects(), now);

                if self.session.source_ended() {
                    crate::ui::paint_banner(&painter, rect, "Landmark source ended");
                } else if self.session.frames_rendered() == 0 {
                    crate::ui::paint_banner(&painter, rect, "Waiting for hand tracking...");
                }
            });
        });
    }
}

impl<S: ShootSink> eframe::App for PinchHuntApp<S> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        while let Ok(event) = self.events.try_recv() {
            self.session.dispatch(event, now);
        }
        self.session.prune_effects(now);

        self.render_header(ctx);
        self.render_canvas(ctx, now);

        // Frames and updates arrive from other threads; keep polling.
        ctx.request_repaint();
    }
}
