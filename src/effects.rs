// src/effects.rs - Cosmetic shot feedback: bullet holes, explosions, audio cue
use std::io::Write;
use std::time::{Duration, Instant};

use nalgebra::Point2;

use crate::config::{
    BULLET_HOLE_LIFETIME, BULLET_HOLE_SIZE_PX, EXPLOSION_LIFETIME, EXPLOSION_SIZE_PX,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    BulletHole,
    Explosion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    /// Impact point in mirrored canvas space (drawn without the canvas mirror).
    pub center: Point2<f32>,
    pub size: f32,
    pub spawned_at: Instant,
    pub lifetime: Duration,
}

impl Effect {
    pub fn is_alive(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.spawned_at) < self.lifetime
    }

    /// 0.0 when spawned, 1.0 when expired.
    pub fn progress(&self, now: Instant) -> f32 {
        let age = now.saturating_duration_since(self.spawned_at).as_secs_f32();
        (age / self.lifetime.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// Overlapping effects each expire on their own clock.
#[derive(Debug, Default)]
pub struct EffectLayer {
    effects: Vec<Effect>,
}

impl EffectLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_shot(&mut self, center: Point2<f32>, now: Instant) {
        self.effects.push(Effect {
            kind: EffectKind::BulletHole,
            center,
            size: BULLET_HOLE_SIZE_PX,
            spawned_at: now,
            lifetime: BULLET_HOLE_LIFETIME,
        });
        self.effects.push(Effect {
            kind: EffectKind::Explosion,
            center,
            size: EXPLOSION_SIZE_PX,
            spawned_at: now,
            lifetime: EXPLOSION_LIFETIME,
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.effects.retain(|effect| effect.is_alive(now));
    }

    pub fn active(&self, now: Instant) -> impl Iterator<Item = &Effect> {
        self.effects.iter().filter(move |effect| effect.is_alive(now))
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Plays the shot sound.
pub trait CuePlayer {
    fn play_shot(&mut self) -> std::io::Result<()>;
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl CuePlayer for TerminalBell {
    fn play_shot(&mut self) -> std::io::Result<()> {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07")?;
        stderr.flush()
    }
}
