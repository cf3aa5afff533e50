// src/shoot.rs
use std::collections::{HashMap, HashSet};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::tracking::SlotId;

/// A shot at a point in mirrored (server) canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShootEvent {
    pub x: f32,
    pub y: f32,
}

impl From<Point2<f32>> for ShootEvent {
    fn from(p: Point2<f32>) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl ShootEvent {
    pub fn point(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShotPhase {
    #[default]
    Idle,
    Shooting,
}

/// Turns per-frame pinch classifications into one shot per aim→shoot edge.
#[derive(Debug, Default)]
pub struct ShootEdgeDetector {
    phases: HashMap<SlotId, ShotPhase>,
}

impl ShootEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every slot not observed this frame.
    pub fn retain_observed(&mut self, observed: &HashSet<SlotId>) {
        self.phases.retain(|slot, _| observed.contains(slot));
    }

    /// Records this frame's classification; true when the slot just started shooting.
    pub fn update(&mut self, slot: SlotId, is_shooting: bool) -> bool {
        let phase = self.phases.entry(slot).or_default();
        let fired = is_shooting && *phase == ShotPhase::Idle;
        *phase = if is_shooting {
            ShotPhase::Shooting
        } else {
            ShotPhase::Idle
        };
        fired
    }

    pub fn phase(&self, slot: SlotId) -> ShotPhase {
        self.phases.get(&slot).copied().unwrap_or_default()
    }

    pub fn tracked_slots(&self) -> usize {
        self.phases.len()
    }
}
