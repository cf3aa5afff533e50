// src/world.rs
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

/// Which way a duck's sprite faces. Only `-1` on the wire reverses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heading {
    #[default]
    Forward,
    Reversed,
}

impl From<f64> for Heading {
    fn from(direction: f64) -> Self {
        if direction == -1.0 {
            Heading::Reversed
        } else {
            Heading::Forward
        }
    }
}

impl<'de> Deserialize<'de> for Heading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let direction = Option::<f64>::deserialize(deserializer)?;
        Ok(direction.map(Heading::from).unwrap_or_default())
    }
}

/// A duck as the server sees it: mirrored canvas pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Duck {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default = "not_a_number", deserialize_with = "number_or_nan")]
    pub x: f32,
    #[serde(default = "not_a_number", deserialize_with = "number_or_nan")]
    pub y: f32,
    #[serde(default = "not_a_number", deserialize_with = "number_or_nan")]
    pub size: f32,
    #[serde(default)]
    pub direction: Heading,
}

impl Duck {
    pub fn new(x: f32, y: f32, size: f32, direction: Heading) -> Self {
        Self {
            id: None,
            x,
            y,
            size,
            direction,
        }
    }

    /// Finite position and a finite, positive size.
    pub fn has_valid_geometry(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.size.is_finite() && self.size > 0.0
    }
}

fn not_a_number() -> f32 {
    f32::NAN
}

fn number_or_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::NAN))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    pub ducks: Vec<Duck>,
    #[serde(default)]
    pub score: i64,
}

/// Holder for the latest server snapshot. Updates replace it wholesale.
#[derive(Debug, Default)]
pub struct WorldStateCache {
    current: Arc<WorldState>,
    updates: u64,
}

impl WorldStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, state: WorldState) {
        self.current = Arc::new(state);
        self.updates += 1;
    }

    pub fn read(&self) -> Arc<WorldState> {
        Arc::clone(&self.current)
    }

    pub fn updates_received(&self) -> u64 {
        self.updates
    }
}
