// src/render.rs - Per-frame scene building: video, ducks, cursors and shot detection
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use nalgebra::{Matrix3, Point2, Vector2};
use thiserror::Error;
use tracing::{info, trace, warn};

use crate::config::{ClientConfig, AIM_CURSOR_RADIUS_PX, SHOOT_CURSOR_RADIUS_PX};
use crate::mapper::{CanvasSize, CoordinateMapper};
use crate::shoot::{ShootEdgeDetector, ShootEvent};
use crate::tracking::{GestureClassifier, LandmarkFrame, SlotId, SlotTracker};
use crate::world::{Heading, WorldState};

pub type Color = Rgba<u8>;

pub const DUCK_COLOR: Color = Rgba([255, 255, 0, 255]);
pub const AIM_COLOR: Color = Rgba([0, 0, 255, 255]);
pub const SHOOT_COLOR: Color = Rgba([255, 0, 0, 255]);

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("failed to load sprite {path}: {source}")]
    Load {
        path: String,
        source: image::ImageError,
    },
}

pub fn load_sprite(path: &Path) -> Result<RgbaImage, SpriteError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| SpriteError::Load {
            path: path.display().to_string(),
            source,
        })
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    VideoFrame(Arc<RgbaImage>),
    DuckSprite,
}

impl PartialEq for ImageSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ImageSource::VideoFrame(a), ImageSource::VideoFrame(b)) => Arc::ptr_eq(a, b),
            (ImageSource::DuckSprite, ImageSource::DuckSprite) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Square of side `size` centered on `center`.
    pub fn centered(center: Point2<f32>, size: f32) -> Self {
        Self::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Image {
        source: ImageSource,
        rect: Rect,
        flip_x: bool,
    },
    Circle {
        center: Point2<f32>,
        radius: f32,
        color: Color,
    },
}

/// A primitive in the coordinates it was drawn with, plus the transform active at the time.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub local: Primitive,
    pub transform: Matrix3<f32>,
}

impl DrawCommand {
    /// The primitive in final canvas pixels, with transforms applied.
    pub fn device(&self) -> Primitive {
        let m = &self.transform;
        match &self.local {
            Primitive::Image {
                source,
                rect,
                flip_x,
            } => {
                let a = m.transform_point(&Point2::new(rect.x, rect.y));
                let b = m.transform_point(&Point2::new(rect.x + rect.width, rect.y + rect.height));
                Primitive::Image {
                    source: source.clone(),
                    rect: Rect::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs()),
                    flip_x: *flip_x != (m[(0, 0)] < 0.0),
                }
            }
            Primitive::Circle {
                center,
                radius,
                color,
            } => Primitive::Circle {
                center: m.transform_point(center),
                radius: radius * m[(0, 0)].abs(),
                color: *color,
            },
        }
    }
}

/// Retained drawing surface with a canvas-style transform stack.
#[derive(Debug, Clone)]
pub struct Scene {
    size: CanvasSize,
    transform: Matrix3<f32>,
    saved: Vec<Matrix3<f32>>,
    commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            transform: Matrix3::identity(),
            saved: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn save(&mut self) {
        self.saved.push(self.transform);
    }

    pub fn restore(&mut self) {
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
    }

    pub fn is_transformed(&self) -> bool {
        self.transform != Matrix3::identity()
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.transform *= Matrix3::new_translation(&Vector2::new(dx, dy));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.transform *= Matrix3::new_nonuniform_scaling(&Vector2::new(sx, sy));
    }

    pub fn apply(&mut self, transform: &Matrix3<f32>) {
        self.transform *= transform;
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn draw_image(&mut self, source: ImageSource, rect: Rect) {
        self.push(Primitive::Image {
            source,
            rect,
            flip_x: false,
        });
    }

    pub fn fill_circle(&mut self, center: Point2<f32>, radius: f32, color: Color) {
        self.push(Primitive::Circle {
            center,
            radius,
            color,
        });
    }

    fn push(&mut self, local: Primitive) {
        self.commands.push(DrawCommand {
            local,
            transform: self.transform,
        });
    }
}

/// A shot detected while rendering a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiredShot {
    pub slot: SlotId,
    pub event: ShootEvent,
}

/// Runs once per landmark frame: redraws the scene and detects shots.
pub struct FrameRenderer {
    mapper: CoordinateMapper,
    classifier: GestureClassifier,
    slots: SlotTracker,
    detector: ShootEdgeDetector,
    sprite: Option<Arc<RgbaImage>>,
    max_hands: usize,
}

impl FrameRenderer {
    pub fn new(config: &ClientConfig, sprite: Option<Arc<RgbaImage>>) -> Self {
        Self {
            mapper: CoordinateMapper::new(CanvasSize::new(config.canvas_width, config.canvas_height)),
            classifier: GestureClassifier::new(config.shoot_threshold_px),
            slots: SlotTracker::new(config.slot_assignment, config.match_radius_px),
            detector: ShootEdgeDetector::new(),
            sprite,
            max_hands: config.max_hands,
        }
    }

    /// Loads the duck sprite named in `config`, falling back to circles if it fails.
    pub fn from_config(config: &ClientConfig) -> Self {
        let sprite = config.duck_sprite.as_deref().and_then(|path| match load_sprite(path) {
            Ok(sprite) => {
                info!(path = %path.display(), "duck sprite loaded");
                Some(Arc::new(sprite))
            }
            Err(e) => {
                warn!(error = %e, "duck sprite unavailable; drawing ducks as circles");
                None
            }
        });
        Self::new(config, sprite)
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn sprite(&self) -> Option<&Arc<RgbaImage>> {
        self.sprite.as_ref()
    }

    pub fn detector(&self) -> &ShootEdgeDetector {
        &self.detector
    }

    pub fn render(&mut self, frame: &LandmarkFrame, world: &WorldState, scene: &mut Scene) -> Vec<FiredShot> {
        let size = self.mapper.size();
        let mut fired = Vec::new();

        scene.save();
        scene.clear();
        scene.apply(&self.mapper.mirror_transform());

        if let Some(image) = &frame.image {
            scene.draw_image(
                ImageSource::VideoFrame(Arc::clone(image)),
                Rect::new(0.0, 0.0, size.width, size.height),
            );
        }

        self.draw_ducks(world, scene);

        let hands = &frame.hands[..frame.hands.len().min(self.max_hands)];
        let anchors: Vec<_> = hands
            .iter()
            .map(|hand| SlotTracker::anchor(hand, &self.mapper))
            .collect();
        let slots = self.slots.assign(&anchors);
        let observed: HashSet<SlotId> = slots.iter().flatten().copied().collect();
        self.detector.retain_observed(&observed);

        for (index, (hand, slot)) in hands.iter().zip(&slots).enumerate() {
            let Some(pose) = self.classifier.classify(hand, &self.mapper) else {
                trace!(hand = index, "hand missing fingertip landmarks; skipped");
                continue;
            };

            // Raw coordinates: the mirror transform places the cursor under the fingertip.
            let (radius, color) = if pose.is_shooting {
                (SHOOT_CURSOR_RADIUS_PX, SHOOT_COLOR)
            } else {
                (AIM_CURSOR_RADIUS_PX, AIM_COLOR)
            };
            scene.fill_circle(pose.fingertip, radius, color);

            let Some(slot) = *slot else { continue };
            if self.detector.update(slot, pose.is_shooting) {
                let event = ShootEvent::from(self.mapper.to_world(pose.fingertip));
                fired.push(FiredShot { slot, event });
            }
        }

        scene.restore();
        fired
    }

    fn draw_ducks(&self, world: &WorldState, scene: &mut Scene) {
        for duck in &world.ducks {
            if !duck.has_valid_geometry() {
                warn!(?duck, "skipping duck with invalid geometry");
                continue;
            }
            let center = self.mapper.world_to_render(Point2::new(duck.x, duck.y));

            if self.sprite.is_none() {
                scene.fill_circle(center, duck.size / 2.0, DUCK_COLOR);
                continue;
            }

            let rect = Rect::centered(center, duck.size);
            if duck.direction == Heading::Reversed {
                // Flip around the sprite's own center; combined with the
                // canvas mirror the sprite ends up in its native orientation.
                scene.save();
                scene.translate(center.x, center.y);
                scene.scale(-1.0, 1.0);
                scene.translate(-center.x, -center.y);
                scene.draw_image(ImageSource::DuckSprite, rect);
                scene.restore();
            } else {
                scene.draw_image(ImageSource::DuckSprite, rect);
            }
        }
    }
}
