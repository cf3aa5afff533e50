// src/ui.rs - Paints the retained scene and shot effects with egui
use std::sync::Arc;

use egui::{Color32, ColorImage, Pos2, Rect, Stroke, TextureHandle, TextureId};
use image::RgbaImage;
use nalgebra::Point2;

use crate::effects::{EffectKind, EffectLayer};
use crate::mapper::CanvasSize;
use crate::render::{self, Color, ImageSource, Primitive, Scene};

const NO_SIGNAL_BG: Color32 = Color32::from_rgb(50, 50, 55);
const BANNER_TEXT: Color32 = Color32::from_rgb(200, 200, 200);
const BULLET_HOLE_FILL: Color32 = Color32::from_rgb(25, 25, 25);
const EXPLOSION_FILL: Color32 = Color32::from_rgb(255, 152, 0);

/// Maps canvas pixels onto the on-screen rectangle the canvas occupies.
#[derive(Debug, Clone, Copy)]
pub struct CanvasViewport {
    rect: Rect,
    scale: f32,
}

impl CanvasViewport {
    pub fn new(rect: Rect, canvas: CanvasSize) -> Self {
        Self {
            rect,
            scale: rect.width() / canvas.width,
        }
    }

    pub fn to_screen(&self, p: Point2<f32>) -> Pos2 {
        Pos2::new(self.rect.min.x + p.x * self.scale, self.rect.min.y + p.y * self.scale)
    }

    pub fn map_rect(&self, r: &render::Rect) -> Rect {
        Rect::from_min_max(
            self.to_screen(Point2::new(r.x, r.y)),
            self.to_screen(Point2::new(r.x + r.width, r.y + r.height)),
        )
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

pub fn to_color32(color: Color) -> Color32 {
    let [r, g, b, a] = color.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn color_image(image: &RgbaImage) -> ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

/// GPU textures for the images a scene references.
#[derive(Default)]
pub struct SceneTextures {
    video: Option<(Arc<RgbaImage>, TextureHandle)>,
    sprite: Option<TextureHandle>,
}

impl SceneTextures {
    /// Re-uploads only when a new frame image arrives.
    fn video_texture(&mut self, ctx: &egui::Context, frame: &Arc<RgbaImage>) -> TextureId {
        match &mut self.video {
            Some((current, handle)) if Arc::ptr_eq(current, frame) => handle.id(),
            Some((current, handle)) => {
                handle.set(color_image(frame), egui::TextureOptions::LINEAR);
                *current = Arc::clone(frame);
                handle.id()
            }
            None => {
                let handle = ctx.load_texture("video_frame", color_image(frame), egui::TextureOptions::LINEAR);
                let id = handle.id();
                self.video = Some((Arc::clone(frame), handle));
                id
            }
        }
    }

    fn sprite_texture(&mut self, ctx: &egui::Context, sprite: &RgbaImage) -> TextureId {
        self.sprite
            .get_or_insert_with(|| ctx.load_texture("duck_sprite", color_image(sprite), egui::TextureOptions::LINEAR))
            .id()
    }

    pub fn paint_scene(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        viewport: &CanvasViewport,
        scene: &Scene,
        sprite: Option<&Arc<RgbaImage>>,
    ) {
        painter.rect_filled(viewport.rect, egui::Rounding::same(4.0), NO_SIGNAL_BG);

        for command in scene.commands() {
            match command.device() {
                Primitive::Image { source, rect, flip_x } => {
                    let texture = match &source {
                        ImageSource::VideoFrame(frame) => self.video_texture(ctx, frame),
                        ImageSource::DuckSprite => match sprite {
                            Some(sprite) => self.sprite_texture(ctx, sprite),
                            None => continue,
                        },
                    };
                    let uv = if flip_x {
                        Rect::from_min_max(Pos2::new(1.0, 0.0), Pos2::new(0.0, 1.0))
                    } else {
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0))
                    };
                    painter.image(texture, viewport.map_rect(&rect), uv, Color32::WHITE);
                }
                Primitive::Circle { center, radius, color } => {
                    painter.circle_filled(viewport.to_screen(center), radius * viewport.scale(), to_color32(color));
                }
            }
        }
    }
}

/// Effects sit in mirrored space already, so they skip the canvas mirror.
pub fn paint_effects(painter: &egui::Painter, viewport: &CanvasViewport, effects: &EffectLayer, now: std::time::Instant) {
    for effect in effects.active(now) {
        let center = viewport.to_screen(effect.center);
        let radius = effect.size / 2.0 * viewport.scale();
        match effect.kind {
            EffectKind::BulletHole => {
                painter.circle_filled(center, radius, BULLET_HOLE_FILL);
                painter.circle_stroke(center, radius, Stroke::new(1.0, Color32::BLACK));
            }
            EffectKind::Explosion => {
                let t = effect.progress(now);
                let alpha = ((1.0 - t) * 255.0) as u8;
                painter.circle_filled(
                    center,
                    radius * (0.5 + 0.5 * t),
                    Color32::from_rgba_unmultiplied(EXPLOSION_FILL.r(), EXPLOSION_FILL.g(), EXPLOSION_FILL.b(), alpha),
                );
            }
        }
    }
}

pub fn paint_banner(painter: &egui::Painter, rect: Rect, text: &str) {
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(16.0),
        BANNER_TEXT,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn viewport_scales_canvas_into_screen_rect() {
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), egui::vec2(640.0, 360.0));
        let viewport = CanvasViewport::new(rect, CanvasSize::new(1280, 720));

        assert_eq!(viewport.scale(), 0.5);
        assert_eq!(viewport.to_screen(Point2::new(1024.0, 360.0)), Pos2::new(522.0, 200.0));

        let mapped = viewport.map_rect(&render::Rect::new(0.0, 0.0, 1280.0, 720.0));
        assert_eq!(mapped, rect);
    }

    #[test]
    fn colors_keep_their_channels() {
        assert_eq!(to_color32(Rgba([255, 0, 0, 255])), Color32::from_rgb(255, 0, 0));
        assert_eq!(to_color32(render::DUCK_COLOR), Color32::from_rgb(255, 255, 0));
    }
}
