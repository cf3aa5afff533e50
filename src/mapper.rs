// src/mapper.rs
//
// Two coordinate spaces meet here:
//   * render space: raw pixel coordinates, drawn under the canvas mirror
//     transform so the video behaves like a mirror;
//   * world space: the visually mirrored frame the server works in.
// Values crossing to or from the server are mirrored exactly once.
use nalgebra::{Matrix3, Point2, Vector2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    size: CanvasSize,
}

impl CoordinateMapper {
    pub fn new(size: CanvasSize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Normalized landmark coordinates to render-space pixels.
    pub fn to_canvas(&self, nx: f32, ny: f32) -> Point2<f32> {
        Point2::new(nx * self.size.width, ny * self.size.height)
    }

    pub fn mirror_x(&self, x: f32) -> f32 {
        self.size.width - x
    }

    /// Render-space point to the mirrored space shared with the server.
    pub fn to_world(&self, render: Point2<f32>) -> Point2<f32> {
        Point2::new(self.mirror_x(render.x), render.y)
    }

    /// Server-space point to the raw coordinates used under the mirror transform.
    pub fn world_to_render(&self, world: Point2<f32>) -> Point2<f32> {
        Point2::new(self.mirror_x(world.x), world.y)
    }

    /// Flip about the vertical center line: translate(W, 0) then scale(-1, 1).
    pub fn mirror_transform(&self) -> Matrix3<f32> {
        Matrix3::new_translation(&Vector2::new(self.size.width, 0.0))
            * Matrix3::new_nonuniform_scaling(&Vector2::new(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::new(CanvasSize::new(1280, 720))
    }

    #[test]
    fn aspect_ratio_is_width_over_height() {
        assert_eq!(CanvasSize::new(1280, 720).aspect_ratio(), 1280.0 / 720.0);
        assert_eq!(CanvasSize::new(640, 640).aspect_ratio(), 1.0);
    }

    #[test]
    fn normalized_points_scale_to_canvas() {
        let p = mapper().to_canvas(0.2, 0.5);
        assert_eq!(p, Point2::new(256.0, 360.0));
    }

    #[test]
    fn world_mapping_mirrors_only_x() {
        let m = mapper();
        let world = m.to_world(m.to_canvas(0.2, 0.5));
        assert_eq!(world, Point2::new(1024.0, 360.0));
        assert_eq!(m.world_to_render(world), Point2::new(256.0, 360.0));
    }

    #[test]
    fn mirror_transform_agrees_with_explicit_mirroring() {
        let m = mapper();
        let raw = Point2::new(256.0, 360.0);
        let device = m.mirror_transform().transform_point(&raw);
        assert_eq!(device, m.to_world(raw));
    }

    #[test]
    fn server_duck_lands_where_the_server_put_it() {
        // A duck at world x=100 is drawn at raw x=1180; the transform puts it back at 100.
        let m = mapper();
        let raw = m.world_to_render(Point2::new(100.0, 200.0));
        assert_eq!(raw.x, 1180.0);
        let device = m.mirror_transform().transform_point(&raw);
        assert_eq!(device, Point2::new(100.0, 200.0));
    }
}
