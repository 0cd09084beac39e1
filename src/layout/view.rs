use eframe::egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;
pub const FOCUS_ZOOM: f32 = 1.5;

/// Pan and zoom of the map: `screen = origin + translate + world * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    /// Centres `world` in a canvas of size `canvas` at [`FOCUS_ZOOM`].
    pub fn focus(world: Vec2, canvas: Vec2) -> Self {
        Self {
            translate: canvas * 0.5 - world * FOCUS_ZOOM,
            scale: FOCUS_ZOOM,
        }
    }

    pub fn world_to_screen(self, origin: Pos2, world: Vec2) -> Pos2 {
        origin + self.translate + world * self.scale
    }

    pub fn screen_to_world(self, origin: Pos2, screen: Pos2) -> Vec2 {
        (screen - origin - self.translate) / self.scale
    }

    /// Zooms by `factor` while keeping the world point under `pointer` fixed.
    pub fn zoom_about(&mut self, origin: Pos2, pointer: Pos2, factor: f32) {
        let world = self.screen_to_world(origin, pointer);
        self.scale = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.translate = pointer - origin - world * self.scale;
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn focus_puts_node_in_the_middle() {
        let view = ViewTransform::focus(vec2(100.0, 40.0), vec2(800.0, 600.0));
        assert_eq!(view.translate, vec2(250.0, 240.0));
        assert_eq!(view.world_to_screen(Pos2::ZERO, vec2(100.0, 40.0)), pos2(400.0, 300.0));
    }

    #[test]
    fn zoom_keeps_pointer_anchored_and_clamps() {
        let origin = pos2(10.0, 20.0);
        let pointer = pos2(300.0, 200.0);
        let mut view = ViewTransform::default();
        let before = view.screen_to_world(origin, pointer);

        view.zoom_about(origin, pointer, 2.0);
        let after = view.screen_to_world(origin, pointer);
        assert!((before - after).length() < 1e-3);

        view.zoom_about(origin, pointer, 1_000.0);
        assert_eq!(view.scale, MAX_ZOOM);
    }
}
