/// Follow camera: a viewport into the world, in world pixels.
///
/// `(x, y)` is the world position of the top-left visible point.
/// The target may move freely inside a deadzone rectangle centered in
/// the view; once it leaves, the camera closes the gap by `lerp` per
/// update. The view is clamped to the map bounds, and maps smaller than
/// the view are centered.
///
/// ## Terminal mapping
///
/// One terminal cell (two columns) covers `px_per_cell()` world pixels:
/// `TILE_SIZE * 2 / zoom`. At zoom 2 one tile is one cell.

use crate::domain::tile::TILE_SIZE;

#[derive(Clone, Debug)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    /// Visible world width/height in pixels.
    pub view_w: f32,
    pub view_h: f32,
    pub bounds_w: f32,
    pub bounds_h: f32,
    pub deadzone: (f32, f32),
    pub lerp: (f32, f32),
    pub zoom: f32,
}

impl Camera {
    pub fn new(bounds_w: f32, bounds_h: f32, zoom: f32) -> Self {
        Camera {
            x: 0.0,
            y: 0.0,
            view_w: 0.0,
            view_h: 0.0,
            bounds_w,
            bounds_h,
            deadzone: (0.0, 0.0),
            lerp: (1.0, 1.0),
            zoom: zoom.max(0.25),
        }
    }

    /// Pan speed toward the target each update, and the free-move zone.
    pub fn start_follow(&mut self, lerp_x: f32, lerp_y: f32, deadzone_w: f32, deadzone_h: f32) {
        self.lerp = (lerp_x.clamp(0.0, 1.0), lerp_y.clamp(0.0, 1.0));
        self.deadzone = (deadzone_w.max(0.0), deadzone_h.max(0.0));
    }

    pub fn px_per_cell(&self) -> f32 {
        TILE_SIZE * 2.0 / self.zoom
    }

    /// Size the view from the terminal area available for the map.
    pub fn set_view_cells(&mut self, cols: usize, rows: usize) {
        self.view_w = cols as f32 * self.px_per_cell();
        self.view_h = rows as f32 * self.px_per_cell();
        self.clamp();
    }

    /// Move toward a target point (usually the player center).
    pub fn follow(&mut self, tx: f32, ty: f32) {
        self.x = Self::follow_axis(self.x, self.view_w, self.deadzone.0, self.lerp.0, tx);
        self.y = Self::follow_axis(self.y, self.view_h, self.deadzone.1, self.lerp.1, ty);
        self.clamp();
    }

    /// Snap so the target is centered (level start).
    pub fn center_on(&mut self, tx: f32, ty: f32) {
        self.x = tx - self.view_w / 2.0;
        self.y = ty - self.view_h / 2.0;
        self.clamp();
    }

    fn follow_axis(scroll: f32, view: f32, dead: f32, lerp: f32, target: f32) -> f32 {
        let lo = scroll + (view - dead) / 2.0;
        let hi = lo + dead;
        if target < lo {
            scroll - (lo - target) * lerp
        } else if target > hi {
            scroll + (target - hi) * lerp
        } else {
            scroll
        }
    }

    fn clamp(&mut self) {
        self.x = Self::clamp_axis(self.x, self.view_w, self.bounds_w);
        self.y = Self::clamp_axis(self.y, self.view_h, self.bounds_h);
    }

    fn clamp_axis(scroll: f32, view: f32, bound: f32) -> f32 {
        if bound <= view {
            -(view - bound) / 2.0
        } else {
            scroll.clamp(0.0, bound - view)
        }
    }

    /// World pixel sampled by view cell (cx, cy) for a layer with the
    /// given scroll factor (1.0 = moves with the camera).
    pub fn cell_to_world(&self, cx: usize, cy: usize, scroll_factor: f32) -> (f32, f32) {
        let p = self.px_per_cell();
        (
            self.x * scroll_factor + (cx as f32 + 0.5) * p,
            self.y * scroll_factor + (cy as f32 + 0.5) * p,
        )
    }

    /// View cell containing world point (wx, wy), if visible.
    pub fn world_to_cell(&self, wx: f32, wy: f32) -> Option<(usize, usize)> {
        let p = self.px_per_cell();
        let vx = ((wx - self.x) / p).floor();
        let vy = ((wy - self.y) / p).floor();
        let cols = (self.view_w / p).round();
        let rows = (self.view_h / p).round();
        if vx >= 0.0 && vy >= 0.0 && vx < cols && vy < rows {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 960x640 map, 20x10 cell view at zoom 2 (320x160 px).
    fn cam() -> Camera {
        let mut c = Camera::new(960.0, 640.0, 2.0);
        c.start_follow(0.25, 0.25, 50.0, 50.0);
        c.set_view_cells(20, 10);
        c
    }

    #[test]
    fn zoom_sets_cell_scale() {
        let c = cam();
        assert_eq!(c.px_per_cell(), 16.0);
        assert_eq!((c.view_w, c.view_h), (320.0, 160.0));
        assert_eq!(Camera::new(10.0, 10.0, 1.0).px_per_cell(), 32.0);
    }

    #[test]
    fn center_on_clamps_to_bounds() {
        let mut c = cam();
        c.center_on(10.0, 630.0);
        assert_eq!((c.x, c.y), (0.0, 480.0));
        c.center_on(950.0, 5.0);
        assert_eq!((c.x, c.y), (640.0, 0.0));
    }

    #[test]
    fn target_inside_deadzone_does_not_move_camera() {
        let mut c = cam();
        c.center_on(480.0, 320.0);
        let (x, y) = (c.x, c.y);
        c.follow(480.0 + 20.0, 320.0 - 20.0);
        assert_eq!((c.x, c.y), (x, y));
    }

    #[test]
    fn leaving_deadzone_lerps_toward_target() {
        let mut c = cam();
        c.center_on(480.0, 320.0);
        let x0 = c.x;
        // Deadzone right edge is at center + 25; target is 100 past it.
        c.follow(480.0 + 125.0, 320.0);
        assert!((c.x - (x0 + 25.0)).abs() < 1e-3);
        for _ in 0..100 {
            c.follow(480.0 + 125.0, 320.0);
        }
        assert!((c.x - (x0 + 100.0)).abs() < 0.01);
    }

    #[test]
    fn small_map_is_centered() {
        let mut c = Camera::new(160.0, 64.0, 2.0);
        c.set_view_cells(20, 10);
        c.follow(80.0, 32.0);
        assert_eq!((c.x, c.y), (-80.0, -48.0));
    }

    #[test]
    fn cell_world_round_trip() {
        let mut c = cam();
        c.center_on(480.0, 320.0);
        let (wx, wy) = c.cell_to_world(3, 4, 1.0);
        assert_eq!(c.world_to_cell(wx, wy), Some((3, 4)));
        assert_eq!(c.world_to_cell(c.x - 1.0, c.y), None);
        // Half-speed layer samples closer to the origin.
        let (px, _) = c.cell_to_world(0, 0, 0.5);
        assert!(px < wx);
    }
}
