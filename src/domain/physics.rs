/// Arcade physics: velocity integration and tile collision for one body.
///
/// ## Integration (per step, `dt` seconds)
///
///   - Horizontal: acceleration wins over drag. With `ax == 0`, drag pulls
///     `vx` toward zero by `drag_x * dt` and never past it.
///   - Vertical: `vy += (gravity + ay) * dt`.
///   - Both components are clamped to `±max_velocity`.
///
/// ## Collision
///
/// Axis-separable move-and-slide against the collidable tiles of a
/// `TileLayer`: X is resolved first, then Y from the corrected X. Each
/// axis sweeps every tile column/row the leading edge crosses, so fast
/// bodies cannot tunnel through a one-tile wall. A stopped axis has its
/// velocity zeroed and its `blocked` flag set; `blocked.down` is the
/// "grounded" signal the player controller consumes.
///
/// World bounds (the map rectangle) are applied last when enabled.

use super::entity::{Blocked, Body};
use super::tile::{TileLayer, TILE_SIZE};

const EPS: f32 = 0.001;

/// Per-step environment a body is simulated in.
#[derive(Clone, Copy, Debug)]
pub struct World<'a> {
    pub gravity: f32,
    pub layer: &'a TileLayer,
    pub bounds_w: f32,
    pub bounds_h: f32,
}

/// Advance `body` by `dt` seconds.
pub fn step_body(body: &mut Body, world: &World, dt: f32) {
    integrate_velocity(body, world.gravity, dt);

    body.blocked = Blocked::default();

    let (nx, hit_x) = sweep_x(world.layer, body, body.vx * dt);
    body.x = nx;
    if hit_x {
        if body.vx > 0.0 { body.blocked.right = true; } else { body.blocked.left = true; }
        body.vx = 0.0;
    }

    let (ny, hit_y) = sweep_y(world.layer, body, body.vy * dt);
    body.y = ny;
    if hit_y {
        if body.vy > 0.0 { body.blocked.down = true; } else { body.blocked.up = true; }
        body.vy = 0.0;
    }

    if body.collide_world_bounds {
        apply_world_bounds(body, world.bounds_w, world.bounds_h);
    }
}

/// Velocity update only (no movement). Exposed for tests.
pub fn integrate_velocity(body: &mut Body, gravity: f32, dt: f32) {
    if body.ax != 0.0 {
        body.vx += body.ax * dt;
    } else if body.drag_x > 0.0 {
        let d = body.drag_x * dt;
        if body.vx - d > 0.0 {
            body.vx -= d;
        } else if body.vx + d < 0.0 {
            body.vx += d;
        } else {
            body.vx = 0.0;
        }
    }
    body.vy += (gravity + body.ay) * dt;

    let max = body.max_velocity;
    body.vx = body.vx.clamp(-max, max);
    body.vy = body.vy.clamp(-max, max);
}

/// Do two bodies intersect? Touching edges do not count.
#[inline]
pub fn overlaps(a: &Body, b: &Body) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

#[inline]
fn cell_of(v: f32) -> i32 {
    (v / TILE_SIZE).floor() as i32
}

/// Horizontal sweep. Returns the resolved x and whether a tile stopped it.
fn sweep_x(layer: &TileLayer, body: &Body, dx: f32) -> (f32, bool) {
    if dx == 0.0 {
        return (body.x, false);
    }
    let row0 = cell_of(body.y + EPS);
    let row1 = cell_of(body.bottom() - EPS);
    let blocked_col = |col: i32| (row0..=row1).any(|row| layer.collides_at(col, row));

    if dx > 0.0 {
        let from = cell_of(body.right() - EPS) + 1;
        let to = cell_of(body.right() + dx - EPS);
        for col in from..=to {
            if blocked_col(col) {
                return (col as f32 * TILE_SIZE - body.width, true);
            }
        }
    } else {
        let from = cell_of(body.x + EPS) - 1;
        let to = cell_of(body.x + dx + EPS);
        for col in (to..=from).rev() {
            if blocked_col(col) {
                return ((col + 1) as f32 * TILE_SIZE, true);
            }
        }
    }
    (body.x + dx, false)
}

/// Vertical sweep, using the already-resolved x.
fn sweep_y(layer: &TileLayer, body: &Body, dy: f32) -> (f32, bool) {
    if dy == 0.0 {
        return (body.y, false);
    }
    let col0 = cell_of(body.x + EPS);
    let col1 = cell_of(body.right() - EPS);
    let blocked_row = |row: i32| (col0..=col1).any(|col| layer.collides_at(col, row));

    if dy > 0.0 {
        let from = cell_of(body.bottom() - EPS) + 1;
        let to = cell_of(body.bottom() + dy - EPS);
        for row in from..=to {
            if blocked_row(row) {
                return (row as f32 * TILE_SIZE - body.height, true);
            }
        }
    } else {
        let from = cell_of(body.y + EPS) - 1;
        let to = cell_of(body.y + dy + EPS);
        for row in (to..=from).rev() {
            if blocked_row(row) {
                return ((row + 1) as f32 * TILE_SIZE, true);
            }
        }
    }
    (body.y + dy, false)
}

fn apply_world_bounds(body: &mut Body, w: f32, h: f32) {
    if body.x < 0.0 {
        body.x = 0.0;
        body.vx = 0.0;
        body.blocked.left = true;
    } else if body.right() > w {
        body.x = w - body.width;
        body.vx = 0.0;
        body.blocked.right = true;
    }
    if body.y < 0.0 {
        body.y = 0.0;
        body.vy = 0.0;
        body.blocked.up = true;
    } else if body.bottom() > h {
        body.y = h - body.height;
        body.vy = 0.0;
        body.blocked.down = true;
    }
}
