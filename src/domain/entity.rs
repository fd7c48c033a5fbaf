/// Entities: the arcade physics body shared by the player and pickups,
/// plus the per-frame input snapshot.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Frame input: held movement keys plus edge-triggered jump/restart.
/// Built once per frame from keyboard + gamepad, never mutated afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub up_pressed: bool,
    pub restart_pressed: bool,
}

/// Which sides of a body were stopped during the last physics step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blocked {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Axis-aligned arcade body. `(x, y)` is the top-left corner in world
/// pixels; +y points down, so a negative vertical velocity moves up.
#[derive(Clone, Debug)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub vx: f32,
    pub vy: f32,
    pub ax: f32,
    pub ay: f32,
    pub drag_x: f32,
    pub max_velocity: f32,
    pub collide_world_bounds: bool,
    pub blocked: Blocked,
}

impl Body {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Body {
            x, y, width, height,
            vx: 0.0,
            vy: 0.0,
            ax: 0.0,
            ay: 0.0,
            drag_x: 0.0,
            max_velocity: 10_000.0,
            collide_world_bounds: false,
            blocked: Blocked::default(),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// A collectable coin: a static, overlap-only body.
#[derive(Clone, Debug)]
pub struct Coin {
    pub body: Body,
    pub tile_x: usize,
    pub tile_y: usize,
}

impl Coin {
    pub fn new(tile_x: usize, tile_y: usize, size: f32) -> Self {
        Coin {
            body: Body::new(tile_x as f32 * size, tile_y as f32 * size, size, size),
            tile_x,
            tile_y,
        }
    }
}
