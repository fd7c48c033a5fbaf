/// Scenes: the playable platformer level and the completion screen.
///
/// The frame loop owns exactly one active `Scene`. Each tick it hands the
/// scene the shared `SceneContext` and the frame's `FrameInput`, and gets
/// back a `Transition` plus the `GameEvent`s for sound and HUD.
///
/// ## Platformer tick order
///
///   1. Sample contact (grounded from the previous physics step)
///   2. Resolve the controller, apply its commands
///   3. Physics step against the platform layer
///   4. Coin overlaps, then the goal overlap
///   5. Emitters, animator, camera
///
/// A restart request ends the tick right after step 2; the frame loop then
/// rebuilds the scene from the context, so nothing survives a restart.

use crate::config::GameConfig;
use crate::domain::anim::{Anim, Animator};
use crate::domain::controller::{
    self, Command, Contact, EmitterCmd, EmitterId, PlayerState, Tuning,
};
use crate::domain::entity::{Body, Coin, Facing, FrameInput};
use crate::domain::physics::{self, World};
use crate::domain::tile::TILE_SIZE;
use super::camera::Camera;
use super::event::GameEvent;
use super::level::Level;
use super::particles::{Emitter, EmitterConfig};

/// Sprite size; emitter offsets are relative to it.
pub const DISPLAY_W: f32 = 16.0;
pub const DISPLAY_H: f32 = 16.0;
/// Collision box, centered horizontally on the sprite and resting on its
/// bottom edge.
pub const HITBOX_W: f32 = 12.0;
pub const HITBOX_H: f32 = 14.0;

const CAMERA_LERP: f32 = 0.25;
const CAMERA_DEADZONE: f32 = 50.0;

const WALKING_SEED: u64 = 0x5EED_0001;
const JUMPING_SEED: u64 = 0x5EED_0002;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SceneKey {
    Platformer,
    End,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    None,
    /// Replace the active scene with a fresh instance of `key`.
    Start(SceneKey),
    /// Rebuild the active scene from scratch.
    Restart,
}

/// Everything scenes share. Read-only once built.
pub struct SceneContext {
    pub config: GameConfig,
    pub level: Level,
    death_y: f32,
}

impl SceneContext {
    pub fn new(config: GameConfig, level: Level) -> Self {
        let death_y = death_line(&config, &level);
        SceneContext { config, level, death_y }
    }

    /// The player dies once its top edge reaches this line.
    pub fn death_y(&self) -> f32 {
        self.death_y
    }
}

/// `height - death_margin`, but never above the row under the spawn tile.
/// A stage shorter than the margin would otherwise kill the player on its
/// first frame.
fn death_line(config: &GameConfig, level: &Level) -> f32 {
    let line = level.height_px() - config.death_margin;
    let floor = level.spawn.1 + TILE_SIZE;
    if line < floor {
        log::warn!(
            "stage '{}' is {} px tall, shorter than death margin {}; death line moved to y={}",
            level.name,
            level.height_px(),
            config.death_margin,
            floor,
        );
        return floor;
    }
    line
}

// ══════════════════════════════════════════════════════════════
// Scene switcher
// ══════════════════════════════════════════════════════════════

pub enum Scene {
    Platformer(Box<PlatformerScene>),
    End(EndScene),
}

impl Scene {
    pub fn create(key: SceneKey, ctx: &SceneContext) -> Self {
        match key {
            SceneKey::Platformer => Scene::Platformer(Box::new(PlatformerScene::create(ctx))),
            SceneKey::End => Scene::End(EndScene::create()),
        }
    }

    pub fn key(&self) -> SceneKey {
        match self {
            Scene::Platformer(_) => SceneKey::Platformer,
            Scene::End(_) => SceneKey::End,
        }
    }

    pub fn update(
        &mut self,
        ctx: &SceneContext,
        input: &FrameInput,
        dt: f32,
    ) -> (Transition, Vec<GameEvent>) {
        match self {
            Scene::Platformer(s) => s.update(ctx, input, dt),
            Scene::End(s) => s.update(input),
        }
    }

    /// Apply a transition in place. Returns true if the scene was replaced.
    pub fn apply(&mut self, transition: Transition, ctx: &SceneContext) -> bool {
        let key = match transition {
            Transition::None => return false,
            Transition::Restart => self.key(),
            Transition::Start(key) => key,
        };
        log::info!("scene {:?} -> {:?} ({:?})", self.key(), key, transition);
        *self = Scene::create(key, ctx);
        true
    }
}

// ══════════════════════════════════════════════════════════════
// Platformer
// ══════════════════════════════════════════════════════════════

pub struct PlatformerScene {
    pub tuning: Tuning,
    pub body: Body,
    pub player: PlayerState,
    /// The sprite art faces left; facing right draws it mirrored.
    pub flip_x: bool,
    pub animator: Animator,
    pub walking: Emitter,
    pub jumping: Emitter,
    pub coins: Vec<Coin>,
    pub coins_total: usize,
    pub goal: Option<Body>,
    pub camera: Camera,
    death_y: f32,
    view_cells: (usize, usize),
}

impl PlatformerScene {
    pub fn create(ctx: &SceneContext) -> Self {
        let level = &ctx.level;
        let tuning = ctx.config.tuning;

        // Spawn marks the sprite's top-left; the hitbox sits at its feet.
        let (sx, sy) = level.spawn;
        let mut body = Body::new(
            sx + (DISPLAY_W - HITBOX_W) / 2.0,
            sy + (DISPLAY_H - HITBOX_H),
            HITBOX_W,
            HITBOX_H,
        );
        body.max_velocity = tuning.max_velocity;
        body.drag_x = tuning.drag;
        body.collide_world_bounds = true;

        let mut walking = Emitter::new(EmitterConfig::walking(), WALKING_SEED);
        let mut jumping = Emitter::new(EmitterConfig::jumping(), JUMPING_SEED);
        walking.stop();
        jumping.stop();

        let coins: Vec<Coin> = level.coins.iter()
            .map(|&(x, y)| Coin::new(x, y, TILE_SIZE))
            .collect();
        let goal = level.goal.map(|(x, y)| {
            Body::new(x as f32 * TILE_SIZE, y as f32 * TILE_SIZE, TILE_SIZE, TILE_SIZE)
        });

        let mut camera = Camera::new(level.width_px(), level.height_px(), ctx.config.scale);
        camera.start_follow(CAMERA_LERP, CAMERA_LERP, CAMERA_DEADZONE, CAMERA_DEADZONE);
        let (cx, cy) = body.center();
        camera.center_on(cx, cy);

        log::debug!("platformer created: spawn ({sx}, {sy}), {} coins", coins.len());

        PlatformerScene {
            tuning,
            body,
            player: PlayerState::new(),
            flip_x: false,
            animator: Animator::new(Anim::Idle),
            walking,
            jumping,
            coins_total: coins.len(),
            coins,
            goal,
            camera,
            death_y: ctx.death_y(),
            view_cells: (0, 0),
        }
    }

    pub fn coins_collected(&self) -> usize {
        self.coins_total - self.coins.len()
    }

    /// Size the camera to the terminal area; recenters when the size changes.
    pub fn set_viewport(&mut self, cols: usize, rows: usize) {
        if self.view_cells == (cols, rows) {
            return;
        }
        self.view_cells = (cols, rows);
        self.camera.set_view_cells(cols, rows);
        let (cx, cy) = self.body.center();
        self.camera.center_on(cx, cy);
    }

    fn contact(&self) -> Contact {
        Contact {
            grounded: self.body.blocked.down,
            y: self.body.y,
            display_w: DISPLAY_W,
            display_h: DISPLAY_H,
            death_y: self.death_y,
        }
    }

    pub fn update(
        &mut self,
        ctx: &SceneContext,
        input: &FrameInput,
        dt: f32,
    ) -> (Transition, Vec<GameEvent>) {
        let mut events = Vec::new();

        let contact = self.contact();
        let commands = controller::resolve(&mut self.player, input, &contact, &self.tuning);
        if let Some(transition) = self.apply_commands(&commands, &mut events) {
            return (transition, events);
        }

        let world = World {
            gravity: self.tuning.gravity,
            layer: &ctx.level.platforms,
            bounds_w: ctx.level.width_px(),
            bounds_h: ctx.level.height_px(),
        };
        physics::step_body(&mut self.body, &world, dt);

        self.collect_coins(&mut events);

        let center = self.body.center();
        self.walking.update(dt, center);
        self.jumping.update(dt, center);
        self.animator.update(dt);
        self.camera.follow(center.0, center.1);

        if self.goal.as_ref().is_some_and(|g| physics::overlaps(&self.body, g)) {
            events.push(GameEvent::GoalReached);
            return (Transition::Start(SceneKey::End), events);
        }

        (Transition::None, events)
    }

    /// Apply controller output to the engine-side objects. A restart
    /// request short-circuits and is returned as the scene transition.
    fn apply_commands(
        &mut self,
        commands: &[Command],
        events: &mut Vec<GameEvent>,
    ) -> Option<Transition> {
        for cmd in commands {
            match *cmd {
                Command::SetAccelerationX(a) => self.body.ax = a,
                Command::SetDragX(d) => self.body.drag_x = d,
                Command::SetVelocityY { velocity, kind } => {
                    self.body.vy = velocity;
                    events.push(GameEvent::Jumped(kind));
                }
                Command::Face(facing) => self.flip_x = facing == Facing::Right,
                Command::PlayAnimation { anim, ignore_if_playing } => {
                    self.animator.play(anim, ignore_if_playing);
                }
                Command::Emitter(id, ecmd) => {
                    let emitter = match id {
                        EmitterId::Walking => &mut self.walking,
                        EmitterId::Jumping => &mut self.jumping,
                    };
                    match ecmd {
                        EmitterCmd::Follow { offset_x, offset_y } => {
                            emitter.start_follow(offset_x, offset_y)
                        }
                        EmitterCmd::SetSpeed { x, y } => emitter.set_particle_speed(x, y),
                        EmitterCmd::Start => emitter.start(),
                        EmitterCmd::Stop => emitter.stop(),
                    }
                }
                Command::RestartScene(reason) => {
                    events.push(GameEvent::LevelRestarted(reason));
                    return Some(Transition::Restart);
                }
            }
        }
        None
    }

    fn collect_coins(&mut self, events: &mut Vec<GameEvent>) {
        let before = self.coins.len();
        let body = &self.body;
        self.coins.retain(|coin| {
            if physics::overlaps(body, &coin.body) {
                events.push(GameEvent::CoinCollected { x: coin.tile_x, y: coin.tile_y });
                false
            } else {
                true
            }
        });
        if before > 0 && self.coins.is_empty() {
            events.push(GameEvent::AllCoinsCollected);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// End screen
// ══════════════════════════════════════════════════════════════

pub struct EndScene {
    pub title: &'static str,
    pub prompt: &'static str,
}

impl EndScene {
    pub fn create() -> Self {
        EndScene {
            title: "Level complete!",
            prompt: "Play Again? Press R",
        }
    }

    pub fn update(&mut self, input: &FrameInput) -> (Transition, Vec<GameEvent>) {
        if input.restart_pressed {
            (Transition::Start(SceneKey::Platformer), vec![GameEvent::GameRestarted])
        } else {
            (Transition::None, vec![])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::controller::{JumpKind, RestartReason};
    use crate::sim::level::parse_stage;

    const DT: f32 = 1.0 / 60.0;

    /// 12x8 stage: floor on row 6, a coin two tiles right of spawn, goal at
    /// the far right, and a pit at columns 5-6.
    const STAGE: &str = "\
# Test





 P o       F
#####  #####
#####  #####
";

    /// The map is only 128 px tall, so the death line sits just above the
    /// world floor instead of 100 px up.
    fn ctx() -> SceneContext {
        let mut config = GameConfig::default();
        config.death_margin = 16.0;
        SceneContext::new(config, parse_stage(STAGE).expect("stage"))
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn right() -> FrameInput {
        FrameInput { right: true, ..FrameInput::default() }
    }

    fn settle(scene: &mut PlatformerScene, ctx: &SceneContext) {
        for _ in 0..30 {
            scene.update(ctx, &idle(), DT);
        }
        assert!(scene.body.blocked.down);
    }

    #[test]
    fn short_stage_keeps_death_line_below_spawn() {
        let level = parse_stage("# Short\n\n\n\n P   \n#####\n").expect("stage");
        let ctx = SceneContext::new(GameConfig::default(), level);
        assert!(ctx.death_y() > ctx.level.spawn.1);

        let mut s = PlatformerScene::create(&ctx);
        for _ in 0..60 {
            let (t, events) = s.update(&ctx, &idle(), DT);
            assert_eq!(t, Transition::None);
            assert!(events.is_empty());
        }
    }

    #[test]
    fn created_at_spawn_with_double_jump() {
        let ctx = ctx();
        let s = PlatformerScene::create(&ctx);
        assert_eq!(s.body.x, 16.0 + 2.0);
        assert_eq!(s.body.y, 80.0 + 2.0);
        assert!(s.player.can_double_jump());
        assert_eq!(s.coins_total, 1);
        assert!(s.goal.is_some());
        assert!(!s.walking.is_running());
        assert!(!s.jumping.is_running());
        assert_eq!(ctx.death_y(), 112.0);
    }

    #[test]
    fn grounded_jump_sets_velocity_and_event() {
        let ctx = ctx();
        let mut s = PlatformerScene::create(&ctx);
        settle(&mut s, &ctx);
        let jump = FrameInput { up_pressed: true, ..FrameInput::default() };
        let (t, events) = s.update(&ctx, &jump, DT);
        assert_eq!(t, Transition::None);
        assert!(events.contains(&GameEvent::Jumped(JumpKind::Ground)));
        assert!(s.body.vy < 0.0);
        assert!(s.player.can_double_jump());
        assert!(s.jumping.is_running());
    }

    #[test]
    fn walking_right_collects_coin() {
        let ctx = ctx();
        let mut s = PlatformerScene::create(&ctx);
        settle(&mut s, &ctx);
        let mut collected = false;
        for _ in 0..40 {
            let (_, events) = s.update(&ctx, &right(), DT);
            if events.contains(&GameEvent::CoinCollected { x: 3, y: 5 }) {
                assert!(events.contains(&GameEvent::AllCoinsCollected));
                collected = true;
                break;
            }
        }
        assert!(collected);
        assert_eq!(s.coins_collected(), 1);
        assert!(s.flip_x);
        assert_eq!(s.player.facing, Facing::Right);
    }

    #[test]
    fn restart_key_requests_rebuild() {
        let ctx = ctx();
        let mut scene = Scene::create(SceneKey::Platformer, &ctx);
        if let Scene::Platformer(s) = &mut scene {
            s.body.x = 100.0;
            s.coins.clear();
            s.player.jump = controller::JumpState::AirborneJumpConsumed;
        }
        let r = FrameInput { restart_pressed: true, ..FrameInput::default() };
        let (t, events) = scene.update(&ctx, &r, DT);
        assert_eq!(t, Transition::Restart);
        assert_eq!(events, vec![GameEvent::LevelRestarted(RestartReason::RestartKey)]);

        assert!(scene.apply(t, &ctx));
        let Scene::Platformer(s) = &scene else { panic!("expected platformer") };
        assert_eq!(s.body.x, 18.0);
        assert_eq!(s.coins.len(), 1);
        assert!(s.player.can_double_jump());
    }

    #[test]
    fn falling_into_pit_restarts() {
        let ctx = ctx();
        let mut s = PlatformerScene::create(&ctx);
        // Drop the player over the pit.
        s.body.x = 5.0 * TILE_SIZE + 2.0;
        let mut restarted = false;
        for _ in 0..120 {
            let (t, events) = s.update(&ctx, &idle(), DT);
            if t == Transition::Restart {
                assert!(events.contains(&GameEvent::LevelRestarted(RestartReason::FellOutOfLevel)));
                restarted = true;
                break;
            }
        }
        assert!(restarted);
    }

    #[test]
    fn reaching_goal_starts_end_scene() {
        let ctx = ctx();
        let mut scene = Scene::create(SceneKey::Platformer, &ctx);
        if let Scene::Platformer(s) = &mut scene {
            s.body.x = 11.0 * TILE_SIZE;
        }
        let (t, events) = scene.update(&ctx, &idle(), DT);
        assert_eq!(t, Transition::Start(SceneKey::End));
        assert!(events.contains(&GameEvent::GoalReached));
        scene.apply(t, &ctx);
        assert_eq!(scene.key(), SceneKey::End);
    }

    #[test]
    fn end_scene_r_starts_fresh_platformer() {
        let ctx = ctx();
        let mut scene = Scene::create(SceneKey::End, &ctx);
        let (t, _) = scene.update(&ctx, &idle(), DT);
        assert_eq!(t, Transition::None);
        assert!(!scene.apply(t, &ctx));

        let r = FrameInput { restart_pressed: true, ..FrameInput::default() };
        let (t, events) = scene.update(&ctx, &r, DT);
        assert_eq!(t, Transition::Start(SceneKey::Platformer));
        assert_eq!(events, vec![GameEvent::GameRestarted]);
        scene.apply(t, &ctx);
        let Scene::Platformer(s) = &scene else { panic!("expected platformer") };
        assert_eq!(s.coins_collected(), 0);
    }

    #[test]
    fn end_scene_labels() {
        let e = EndScene::create();
        assert_eq!(e.title, "Level complete!");
        assert_eq!(e.prompt, "Play Again? Press R");
    }
}
