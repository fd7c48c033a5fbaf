/// Entry point and frame loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use config::GameConfig;
use domain::entity::FrameInput;
use sim::event::GameEvent;
use sim::level::load_stage;
use sim::scene::{Scene, SceneContext, SceneKey};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Log destination; `HOPPER_LOG` overrides it. The terminal is in raw
/// mode while playing, so logs never go to stderr.
const DEFAULT_LOG_FILE: &str = "hopper.log";

fn main() {
    init_logging();

    let config = GameConfig::load();
    let level = load_stage(&config);
    let ctx = SceneContext::new(config, level);
    let mut scene = Scene::create(SceneKey::Platformer, &ctx);

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut scene, &ctx, &mut renderer, sound.as_ref());

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Hopper!");
}

fn init_logging() {
    let path = std::env::var_os("HOPPER_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    );
    match File::create(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("cannot open log file {}: {e}; logging disabled", path.display());
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

/// Edge-triggered presses seen since the last tick. Input is drained every
/// loop iteration but the scene only ticks at `tick_rate_ms`, so presses
/// are latched until the next tick consumes them.
#[derive(Default)]
struct PendingPresses {
    jump: bool,
    restart: bool,
}

impl PendingPresses {
    fn latch(&mut self, kb: &InputState, gp: &GamepadState) {
        self.jump |= kb.jump_pressed() || gp.jump_pressed();
        self.restart |= kb.restart_pressed() || gp.restart_pressed();
    }

    /// Build the tick's input snapshot and clear the latches.
    fn take(&mut self, kb: &InputState, gp: &GamepadState) -> FrameInput {
        let input = FrameInput {
            left: kb.left_held() || gp.left_held(),
            right: kb.right_held() || gp.right_held(),
            up_pressed: self.jump,
            restart_pressed: self.restart,
        };
        *self = PendingPresses::default();
        input
    }
}

fn game_loop(
    scene: &mut Scene,
    ctx: &SceneContext,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.enable_key_release();
    let mut gp = GamepadState::new();
    gp.load_button_config(&ctx.config.gamepad);

    let tick_rate = Duration::from_millis(ctx.config.tick_rate_ms);
    let dt = ctx.config.dt();
    let mut last_tick = Instant::now();
    let mut pending = PendingPresses::default();

    log::info!("playing '{}' ({} coins)", ctx.level.name, ctx.level.coins.len());

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_pressed() || gp.quit_pressed() {
            log::info!("quit requested");
            break;
        }
        pending.latch(&kb, &gp);

        if last_tick.elapsed() >= tick_rate {
            let input = pending.take(&kb, &gp);
            let (transition, events) = scene.update(ctx, &input, dt);
            log_events(&events);
            if let Some(sfx) = sound {
                sfx.play_events(&events);
            }
            scene.apply(transition, ctx);
            last_tick = Instant::now();
        }

        renderer.render(scene, ctx)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Jumped(kind) => log::trace!("jump: {kind:?}"),
            GameEvent::CoinCollected { x, y } => log::debug!("coin collected at tile ({x}, {y})"),
            GameEvent::AllCoinsCollected => log::info!("all coins collected"),
            GameEvent::LevelRestarted(reason) => log::info!("level restart: {reason:?}"),
            GameEvent::GoalReached => log::info!("goal reached"),
            GameEvent::GameRestarted => log::info!("new game"),
        }
    }
}
