/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to the stock tuning if the file is missing or
/// incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::controller::Tuning;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tuning: Tuning,
    /// Camera zoom (2.0 = one tile per terminal cell).
    pub scale: f32,
    /// The player dies once its top edge is this close to the map bottom.
    pub death_margin: f32,
    pub tick_rate_ms: u64,
    pub gamepad: GamepadConfig,
    /// Optional stage file overriding the built-in stage.
    pub stage: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    tuning: TomlTuning,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTuning {
    #[serde(default = "default_acceleration")]
    acceleration: f32,
    #[serde(default = "default_drag")]
    drag: f32,
    #[serde(default = "default_jump_velocity")]
    jump_velocity: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_max_velocity")]
    max_velocity: f32,
    #[serde(default = "default_particle_velocity")]
    particle_velocity: f32,
    #[serde(default = "default_scale")]
    scale: f32,
    #[serde(default = "default_death_margin")]
    death_margin: f32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump")]
    jump: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    #[serde(default)]
    stage: Option<String>,
}

// ── Defaults ──

fn default_acceleration() -> f32 { 500.0 }
fn default_drag() -> f32 { 2000.0 }
fn default_jump_velocity() -> f32 { -410.0 }   // negative = up
fn default_gravity() -> f32 { 1500.0 }
fn default_max_velocity() -> f32 { 10_000.0 }
fn default_particle_velocity() -> f32 { 0.0 }
fn default_scale() -> f32 { 2.0 }
fn default_death_margin() -> f32 { 100.0 }
fn default_tick_rate() -> u64 { 16 }           // ~60 Hz

fn default_jump() -> Vec<String> { vec!["A".into()] }
fn default_restart() -> Vec<String> { vec!["Start".into(), "Y".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlTuning {
    fn default() -> Self {
        TomlTuning {
            acceleration: default_acceleration(),
            drag: default_drag(),
            jump_velocity: default_jump_velocity(),
            gravity: default_gravity(),
            max_velocity: default_max_velocity(),
            particle_velocity: default_particle_velocity(),
            scale: default_scale(),
            death_margin: default_death_margin(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump(),
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly; invalid TOML yields defaults.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Self {
        let toml_cfg = parse_toml(text, "config").unwrap_or_default();
        GameConfig::from_toml(toml_cfg, &[])
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let t = cfg.tuning;
        let tick_rate_ms = cfg.timing.tick_rate_ms.max(1);
        GameConfig {
            tuning: Tuning {
                acceleration: t.acceleration,
                drag: t.drag.max(0.0),
                jump_velocity: t.jump_velocity,
                gravity: t.gravity,
                max_velocity: t.max_velocity.abs(),
                particle_velocity: t.particle_velocity,
            },
            scale: if t.scale > 0.0 { t.scale } else { default_scale() },
            death_margin: t.death_margin,
            tick_rate_ms,
            gamepad: GamepadConfig {
                jump: cfg.gamepad.jump,
                restart: cfg.gamepad.restart,
                quit: cfg.gamepad.quit,
            },
            stage: cfg.general.stage.map(|s| resolve_path(&s, search_dirs)),
        }
    }

    /// Fixed simulation step in seconds.
    pub fn dt(&self) -> f32 {
        self.tick_rate_ms as f32 / 1000.0
    }
}

/// Absolute paths are kept; relative ones are looked up in the search dirs,
/// defaulting to CWD-relative.
fn resolve_path(s: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = PathBuf::from(s);
    if p.is_absolute() {
        return p;
    }
    search_dirs.iter()
        .map(|d| d.join(&p))
        .find(|candidate| candidate.is_file())
        .unwrap_or(p)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match read_toml(&path) {
            Some(cfg) => {
                log::info!("using {}", path.display());
                return cfg;
            }
            None => return TomlConfig::default(),
        }
    }
    log::info!("no config.toml found; using default settings");
    TomlConfig::default()
}

fn read_toml(path: &Path) -> Option<TomlConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_toml(&text, &path.display().to_string()),
        Err(e) => {
            log::warn!("could not read {}: {e}", path.display());
            None
        }
    }
}

fn parse_toml(text: &str, origin: &str) -> Option<TomlConfig> {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("{origin} parse error: {e}; using default settings");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_tuning() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.tuning, Tuning::default());
        assert_eq!(cfg.scale, 2.0);
        assert_eq!(cfg.death_margin, 100.0);
        assert!(cfg.stage.is_none());
        assert_eq!(cfg.gamepad.jump, vec!["A".to_string()]);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[tuning]\ngravity = 900.0\n\n[timing]\ntick_rate_ms = 20\n",
        );
        assert_eq!(cfg.tuning.gravity, 900.0);
        assert_eq!(cfg.tuning.jump_velocity, -410.0);
        assert_eq!(cfg.tick_rate_ms, 20);
        assert!((cfg.dt() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn invalid_file_falls_back() {
        let cfg = GameConfig::from_toml_str("[tuning\ngravity = ");
        assert_eq!(cfg.tuning, Tuning::default());
    }

    #[test]
    fn nonsense_values_are_sanitized() {
        let cfg = GameConfig::from_toml_str(
            "[tuning]\nscale = 0.0\ndrag = -5.0\n[timing]\ntick_rate_ms = 0\n",
        );
        assert_eq!(cfg.scale, 2.0);
        assert_eq!(cfg.tuning.drag, 0.0);
        assert_eq!(cfg.tick_rate_ms, 1);
    }

    #[test]
    fn stage_path_is_kept() {
        let cfg = GameConfig::from_toml_str("[general]\nstage = \"/tmp/my_stage.txt\"\n");
        assert_eq!(cfg.stage, Some(PathBuf::from("/tmp/my_stage.txt")));
    }
}
