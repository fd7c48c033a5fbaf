/// Stage loader.
///
/// ## Sources (priority order):
///   1. `general.stage` from config.toml (a `.txt` stage file)
///   2. Built-in stage (`levels/stage.txt`, embedded at compile time)
///
/// A stage that fails to load is logged and replaced by the built-in one.
///
/// ## Stage format:
///   ```
///   # Stage Name
///   <platform rows>
///   ---
///   <backdrop rows>        (optional parallax layer)
///   ```
///
/// ## Platform legend (one char per 16x16 tile):
///   '#' = Ground (collides)       '=' = Brick (collides)
///   '%' = Decoration (no collide) 'o' = Coin
///   'P' = Player spawn            'F' = Goal flag
///   ' ' / '.' = Empty
///
/// Backdrop rows: any non-space char is a backdrop tile.

use std::path::{Path, PathBuf};

use crate::config::GameConfig;
use crate::domain::tile::{Tile, TileLayer, TILE_SIZE};

const BUILTIN_STAGE: &str = include_str!("../../levels/stage.txt");

/// Spawn point used when a stage has no `P` marker.
pub const DEFAULT_SPAWN: (f32, f32) = (50.0, 500.0);

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("cannot read stage {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stage has no platform rows")]
    Empty,
    #[error("second player spawn at ({x}, {y})")]
    DuplicateSpawn { x: usize, y: usize },
    #[error("second goal flag at ({x}, {y})")]
    DuplicateGoal { x: usize, y: usize },
    #[error("unexpected layer separator on line {line}")]
    ExtraSeparator { line: usize },
}

/// A parsed stage: two tile layers plus object markers.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub platforms: TileLayer,
    pub backdrop: TileLayer,
    /// Top-left of the player body, in world pixels.
    pub spawn: (f32, f32),
    /// Coin tiles (object layer).
    pub coins: Vec<(usize, usize)>,
    pub goal: Option<(usize, usize)>,
}

impl Level {
    pub fn width_px(&self) -> f32 {
        self.platforms.width_px()
    }

    pub fn height_px(&self) -> f32 {
        self.platforms.height_px()
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the configured stage, falling back to the built-in one.
pub fn load_stage(config: &GameConfig) -> Level {
    if let Some(path) = &config.stage {
        match load_stage_file(path) {
            Ok(level) => {
                log::info!("loaded stage '{}' from {}", level.name, path.display());
                return level;
            }
            Err(e) => log::warn!("{e}; using built-in stage"),
        }
    }
    builtin_stage()
}

pub fn load_stage_file(path: &Path) -> Result<Level, LevelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
    parse_stage(&content)
}

pub fn builtin_stage() -> Level {
    match parse_stage(BUILTIN_STAGE) {
        Ok(level) => level,
        Err(e) => {
            log::error!("built-in stage is invalid: {e}");
            fallback_stage()
        }
    }
}

/// Parse a stage file. Ragged rows are padded with empty tiles.
pub fn parse_stage(content: &str) -> Result<Level, LevelError> {
    let mut name = String::new();
    let mut platform_rows: Vec<&str> = vec![];
    let mut backdrop_rows: Vec<&str> = vec![];
    let mut in_backdrop = false;

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if i == 0 && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if line.trim() == "---" {
            if in_backdrop {
                return Err(LevelError::ExtraSeparator { line: i + 1 });
            }
            in_backdrop = true;
        } else if in_backdrop {
            backdrop_rows.push(line);
        } else {
            platform_rows.push(line);
        }
    }

    trim_trailing_blank(&mut platform_rows);
    trim_trailing_blank(&mut backdrop_rows);
    if platform_rows.is_empty() {
        return Err(LevelError::Empty);
    }

    let width = platform_rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let mut platforms = TileLayer::new(width, platform_rows.len());
    let mut spawn = None;
    let mut coins = vec![];
    let mut goal = None;

    for (y, row) in platform_rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            match ch {
                '#' => platforms.set(x, y, Tile::Ground),
                '=' => platforms.set(x, y, Tile::Brick),
                '%' => platforms.set(x, y, Tile::Decoration),
                'o' => coins.push((x, y)),
                'P' => {
                    if spawn.is_some() {
                        return Err(LevelError::DuplicateSpawn { x, y });
                    }
                    spawn = Some((x as f32 * TILE_SIZE, y as f32 * TILE_SIZE));
                }
                'F' => {
                    if goal.is_some() {
                        return Err(LevelError::DuplicateGoal { x, y });
                    }
                    goal = Some((x, y));
                }
                _ => {}
            }
        }
    }

    let back_w = backdrop_rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let mut backdrop = TileLayer::new(back_w, backdrop_rows.len());
    for (y, row) in backdrop_rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            if !ch.is_whitespace() {
                backdrop.set(x, y, Tile::Backdrop);
            }
        }
    }

    if name.is_empty() {
        name = "Untitled Stage".to_string();
    }

    Ok(Level {
        name,
        platforms,
        backdrop,
        spawn: spawn.unwrap_or(DEFAULT_SPAWN),
        coins,
        goal,
    })
}

// ══════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════

/// Distinguish `# Stage Name` from `#####   ###` (platform data).
/// A name line starts with `#` and contains at least one letter.
fn is_name_line(line: &str) -> bool {
    line.starts_with('#') && line[1..].chars().any(|c| c.is_alphabetic())
}

/// Drop empty trailing lines. Rows of spaces are sky and are kept.
fn trim_trailing_blank(rows: &mut Vec<&str>) {
    while rows.last().map_or(false, |r| r.is_empty()) {
        rows.pop();
    }
}

/// Bare floor, used only if the embedded stage is broken.
fn fallback_stage() -> Level {
    let mut platforms = TileLayer::new(60, 40);
    for x in 0..60 {
        platforms.set(x, 33, Tile::Ground);
    }
    Level {
        name: "Fallback".to_string(),
        platforms,
        backdrop: TileLayer::new(0, 0),
        spawn: DEFAULT_SPAWN,
        coins: vec![],
        goal: None,
    }
}
