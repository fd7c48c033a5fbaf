/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// One map cell is two terminal columns. The camera decides which world
/// pixel each cell samples; the backdrop layer is sampled at half scroll
/// speed and drawn dimmed behind the platforms.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::anim::Anim;
use crate::domain::tile::{Tile, TILE_SIZE};
use crate::sim::scene::{EndScene, PlatformerScene, Scene, SceneContext, SceneKey};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = continuation of previous wide char (skip render)
}

impl Cell {
    /// Explicit background for every "empty" terminal cell, so the
    /// inter-row gap color matches the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 24 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 4],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    /// Normalize bg: Color::Reset → BASE_BG (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::from_char(c, fg, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Horizontally centered string.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }

    /// One map cell: two terminal columns.
    fn put_pair(&mut self, col: usize, row: usize, (c0, c1): (char, char), fg: Color, bg: Color) {
        self.set(col, row, Cell::from_char(c0, fg, bg));
        self.set(col + 1, row, Cell::from_char(c1, fg, bg));
    }
}

// ── Renderer ──

/// Each map cell = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, gap + help below it.
const RESERVED_ROWS: usize = MAP_ROW + 2;

/// Backdrop layer parallax.
const BACKDROP_SCROLL: f32 = 0.5;
const BACKDROP_OFFSET_Y: f32 = 50.0;

const HUD_BG: Color = Color::Rgb { r: 40, g: 40, b: 48 };
const PLAYER_FG: Color = Color::Rgb { r: 250, g: 250, b: 250 };
const COIN_FG: Color = Color::Rgb { r: 255, g: 210, b: 60 };
const FLAG_FG: Color = Color::Rgb { r: 120, g: 230, b: 120 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_scene: Option<SceneKey>,
    key_release_enabled: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_scene: None,
            key_release_enabled: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// Ask the terminal to report key Release events. Returns whether it
    /// will; without them, held keys are tracked by timeout.
    pub fn enable_key_release(&mut self) -> bool {
        if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
            log::info!("terminal has no key release events; using hold timeout");
            return false;
        }
        let flags = KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
        self.key_release_enabled =
            execute!(self.writer, PushKeyboardEnhancementFlags(flags)).is_ok();
        self.key_release_enabled
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release_enabled {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Map viewport in cells for the current terminal size.
    fn view_cells(&self) -> (usize, usize) {
        (self.term_w / CELL_W, self.term_h.saturating_sub(RESERVED_ROWS).max(1))
    }

    pub fn render(&mut self, scene: &mut Scene, ctx: &SceneContext) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.invalidate()?;
        }

        // Scene switch → clear for clean transition
        if self.last_scene != Some(scene.key()) {
            self.invalidate()?;
            self.last_scene = Some(scene.key());
        }

        self.front.clear();

        match scene {
            Scene::Platformer(s) => {
                let (cols, rows) = self.view_cells();
                s.set_viewport(cols, rows);
                self.compose_platformer(s, ctx);
            }
            Scene::End(s) => self.compose_end(s),
        }

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn invalidate(&mut self) -> io::Result<()> {
        self.back.cells.fill(Cell::INVALID);
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: platformer ──

    fn compose_platformer(&mut self, s: &PlatformerScene, ctx: &SceneContext) {
        let buf_w = self.front.width;
        let (cols, rows) = self.view_cells();
        let level = &ctx.level;

        // ── HUD row ──
        let jump = if s.player.can_double_jump() { "ready" } else { "used" };
        let hud = format!(
            " {}   Coins {}/{}   Double jump: {} ",
            level.name, s.coins_collected(), s.coins_total, jump,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Tiles: platforms over the parallax backdrop ──
        let cam = &s.camera;
        for vy in 0..rows {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cols {
                let col = vx * CELL_W;
                if col + 1 >= buf_w { break; }

                let (wx, wy) = cam.cell_to_world(vx, vy, 1.0);
                if wx < 0.0 || wy < 0.0 || wx >= level.width_px() || wy >= level.height_px() {
                    continue; // void
                }
                let tile = level.platforms.get(tile_index(wx), tile_index(wy));
                if tile.is_visible() {
                    let (glyph, fg, bg) = tile_style(tile);
                    self.front.put_pair(col, row, glyph, fg, bg);
                    continue;
                }
                let (bx, by) = cam.cell_to_world(vx, vy, BACKDROP_SCROLL);
                let back = level.backdrop.get(tile_index(bx), tile_index(by - BACKDROP_OFFSET_Y));
                if back.is_visible() {
                    let (glyph, fg, bg) = tile_style(back);
                    self.front.put_pair(col, row, glyph, fg, bg);
                }
            }
        }

        // ── Objects ──
        let half = TILE_SIZE / 2.0;
        if let Some(goal) = &s.goal {
            if let Some((vx, vy)) = cam.world_to_cell(goal.x + half, goal.y + half) {
                self.put_map_wide(vx, vy, '🏁');
            }
        }
        for coin in &s.coins {
            if let Some((vx, vy)) = cam.world_to_cell(coin.body.x + half, coin.body.y + half) {
                self.put_map_pair(vx, vy, ('(', ')'), COIN_FG);
            }
        }

        // ── Particles (behind the player) ──
        for emitter in [&s.walking, &s.jumping] {
            for p in emitter.particles() {
                if let Some((vx, vy)) = cam.world_to_cell(p.x, p.y) {
                    let fg = fade(emitter.alpha_of(p));
                    let glyph = if emitter.scale_of(p) < 0.05 { '·' } else { p.glyph };
                    let col = vx * CELL_W;
                    let row = MAP_ROW + vy;
                    let bg = self.front.get(col, row).bg;
                    self.front.set(col, row, Cell::from_char(glyph, fg, bg));
                }
            }
        }

        // ── Player ──
        let (px, py) = s.body.center();
        if let Some((vx, vy)) = cam.world_to_cell(px, py) {
            let glyph = player_glyph(s.flip_x, s.animator.current(), s.animator.frame());
            self.put_map_pair(vx, vy, glyph, PLAYER_FG);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + rows + 1;
        if help_row < self.front.height {
            let help = " ←→/AD Walk   ↑/W/Space Jump (twice in air)   R Restart   Esc Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Draw a two-column glyph in map cell (vx, vy), keeping the tile bg.
    fn put_map_pair(&mut self, vx: usize, vy: usize, glyph: (char, char), fg: Color) {
        let col = vx * CELL_W;
        let row = MAP_ROW + vy;
        if col + 1 >= self.front.width { return; }
        let bg = self.front.get(col, row).bg;
        self.front.put_pair(col, row, glyph, fg, bg);
    }

    fn put_map_wide(&mut self, vx: usize, vy: usize, ch: char) {
        let col = vx * CELL_W;
        let row = MAP_ROW + vy;
        if col + 1 >= self.front.width { return; }
        self.front.set(col, row, Cell::from_char_wide(ch, FLAG_FG, Color::Reset));
        self.front.set(col + 1, row, Cell::WIDE_CONT);
    }

    // ── Compose: completion screen ──

    fn compose_end(&mut self, e: &EndScene) {
        let h = self.front.height;
        let title_row = h / 3;
        let title_fg = Color::Rgb { r: 255, g: 220, b: 50 };
        self.front.put_centered(title_row, e.title, title_fg, Color::Reset);
        self.front.put_centered(title_row + 3, e.prompt, Color::White, Color::Reset);
        if title_row + 5 < h {
            self.front.put_centered(title_row + 5, "Esc: Quit", Color::DarkGrey, Color::Reset);
        }
    }
}

#[inline]
fn tile_index(v: f32) -> i32 {
    (v / TILE_SIZE).floor() as i32
}

const fn grey(v: u8) -> Color {
    Color::Rgb { r: v, g: v, b: v }
}

/// (glyph pair, fg, bg) for a visible tile.
fn tile_style(tile: Tile) -> ((char, char), Color, Color) {
    match tile {
        Tile::Ground     => (('█', '█'), grey(200), grey(120)),
        Tile::Brick      => (('▓', '▓'), grey(170), grey(90)),
        Tile::Decoration => (('"', '"'), grey(150), Color::Reset),
        Tile::Backdrop   => (('░', '░'), Color::Rgb { r: 55, g: 55, b: 65 }, Color::Reset),
        Tile::Empty      => ((' ', ' '), Color::White, Color::Reset),
    }
}

/// The art faces left; `flip_x` mirrors it.
fn player_glyph(flip_x: bool, anim: Anim, frame: usize) -> (char, char) {
    let (head, feet) = match (anim, frame % anim.frame_count()) {
        (Anim::Jump, _) => ('▲', '▲'),
        (Anim::Walk, 1) => ('◆', '◆'),
        _ => ('■', '■'),
    };
    if flip_x { (feet, '▶') } else { ('◀', head) }
}

/// Grey level for a particle alpha in 0..=1.
fn fade(alpha: f32) -> Color {
    grey((alpha.clamp(0.0, 1.0) * 255.0) as u8)
}
