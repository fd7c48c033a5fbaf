/// Keyboard state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous walking while Left/Right is held
///   - Edge-triggered jump and restart (only fire on the initial press)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it;
/// there, a second press after a pause longer than the auto-repeat interval
/// still counts as a new press.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Auto-repeat events arrive well inside this gap. A Press on a held key
/// after a longer silence is a second tap (a quick double jump), not a
/// repeat. Only used when the terminal doesn't report Release events.
const RETAP_GAP: Duration = Duration::from_millis(90);

pub const LEFT_KEYS: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const RIGHT_KEYS: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const JUMP_KEYS: &[KeyCode] = &[
    KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char(' '),
];
pub const RESTART_KEYS: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const QUIT_KEYS: &[KeyCode] = &[KeyCode::Esc];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for Ctrl-C detection.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per loop iteration, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.handle_key(key, Instant::now());
            }
        }

        self.expire(Instant::now());
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, releases are unreliable; rely on expiry.
            KeyEventKind::Release => {}
            _ => {
                let fresh = match self.last_active.get(&key.code) {
                    Some(&t) if self.is_held_at(key.code, now) => {
                        !self.honor_release && now.duration_since(t) >= RETAP_GAP
                    }
                    _ => true,
                };
                self.last_active.insert(key.code, now);
                if fresh {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Drop keys that have timed out (fallback for terminals without Release).
    fn expire(&mut self, now: Instant) {
        if self.honor_release {
            return;
        }
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Is any of these keys held?
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        let now = Instant::now();
        codes.iter().any(|c| self.is_held_at(*c, now))
    }

    /// Was any of these keys freshly pressed this drain? (edge trigger)
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn left_held(&self) -> bool { self.any_held(LEFT_KEYS) }
    pub fn right_held(&self) -> bool { self.any_held(RIGHT_KEYS) }
    pub fn jump_pressed(&self) -> bool { self.any_pressed(JUMP_KEYS) }
    pub fn restart_pressed(&self) -> bool { self.any_pressed(RESTART_KEYS) }

    pub fn quit_pressed(&self) -> bool {
        self.any_pressed(QUIT_KEYS) || self.ctrl_c_pressed()
    }

    /// Check if any raw event this drain has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map(|t| self.honor_release || now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn release(code: KeyCode) -> KeyEvent {
        let mut k = KeyEvent::new(code, KeyModifiers::NONE);
        k.kind = KeyEventKind::Release;
        k
    }

    #[test]
    fn first_press_is_fresh_repeat_is_not() {
        let mut kb = InputState::new();
        let t0 = Instant::now();
        kb.handle_key(press(KeyCode::Char(' ')), t0);
        assert!(kb.jump_pressed());
        assert!(kb.any_held(JUMP_KEYS));

        kb.fresh_presses.clear();
        kb.handle_key(press(KeyCode::Char(' ')), t0 + Duration::from_millis(30));
        assert!(!kb.jump_pressed());
    }

    #[test]
    fn quick_second_tap_is_a_fresh_press() {
        let mut kb = InputState::new();
        let t0 = Instant::now();
        kb.handle_key(press(KeyCode::Up), t0);
        kb.fresh_presses.clear();

        // Inside the hold window, but after a gap no auto-repeat leaves.
        kb.handle_key(press(KeyCode::Up), t0 + Duration::from_millis(120));
        assert!(kb.jump_pressed());

        // With real release events a Press on a held key is never a tap.
        let mut kb = InputState::new();
        kb.honor_release = true;
        kb.handle_key(press(KeyCode::Up), t0);
        kb.fresh_presses.clear();
        kb.handle_key(press(KeyCode::Up), t0 + Duration::from_millis(120));
        assert!(!kb.jump_pressed());
    }

    #[test]
    fn keys_expire_without_release_events() {
        let mut kb = InputState::new();
        let t0 = Instant::now();
        kb.handle_key(press(KeyCode::Left), t0);
        kb.expire(t0 + HOLD_TIMEOUT + Duration::from_millis(1));
        assert!(kb.last_active.is_empty());

        // With real release events a held key never times out.
        kb.honor_release = true;
        kb.handle_key(press(KeyCode::Left), t0);
        kb.expire(t0 + HOLD_TIMEOUT * 10);
        assert!(kb.left_held());
    }

    #[test]
    fn release_honored_only_with_enhancement() {
        let mut kb = InputState::new();
        let t0 = Instant::now();
        kb.handle_key(press(KeyCode::Right), t0);
        kb.handle_key(release(KeyCode::Right), t0);
        assert!(kb.last_active.contains_key(&KeyCode::Right));

        kb.honor_release = true;
        kb.handle_key(release(KeyCode::Right), t0);
        assert!(!kb.last_active.contains_key(&KeyCode::Right));
    }

    #[test]
    fn ctrl_c_quits() {
        let mut kb = InputState::new();
        kb.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(kb.quit_pressed());
        let mut kb = InputState::new();
        kb.handle_key(press(KeyCode::Char('c')), Instant::now());
        assert!(!kb.quit_pressed());
    }
}
