/// Particle emitters for the walking dust and the jump burst.
///
/// An emitter flows one particle per update while running, capped by
/// `max_alive`. It can follow a target with a fixed offset and may stop
/// itself after `duration` seconds. Stopping never kills live particles;
/// they fade out over their lifespan.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

#[derive(Clone, Debug)]
pub struct EmitterConfig {
    /// Glyphs a particle may use.
    pub frames: Vec<char>,
    /// Pick a random frame per particle instead of cycling.
    pub random: bool,
    pub scale: (f32, f32),
    pub alpha: (f32, f32),
    pub max_alive: usize,
    /// Seconds.
    pub lifespan: f32,
    /// Pixels per second squared; negative floats upward.
    pub gravity_y: f32,
    /// Seconds of emission after `start`, or unbounded.
    pub duration: Option<f32>,
}

impl EmitterConfig {
    /// Star-shaped dust kicked up while walking on the ground.
    pub fn walking() -> Self {
        EmitterConfig {
            frames: vec!['.', '*', '+', 'x'],
            random: true,
            scale: (0.01, 0.15),
            alpha: (1.0, 0.1),
            max_alive: 10,
            lifespan: 0.25,
            gravity_y: -300.0,
            duration: None,
        }
    }

    /// A single slash under the feet on every jump.
    pub fn jumping() -> Self {
        EmitterConfig {
            frames: vec!['/', '\\'],
            random: true,
            scale: (0.1, 0.2),
            alpha: (1.0, 0.1),
            max_alive: 1,
            lifespan: 0.15,
            gravity_y: 400.0,
            duration: Some(0.15),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub age: f32,
    pub lifespan: f32,
    pub glyph: char,
}

impl Particle {
    /// 0.0 at birth, 1.0 at death.
    pub fn progress(&self) -> f32 {
        if self.lifespan <= 0.0 { return 1.0; }
        (self.age / self.lifespan).clamp(0.0, 1.0)
    }
}

fn lerp((a, b): (f32, f32), t: f32) -> f32 {
    a + (b - a) * t
}

pub struct Emitter {
    config: EmitterConfig,
    running: bool,
    elapsed: f32,
    follow: Option<(f32, f32)>,
    speed: (f32, f32),
    pub x: f32,
    pub y: f32,
    particles: Vec<Particle>,
    next_frame: usize,
    rng: Pcg32,
}

impl Emitter {
    pub fn new(config: EmitterConfig, seed: u64) -> Self {
        Emitter {
            particles: Vec::with_capacity(config.max_alive),
            config,
            running: false,
            elapsed: 0.0,
            follow: None,
            speed: (0.0, 0.0),
            x: 0.0,
            y: 0.0,
            next_frame: 0,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.elapsed = 0.0;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Track a target; `offset` is added to the target position each update.
    pub fn start_follow(&mut self, offset_x: f32, offset_y: f32) {
        self.follow = Some((offset_x, offset_y));
    }

    pub fn set_particle_speed(&mut self, x: f32, y: f32) {
        self.speed = (x, y);
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn alpha_of(&self, p: &Particle) -> f32 {
        lerp(self.config.alpha, p.progress())
    }

    pub fn scale_of(&self, p: &Particle) -> f32 {
        lerp(self.config.scale, p.progress())
    }

    /// Advance by `dt` seconds. `target` is the followed sprite's center.
    pub fn update(&mut self, dt: f32, target: (f32, f32)) {
        if let Some((ox, oy)) = self.follow {
            self.x = target.0 + ox;
            self.y = target.1 + oy;
        }

        let gravity = self.config.gravity_y;
        for p in &mut self.particles {
            p.age += dt;
            p.vy += gravity * dt;
            p.x += p.vx * dt;
            p.y += p.vy * dt;
        }
        self.particles.retain(|p| p.age < p.lifespan);

        if !self.running {
            return;
        }
        self.elapsed += dt;
        if let Some(limit) = self.config.duration {
            if self.elapsed > limit {
                self.running = false;
                return;
            }
        }
        if self.particles.len() < self.config.max_alive {
            self.emit();
        }
    }

    fn emit(&mut self) {
        let frames = &self.config.frames;
        if frames.is_empty() {
            return;
        }
        let idx = if self.config.random {
            self.rng.random_range(0..frames.len())
        } else {
            let i = self.next_frame % frames.len();
            self.next_frame = self.next_frame.wrapping_add(1);
            i
        };
        self.particles.push(Particle {
            x: self.x,
            y: self.y,
            vx: self.speed.0,
            vy: self.speed.1,
            age: 0.0,
            lifespan: self.config.lifespan,
            glyph: frames[idx],
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn stopped_emitter_emits_nothing() {
        let mut e = Emitter::new(EmitterConfig::walking(), 1);
        for _ in 0..10 {
            e.update(DT, (0.0, 0.0));
        }
        assert!(e.particles().is_empty());
    }

    #[test]
    fn walking_dust_caps_at_max_alive() {
        let mut e = Emitter::new(EmitterConfig::walking(), 1);
        e.start();
        let mut peak = 0;
        for _ in 0..60 {
            e.update(DT, (100.0, 100.0));
            peak = peak.max(e.particles().len());
        }
        assert!(peak <= 10);
        assert!(peak > 1);
        assert!(e.particles().iter().all(|p| ".*+x".contains(p.glyph)));
    }

    #[test]
    fn dust_floats_up() {
        let mut e = Emitter::new(EmitterConfig::walking(), 7);
        e.start();
        e.update(DT, (0.0, 0.0));
        e.stop();
        for _ in 0..5 {
            e.update(DT, (0.0, 0.0));
        }
        assert!(e.particles()[0].y < 0.0);
    }

    #[test]
    fn particles_expire_after_stop() {
        let mut e = Emitter::new(EmitterConfig::walking(), 1);
        e.start();
        for _ in 0..5 {
            e.update(DT, (0.0, 0.0));
        }
        e.stop();
        assert!(!e.particles().is_empty());
        for _ in 0..20 {
            e.update(DT, (0.0, 0.0));
        }
        assert!(e.particles().is_empty());
    }

    #[test]
    fn jump_burst_stops_after_duration() {
        let mut e = Emitter::new(EmitterConfig::jumping(), 3);
        e.start();
        e.update(DT, (0.0, 0.0));
        assert_eq!(e.particles().len(), 1);
        for _ in 0..12 {
            e.update(DT, (0.0, 0.0));
            assert!(e.particles().len() <= 1);
        }
        assert!(!e.is_running());
    }

    #[test]
    fn follow_applies_offset() {
        let mut e = Emitter::new(EmitterConfig::jumping(), 3);
        e.start_follow(8.0, 3.0);
        e.start();
        e.update(DT, (40.0, 60.0));
        assert_eq!((e.x, e.y), (48.0, 63.0));
        let p = &e.particles()[0];
        assert_eq!((p.x, p.y), (48.0, 63.0));
    }

    #[test]
    fn alpha_fades_over_life() {
        let mut e = Emitter::new(EmitterConfig::walking(), 1);
        e.start();
        e.update(DT, (0.0, 0.0));
        let fresh = e.alpha_of(&e.particles()[0]);
        e.stop();
        for _ in 0..10 {
            e.update(DT, (0.0, 0.0));
        }
        let old = e.alpha_of(&e.particles()[0]);
        assert!(fresh > old);
        assert!(e.scale_of(&e.particles()[0]) > 0.01);
    }
}
