/// Sound engine: procedural chiptune effects via rodio.
///
/// Every effect is synthesized into an in-memory WAV buffer at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely (the
/// stub SoundEngine does nothing).

use crate::domain::controller::{JumpKind, RestartReason};
use crate::sim::event::GameEvent;

const SAMPLE_RATE: u32 = 22050;
const TAU: f32 = std::f32::consts::TAU;

/// One sound effect per audible game event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Sfx {
    Jump,
    DoubleJump,
    Coin,
    AllCoins,
    Fall,
    Restart,
    Complete,
}

impl Sfx {
    pub const ALL: [Sfx; 7] = [
        Sfx::Jump, Sfx::DoubleJump, Sfx::Coin, Sfx::AllCoins,
        Sfx::Fall, Sfx::Restart, Sfx::Complete,
    ];

    /// Which effect a game event triggers, if any.
    pub fn for_event(event: &GameEvent) -> Option<Sfx> {
        match event {
            GameEvent::Jumped(JumpKind::Ground) => Some(Sfx::Jump),
            GameEvent::Jumped(JumpKind::Double) => Some(Sfx::DoubleJump),
            GameEvent::CoinCollected { .. } => Some(Sfx::Coin),
            GameEvent::AllCoinsCollected => Some(Sfx::AllCoins),
            GameEvent::LevelRestarted(RestartReason::FellOutOfLevel) => Some(Sfx::Fall),
            GameEvent::LevelRestarted(RestartReason::RestartKey) => Some(Sfx::Restart),
            GameEvent::GoalReached => Some(Sfx::Complete),
            GameEvent::GameRestarted => None,
        }
    }

    /// Mono samples in -1..=1.
    #[cfg_attr(not(feature = "sound"), allow(dead_code))]
    fn samples(self) -> Vec<f32> {
        match self {
            Sfx::Jump => gen_sweep(300.0, 700.0, 0.09, 0.22),
            Sfx::DoubleJump => gen_sweep(500.0, 1100.0, 0.08, 0.22),
            // C6 → E6 → G6
            Sfx::Coin => gen_notes(&[(1047.0, 0.045), (1319.0, 0.045), (1568.0, 0.045)], 0.25),
            // G5, C6
            Sfx::AllCoins => gen_notes(&[(784.0, 0.08), (1047.0, 0.15)], 0.3),
            Sfx::Fall => gen_sweep(600.0, 150.0, 0.3, 0.25),
            // A4 → F#4 → Eb4
            Sfx::Restart => gen_notes(&[(440.0, 0.08), (370.0, 0.08), (311.0, 0.12)], 0.25),
            // C5 → E5 → G5 → C6, held
            Sfx::Complete => gen_notes(
                &[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)],
                0.3,
            ),
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Waveform generators: all produce Vec<f32> mono samples
// ════════════════════════════════════════════════════════════

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn sample_count(duration: f32) -> usize {
    (SAMPLE_RATE as f32 * duration) as usize
}

/// Linear pitch sweep with a fade-out envelope.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_sweep(from_hz: f32, to_hz: f32, duration: f32, volume: f32) -> Vec<f32> {
    let n = sample_count(duration);
    let mut phase = 0.0_f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let freq = from_hz + (to_hz - from_hz) * t;
            phase += freq / SAMPLE_RATE as f32;
            let env = (1.0 - t).powf(0.7);
            // Square-ish (sine + 3rd harmonic) for a retro feel
            ((phase * TAU).sin() * 0.7 + (phase * 3.0 * TAU).sin() * 0.3) * env * volume
        })
        .collect()
}

/// A sequence of (frequency, seconds) notes with per-note decay.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_notes(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
    let mut samples = Vec::new();
    for &(freq, dur) in notes {
        let n = sample_count(dur);
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32).powf(0.5);
            let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
            samples.push(wave * env * volume);
        }
    }
    samples
}

/// Wrap f32 samples into a 16-bit PCM mono WAV buffer.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn make_wav(samples: &[f32]) -> Vec<u8> {
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_size = samples.len() as u32 * 2;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &s in samples {
        let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        buf.extend_from_slice(&val.to_le_bytes());
    }

    buf
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::{make_wav, Sfx};

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Sfx, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("audio output unavailable: {e}");
                    return None;
                }
            };

            let buffers = Sfx::ALL.iter()
                .map(|&sfx| (sfx, Arc::new(make_wav(&sfx.samples()))))
                .collect();

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(&sfx) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

impl SoundEngine {
    /// Play the effect for each event that has one.
    pub fn play_events(&self, events: &[GameEvent]) {
        for sfx in events.iter().filter_map(Sfx::for_event) {
            self.play(sfx);
        }
    }
}
