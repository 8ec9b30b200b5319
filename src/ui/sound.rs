/// Sound effects: short procedural tones played through rodio.
///
/// Every effect is rendered into an in-memory WAV buffer once at start-up
/// and played fire-and-forget. The `sound` setting mutes playback at run
/// time; building without the "sound" feature swaps in a silent stub.

use crate::sim::event::GameEvent;

/// One effect per kind of feedback the player gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sfx {
    Place,
    Note,
    Erase,
    Undo,
    Hint,
    Error,
    Valid,
    Win,
    Start,
}

/// Which effect, if any, accompanies an event.
pub fn sfx_for(event: &GameEvent) -> Option<Sfx> {
    match event {
        GameEvent::GameStarted => Some(Sfx::Start),
        GameEvent::DigitPlaced { .. } => Some(Sfx::Place),
        GameEvent::DigitCleared { .. } => Some(Sfx::Erase),
        GameEvent::NoteToggled { .. } => Some(Sfx::Note),
        GameEvent::MoveUndone | GameEvent::MoveRedone => Some(Sfx::Undo),
        GameEvent::HintApplied { .. } => Some(Sfx::Hint),
        GameEvent::ConflictsFound { .. } | GameEvent::RequestFailed => Some(Sfx::Error),
        GameEvent::SolutionValid => Some(Sfx::Valid),
        GameEvent::PuzzleSolved => Some(Sfx::Win),
        GameEvent::SettingsSaved(_) => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Sfx, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::info!(error = %err, "no audio output, sound disabled");
                    return None;
                }
            };

            let buffers = [
                Sfx::Place,
                Sfx::Note,
                Sfx::Erase,
                Sfx::Undo,
                Sfx::Hint,
                Sfx::Error,
                Sfx::Valid,
                Sfx::Win,
                Sfx::Start,
            ]
            .into_iter()
            .map(|sfx| (sfx, Arc::new(make_wav(&render(sfx)))))
            .collect();

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(&sfx) else { return };
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            match rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                Ok(src) => {
                    sink.append(src);
                    sink.detach();
                }
                Err(err) => tracing::debug!(error = %err, ?sfx, "sound decode failed"),
            }
        }
    }

    // ── Synthesis ──

    /// Sine with a touch of second harmonic, faded out linearly.
    fn tone(freq: f32, secs: f32, volume: f32) -> impl Iterator<Item = f32> {
        let n = (SAMPLE_RATE as f32 * secs) as usize;
        (0..n).map(move |i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let fade = 1.0 - i as f32 / n as f32;
            let wave = (t * freq * TAU).sin() * 0.8 + (t * freq * 2.0 * TAU).sin() * 0.2;
            wave * fade * volume
        })
    }

    /// Linear pitch sweep.
    fn sweep(from: f32, to: f32, secs: f32, volume: f32) -> impl Iterator<Item = f32> {
        let n = (SAMPLE_RATE as f32 * secs) as usize;
        let mut phase = 0.0f32;
        (0..n).map(move |i| {
            let k = i as f32 / n as f32;
            phase += (from + (to - from) * k) / SAMPLE_RATE as f32;
            (phase * TAU).sin() * (1.0 - k) * volume
        })
    }

    fn melody(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        notes
            .iter()
            .flat_map(|&(freq, secs)| tone(freq, secs, volume))
            .collect()
    }

    pub(super) fn render(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Place => tone(880.0, 0.05, 0.25).collect(),
            Sfx::Note => tone(1568.0, 0.03, 0.15).collect(),
            Sfx::Erase => sweep(700.0, 350.0, 0.07, 0.2).collect(),
            Sfx::Undo => sweep(500.0, 800.0, 0.06, 0.18).collect(),
            Sfx::Hint => melody(&[(784.0, 0.06), (988.0, 0.06), (1319.0, 0.12)], 0.22),
            Sfx::Error => melody(&[(220.0, 0.09), (185.0, 0.14)], 0.3),
            Sfx::Valid => melody(&[(659.0, 0.07), (988.0, 0.12)], 0.22),
            Sfx::Start => melody(&[(523.0, 0.06), (784.0, 0.1)], 0.2),
            Sfx::Win => {
                let mut s = melody(
                    &[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.1)],
                    0.28,
                );
                s.extend(tone(1047.0, 0.3, 0.28));
                s
            }
        }
    }

    /// 16-bit mono PCM WAV.
    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_len = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_len as usize);
        let mut put = |bytes: &[u8]| buf.extend_from_slice(bytes);

        put(b"RIFF");
        put(&(36 + data_len).to_le_bytes());
        put(b"WAVE");
        put(b"fmt ");
        put(&16u32.to_le_bytes());
        put(&1u16.to_le_bytes());
        put(&CHANNELS.to_le_bytes());
        put(&SAMPLE_RATE.to_le_bytes());
        put(&byte_rate.to_le_bytes());
        put(&block_align.to_le_bytes());
        put(&BITS.to_le_bytes());
        put(b"data");
        put(&data_len.to_le_bytes());
        for &s in samples {
            put(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
        }

        buf
    }
}

// ── Public API: no-ops when the sound feature is off ──

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
    /// Play the effects for a frame's events unless muted.
    pub fn react(&self, events: &[GameEvent], enabled: bool) {
        if !enabled {
            return;
        }
        for sfx in events.iter().filter_map(sfx_for) {
            self.play(sfx);
        }
    }
}
