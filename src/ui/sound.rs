/// UI sound cues: short synthesized tones played through rodio.
///
/// Buffers are rendered to in-memory WAV once at startup and replayed
/// fire-and-forget. Without the `sound` feature the engine is a silent stub
/// with the same API.

use crate::sim::event::CourseEvent;

/// Which cue to play.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Pickup,
    GoalOpen,
    LevelClear,
    Notify,
    Menu,
}

/// Cue for a course event, if it has one.
pub fn cue_for(event: &CourseEvent) -> Option<Cue> {
    match event {
        CourseEvent::Collected { .. } => Some(Cue::Pickup),
        CourseEvent::GoalOpened => Some(Cue::GoalOpen),
        CourseEvent::GoalReached => Some(Cue::LevelClear),
        CourseEvent::Rolled { .. } => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use log::{debug, warn};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        pickup: Arc<Vec<u8>>,
        goal_open: Arc<Vec<u8>>,
        level_clear: Arc<Vec<u8>>,
        notify: Arc<Vec<u8>>,
        menu: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output: {e}");
                    return None;
                }
            };
            Some(SoundEngine {
                _stream: stream,
                handle,
                pickup: Arc::new(make_wav(&arpeggio(&[880.0, 1320.0], 0.04, 0.25))),
                goal_open: Arc::new(make_wav(&arpeggio(&[660.0, 880.0, 1100.0], 0.06, 0.25))),
                level_clear: Arc::new(make_wav(&fanfare())),
                notify: Arc::new(make_wav(&blip(740.0, 0.08, 0.2))),
                menu: Arc::new(make_wav(&blip(420.0, 0.04, 0.2))),
            })
        }

        pub fn play(&self, cue: Cue) {
            let buf = match cue {
                Cue::Pickup => &self.pickup,
                Cue::GoalOpen => &self.goal_open,
                Cue::LevelClear => &self.level_clear,
                Cue::Notify => &self.notify,
                Cue::Menu => &self.menu,
            };
            let Ok(sink) = Sink::try_new(&self.handle) else {
                return;
            };
            match Decoder::new(Cursor::new(buf.as_ref().clone())) {
                Ok(src) => {
                    sink.append(src);
                    sink.detach();
                }
                Err(e) => debug!("cue {cue:?} failed to decode: {e}"),
            }
        }
    }

    // ── Waveforms (mono f32) ──

    fn blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    fn arpeggio(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        notes.iter().flat_map(|&f| blip(f, note_dur, volume)).collect()
    }

    fn fanfare() -> Vec<f32> {
        let mut samples = arpeggio(&[523.0, 659.0, 784.0], 0.09, 0.3);
        samples.extend(blip(1047.0, 0.3, 0.3));
        samples
    }

    // ── WAV encoding (16-bit PCM mono) ──

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let data_size = samples.len() as u32 * 2;
        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let wav = make_wav(&blip(440.0, 0.01, 0.5));
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..16], b"WAVEfmt ");
            let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
            assert_eq!(wav.len(), 44 + data_size as usize);
        }
    }
}

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }

    pub fn play(&self, _cue: Cue) {}
}
