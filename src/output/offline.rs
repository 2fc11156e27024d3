use std::sync::Arc;

use parking_lot::Mutex;

use super::{AudioBackend, AudioClock, BackendOptions};
use crate::Result;
use crate::audio::{Mixer, Voice};

struct OfflineState {
    mixer: Mixer,
    submitted: Vec<Voice>,
    closed: bool,
}

/// Headless backend whose clock only moves when [`OfflineOutput::render`]
/// is called.
///
/// Clones share the same clock and mixer, so one clone can be handed to an
/// [`Output`](super::Output) while another inspects what was played.
#[derive(Clone)]
pub struct OfflineOutput {
    clock: AudioClock,
    state: Arc<Mutex<OfflineState>>,
}

impl OfflineOutput {
    pub fn new(sample_rate: f64, options: &BackendOptions) -> Self {
        Self {
            clock: AudioClock::new(sample_rate),
            state: Arc::new(Mutex::new(OfflineState {
                mixer: Mixer::new(sample_rate, options.mix.clone(), options.voice_queue_capacity),
                submitted: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Render `seconds` of mono audio and move the clock forward by as much.
    pub fn render(&self, seconds: f64) -> Vec<f32> {
        let frames = (seconds * self.clock.sample_rate()).round() as usize;
        let mut buffer = vec![0.0; frames];

        let mut state = self.state.lock();
        if !state.closed {
            state.mixer.render(&mut buffer, 1, self.clock.frame());
        }
        self.clock.advance(frames as u64);

        buffer
    }

    /// Every voice submitted so far, in submission order.
    pub fn submitted(&self) -> Vec<Voice> {
        self.state.lock().submitted.clone()
    }

    pub fn active_voices(&self) -> usize {
        self.state.lock().mixer.active_voices()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl AudioBackend for OfflineOutput {
    fn clock(&self) -> AudioClock {
        self.clock.clone()
    }

    fn submit(&mut self, voice: Voice) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.submitted.push(voice.clone());
        state.mixer.add(voice);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.mixer.clear();
        state.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{InstrumentBank, MixSettings, Synth, shared_settings};

    fn offline() -> OfflineOutput {
        let options = BackendOptions {
            mix: shared_settings(MixSettings::default()),
            voice_queue_capacity: 16,
        };
        OfflineOutput::new(8000.0, &options)
    }

    #[test]
    fn render_moves_the_clock() {
        let out = offline();
        assert_eq!(out.clock().now(), 0.0);
        let buffer = out.render(0.5);
        assert_eq!(buffer.len(), 4000);
        assert_eq!(out.clock().now(), 0.5);
    }

    #[test]
    fn submitted_voices_are_heard_at_their_start() {
        let mut out = offline();
        let bank = InstrumentBank::builtin().unwrap();
        let voice = Synth::default().voice(440.0, bank.lookup("chiptune_square"), 0.25, 0.2);
        out.submit(voice).unwrap();

        let before = out.render(0.25);
        assert!(before.iter().all(|&s| s == 0.0));
        let during = out.render(0.2);
        assert!(during.iter().any(|&s| s.abs() > 0.01));
        assert_eq!(out.submitted().len(), 1);
    }

    #[test]
    fn closing_cuts_and_ignores_new_voices() {
        let mut out = offline();
        let bank = InstrumentBank::builtin().unwrap();
        let synth = Synth::default();
        out.submit(synth.voice(440.0, bank.default_instrument(), 0.0, 1.0)).unwrap();

        out.close();
        assert!(out.is_closed());
        assert_eq!(out.active_voices(), 0);

        out.submit(synth.voice(440.0, bank.default_instrument(), 0.0, 1.0)).unwrap();
        assert_eq!(out.active_voices(), 0);
        assert!(out.render(0.1).iter().all(|&s| s == 0.0));
    }
}
