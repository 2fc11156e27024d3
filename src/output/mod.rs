//! Audio output backends and the lazily opened output slot.
//!
//! The control thread talks to a backend only through [`AudioBackend`]: it
//! reads the audio clock and hands over finished voices. Everything after
//! that happens on the backend's own timeline.

mod device;
mod offline;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

use crate::audio::{SharedMixSettings, Voice};
use crate::timing::Scheduler;
use crate::Result;

pub use device::DeviceOutput;
pub use offline::OfflineOutput;

/// Read-only view of an audio clock: frames rendered so far.
#[derive(Debug, Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Seconds since the backend started.
    pub fn now(&self) -> f64 {
        self.frame() as f64 / self.sample_rate
    }

    pub fn frame(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Relaxed);
    }
}

pub trait AudioBackend {
    fn clock(&self) -> AudioClock;

    /// Hand a voice to the audio thread. It plays at its own start time.
    fn submit(&mut self, voice: Voice) -> Result<()>;

    /// Stop producing sound; voices still queued or ringing are cut.
    fn close(&mut self);
}

#[derive(Clone)]
pub struct BackendOptions {
    pub mix: SharedMixSettings,
    pub voice_queue_capacity: usize,
}

pub type BackendOpener = Box<dyn FnMut(&BackendOptions) -> Result<Box<dyn AudioBackend>> + Send>;

struct Live {
    backend: Box<dyn AudioBackend>,
    scheduler: Scheduler,
}

enum OutputState {
    Pending,
    Live(Live),
    Unavailable,
    Closed,
}

/// Output slot that opens its backend on first use.
///
/// A failed open is logged once and then the slot stays a no-op forever.
/// The melodic lane's scheduler is created together with the backend and
/// lives exactly as long as it does.
pub struct Output {
    state: OutputState,
    opener: BackendOpener,
    options: BackendOptions,
}

impl Output {
    pub fn lazy(opener: BackendOpener, options: BackendOptions) -> Self {
        Self {
            state: OutputState::Pending,
            opener,
            options,
        }
    }

    /// Open the default output device on first use.
    pub fn device(options: BackendOptions) -> Self {
        Self::lazy(
            Box::new(|options: &BackendOptions| -> Result<Box<dyn AudioBackend>> {
                let backend = DeviceOutput::open(options)?;
                Ok(Box::new(backend) as Box<dyn AudioBackend>)
            }),
            options,
        )
    }

    fn live(&mut self) -> Option<&mut Live> {
        if matches!(self.state, OutputState::Pending) {
            self.state = match (self.opener)(&self.options) {
                Ok(backend) => {
                    let clock = backend.clock();
                    info!("Audio output ready at {} Hz", clock.sample_rate());
                    OutputState::Live(Live {
                        scheduler: Scheduler::new(clock.now()),
                        backend,
                    })
                }
                Err(e) => {
                    warn!("Audio output unavailable, sound is disabled: {}", e);
                    OutputState::Unavailable
                }
            };
        }

        match &mut self.state {
            OutputState::Live(live) => Some(live),
            _ => None,
        }
    }

    /// Opens the backend if needed. `false` once it is known to be missing.
    pub fn ensure_open(&mut self) -> bool {
        self.live().is_some()
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, OutputState::Live(_))
    }

    /// Clock of the live backend, without opening one.
    pub fn clock(&self) -> Option<AudioClock> {
        match &self.state {
            OutputState::Live(live) => Some(live.backend.clock()),
            _ => None,
        }
    }

    pub fn now(&mut self) -> Option<f64> {
        self.live().map(|live| live.backend.clock().now())
    }

    /// Reserve the next melodic slot, or `None` when there is no backend.
    pub fn reserve_slot(&mut self, tempo: f64) -> Option<f64> {
        let live = self.live()?;
        let now = live.backend.clock().now();
        Some(live.scheduler.reserve_slot(now, tempo))
    }

    pub fn submit(&mut self, voice: Voice) -> Result<()> {
        match self.live() {
            Some(live) => live.backend.submit(voice),
            None => Ok(()),
        }
    }

    /// Tear the backend down. Safe to call any number of times.
    pub fn close(&mut self) {
        if let OutputState::Live(live) = &mut self.state {
            live.backend.close();
            info!("Audio output closed");
        }
        self.state = OutputState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::audio::{InstrumentBank, MixSettings, Synth, shared_settings};
    use std::sync::atomic::AtomicUsize;

    fn beep() -> Voice {
        let bank = InstrumentBank::builtin().unwrap();
        Synth::default().voice(440.0, bank.default_instrument(), 0.0, 0.5)
    }

    fn offline_opener(offline: OfflineOutput) -> BackendOpener {
        Box::new(move |_: &BackendOptions| -> Result<Box<dyn AudioBackend>> {
            Ok(Box::new(offline.clone()))
        })
    }

    fn options() -> BackendOptions {
        BackendOptions {
            mix: shared_settings(MixSettings::default()),
            voice_queue_capacity: 16,
        }
    }

    #[test]
    fn opens_once_on_first_use() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = opens.clone();
        let offline = OfflineOutput::new(1000.0, &options());

        let mut output = Output::lazy(
            Box::new(move |_: &BackendOptions| -> Result<Box<dyn AudioBackend>> {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(Box::new(offline.clone()) as Box<dyn AudioBackend>)
            }),
            options(),
        );

        assert!(!output.is_live());
        assert!(output.clock().is_none());
        assert_eq!(output.reserve_slot(120.0), Some(0.0));
        assert_eq!(output.reserve_slot(120.0), Some(0.5));
        assert!(output.ensure_open());
        assert_eq!(opens.load(Ordering::Relaxed), 1);
        assert!(output.clock().is_some());
    }

    #[test]
    fn failed_open_is_permanent() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = opens.clone();
        let mut output = Output::lazy(
            Box::new(move |_: &BackendOptions| -> Result<Box<dyn AudioBackend>> {
                counter.fetch_add(1, Ordering::Relaxed);
                Err(Error::NoOutputDevice)
            }),
            options(),
        );

        assert_eq!(output.reserve_slot(120.0), None);
        assert_eq!(output.now(), None);
        assert!(!output.ensure_open());
        assert!(output.submit(beep()).is_ok());
        assert_eq!(opens.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let offline = OfflineOutput::new(1000.0, &options());
        let probe = offline.clone();
        let mut output = Output::lazy(
            offline_opener(offline),
            options(),
        );

        output.submit(beep()).unwrap();
        assert_eq!(probe.active_voices(), 1);

        output.close();
        output.close();
        assert_eq!(probe.active_voices(), 0);
        assert_eq!(output.reserve_slot(120.0), None);
        assert!(!output.ensure_open());
    }

    #[test]
    fn cursor_starts_at_clock_time_when_opened() {
        let offline = OfflineOutput::new(1000.0, &options());
        offline.render(2.0);
        let mut output = Output::lazy(
            offline_opener(offline),
            options(),
        );
        assert_eq!(output.reserve_slot(120.0), Some(2.0));
    }
}
