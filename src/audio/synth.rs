use super::{Instrument, Oscillator, Voice};

/// Fraction of the release time used as the fade's time constant.
/// Below 1.0 the tail dies away faster than the nominal release suggests.
pub const DEFAULT_RELEASE_TIME_SCALE: f64 = 0.5;

/// Oscillators keep running this many release times past the note end so
/// the fade reaches silence before they are cut.
pub const STOP_MARGIN_RELEASES: f64 = 2.0;

/// Turns a resolved frequency and an instrument into a scheduled voice.
#[derive(Debug, Clone, Copy)]
pub struct Synth {
    pub release_time_scale: f64,
}

impl Default for Synth {
    fn default() -> Self {
        Self {
            release_time_scale: DEFAULT_RELEASE_TIME_SCALE,
        }
    }
}

impl Synth {
    pub fn new(release_time_scale: f64) -> Self {
        Self { release_time_scale }
    }

    /// When the note stops holding and starts to fade.
    ///
    /// One-shot instruments ignore `requested_duration`: their length is
    /// attack + decay. A negative or non-finite request counts as zero, so the
    /// note end is finite whenever `start` is.
    pub fn note_end(instrument: &Instrument, start: f64, requested_duration: f64) -> f64 {
        if instrument.rhythmic {
            let duration = if requested_duration.is_finite() {
                requested_duration.max(0.0)
            } else {
                0.0
            };
            start + duration
        } else {
            start + instrument.envelope.attack + instrument.envelope.decay
        }
    }

    pub fn voice(
        &self,
        frequency: f64,
        instrument: &Instrument,
        start: f64,
        requested_duration: f64,
    ) -> Voice {
        let envelope = instrument.envelope;
        let note_end = Self::note_end(instrument, start, requested_duration);

        let layers = instrument
            .layers
            .iter()
            .map(|layer| Oscillator::new(layer.wave, layer.frequency(frequency), layer.gain))
            .collect();

        Voice {
            start,
            note_end,
            stop_at: note_end + envelope.release * STOP_MARGIN_RELEASES,
            envelope,
            release_time_constant: envelope.release * self.release_time_scale,
            layers,
        }
    }
}
