use serde::{Deserialize, Serialize};

use super::Oscillator;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Seconds
    pub attack: f64,
    /// Seconds
    pub decay: f64,
    /// 0.0 -> 1.0
    pub sustain: f64,
    /// Seconds
    pub release: f64,
}

impl Envelope {
    pub fn validate(&self) -> Result<()> {
        let times = [
            ("attack", self.attack),
            ("decay", self.decay),
            ("release", self.release),
        ];
        for (label, value) in times {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidEnvelope(format!(
                    "{label} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            return Err(Error::InvalidEnvelope(format!(
                "sustain {} is outside 0..=1",
                self.sustain
            )));
        }
        Ok(())
    }

    /// Level `elapsed` seconds after the note started, ignoring release.
    ///
    /// Linear rise over the attack, then an exponential approach to the
    /// sustain level with the decay time as its time constant.
    pub fn level_before_release(&self, elapsed: f64) -> f64 {
        if elapsed < 0.0 {
            return 0.0;
        }
        if elapsed < self.attack {
            return elapsed / self.attack;
        }
        if self.decay == 0.0 {
            return self.sustain;
        }
        let since_peak = elapsed - self.attack;
        self.sustain + (1.0 - self.sustain) * (-since_peak / self.decay).exp()
    }
}

/// One scheduled note: the layered oscillators plus the master gain curve
/// they share, all positioned in absolute audio-clock time.
///
/// A voice is inert before `start` and finished at `stop_at`; the mixer drops
/// it then, so nothing else has to clean it up.
#[derive(Debug, Clone)]
pub struct Voice {
    pub start: f64,
    pub note_end: f64,
    pub stop_at: f64,
    pub envelope: Envelope,
    /// Time constant of the exponential fade that begins at `note_end`.
    pub release_time_constant: f64,
    pub layers: Vec<Oscillator>,
}

impl Voice {
    /// Master gain at audio-clock time `t`.
    pub fn gain_at(&self, t: f64) -> f64 {
        if t < self.start || t >= self.stop_at {
            return 0.0;
        }
        if t < self.note_end {
            return self.envelope.level_before_release(t - self.start);
        }

        let held = self.envelope.level_before_release(self.note_end - self.start);
        if self.release_time_constant.is_nan() || self.release_time_constant <= 0.0 {
            return 0.0;
        }
        held * (-(t - self.note_end) / self.release_time_constant).exp()
    }

    /// A voice with a NaN stop time counts as finished, so it can never
    /// stay in the mix.
    pub fn is_finished(&self, t: f64) -> bool {
        self.stop_at.is_nan() || t >= self.stop_at
    }

    /// Render the sample at time `t` and advance every layer by one frame.
    /// Layers only run while the voice is sounding, so each starts in phase.
    pub fn next_sample(&mut self, t: f64, sample_rate: f64) -> f64 {
        if t < self.start || self.is_finished(t) {
            return 0.0;
        }
        let gain = self.gain_at(t);
        let sum: f64 = self
            .layers
            .iter_mut()
            .map(|osc| osc.next_sample(sample_rate))
            .sum();
        sum * gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Wave;

    fn envelope() -> Envelope {
        Envelope {
            attack: 0.1,
            decay: 0.2,
            sustain: 0.5,
            release: 0.4,
        }
    }

    fn voice(start: f64, note_end: f64) -> Voice {
        let env = envelope();
        Voice {
            start,
            note_end,
            stop_at: note_end + env.release * 2.0,
            envelope: env,
            release_time_constant: env.release / 2.0,
            layers: vec![Oscillator::new(Wave::Sine, 440.0, 1.0)],
        }
    }

    #[test]
    fn attack_is_linear() {
        let env = envelope();
        assert_eq!(env.level_before_release(0.0), 0.0);
        assert!((env.level_before_release(0.05) - 0.5).abs() < 1e-12);
        assert!((env.level_before_release(0.1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn decay_approaches_sustain() {
        let env = envelope();
        let mut previous = env.level_before_release(0.1);
        for step in 1..50 {
            let level = env.level_before_release(0.1 + step as f64 * 0.05);
            assert!(level < previous);
            assert!(level > env.sustain);
            previous = level;
        }
        assert!((env.level_before_release(10.0) - env.sustain).abs() < 1e-9);
    }

    #[test]
    fn zero_attack_and_decay_sit_at_sustain() {
        let env = Envelope {
            attack: 0.0,
            decay: 0.0,
            sustain: 0.7,
            release: 0.1,
        };
        assert_eq!(env.level_before_release(0.0), 0.7);
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(envelope().validate().is_ok());
        assert!(Envelope { attack: -0.1, ..envelope() }.validate().is_err());
        assert!(Envelope { sustain: 1.01, ..envelope() }.validate().is_err());
        assert!(Envelope { release: f64::NAN, ..envelope() }.validate().is_err());
        assert!(matches!(
            Envelope { decay: -1.0, ..envelope() }.validate(),
            Err(Error::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn silent_outside_its_window() {
        let v = voice(1.0, 1.5);
        assert_eq!(v.gain_at(0.99), 0.0);
        assert_eq!(v.gain_at(v.stop_at), 0.0);
        assert!(v.gain_at(1.05) > 0.0);
    }

    #[test]
    fn release_decays_from_held_level() {
        let v = voice(0.0, 1.0);
        let held = v.envelope.level_before_release(1.0);
        assert!((v.gain_at(1.0) - held).abs() < 1e-12);

        let one_constant_later = v.gain_at(1.0 + v.release_time_constant);
        assert!((one_constant_later - held * (-1.0_f64).exp()).abs() < 1e-12);
        assert!(v.gain_at(v.stop_at - 1e-6) < held * 0.02);
    }

    #[test]
    fn finished_after_stop_time() {
        let v = voice(0.0, 0.5);
        assert!(!v.is_finished(0.5));
        assert!(v.is_finished(v.stop_at));
    }

    #[test]
    fn nan_stop_time_is_finished_and_silent() {
        let mut v = voice(0.0, f64::NAN);
        v.stop_at = f64::NAN;
        assert!(v.is_finished(0.0));
        assert_eq!(v.next_sample(0.2, 8000.0), 0.0);
    }

    #[test]
    fn nan_release_constant_is_silent_after_note_end() {
        let mut v = voice(0.0, 0.5);
        v.release_time_constant = f64::NAN;
        assert_eq!(v.gain_at(0.6), 0.0);
    }

    #[test]
    fn produces_sound_while_active() {
        let mut v = voice(0.0, 0.5);
        let sample_rate = 8000.0;
        let loud = (0..4000)
            .map(|i| v.next_sample(i as f64 / sample_rate, sample_rate).abs())
            .fold(0.0, f64::max);
        assert!(loud > 0.1);
    }
}
