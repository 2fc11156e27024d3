//! Band-limited oscillators for voice layers.

use std::f64::consts::PI;

use super::Wave;

/// A running oscillator: fixed frequency and gain, free-running phase.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub wave: Wave,
    pub frequency: f64,
    pub gain: f64,
    phase: f64,
}

impl Oscillator {
    pub fn new(wave: Wave, frequency: f64, gain: f64) -> Self {
        Self {
            wave,
            frequency,
            gain,
            phase: 0.0,
        }
    }

    /// Next sample scaled by the layer gain.
    pub fn next_sample(&mut self, sample_rate: f64) -> f64 {
        let inc = self.frequency / sample_rate;
        let t = self.phase;

        let sample = match self.wave {
            Wave::Sine => (2.0 * PI * t).sin(),
            Wave::Triangle => {
                if t < 0.5 {
                    4.0 * t - 1.0
                } else {
                    3.0 - 4.0 * t
                }
            }
            Wave::Square => {
                let naive = if t < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(t, inc) - poly_blep((t + 0.5) % 1.0, inc)
            }
            Wave::Sawtooth => (2.0 * t - 1.0) - poly_blep(t, inc),
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample * self.gain
    }
}

/// Polynomial band-limited step correction around a wrap at phase 0.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(wave: Wave) -> f64 {
        let mut osc = Oscillator::new(wave, 440.0, 1.0);
        (0..44100)
            .map(|_| osc.next_sample(44100.0).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn sine_starts_at_zero() {
        let mut osc = Oscillator::new(Wave::Sine, 440.0, 1.0);
        assert!(osc.next_sample(44100.0).abs() < 1e-10);
    }

    #[test]
    fn waves_stay_in_range() {
        assert!(peak(Wave::Sine) <= 1.0);
        assert!(peak(Wave::Triangle) <= 1.0);
        assert!(peak(Wave::Square) <= 1.5);
        assert!(peak(Wave::Sawtooth) <= 1.5);
    }

    #[test]
    fn gain_scales_output() {
        let mut quiet = Oscillator::new(Wave::Square, 110.0, 0.25);
        for _ in 0..1000 {
            assert!(quiet.next_sample(44100.0).abs() <= 0.25 * 1.5);
        }
    }

    #[test]
    fn phase_wraps_for_frequencies_above_nyquist() {
        let mut osc = Oscillator::new(Wave::Sawtooth, 100_000.0, 1.0);
        for _ in 0..100 {
            osc.next_sample(44100.0);
            assert!((0.0..1.0).contains(&osc.phase));
        }
    }
}
