use std::sync::Arc;

use arc_swap::ArcSwap;

use super::Voice;

/// Settings the control thread can swap while the audio thread is running.
#[derive(Debug, Clone)]
pub struct MixSettings {
    pub master_gain: f32,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self { master_gain: 0.3 }
    }
}

pub type SharedMixSettings = Arc<ArcSwap<MixSettings>>;

pub fn shared_settings(settings: MixSettings) -> SharedMixSettings {
    Arc::new(ArcSwap::from_pointee(settings))
}

/// Sums active voices into an interleaved output buffer.
///
/// Voices are dropped as soon as their stop time passes, which is the only
/// teardown a note ever gets. Storage for `max_voices` is reserved up front
/// so adding a voice on the audio thread never allocates.
pub struct Mixer {
    voices: Vec<Voice>,
    max_voices: usize,
    settings: SharedMixSettings,
    sample_rate: f64,
}

impl Mixer {
    pub fn new(sample_rate: f64, settings: SharedMixSettings, max_voices: usize) -> Self {
        let max_voices = max_voices.max(1);
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices,
            settings,
            sample_rate,
        }
    }

    /// When full, the voice closest to its stop time is replaced.
    pub fn add(&mut self, voice: Voice) {
        if self.voices.len() < self.max_voices {
            self.voices.push(voice);
            return;
        }
        let oldest = self
            .voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.stop_at.total_cmp(&b.stop_at))
            .map(|(i, _)| i);
        if let Some(i) = oldest {
            self.voices[i] = voice;
        }
    }

    pub fn capacity(&self) -> usize {
        self.voices.capacity()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Cut every voice immediately.
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Fill `output` (interleaved, `channels` wide) starting at clock frame
    /// `first_frame`. Returns the number of frames written.
    pub fn render(&mut self, output: &mut [f32], channels: usize, first_frame: u64) -> usize {
        let channels = channels.max(1);
        let num_frames = output.len() / channels;
        let gain = self.settings.load().master_gain as f64;

        for (i, frame) in output.chunks_mut(channels).enumerate() {
            let t = (first_frame + i as u64) as f64 / self.sample_rate;
            let mut sum = 0.0;
            for voice in self.voices.iter_mut() {
                sum += voice.next_sample(t, self.sample_rate);
            }
            let sample = soft_clip(sum * gain) as f32;
            frame.fill(sample);
        }

        let end = (first_frame + num_frames as u64) as f64 / self.sample_rate;
        self.voices.retain(|voice| !voice.is_finished(end));

        num_frames
    }
}

fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Envelope, Oscillator, Wave};

    fn voice(start: f64, note_end: f64) -> Voice {
        Voice {
            start,
            note_end,
            stop_at: note_end + 0.1,
            envelope: Envelope {
                attack: 0.0,
                decay: 0.0,
                sustain: 1.0,
                release: 0.05,
            },
            release_time_constant: 0.025,
            layers: vec![Oscillator::new(Wave::Square, 100.0, 1.0)],
        }
    }

    fn mixer() -> Mixer {
        Mixer::new(1000.0, shared_settings(MixSettings { master_gain: 1.0 }), 32)
    }

    #[test]
    fn silent_without_voices() {
        let mut m = mixer();
        let mut out = vec![1.0; 64];
        assert_eq!(m.render(&mut out, 2, 0), 32);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn writes_every_channel() {
        let mut m = mixer();
        m.add(voice(0.0, 1.0));
        let mut out = vec![0.0; 200];
        m.render(&mut out, 2, 0);
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(out.iter().any(|&s| s.abs() > 0.1));
    }

    #[test]
    fn waits_for_start_time() {
        let mut m = mixer();
        m.add(voice(0.5, 1.0));
        let mut out = vec![0.0; 500];
        m.render(&mut out, 1, 0);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(m.active_voices(), 1);

        m.render(&mut out, 1, 500);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn drops_voices_after_stop_time() {
        let mut m = mixer();
        m.add(voice(0.0, 0.1));
        let mut out = vec![0.0; 100];
        m.render(&mut out, 1, 0);
        assert_eq!(m.active_voices(), 1);
        m.render(&mut out, 1, 100);
        assert_eq!(m.active_voices(), 0);
    }

    #[test]
    fn master_gain_is_hot_swappable() {
        let settings = shared_settings(MixSettings { master_gain: 1.0 });
        let mut m = Mixer::new(1000.0, settings.clone(), 8);
        m.add(voice(0.0, 10.0));

        settings.store(Arc::new(MixSettings { master_gain: 0.0 }));
        let mut out = vec![0.0; 100];
        m.render(&mut out, 1, 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn output_is_soft_clipped() {
        let mut m = mixer();
        for _ in 0..16 {
            m.add(voice(0.0, 1.0));
        }
        let mut out = vec![0.0; 500];
        m.render(&mut out, 1, 0);
        assert!(out.iter().all(|&s| s.abs() <= 1.0));
    }

    #[test]
    fn full_mixer_steals_the_voice_ending_first() {
        let mut m = Mixer::new(1000.0, shared_settings(MixSettings::default()), 2);
        let capacity = m.capacity();
        m.add(voice(0.0, 3.0));
        m.add(voice(0.0, 1.0));
        m.add(voice(0.0, 2.0));

        assert_eq!(m.active_voices(), 2);
        assert_eq!(m.capacity(), capacity);
        let mut stops: Vec<f64> = m.voices.iter().map(|v| v.stop_at).collect();
        stops.sort_by(f64::total_cmp);
        assert_eq!(stops, [voice(0.0, 2.0).stop_at, voice(0.0, 3.0).stop_at]);
    }
}
