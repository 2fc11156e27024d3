use serde::{Deserialize, Serialize};

use super::beat_duration;
use crate::{Error, Result};

pub const DEFAULT_TEMPO: f64 = 120.0;

/// Fraction of each beat that actually sounds. The rest is a gap before the
/// next note.
pub const STACCATO_DUTY: f64 = 0.8;

fn default_tempo() -> f64 {
    DEFAULT_TEMPO
}

/// A melody for the single lane.
///
/// Each note token is either a bare pitch (`"C4"`) or an instrument override
/// followed by a pitch (`"plucked_bass C3"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub title: String,
    /// Instrument for tokens without an override.
    pub instrument: String,
    pub notes: Vec<String>,
    /// Beats per minute.
    #[serde(default = "default_tempo")]
    pub tempo: f64,
}

impl Song {
    pub fn new(instrument: impl Into<String>, notes: Vec<String>) -> Self {
        Self {
            title: String::new(),
            instrument: instrument.into(),
            notes,
            tempo: DEFAULT_TEMPO,
        }
    }

    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// A song with no notes is allowed to load; only advancing it fails.
    pub fn validate(&self) -> Result<()> {
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(Error::InvalidSong {
                title: self.title.clone(),
                reason: format!("tempo must be positive, got {}", self.tempo),
            });
        }
        Ok(())
    }

    /// Instrument names used by the song, default first, without duplicates.
    pub fn instruments(&self) -> Vec<&str> {
        let mut names = vec![self.instrument.as_str()];
        for token in &self.notes {
            if let Some((instrument, _)) = token.split_once(' ') {
                if !names.contains(&instrument) {
                    names.push(instrument);
                }
            }
        }
        names
    }
}

/// One step of a melody, ready to be scheduled.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// The token exactly as written in the song.
    pub token: String,
    pub instrument: String,
    pub pitch: String,
    pub tempo: f64,
    /// How long the note sounds, shorter than a beat.
    pub sound_duration: f64,
}

impl Cue {
    pub fn parse(token: &str, default_instrument: &str, tempo: f64) -> Self {
        let (instrument, pitch) = match token.split_once(' ') {
            Some((instrument, pitch)) => (instrument, pitch),
            None => (default_instrument, token),
        };

        Self {
            token: token.to_string(),
            instrument: instrument.to_string(),
            pitch: pitch.to_string(),
            tempo,
            sound_duration: beat_duration(tempo) * STACCATO_DUTY,
        }
    }
}

/// Walks the active song's notes in a loop.
#[derive(Debug, Clone)]
pub struct SongPlayer {
    song: Song,
    index: usize,
}

impl SongPlayer {
    pub fn new(song: Song) -> Self {
        Self { song, index: 0 }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Replace the song and start again from its first note.
    pub fn set_song(&mut self, song: Song) {
        self.song = song;
        self.index = 0;
    }

    /// Take the current note and move on, wrapping at the end of the song.
    pub fn advance(&mut self) -> Result<Cue> {
        let len = self.song.notes.len();
        if len == 0 {
            return Err(Error::EmptySong(self.song.title.clone()));
        }

        let cue = Cue::parse(
            &self.song.notes[self.index],
            &self.song.instrument,
            self.song.tempo,
        );
        self.index = (self.index + 1) % len;
        Ok(cue)
    }
}
