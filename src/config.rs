use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::{DEFAULT_RELEASE_TIME_SCALE, InstrumentBank, MixSettings};
use crate::catalog::SongCatalog;
use crate::output::BackendOptions;
use crate::{Error, Result};

/// Runtime settings, read from a RON file. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub master_gain: f32,
    /// Release fade time constant as a fraction of each instrument's release.
    pub release_time_scale: f64,
    /// How many voices may wait for the audio thread at once.
    pub voice_queue_capacity: usize,
    /// Instrument table to use instead of the built-in one.
    pub instruments: Option<PathBuf>,
    /// Song catalog to use instead of the built-in one.
    pub songs: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_gain: MixSettings::default().master_gain,
            release_time_scale: DEFAULT_RELEASE_TIME_SCALE,
            voice_queue_capacity: 256,
            instruments: None,
            songs: None,
        }
    }
}

impl AudioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.master_gain) {
            return Err(Error::InvalidConfig(format!(
                "master_gain {} is outside 0..=1",
                self.master_gain
            )));
        }
        if !self.release_time_scale.is_finite() || self.release_time_scale < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "release_time_scale must be a non-negative number, got {}",
                self.release_time_scale
            )));
        }
        if self.voice_queue_capacity == 0 {
            return Err(Error::InvalidConfig("voice_queue_capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn instrument_bank(&self) -> Result<InstrumentBank> {
        match &self.instruments {
            Some(path) => InstrumentBank::load(path),
            None => InstrumentBank::builtin(),
        }
    }

    pub fn song_catalog(&self) -> Result<SongCatalog> {
        match &self.songs {
            Some(path) => SongCatalog::load(path),
            None => SongCatalog::builtin(),
        }
    }

    pub fn mix_settings(&self) -> MixSettings {
        MixSettings {
            master_gain: self.master_gain,
        }
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            mix: crate::audio::shared_settings(self.mix_settings()),
            voice_queue_capacity: self.voice_queue_capacity,
        }
    }
}
