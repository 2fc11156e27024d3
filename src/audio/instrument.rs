use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Envelope;
use crate::{Error, Result};

const BUILTIN_INSTRUMENTS: &str = include_str!("../../assets/instruments.ron");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wave {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

/// One waveform generator contributing to an instrument's timbre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorLayer {
    pub wave: Wave,
    /// 0.0 -> 1.0
    pub gain: f64,
    /// Fine offset, 100 cents to the semitone.
    #[serde(default)]
    pub detune_cents: f64,
    /// Coarse offset, usually octaves (multiples of 12).
    #[serde(default)]
    pub semitones: i32,
}

impl OscillatorLayer {
    /// Frequency this layer sounds at when the note is `base` Hz.
    pub fn frequency(&self, base: f64) -> f64 {
        base * 2.0_f64.powf(self.semitones as f64 / 12.0) * 2.0_f64.powf(self.detune_cents / 1200.0)
    }
}

fn rhythmic_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub layers: Vec<OscillatorLayer>,
    pub envelope: Envelope,
    /// `false` marks one-shot effects whose length comes from the envelope
    /// rather than from the caller.
    #[serde(default = "rhythmic_by_default")]
    pub rhythmic: bool,
}

impl Instrument {
    /// Check the instrument registered as `name`.
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidInstrument {
            name: name.to_string(),
            reason,
        };

        if self.layers.is_empty() {
            return Err(invalid("no oscillator layers".into()));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if !(0.0..=1.0).contains(&layer.gain) {
                return Err(invalid(format!("layer {i} gain {} is outside 0..=1", layer.gain)));
            }
            if !layer.detune_cents.is_finite() {
                return Err(invalid(format!("layer {i} detune is not finite")));
            }
        }
        self.envelope
            .validate()
            .map_err(|e| invalid(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct BankFile {
    default: String,
    instruments: BTreeMap<String, Instrument>,
}

/// Immutable registry of named timbres with a designated fallback.
#[derive(Debug, Clone)]
pub struct InstrumentBank {
    default_name: String,
    instruments: BTreeMap<String, Instrument>,
}

impl InstrumentBank {
    pub fn new(default_name: impl Into<String>, instruments: BTreeMap<String, Instrument>) -> Result<Self> {
        let default_name = default_name.into();

        for (name, instrument) in &instruments {
            instrument.validate(name)?;
        }
        if !instruments.contains_key(&default_name) {
            return Err(Error::MissingDefault(default_name));
        }

        debug!("Instrument bank ready: {} instruments", instruments.len());
        Ok(Self {
            default_name,
            instruments,
        })
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_ron(BUILTIN_INSTRUMENTS)
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        let file: BankFile = ron::from_str(source)?;
        Self::new(file.default, file.instruments)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    pub fn get(&self, name: &str) -> Option<&Instrument> {
        self.instruments.get(name)
    }

    /// Never fails: unknown names get the default timbre and a warning.
    pub fn lookup(&self, name: &str) -> &Instrument {
        match self.instruments.get(name) {
            Some(instrument) => instrument,
            None => {
                warn!(
                    "Unknown instrument '{}', falling back to '{}'",
                    name, self.default_name
                );
                self.default_instrument()
            }
        }
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn default_instrument(&self) -> &Instrument {
        // Presence is checked in `new`.
        &self.instruments[&self.default_name]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instruments.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instrument)> {
        self.instruments.iter().map(|(name, i)| (name.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
