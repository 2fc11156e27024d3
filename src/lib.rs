//! Procedural game audio: named synth instruments, looping melodies that
//! advance one note per game event, and a clock-driven scheduler that keeps
//! them on the beat regardless of frame timing.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod timing;

pub use audio::{Instrument, InstrumentBank, Synth, resolve};
pub use catalog::SongCatalog;
pub use config::AudioConfig;
pub use engine::{
    PlayedNote, SoundCommand, SoundUpdate, Soundtrack, SoundtrackHandle, spawn_soundtrack,
};
pub use error::{Error, Result};
pub use output::{AudioClock, Output};
pub use timing::{Scheduler, Song, SongPlayer};
