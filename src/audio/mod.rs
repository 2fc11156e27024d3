mod instrument;
mod mixer;
pub mod note;
mod oscillator;
mod synth;
mod voice;

pub use instrument::{Instrument, InstrumentBank, OscillatorLayer, Wave};
pub use mixer::{MixSettings, Mixer, SharedMixSettings, shared_settings};
pub use note::{Pitch, resolve};
pub use oscillator::Oscillator;
pub use synth::{DEFAULT_RELEASE_TIME_SCALE, STOP_MARGIN_RELEASES, Synth};
pub use voice::{Envelope, Voice};
