use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid pitch notation '{0}'")]
    InvalidPitch(String),

    #[error("Invalid instrument '{name}': {reason}")]
    InvalidInstrument { name: String, reason: String },

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Default instrument '{0}' is not in the registry")]
    MissingDefault(String),

    #[error("Invalid song '{title}': {reason}")]
    InvalidSong { title: String, reason: String },

    /// Advancing a melody that has no notes is a caller bug, not a rest.
    #[error("Song '{0}' has no notes")]
    EmptySong(String),

    #[error("No output device available")]
    NoOutputDevice,

    #[error("Output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Voice queue is full")]
    QueueFull,
}
