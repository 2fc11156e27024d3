mod scheduler;
mod song;

pub use scheduler::{Scheduler, beat_duration};
pub use song::{Cue, DEFAULT_TEMPO, STACCATO_DUTY, Song, SongPlayer};
