use std::sync::Arc;

use crossbeam::channel::{Receiver, RecvError, Sender};
use tracing::{debug, info, warn};

use crate::audio::{InstrumentBank, MixSettings, SharedMixSettings, Synth, Voice, resolve};
use crate::config::AudioConfig;
use crate::output::{AudioClock, BackendOpener, Output};
use crate::timing::{Song, SongPlayer};
use crate::{Error, Result};

/// A melody note that was taken from the song.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedNote {
    /// The token as written in the song, e.g. `"plucked_bass C3"`.
    pub token: String,
    /// Audio-clock time of the reserved slot. `None` without an output.
    pub at: Option<f64>,
}

/// The game-facing audio subsystem.
///
/// Owns the instrument bank, the active song, the synth and the output slot.
/// Every call returns immediately; sound happens later on the audio clock.
pub struct Soundtrack {
    bank: InstrumentBank,
    player: SongPlayer,
    synth: Synth,
    output: Output,
    mix: SharedMixSettings,
    halted: bool,
    closed: bool,
}

impl Soundtrack {
    pub fn new(
        bank: InstrumentBank,
        song: Song,
        config: &AudioConfig,
        opener: BackendOpener,
    ) -> Result<Self> {
        let options = config.backend_options();
        let mix = options.mix.clone();
        Self::with_output(bank, song, config, Output::lazy(opener, options), mix)
    }

    /// Play through the default output device, opened on the first sound.
    pub fn with_device(bank: InstrumentBank, song: Song, config: &AudioConfig) -> Result<Self> {
        let options = config.backend_options();
        let mix = options.mix.clone();
        Self::with_output(bank, song, config, Output::device(options), mix)
    }

    fn with_output(
        bank: InstrumentBank,
        song: Song,
        config: &AudioConfig,
        output: Output,
        mix: SharedMixSettings,
    ) -> Result<Self> {
        config.validate()?;
        song.validate()?;
        Ok(Self {
            bank,
            player: SongPlayer::new(song),
            synth: Synth::new(config.release_time_scale),
            output,
            mix,
            halted: false,
            closed: false,
        })
    }

    pub fn bank(&self) -> &InstrumentBank {
        &self.bank
    }

    pub fn song(&self) -> &Song {
        self.player.song()
    }

    /// `true` while stopped, and for good after `shutdown`.
    pub fn is_halted(&self) -> bool {
        self.halted || self.closed
    }

    /// Clock of the output, once one has been opened.
    pub fn clock(&self) -> Option<AudioClock> {
        self.output.clock()
    }

    /// Schedule the next melody note in the melodic lane.
    ///
    /// The slot is reserved before the pitch is resolved, so a malformed
    /// pitch becomes a rest of one beat. Returns `None` while stopped.
    pub fn advance_melody(&mut self) -> Result<Option<PlayedNote>> {
        if self.is_halted() {
            return Ok(None);
        }

        let cue = self.player.advance()?;
        let Some(start) = self.output.reserve_slot(cue.tempo) else {
            return Ok(Some(PlayedNote {
                token: cue.token,
                at: None,
            }));
        };

        match resolve(&cue.pitch) {
            Some(frequency) => {
                let instrument = self.bank.lookup(&cue.instrument);
                let voice = self.synth.voice(frequency, instrument, start, cue.sound_duration);
                self.submit(voice);
            }
            None => debug!("Skipping unresolvable pitch '{}' in '{}'", cue.pitch, cue.token),
        }

        Ok(Some(PlayedNote {
            token: cue.token,
            at: Some(start),
        }))
    }

    /// Play a sound right now, outside the melodic lane.
    pub fn play_effect(&mut self, instrument: &str, pitch: &str, duration: f64) {
        if self.is_halted() {
            return;
        }
        if !duration.is_finite() || duration < 0.0 {
            debug!("Skipping effect '{}' with unusable duration {}", instrument, duration);
            return;
        }
        let Some(frequency) = resolve(pitch) else {
            debug!("Skipping effect '{}' with unresolvable pitch '{}'", instrument, pitch);
            return;
        };
        let Some(now) = self.output.now() else {
            return;
        };

        let voice = self.synth.voice(frequency, self.bank.lookup(instrument), now, duration);
        self.submit(voice);
    }

    fn submit(&mut self, voice: Voice) {
        match self.output.submit(voice) {
            Ok(()) => {}
            Err(Error::QueueFull) => warn!("Voice queue is full, dropping note"),
            Err(e) => warn!("Failed to submit voice: {}", e),
        }
    }

    /// Switch songs. The melody restarts from the first note.
    pub fn load_song(&mut self, song: Song) -> Result<()> {
        song.validate()?;
        info!("Loading song '{}' at {} bpm", song.title, song.tempo);
        self.player.set_song(song);
        Ok(())
    }

    pub fn master_gain(&self) -> f32 {
        self.mix.load().master_gain
    }

    /// Takes effect on the next audio buffer.
    pub fn set_master_gain(&mut self, gain: f32) {
        let master_gain = gain.clamp(0.0, 1.0);
        self.mix.store(Arc::new(MixSettings { master_gain }));
    }

    /// Stop scheduling new sounds. Notes already scheduled still play out.
    pub fn stop(&mut self) {
        if !self.halted {
            info!("Soundtrack stopped");
        }
        self.halted = true;
    }

    /// Has no effect after `shutdown`.
    pub fn resume(&mut self) {
        if self.closed {
            return;
        }
        if self.halted {
            info!("Soundtrack resumed");
        }
        self.halted = false;
    }

    /// Close the output, cutting anything still sounding. Idempotent, and
    /// nothing plays afterwards.
    pub fn shutdown(&mut self) {
        self.closed = true;
        self.output.close();
    }
}

impl Drop for Soundtrack {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Clone)]
pub enum SoundCommand {
    PlayEffect {
        instrument: String,
        pitch: String,
        duration: f64,
    },
    AdvanceMelody,
    LoadSong(Song),
    SetMasterGain(f32),
    Stop,
    Resume,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum SoundUpdate {
    NotePlayed(PlayedNote),
    SongLoaded { title: String },
    /// Sent once, when the output has opened.
    ClockReady(AudioClock),
    Error { message: String },
}

pub struct SoundtrackHandle {
    pub command_tx: Sender<SoundCommand>,
    pub update_rx: Receiver<SoundUpdate>,
}

/// Run a soundtrack on its own control thread.
///
/// `build` runs on that thread, so the output it opens never has to cross
/// threads. The thread exits on `Shutdown` or when every sender is dropped.
pub fn spawn_soundtrack<F>(build: F) -> SoundtrackHandle
where
    F: FnOnce() -> Result<Soundtrack> + Send + 'static,
{
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();

    std::thread::spawn(move || match build() {
        Ok(soundtrack) => soundtrack_thread(soundtrack, command_rx, update_tx),
        Err(e) => {
            let _ = update_tx.send(SoundUpdate::Error {
                message: format!("Failed to start soundtrack: {}", e),
            });
        }
    });

    SoundtrackHandle {
        command_tx,
        update_rx,
    }
}

fn soundtrack_thread(
    mut soundtrack: Soundtrack,
    command_rx: Receiver<SoundCommand>,
    update_tx: Sender<SoundUpdate>,
) {
    let mut clock_sent = false;

    loop {
        match command_rx.recv() {
            Ok(SoundCommand::PlayEffect {
                instrument,
                pitch,
                duration,
            }) => {
                soundtrack.play_effect(&instrument, &pitch, duration);
                announce_clock(&soundtrack, &mut clock_sent, &update_tx);
            }

            Ok(SoundCommand::AdvanceMelody) => match soundtrack.advance_melody() {
                Ok(Some(note)) => {
                    announce_clock(&soundtrack, &mut clock_sent, &update_tx);
                    let _ = update_tx.send(SoundUpdate::NotePlayed(note));
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = update_tx.send(SoundUpdate::Error {
                        message: e.to_string(),
                    });
                }
            },

            Ok(SoundCommand::LoadSong(song)) => {
                let title = song.title.clone();
                match soundtrack.load_song(song) {
                    Ok(()) => {
                        let _ = update_tx.send(SoundUpdate::SongLoaded { title });
                    }
                    Err(e) => {
                        let _ = update_tx.send(SoundUpdate::Error {
                            message: format!("Failed to load song: {}", e),
                        });
                    }
                }
            }

            Ok(SoundCommand::SetMasterGain(gain)) => soundtrack.set_master_gain(gain),
            Ok(SoundCommand::Stop) => soundtrack.stop(),
            Ok(SoundCommand::Resume) => soundtrack.resume(),

            Ok(SoundCommand::Shutdown) | Err(RecvError) => break,
        }
    }

    soundtrack.shutdown();
}

fn announce_clock(soundtrack: &Soundtrack, clock_sent: &mut bool, update_tx: &Sender<SoundUpdate>) {
    if *clock_sent {
        return;
    }
    if let Some(clock) = soundtrack.clock() {
        let _ = update_tx.send(SoundUpdate::ClockReady(clock));
        *clock_sent = true;
    }
}
