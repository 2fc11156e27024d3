use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use bricktone::{
    AudioClock, AudioConfig, Song, SoundCommand, SoundUpdate, Soundtrack, SoundtrackHandle,
    spawn_soundtrack,
};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const HELP: &str = "space: paddle hit   b: brick   l: life lost   n: next song\r\n\
                    s: stop   r: resume   +/-: volume   q: quit\r\n";

const GAIN_STEP: f32 = 0.1;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AudioConfig::load(Path::new(&path))?,
        None => AudioConfig::default(),
    };

    let bank = config.instrument_bank()?;
    let mut catalog = config.song_catalog()?;
    catalog.shuffle(&mut rand::rng());
    for (title, instrument) in catalog.unknown_instruments(&bank) {
        warn!("'{}' uses unknown instrument '{}'", title, instrument);
    }

    let songs = catalog.songs().to_vec();
    let first = songs.first().cloned().ok_or("song catalog is empty")?;
    let gain = config.master_gain;
    println!("Now playing: {}", first.title);

    let handle = spawn_soundtrack(move || Soundtrack::with_device(bank, first, &config));

    terminal::enable_raw_mode()?;
    let result = run(&handle, &songs, gain);
    terminal::disable_raw_mode()?;

    let _ = handle.command_tx.send(SoundCommand::Shutdown);
    result
}

fn run(handle: &SoundtrackHandle, songs: &[Song], mut gain: f32) -> Result<(), Box<dyn Error>> {
    let mut song_index = 0;
    let mut clock: Option<AudioClock> = None;
    print!("{HELP}");
    io::stdout().flush()?;

    loop {
        while let Ok(update) = handle.update_rx.try_recv() {
            match update {
                SoundUpdate::ClockReady(ready) => clock = Some(ready),
                SoundUpdate::NotePlayed(note) => {
                    let now = clock.as_ref().map_or(0.0, AudioClock::now);
                    match note.at {
                        Some(at) => print!("{:>20}  +{:.2}s\r\n", note.token, at - now),
                        None => print!("{:>20}  (no output)\r\n", note.token),
                    }
                }
                SoundUpdate::SongLoaded { title } => print!("Now playing: {title}\r\n"),
                SoundUpdate::Error { message } => print!("error: {message}\r\n"),
            }
        }
        io::stdout().flush()?;

        if !event::poll(Duration::from_millis(30))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let command = match key.code {
            KeyCode::Char(' ') => SoundCommand::AdvanceMelody,
            KeyCode::Char('b') => effect("sfx_brick_break", "E5", 0.1),
            KeyCode::Char('l') => effect("sfx_life_lost", "C3", 0.5),
            KeyCode::Char('n') => {
                song_index = (song_index + 1) % songs.len();
                SoundCommand::LoadSong(songs[song_index].clone())
            }
            KeyCode::Char('s') => SoundCommand::Stop,
            KeyCode::Char('r') => SoundCommand::Resume,
            KeyCode::Char('+') | KeyCode::Char('=') => {
                gain = (gain + GAIN_STEP).min(1.0);
                SoundCommand::SetMasterGain(gain)
            }
            KeyCode::Char('-') => {
                gain = (gain - GAIN_STEP).max(0.0);
                SoundCommand::SetMasterGain(gain)
            }
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            _ => continue,
        };
        handle.command_tx.send(command)?;
    }
}

fn effect(instrument: &str, pitch: &str, duration: f64) -> SoundCommand {
    SoundCommand::PlayEffect {
        instrument: instrument.to_string(),
        pitch: pitch.to_string(),
        duration,
    }
}
