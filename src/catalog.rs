use std::fs;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::audio::InstrumentBank;
use crate::timing::Song;
use crate::Result;

const BUILTIN_SONGS: &str = include_str!("../assets/songs.ron");

/// The songs a game can cycle through.
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    songs: Vec<Song>,
}

impl SongCatalog {
    pub fn new(songs: Vec<Song>) -> Result<Self> {
        for song in &songs {
            song.validate()?;
        }
        Ok(Self { songs })
    }

    pub fn builtin() -> Result<Self> {
        Self::from_ron(BUILTIN_SONGS)
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        let songs: Vec<Song> = ron::from_str(source)?;
        Self::new(songs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    pub fn get(&self, title: &str) -> Option<&Song> {
        self.songs.iter().find(|song| song.title == title)
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Randomize the play order.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.songs.shuffle(rng);
    }

    /// `(song title, instrument)` pairs naming instruments the bank lacks.
    /// Those notes still play, on the bank's default timbre.
    pub fn unknown_instruments<'a>(&'a self, bank: &InstrumentBank) -> Vec<(&'a str, &'a str)> {
        self.songs
            .iter()
            .flat_map(move |song| {
                song.instruments()
                    .into_iter()
                    .filter(move |name| !bank.contains(name))
                    .map(move |name| (song.title.as_str(), name))
            })
            .collect()
    }
}
