//! Endless playlist loop over the catalog.

use core::fmt::Debug;

use log::info;

use crate::catalog::{Catalog, MediaEntry};
use crate::clock::Clock;
use crate::decoder::FrameDecoder;
use crate::display::Display;
use crate::engine::{PlaybackEngine, PlaybackOutcome};
use crate::input::ButtonLine;
use crate::settings::PreferenceStore;
use crate::storage::MediaStorage;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PlaylistError {
    EmptyCatalog,
}

/// Cursor over a non-empty catalog driving the playback engine.
pub struct Playlist<S, DSP, DEC, BTN, CLK, PS> {
    storage: S,
    engine: PlaybackEngine<DSP, DEC, BTN, CLK, PS>,
    catalog: Catalog,
    folder: &'static str,
    cursor: usize,
}

impl<S, DSP, DEC, BTN, CLK, PS> Playlist<S, DSP, DEC, BTN, CLK, PS>
where
    S: MediaStorage,
    DSP: Display,
    DEC: FrameDecoder,
    BTN: ButtonLine,
    BTN::Error: Debug,
    CLK: Clock,
    PS: PreferenceStore,
    PS::Error: Debug,
{
    pub fn new(
        storage: S,
        engine: PlaybackEngine<DSP, DEC, BTN, CLK, PS>,
        catalog: Catalog,
        folder: &'static str,
    ) -> Result<Self, PlaylistError> {
        if catalog.is_empty() {
            return Err(PlaylistError::EmptyCatalog);
        }

        Ok(Self {
            storage,
            engine,
            catalog,
            folder,
            cursor: 0,
        })
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&MediaEntry> {
        self.catalog.get(self.cursor)
    }

    /// Plays the entry under the cursor once, then moves on only if the
    /// user asked to.
    pub fn step(&mut self) -> PlaybackOutcome {
        let Some(entry) = self.catalog.get(self.cursor) else {
            self.cursor = 0;
            return PlaybackOutcome::EndedNaturally;
        };

        let outcome = self.engine.play(&mut self.storage, self.folder, entry);
        if outcome == PlaybackOutcome::AdvanceRequested {
            self.cursor = (self.cursor + 1) % self.catalog.len();
            info!("playlist: advance to [{}]", self.cursor);
        }
        outcome
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    pub fn engine(&self) -> &PlaybackEngine<DSP, DEC, BTN, CLK, PS> {
        &self.engine
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_buffer::FrameBuffers;
    use crate::input::gesture::GestureConfig;
    use crate::settings::{DisplayPreference, Preferences};
    use crate::testing::{
        FakeDecoder, ManualClock, MemoryPreferenceStore, MemoryStorage, RecordingDisplay,
        ScriptedButton, mjpeg_clip,
    };

    const FOLDER: &str = "MJPEG";

    type TestPlaylist = Playlist<
        MemoryStorage,
        RecordingDisplay,
        FakeDecoder,
        ScriptedButton,
        ManualClock,
        MemoryPreferenceStore,
    >;

    fn playlist(storage: MemoryStorage, clock: &ManualClock, button: ScriptedButton) -> TestPlaylist {
        let mut storage = storage;
        let (catalog, _) = Catalog::build(&mut storage, FOLDER).unwrap();

        let mut preferences = Preferences::new(Some(MemoryPreferenceStore::default()));
        preferences.load();
        let mut engine = PlaybackEngine::new(
            RecordingDisplay::new(64, 64),
            FakeDecoder::default(),
            button,
            clock.clone(),
            preferences,
            FrameBuffers::allocate(64, 64).unwrap(),
            GestureConfig::default(),
        );
        engine.apply_preference().unwrap();

        Playlist::new(storage, engine, catalog, FOLDER).unwrap()
    }

    fn two_clips() -> MemoryStorage {
        MemoryStorage::new(FOLDER)
            .with_file("a.mjpeg", &mjpeg_clip(100, 32, 16))
            .with_file("b.mjpeg", &mjpeg_clip(20, 32, 16))
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let clock = ManualClock::new(1);
        let mut storage = MemoryStorage::new(FOLDER).with_file("notes.txt", b"x");
        let (catalog, _) = Catalog::build(&mut storage, FOLDER).unwrap();
        let engine = PlaybackEngine::new(
            RecordingDisplay::new(64, 64),
            FakeDecoder::default(),
            ScriptedButton::new(&clock),
            clock.clone(),
            Preferences::<MemoryPreferenceStore>::new(None),
            FrameBuffers::allocate(64, 64).unwrap(),
            GestureConfig::default(),
        );
        assert!(matches!(
            Playlist::new(storage, engine, catalog, FOLDER),
            Err(PlaylistError::EmptyCatalog)
        ));
    }

    #[test]
    fn natural_end_replays_the_same_entry() {
        let clock = ManualClock::new(1);
        let mut playlist = playlist(two_clips(), &clock, ScriptedButton::new(&clock));

        assert_eq!(playlist.step(), PlaybackOutcome::EndedNaturally);
        assert_eq!(playlist.cursor(), 0);
        assert_eq!(playlist.step(), PlaybackOutcome::EndedNaturally);
        assert_eq!(playlist.cursor(), 0);
        assert_eq!(playlist.storage().opened(), ["a.mjpeg", "a.mjpeg"]);
    }

    #[test]
    fn short_press_advances_then_natural_end_replays() {
        let clock = ManualClock::new(1);
        let button = ScriptedButton::new(&clock).with_press(50, 250);
        let mut playlist = playlist(two_clips(), &clock, button);

        assert_eq!(playlist.step(), PlaybackOutcome::AdvanceRequested);
        assert!(playlist.engine().last_session().frame_count < 100);
        assert_eq!(playlist.cursor(), 1);

        assert_eq!(playlist.step(), PlaybackOutcome::EndedNaturally);
        assert_eq!(playlist.engine().last_session().frame_count, 20);
        assert_eq!(playlist.cursor(), 1);

        assert_eq!(playlist.step(), PlaybackOutcome::EndedNaturally);
        assert_eq!(playlist.current().map(MediaEntry::name), Some("b.mjpeg"));
        assert_eq!(
            playlist.storage().opened(),
            ["a.mjpeg", "b.mjpeg", "b.mjpeg"]
        );
    }

    #[test]
    fn cursor_wraps_after_the_last_entry() {
        let clock = ManualClock::new(1);
        // One press per clip; each clip runs well past the press window.
        let button = ScriptedButton::new(&clock)
            .with_press(50, 250)
            .with_press(1_000, 1_200)
            .with_press(2_000, 2_200);
        let storage = MemoryStorage::new(FOLDER)
            .with_file("a.mjpeg", &mjpeg_clip(400, 32, 16))
            .with_file("b.mjpeg", &mjpeg_clip(400, 32, 16));
        let mut playlist = playlist(storage, &clock, button);

        assert_eq!(playlist.step(), PlaybackOutcome::AdvanceRequested);
        assert_eq!(playlist.cursor(), 1);
        assert_eq!(playlist.step(), PlaybackOutcome::AdvanceRequested);
        assert_eq!(playlist.cursor(), 0);
        assert_eq!(playlist.step(), PlaybackOutcome::AdvanceRequested);
        assert_eq!(playlist.cursor(), 1);
    }

    #[test]
    fn long_press_on_first_boot_persists_inverted_polarity() {
        let clock = ManualClock::new(1);
        let button = ScriptedButton::new(&clock).with_press(50, 1_500);
        let storage = MemoryStorage::new(FOLDER).with_file("a.mjpeg", &mjpeg_clip(200, 32, 16));
        let mut playlist = playlist(storage, &clock, button);

        assert_eq!(playlist.step(), PlaybackOutcome::EndedNaturally);
        assert_eq!(playlist.cursor(), 0);

        let engine = playlist.engine();
        assert_eq!(engine.display().inversions(), [true, false]);
        assert_eq!(engine.display().inverted(), Some(false));
        assert_eq!(
            engine.preferences().store().and_then(|store| store.record()),
            Some(DisplayPreference::new(false))
        );
    }

    #[test]
    fn removed_file_is_replayed_without_advancing() {
        let clock = ManualClock::new(1);
        let mut storage = two_clips();
        let (catalog, _) = Catalog::build(&mut storage, FOLDER).unwrap();
        storage.remove("a.mjpeg");

        let engine = PlaybackEngine::new(
            RecordingDisplay::new(64, 64),
            FakeDecoder::default(),
            ScriptedButton::new(&clock),
            clock.clone(),
            Preferences::<MemoryPreferenceStore>::new(None),
            FrameBuffers::allocate(64, 64).unwrap(),
            GestureConfig::default(),
        );
        let mut playlist = Playlist::new(storage, engine, catalog, FOLDER).unwrap();

        assert_eq!(playlist.step(), PlaybackOutcome::EndedNaturally);
        assert_eq!(playlist.cursor(), 0);
    }
}
