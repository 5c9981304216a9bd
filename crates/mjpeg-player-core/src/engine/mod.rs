//! Per-file playback: read, decode, present, and react to the button.

mod session;

use core::fmt::Debug;

use log::{debug, info, warn};

pub use session::PlaybackSession;

use crate::catalog::MediaEntry;
use crate::clock::Clock;
use crate::decoder::FrameDecoder;
use crate::display::Display;
use crate::frame_buffer::FrameBuffers;
use crate::input::ButtonLine;
use crate::input::gesture::{Gesture, GestureConfig, GestureRecognizer};
use crate::layout::{FrameLayout, parse_frame_dimensions};
use crate::mjpeg::{MjpegError, MjpegReader};
use crate::settings::{DisplayPreference, PreferenceStore, Preferences};
use crate::storage::{MediaStorage, OpenError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaybackOutcome {
    EndedNaturally,
    AdvanceRequested,
}

/// Owns every peripheral touched while a file plays.
pub struct PlaybackEngine<DSP, DEC, BTN, CLK, PS> {
    display: DSP,
    decoder: DEC,
    button: BTN,
    clock: CLK,
    preferences: Preferences<PS>,
    buffers: FrameBuffers,
    gestures: GestureRecognizer,
    reader: MjpegReader,
    last_session: PlaybackSession,
    failed_entry: Option<MediaEntry>,
    open_failures: u32,
}

impl<DSP, DEC, BTN, CLK, PS> PlaybackEngine<DSP, DEC, BTN, CLK, PS>
where
    DSP: Display,
    DEC: FrameDecoder,
    BTN: ButtonLine,
    BTN::Error: Debug,
    CLK: Clock,
    PS: PreferenceStore,
    PS::Error: Debug,
{
    /// Seeds the gesture recognizer from the button level seen right now, so
    /// a button held through boot is not reported on release.
    pub fn new(
        display: DSP,
        decoder: DEC,
        mut button: BTN,
        clock: CLK,
        preferences: Preferences<PS>,
        buffers: FrameBuffers,
        gesture_config: GestureConfig,
    ) -> Self {
        let now_ms = clock.now_ms();
        let gestures = match button.sample() {
            Ok(level) => GestureRecognizer::new(gesture_config, level, now_ms),
            Err(err) => {
                warn!("input: initial sample failed ({:?}); assuming released", err);
                GestureRecognizer::idle(gesture_config, now_ms)
            }
        };

        Self {
            display,
            decoder,
            button,
            clock,
            preferences,
            buffers,
            gestures,
            reader: MjpegReader::new(),
            last_session: PlaybackSession::default(),
            failed_entry: None,
            open_failures: 0,
        }
    }

    /// Pushes the current polarity to the panel.
    pub fn apply_preference(&mut self) -> Result<(), DSP::Error> {
        let preference = self.preferences.current();
        self.display.set_inverted(preference.invert)
    }

    /// Plays one file from `folder` until it ends or a short press arrives.
    ///
    /// Open failures end the file naturally so the caller replays it.
    pub fn play<S>(&mut self, storage: &mut S, folder: &str, entry: &MediaEntry) -> PlaybackOutcome
    where
        S: MediaStorage,
    {
        let name = entry.name();
        let mut stream = match storage.open(folder, name) {
            Ok(stream) => stream,
            Err(err) => {
                self.note_open_failure(folder, entry, err);
                return self.outcome_after_idle_poll();
            }
        };
        self.failed_entry = None;
        self.open_failures = 0;

        info!("play: start {} ({} bytes)", name, entry.size_bytes());
        self.reader.reset();
        let (display_w, display_h) = self.display.size();
        let mut session = PlaybackSession::start(self.clock.now_ms());
        let mut outcome = PlaybackOutcome::EndedNaturally;

        loop {
            let (decode_buf, output_buf) = self.buffers.split_mut();

            let read_start = self.clock.now_ms();
            let next = self.reader.next_frame(&mut stream, decode_buf);
            session.read_ms += self.clock.now_ms().saturating_sub(read_start);

            let frame_len = match next {
                Ok(Some(len)) => len,
                Ok(None) => {
                    if self.poll_input() {
                        outcome = PlaybackOutcome::AdvanceRequested;
                    }
                    break;
                }
                Err(MjpegError::FrameTooLarge { capacity }) => {
                    warn!(
                        "play: {} frame {} exceeds decode buffer ({} bytes); ending file",
                        name, session.frame_count, capacity
                    );
                    break;
                }
                Err(MjpegError::Stream(err)) => {
                    warn!("play: {} read failed ({:?})", name, err);
                    break;
                }
            };
            let frame = &decode_buf[..frame_len];

            if session.layout.is_none() {
                session.layout = parse_frame_dimensions(frame).map(|(width, height)| {
                    FrameLayout::fit(width, height, display_w, display_h)
                });
            }

            match session.layout {
                Some(layout) => {
                    let display = &mut self.display;
                    let clock = &self.clock;
                    let mut present_ms = 0u64;
                    let mut blit_error = None;

                    let decode_start = clock.now_ms();
                    let result = self.decoder.decode(frame, layout.scale, output_buf, |region, pixels| {
                        let placed = region.translated(layout.origin.0, layout.origin.1);
                        if placed.is_empty() || !placed.fits_within(display_w, display_h) {
                            return true;
                        }
                        let blit_start = clock.now_ms();
                        let blitted = display.blit(placed, pixels);
                        present_ms += clock.now_ms().saturating_sub(blit_start);
                        match blitted {
                            Ok(()) => true,
                            Err(err) => {
                                blit_error = Some(err);
                                false
                            }
                        }
                    });
                    let decode_total = clock.now_ms().saturating_sub(decode_start);

                    session.present_ms += present_ms;
                    session.decode_ms += decode_total.saturating_sub(present_ms);
                    if let Some(err) = blit_error {
                        warn!("play: {} blit failed ({:?})", name, err);
                    }
                    if let Err(err) = result {
                        session.decode_errors += 1;
                        debug!("play: {} frame {} decode failed ({:?})", name, session.frame_count, err);
                    }
                }
                None => {
                    session.decode_errors += 1;
                    debug!("play: {} frame {} has no SOF header", name, session.frame_count);
                }
            }

            session.frame_count += 1;

            if self.poll_input() {
                outcome = PlaybackOutcome::AdvanceRequested;
                break;
            }
        }

        drop(stream);
        session.finish(self.clock.now_ms());
        log_session(name, &session, outcome);
        self.last_session = session;
        outcome
    }

    /// Samples the button once, applying a long press immediately.
    ///
    /// Returns `true` when a short press requested the next file.
    pub fn poll_input(&mut self) -> bool {
        let level = match self.button.sample() {
            Ok(level) => level,
            Err(err) => {
                debug!("input: sample failed ({:?})", err);
                return false;
            }
        };

        match self.gestures.poll(level, self.clock.now_ms()) {
            Some(Gesture::Long) => self.toggle_inversion(),
            Some(Gesture::Short) => debug!("input: short press"),
            None => {}
        }
        self.gestures.take_advance_request()
    }

    fn toggle_inversion(&mut self) {
        let DisplayPreference { invert } = self.preferences.toggle();
        if let Err(err) = self.display.set_inverted(invert) {
            warn!("display: set_inverted({}) failed ({:?})", invert, err);
        }
    }

    /// Warns on the first failure for an entry; replays of the same entry
    /// only log at debug level.
    fn note_open_failure<E: Debug>(&mut self, folder: &str, entry: &MediaEntry, err: OpenError<E>) {
        if self.failed_entry.as_ref() == Some(entry) {
            self.open_failures = self.open_failures.saturating_add(1);
            debug!(
                "play: {}/{} still unavailable attempts={}",
                folder,
                entry.name(),
                self.open_failures
            );
            return;
        }

        self.failed_entry = Some(entry.clone());
        self.open_failures = 1;
        let name = entry.name();
        match err {
            OpenError::NotFound => warn!("play: {}/{} not found", folder, name),
            OpenError::IsDirectory => warn!("play: {}/{} is a directory", folder, name),
            OpenError::Storage(err) => warn!("play: open {}/{} failed ({:?})", folder, name, err),
        }
    }

    fn outcome_after_idle_poll(&mut self) -> PlaybackOutcome {
        if self.poll_input() {
            PlaybackOutcome::AdvanceRequested
        } else {
            PlaybackOutcome::EndedNaturally
        }
    }

    /// Consecutive open failures of the most recently failed entry.
    pub const fn open_failures(&self) -> u32 {
        self.open_failures
    }

    pub fn last_session(&self) -> &PlaybackSession {
        &self.last_session
    }

    pub fn display(&self) -> &DSP {
        &self.display
    }

    pub fn decoder(&self) -> &DEC {
        &self.decoder
    }

    pub fn preferences(&self) -> &Preferences<PS> {
        &self.preferences
    }
}

fn log_session(name: &str, session: &PlaybackSession, outcome: PlaybackOutcome) {
    let (source, scale, origin) = match session.layout {
        Some(layout) => (layout.source, layout.scale.divisor(), layout.origin),
        None => ((0, 0), 1, (0, 0)),
    };
    info!(
        "play: done {} frames={} errors={} elapsed_ms={} fps={} read_ms={} decode_ms={} present_ms={} src={}x{} scale=1/{} at={},{} outcome={:?}",
        name,
        session.frame_count,
        session.decode_errors,
        session.elapsed_ms,
        session.fps(),
        session.read_ms,
        session.decode_ms,
        session.present_ms,
        source.0,
        source.1,
        scale,
        origin.0,
        origin.1,
        outcome
    );
}
