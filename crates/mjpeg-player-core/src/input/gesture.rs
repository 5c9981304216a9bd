//! Debounced short/long press recognizer for a single button line.
//!
//! The recognizer never blocks and owns no hardware: callers feed it a sampled
//! [`Level`] and a millisecond timestamp once per frame (or more often).

use super::Level;

pub const DEFAULT_DEBOUNCE_MS: u64 = 30;
pub const DEFAULT_LONG_PRESS_MS: u64 = 1_200;

/// Classified outcome of one completed press-release cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gesture {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct GestureConfig {
    debounce_ms: u64,
    long_press_ms: u64,
    active_low: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            active_low: true,
        }
    }
}

impl GestureConfig {
    pub const fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub const fn with_long_press_ms(mut self, long_press_ms: u64) -> Self {
        self.long_press_ms = long_press_ms;
        self
    }

    pub const fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }

    pub const fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }

    pub const fn long_press_ms(&self) -> u64 {
        self.long_press_ms
    }

    const fn idle_level(&self) -> Level {
        if self.active_low { Level::High } else { Level::Low }
    }
}

/// Snapshot of the recognizer internals, mostly for diagnostics.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct GestureState {
    pub raw_level: Level,
    pub stable_level: Level,
    /// Time of the last accepted edge.
    pub last_change_ms: u64,
    pub press_start_ms: Option<u64>,
}

/// One-shot "advance to next entry" latch with a single consumer.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct AdvanceSignal {
    pending: bool,
}

impl AdvanceSignal {
    pub const fn new() -> Self {
        Self { pending: false }
    }

    pub fn raise(&mut self) {
        self.pending = true;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns whether a request was pending and clears it.
    pub fn take(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GestureRecognizer {
    config: GestureConfig,
    raw_level: Level,
    raw_edge_ms: u64,
    stable_level: Level,
    last_change_ms: u64,
    press_start_ms: Option<u64>,
    advance: AdvanceSignal,
}

impl GestureRecognizer {
    /// Creates a recognizer seeded with the line level observed at boot.
    ///
    /// A button already held at boot never produces a gesture on release,
    /// since its press edge was not observed.
    pub fn new(config: GestureConfig, initial_level: Level, now_ms: u64) -> Self {
        Self {
            config,
            raw_level: initial_level,
            raw_edge_ms: now_ms,
            stable_level: initial_level,
            last_change_ms: now_ms,
            press_start_ms: None,
            advance: AdvanceSignal::new(),
        }
    }

    /// Recognizer for an idle line (released button).
    pub fn idle(config: GestureConfig, now_ms: u64) -> Self {
        Self::new(config, config.idle_level(), now_ms)
    }

    pub const fn config(&self) -> GestureConfig {
        self.config
    }

    pub const fn state(&self) -> GestureState {
        GestureState {
            raw_level: self.raw_level,
            stable_level: self.stable_level,
            last_change_ms: self.last_change_ms,
            press_start_ms: self.press_start_ms,
        }
    }

    /// Whether the debounced line currently reads as pressed.
    pub fn is_pressed(&self) -> bool {
        self.stable_level != self.config.idle_level()
    }

    /// Feeds one sample. Returns a gesture exactly once per completed
    /// press-release cycle; a short press also latches the advance request.
    ///
    /// A level that differs from the stable one is accepted at once unless
    /// the last accepted edge is younger than the debounce interval. A press
    /// whose raw release came sooner than that interval counts as a bounce.
    pub fn poll(&mut self, level: Level, now_ms: u64) -> Option<Gesture> {
        if level != self.raw_level {
            self.raw_level = level;
            self.raw_edge_ms = now_ms;
        }

        if level == self.stable_level {
            return None;
        }
        if now_ms.saturating_sub(self.last_change_ms) < self.config.debounce_ms {
            return None;
        }

        self.stable_level = level;
        self.last_change_ms = now_ms;
        if level != self.config.idle_level() {
            self.press_start_ms = Some(now_ms);
            return None;
        }

        let press_start_ms = self.press_start_ms.take()?;
        let held_ms = self.raw_edge_ms.saturating_sub(press_start_ms);
        if held_ms < self.config.debounce_ms {
            None
        } else if held_ms >= self.config.long_press_ms {
            Some(Gesture::Long)
        } else {
            self.advance.raise();
            Some(Gesture::Short)
        }
    }

    /// Consumes a pending short-press advance request.
    pub fn take_advance_request(&mut self) -> bool {
        self.advance.take()
    }

    pub const fn advance_pending(&self) -> bool {
        self.advance.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL_STEP_MS: u64 = 5;

    /// Holds the button for `held_ms` starting at `start_ms`, polling every
    /// few milliseconds until well after release. Collects emitted gestures.
    fn press_for(
        recognizer: &mut GestureRecognizer,
        start_ms: u64,
        held_ms: u64,
    ) -> (Vec<Gesture>, u64) {
        let mut gestures = Vec::new();
        let end_ms = start_ms + held_ms + 200;
        let mut now = start_ms;
        while now <= end_ms {
            let level = if now >= start_ms && now < start_ms + held_ms {
                Level::Low
            } else {
                Level::High
            };
            if let Some(gesture) = recognizer.poll(level, now) {
                gestures.push(gesture);
            }
            now += POLL_STEP_MS;
        }
        (gestures, end_ms)
    }

    fn recognizer() -> GestureRecognizer {
        GestureRecognizer::idle(GestureConfig::default(), 0)
    }

    #[test]
    fn bounce_shorter_than_debounce_emits_nothing() {
        let mut recognizer = recognizer();
        for (i, held) in [5, 10, 20, 25].into_iter().enumerate() {
            let start_ms = 1_000 + i as u64 * 1_000;
            let (gestures, _) = press_for(&mut recognizer, start_ms, held);
            assert!(gestures.is_empty(), "held={held}");
        }
        assert!(!recognizer.take_advance_request());
    }

    #[test]
    fn press_between_debounce_and_threshold_is_short() {
        for held in [40, 100, 600, 1_195] {
            let mut recognizer = recognizer();
            let (gestures, _) = press_for(&mut recognizer, 1_000, held);
            assert_eq!(gestures, [Gesture::Short], "held={held}");
            assert!(recognizer.take_advance_request());
            assert!(!recognizer.take_advance_request());
        }
    }

    #[test]
    fn press_at_or_above_threshold_is_long_only() {
        for held in [1_200, 1_500, 5_000] {
            let mut recognizer = recognizer();
            let (gestures, _) = press_for(&mut recognizer, 1_000, held);
            assert_eq!(gestures, [Gesture::Long], "held={held}");
            assert!(!recognizer.take_advance_request());
        }
    }

    #[test]
    fn chattering_edges_collapse_into_one_short_press() {
        let mut recognizer = recognizer();
        let samples = [
            (1_000, Level::Low),
            (1_003, Level::High),
            (1_006, Level::Low),
            (1_040, Level::Low),
            (1_200, Level::Low),
            (1_202, Level::High),
            (1_204, Level::Low),
            (1_206, Level::High),
            (1_240, Level::High),
            (1_400, Level::High),
        ];
        let emitted: Vec<_> = samples
            .iter()
            .filter_map(|&(now, level)| recognizer.poll(level, now))
            .collect();
        assert_eq!(emitted, [Gesture::Short]);
    }

    #[test]
    fn held_duration_runs_from_accepted_press_to_release() {
        let mut recognizer = recognizer();
        assert_eq!(recognizer.poll(Level::Low, 100), None);
        assert_eq!(recognizer.poll(Level::Low, 180), None);
        assert_eq!(recognizer.state().press_start_ms, Some(100));
        assert!(recognizer.is_pressed());

        // Released at 1_300: exactly the threshold after the press edge.
        assert_eq!(recognizer.poll(Level::High, 1_300), Some(Gesture::Long));
        assert_eq!(recognizer.state().last_change_ms, 1_300);
        assert!(!recognizer.is_pressed());
    }

    #[test]
    fn press_of_exactly_the_debounce_interval_is_short() {
        let mut recognizer = recognizer();
        let mut emitted = Vec::new();
        for now in 0..=400 {
            let level = if (100..130).contains(&now) { Level::Low } else { Level::High };
            emitted.extend(recognizer.poll(level, now));
        }
        assert_eq!(emitted, [Gesture::Short]);
        assert!(recognizer.take_advance_request());
    }

    #[test]
    fn frame_rate_polling_catches_a_quick_tap() {
        // One poll per ~40 ms frame; the tap is sampled low only once.
        let mut recognizer = recognizer();
        let mut emitted = Vec::new();
        for now in (0..=400).step_by(40) {
            let level = if (10..80).contains(&now) { Level::Low } else { Level::High };
            emitted.extend(recognizer.poll(level, now));
        }
        assert_eq!(emitted, [Gesture::Short]);
    }

    #[test]
    fn frame_rate_polling_classifies_a_long_hold() {
        let mut recognizer = recognizer();
        let mut emitted = Vec::new();
        for now in (0..=2_000).step_by(40) {
            let level = if (200..1_500).contains(&now) { Level::Low } else { Level::High };
            emitted.extend(recognizer.poll(level, now));
        }
        assert_eq!(emitted, [Gesture::Long]);
        assert!(!recognizer.take_advance_request());
    }

    #[test]
    fn edges_inside_the_lockout_are_ignored() {
        let mut recognizer = recognizer();
        assert_eq!(recognizer.poll(Level::Low, 100), None);
        assert_eq!(recognizer.poll(Level::High, 110), None);
        assert!(recognizer.is_pressed());
        assert_eq!(recognizer.state().last_change_ms, 100);
    }

    #[test]
    fn button_held_at_boot_is_ignored_until_next_press() {
        let mut recognizer = GestureRecognizer::new(GestureConfig::default(), Level::Low, 0);
        assert_eq!(recognizer.poll(Level::High, 50), None);
        assert_eq!(recognizer.poll(Level::High, 100), None);

        let (gestures, _) = press_for(&mut recognizer, 500, 80);
        assert_eq!(gestures, [Gesture::Short]);
    }

    #[test]
    fn pending_advance_survives_until_consumed() {
        let mut recognizer = recognizer();
        let (_, end_ms) = press_for(&mut recognizer, 0, 100);
        assert!(recognizer.advance_pending());

        // Extra idle polls do not clear or duplicate the latch.
        assert_eq!(recognizer.poll(Level::High, end_ms + 10), None);
        assert!(recognizer.take_advance_request());
        assert!(!recognizer.advance_pending());
    }

    #[test]
    fn active_high_lines_invert_the_idle_level() {
        let config = GestureConfig::default().with_active_low(false);
        let mut recognizer = GestureRecognizer::idle(config, 0);
        // Still inside the lockout that starts at creation.
        assert_eq!(recognizer.poll(Level::High, 10), None);
        assert!(!recognizer.is_pressed());
        assert_eq!(recognizer.poll(Level::High, 60), None);
        assert!(recognizer.is_pressed());
        assert_eq!(recognizer.poll(Level::Low, 200), Some(Gesture::Short));
    }
}
