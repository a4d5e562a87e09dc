//! Kanal-Zustände aller überwachten Eingänge
//!
//! Die Bank besitzt die `InputSource` und hält pro Kanal den stabilen
//! Pegel, die Baseline vom Start und den Trigger-Zähler.
//! Der stabile Pegel wird ausschließlich vom `EdgeDetector` geschrieben.

use crate::traits::{InputError, InputSource};
use crate::types::{Classification, Level};

/// Zustand eines einzelnen Kanals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    stable: Level,
    baseline: Level,
    trigger_count: u32,
}

impl Channel {
    const fn new() -> Self {
        Self {
            stable: Level::DEASSERTED,
            baseline: Level::DEASSERTED,
            trigger_count: 0,
        }
    }

    pub fn stable(&self) -> Level {
        self.stable
    }

    pub fn baseline(&self) -> Level {
        self.baseline
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    /// Einordnung des aktuellen stabilen Pegels
    pub fn class(&self) -> Classification {
        Classification::of(self.stable, self.baseline)
    }
}

/// Feste Menge von `N` Kanälen
///
/// Ein Index außerhalb von `0..N` ist ein Programmierfehler und führt zu Panic.
pub struct ChannelBank<I, const N: usize> {
    input: I,
    channels: [Channel; N],
}

impl<I: InputSource, const N: usize> ChannelBank<I, N> {
    /// Liest alle Eingänge einmal und übernimmt die Pegel als
    /// stabilen Zustand und als Baseline.
    pub fn new(mut input: I) -> Result<Self, InputError> {
        let initial: [Level; N] = input.read_all()?;
        let mut channels = [Channel::new(); N];
        for (channel, level) in channels.iter_mut().zip(initial) {
            channel.stable = level;
            channel.baseline = level;
        }
        Ok(Self { input, channels })
    }

    /// Aktuelle Roh-Pegel aller Kanäle (frisch gelesen)
    pub fn read_all(&mut self) -> Result<[Level; N], InputError> {
        self.input.read_all()
    }

    pub fn stable(&self, index: usize) -> Level {
        self.channels[index].stable
    }

    pub fn baseline(&self, index: usize) -> Level {
        self.channels[index].baseline
    }

    pub fn trigger_count(&self, index: usize) -> u32 {
        self.channels[index].trigger_count
    }

    pub fn channel(&self, index: usize) -> &Channel {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Channel; N] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Übernimmt einen erkannten Pegelwechsel (nur EdgeDetector)
    pub(crate) fn commit(&mut self, index: usize, level: Level) {
        self.channels[index].stable = level;
    }

    /// Zählt einen aktiven Trigger und gibt den neuen Zählerstand zurück
    pub(crate) fn count_trigger(&mut self, index: usize) -> u32 {
        let channel = &mut self.channels[index];
        channel.trigger_count = channel.trigger_count.saturating_add(1);
        channel.trigger_count
    }
}
