//! Flankenerkennung
//!
//! Vergleicht die frisch gelesenen Pegel mit dem stabilen Zustand der Bank.
//! Kanäle werden jeden Zyklus in aufsteigender Reihenfolge ausgewertet,
//! der stabile Pegel wird sofort pro Kanal übernommen.

use crate::bank::ChannelBank;
use crate::traits::InputSource;
use crate::types::{Classification, Events, Level, TransitionEvent};

/// Optionaler Rauschfilter
///
/// Ein abweichender Pegel wird erst zur Flanke, wenn er mindestens
/// `confirm_ms` lang unverändert anliegt. Springt der Eingang vorher
/// zurück, wird der Wechsel verworfen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoiseFilter {
    pub confirm_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    level: Level,
    since_ms: u64,
}

pub struct EdgeDetector<const N: usize> {
    filter: Option<NoiseFilter>,
    pending: [Option<Pending>; N],
}

impl<const N: usize> EdgeDetector<N> {
    /// Ohne Filter: jede Pegeländerung ist sofort eine Flanke
    pub fn new() -> Self {
        Self::with_filter(None)
    }

    pub fn with_filter(filter: Option<NoiseFilter>) -> Self {
        Self {
            filter,
            pending: [None; N],
        }
    }

    pub fn filter(&self) -> Option<NoiseFilter> {
        self.filter
    }

    /// Erzeugt die Events für diesen Zyklus und aktualisiert die Bank
    pub fn detect<I: InputSource>(
        &mut self,
        bank: &mut ChannelBank<I, N>,
        raw: &[Level; N],
        now_ms: u64,
    ) -> Events<N> {
        let mut events = Events::new();

        for (channel, &level) in raw.iter().enumerate() {
            let previous = bank.stable(channel);
            if !self.confirm(channel, previous, level, now_ms) {
                continue;
            }

            bank.commit(channel, level);

            // Kapazität N, höchstens ein Event pro Kanal
            let _ = events.push(TransitionEvent {
                channel,
                previous,
                level,
                class: Classification::of(level, bank.baseline(channel)),
                trigger_count: None,
            });
        }

        events
    }

    fn confirm(&mut self, channel: usize, stable: Level, level: Level, now_ms: u64) -> bool {
        if level == stable {
            self.pending[channel] = None;
            return false;
        }

        let Some(filter) = self.filter else {
            return true;
        };

        match self.pending[channel] {
            Some(pending) if pending.level == level => {
                if now_ms.saturating_sub(pending.since_ms) >= filter.confirm_ms {
                    self.pending[channel] = None;
                    true
                } else {
                    false
                }
            }
            _ => {
                if filter.confirm_ms == 0 {
                    return true;
                }
                self.pending[channel] = Some(Pending {
                    level,
                    since_ms: now_ms,
                });
                false
            }
        }
    }
}

impl<const N: usize> Default for EdgeDetector<N> {
    fn default() -> Self {
        Self::new()
    }
}
