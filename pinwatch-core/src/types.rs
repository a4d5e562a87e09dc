//! Core Types für die Eingangs-Überwachung
//!
//! Datenstrukturen ohne Hardware-Dependencies

use heapless::Vec;

/// Anzahl der überwachten Eingänge (ein MCP23008 Port)
pub const CHANNEL_COUNT: usize = 8;

/// Logischer Pegel eines Eingangs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Ruhepegel: Eingänge hängen an Pull-ups, ein offener Kontakt liest HIGH
    pub const DEASSERTED: Level = Level::High;

    /// Zustandswort für Display und Log
    pub fn as_str(self) -> &'static str {
        match self {
            Level::High => "HIGH",
            Level::Low => "LOW",
        }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Einordnung eines Übergangs relativ zum Start-Pegel (Baseline)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Classification {
    /// Neuer Pegel entspricht der Baseline
    Rest,
    /// Neuer Pegel weicht von der Baseline ab
    Active,
}

impl Classification {
    pub fn of(level: Level, baseline: Level) -> Self {
        if level == baseline {
            Classification::Rest
        } else {
            Classification::Active
        }
    }
}

/// Pegelwechsel eines Kanals innerhalb eines Poll-Zyklus
///
/// Wird vom EdgeDetector erzeugt und noch im selben Zyklus
/// an alle Sinks verteilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    /// Kanal-Index (0-basiert)
    pub channel: usize,
    /// Stabiler Pegel vor dem Wechsel
    pub previous: Level,
    /// Neuer Pegel
    pub level: Level,
    pub class: Classification,
    /// Trigger-Zähler nach diesem Wechsel (nur wenn Zählung aktiv ist)
    pub trigger_count: Option<u32>,
}

impl TransitionEvent {
    /// Kanal-Nummer wie auf dem Display (1-basiert)
    pub fn number(&self) -> usize {
        self.channel + 1
    }

    pub fn is_active(&self) -> bool {
        self.class == Classification::Active
    }
}

/// Alle Events eines Zyklus, aufsteigend nach Kanal-Index
pub type Events<const N: usize> = Vec<TransitionEvent, N>;

// ============================================================================
// defmt::Format Implementations (optional feature)
// ============================================================================

#[cfg(feature = "defmt")]
impl defmt::Format for TransitionEvent {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "TransitionEvent {{ channel: {:02}, {} -> {}, {} }}",
            self.number(),
            self.previous.as_str(),
            self.level.as_str(),
            self.class
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_relative_to_baseline() {
        assert_eq!(Classification::of(Level::High, Level::High), Classification::Rest);
        assert_eq!(Classification::of(Level::Low, Level::High), Classification::Active);
        assert_eq!(Classification::of(Level::High, Level::Low), Classification::Active);
    }

    #[test]
    fn test_level_words_fit_field() {
        assert_eq!(Level::High.as_str(), "HIGH");
        assert_eq!(Level::Low.as_str(), "LOW");
        assert!(Level::from(true).is_high());
    }
}
