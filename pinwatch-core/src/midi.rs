//! MIDI Note-Nachrichten für Kanal-Übergänge

use crate::types::{Level, TransitionEvent};

/// Standard-Velocity für Note-Events
pub const DEFAULT_VELOCITY: u8 = 64;

/// MIDI-Kanal (1-16) für alle Note-Events
pub const DEFAULT_MIDI_CHANNEL: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NoteMessage {
    On { note: u8, velocity: u8, channel: u8 },
    Off { note: u8, velocity: u8, channel: u8 },
}

impl NoteMessage {
    /// Note-Nummer = Kanal-Index + 1; HIGH erzeugt "note on", LOW "note off"
    ///
    /// Die Polarität ist hier absolut, nicht relativ zur Baseline.
    pub fn for_event(event: &TransitionEvent, velocity: u8, channel: u8) -> Self {
        let note = event.number() as u8;
        match event.level {
            Level::High => NoteMessage::On {
                note,
                velocity,
                channel,
            },
            Level::Low => NoteMessage::Off {
                note,
                velocity,
                channel,
            },
        }
    }

    pub fn note(&self) -> u8 {
        match *self {
            NoteMessage::On { note, .. } | NoteMessage::Off { note, .. } => note,
        }
    }

    /// Drei Bytes MIDI (Status, Note, Velocity)
    pub fn to_bytes(&self) -> [u8; 3] {
        let (status, note, velocity, channel) = match *self {
            NoteMessage::On {
                note,
                velocity,
                channel,
            } => (0x90, note, velocity, channel),
            NoteMessage::Off {
                note,
                velocity,
                channel,
            } => (0x80, note, velocity, channel),
        };
        [
            status | (channel.saturating_sub(1) & 0x0F),
            note & 0x7F,
            velocity & 0x7F,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classification;

    fn event(channel: usize, level: Level) -> TransitionEvent {
        TransitionEvent {
            channel,
            previous: Level::Low,
            level,
            class: Classification::Active,
            trigger_count: None,
        }
    }

    #[test]
    fn test_high_is_note_on() {
        let msg = NoteMessage::for_event(&event(0, Level::High), 64, 1);
        assert_eq!(msg, NoteMessage::On { note: 1, velocity: 64, channel: 1 });
        assert_eq!(msg.to_bytes(), [0x90, 1, 64]);
    }

    #[test]
    fn test_low_is_note_off() {
        let msg = NoteMessage::for_event(&event(7, Level::Low), 64, 1);
        assert_eq!(msg.to_bytes(), [0x80, 8, 64]);
    }

    #[test]
    fn test_midi_channel_in_status_nibble() {
        let msg = NoteMessage::On { note: 3, velocity: 100, channel: 10 };
        assert_eq!(msg.to_bytes()[0], 0x99);
    }
}
