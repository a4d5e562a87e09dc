// Library-Root: Firmware-Module für den ESP32-C6 Eingangs-Monitor
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod queue;
pub mod tasks;

// Re-exports von pinwatch-core
pub use pinwatch_core::{
    DeviceId, LedError, Monitor, MonitorSettings, NoteMessage, SessionCounter, SmartLedWriter,
    Topic,
};

// Embassy Channel-Typen
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use crate::config::{MIDI_QUEUE_DEPTH, TELEMETRY_QUEUE_DEPTH};

/// Anzahl verbundener AppleMIDI Sessions
///
/// Wird vom MIDI Task geschrieben und vom Monitor Task gelesen,
/// daher ein Atomic statt eines Channels.
pub static MIDI_SESSIONS: SessionCounter = SessionCounter::new();

/// Maximale Payload-Länge einer Telemetrie-Nachricht ("0" / "1")
pub const TELEMETRY_PAYLOAD_CAPACITY: usize = 8;

/// Telemetrie-Nachricht (Monitor Task → MQTT Task)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryMessage {
    pub topic: Topic,
    pub payload: heapless::Vec<u8, TELEMETRY_PAYLOAD_CAPACITY>,
}

impl defmt::Format for TelemetryMessage {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "{} = {=[u8]:a}",
            self.topic.as_str(),
            self.payload.as_slice()
        );
    }
}

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================
//
// Statt:  Sender<'static, NoopRawMutex, NoteMessage, 16>
// Nutze:  NoteSender

/// Channel für Note-Events (Monitor Task → MIDI Task)
pub type NoteChannel = Channel<NoopRawMutex, NoteMessage, MIDI_QUEUE_DEPTH>;

/// Sender für Note-Events, wird vom `NoteProtocolSink` befüllt
pub type NoteSender = Sender<'static, NoopRawMutex, NoteMessage, MIDI_QUEUE_DEPTH>;

/// Receiver für Note-Events (MIDI Task)
pub type NoteReceiver = Receiver<'static, NoopRawMutex, NoteMessage, MIDI_QUEUE_DEPTH>;

/// Channel für Telemetrie (Monitor Task → MQTT Task)
pub type TelemetryChannel = Channel<NoopRawMutex, TelemetryMessage, TELEMETRY_QUEUE_DEPTH>;

pub type TelemetrySender = Sender<'static, NoopRawMutex, TelemetryMessage, TELEMETRY_QUEUE_DEPTH>;

pub type TelemetryReceiver =
    Receiver<'static, NoopRawMutex, TelemetryMessage, TELEMETRY_QUEUE_DEPTH>;
