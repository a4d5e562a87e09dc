//! Event-Sinks
//!
//! Jeder Sink verarbeitet ein `TransitionEvent` unabhängig von den anderen.
//! Ein Fehler in einem Sink hält die übrigen nicht auf, der `Monitor`
//! sammelt ihn nur im `CycleReport`.

use crate::display::DisplayFormatter;
use crate::midi::{DEFAULT_MIDI_CHANNEL, DEFAULT_VELOCITY, NoteMessage};
use crate::topic::sensor_topic;
use crate::traits::{
    DisplayDevice, DisplayError, NoteError, NoteOutput, PublishError, PublishTransport,
    SessionState,
};
use crate::types::TransitionEvent;

/// Fehler eines einzelnen Sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    Display(DisplayError),
    Note(NoteError),
    Publish(PublishError),
}

impl From<DisplayError> for SinkError {
    fn from(error: DisplayError) -> Self {
        SinkError::Display(error)
    }
}

impl From<NoteError> for SinkError {
    fn from(error: NoteError) -> Self {
        SinkError::Note(error)
    }
}

impl From<PublishError> for SinkError {
    fn from(error: PublishError) -> Self {
        SinkError::Publish(error)
    }
}

/// Konsument von Übergangs-Events
pub trait EventSink {
    /// Kurzer Name für Logs
    fn name(&self) -> &'static str;

    fn consume(&mut self, event: &TransitionEvent) -> Result<(), SinkError>;
}

// ============================================================================
// DisplaySink
// ============================================================================

/// Schreibt jeden Übergang in das Feld des Kanals
pub struct DisplaySink<D> {
    display: D,
    formatter: DisplayFormatter,
}

impl<D: DisplayDevice> DisplaySink<D> {
    pub fn new(display: D, formatter: DisplayFormatter) -> Self {
        Self { display, formatter }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn formatter(&self) -> &DisplayFormatter {
        &self.formatter
    }
}

impl<D: DisplayDevice> EventSink for DisplaySink<D> {
    fn name(&self) -> &'static str {
        "display"
    }

    fn consume(&mut self, event: &TransitionEvent) -> Result<(), SinkError> {
        self.formatter.render(&mut self.display, event)?;
        Ok(())
    }
}

// ============================================================================
// NoteProtocolSink
// ============================================================================

/// Sendet "note on" / "note off" solange mindestens eine Session verbunden ist
///
/// Ohne Session werden Events verworfen, nicht gepuffert.
pub struct NoteProtocolSink<S, O> {
    session: S,
    output: O,
    velocity: u8,
    midi_channel: u8,
}

impl<S: SessionState, O: NoteOutput> NoteProtocolSink<S, O> {
    pub fn new(session: S, output: O) -> Self {
        Self {
            session,
            output,
            velocity: DEFAULT_VELOCITY,
            midi_channel: DEFAULT_MIDI_CHANNEL,
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_midi_channel(mut self, midi_channel: u8) -> Self {
        self.midi_channel = midi_channel;
        self
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}

impl<S: SessionState, O: NoteOutput> EventSink for NoteProtocolSink<S, O> {
    fn name(&self) -> &'static str {
        "midi"
    }

    fn consume(&mut self, event: &TransitionEvent) -> Result<(), SinkError> {
        if !self.session.is_connected() {
            return Ok(());
        }

        let message = NoteMessage::for_event(event, self.velocity, self.midi_channel);
        self.output.send(message)?;
        Ok(())
    }
}

// ============================================================================
// TelemetryPublishSink
// ============================================================================

/// Payload für einen aktiven Übergang
pub const PAYLOAD_ACTIVE: &[u8] = b"1";

/// Payload für die Rückkehr zur Baseline
pub const PAYLOAD_REST: &[u8] = b"0";

/// Published jeden Übergang auf `"<device-id>/sensorNN"`
///
/// Der Trigger-Zähler wird vom `Monitor` vor dem Dispatch erhöht
/// (Zählung im Telemetrie-Betrieb aktiviert), hier wird nur veröffentlicht.
pub struct TelemetryPublishSink<'a, P> {
    device_id: &'a str,
    transport: P,
}

impl<'a, P: PublishTransport> TelemetryPublishSink<'a, P> {
    pub fn new(device_id: &'a str, transport: P) -> Self {
        Self {
            device_id,
            transport,
        }
    }

    pub fn transport(&self) -> &P {
        &self.transport
    }
}

impl<P: PublishTransport> EventSink for TelemetryPublishSink<'_, P> {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn consume(&mut self, event: &TransitionEvent) -> Result<(), SinkError> {
        let topic = sensor_topic(self.device_id, event.channel)?;
        let payload = if event.is_active() {
            PAYLOAD_ACTIVE
        } else {
            PAYLOAD_REST
        };
        self.transport.publish(&topic, payload)?;
        Ok(())
    }
}
