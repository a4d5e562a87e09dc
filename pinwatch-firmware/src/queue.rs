// Queue-Adapter: Sinks des Monitor Tasks → Netzwerk-Tasks
//
// Der Monitor läuft synchron, daher nur `try_send`.
// Ist die Queue voll, gilt das Event als nicht zugestellt.

use pinwatch_core::{NoteError, NoteMessage, NoteOutput, PublishError, PublishTransport, Topic};

use crate::{NoteSender, TelemetryMessage, TelemetrySender};

/// `NoteOutput` über die Note-Queue zum MIDI Task
pub struct QueuedNotes {
    sender: NoteSender,
}

impl QueuedNotes {
    pub fn new(sender: NoteSender) -> Self {
        Self { sender }
    }
}

impl NoteOutput for QueuedNotes {
    fn send(&mut self, message: NoteMessage) -> Result<(), NoteError> {
        self.sender
            .try_send(message)
            .map_err(|_| NoteError::QueueFull)
    }
}

/// `PublishTransport` über die Telemetrie-Queue zum MQTT Task
pub struct QueuedTelemetry {
    sender: TelemetrySender,
}

impl QueuedTelemetry {
    pub fn new(sender: TelemetrySender) -> Self {
        Self { sender }
    }
}

impl PublishTransport for QueuedTelemetry {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let topic = Topic::try_from(topic).map_err(|_| PublishError::TooLong)?;
        let payload = heapless::Vec::from_slice(payload).map_err(|_| PublishError::TooLong)?;

        self.sender
            .try_send(TelemetryMessage { topic, payload })
            .map_err(|_| PublishError::QueueFull)
    }
}
