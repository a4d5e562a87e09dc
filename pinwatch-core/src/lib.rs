//! Pinwatch Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Chip-Dependencies.
//! Sie definiert die Traits zu den Kollaborateuren, die Poll-Loop mit
//! Flankenerkennung, Display-Formatierung und Sinks sowie Treiber,
//! die nur gegen `embedded-hal` Traits geschrieben sind.
//!
//! Datenfluss pro Zyklus:
//! `InputSource` → `EdgeDetector` → {`DisplayFormatter`, Sinks} → `ActivityIndicator`

#![no_std]

pub mod applemidi;
pub mod bank;
pub mod display;
pub mod drivers;
pub mod edge;
pub mod identity;
pub mod indicator;
pub mod midi;
pub mod monitor;
pub mod session;
pub mod sinks;
pub mod topic;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use bank::{Channel, ChannelBank};
pub use display::{DisplayFormatter, DisplayMode, FieldLayout, FieldPosition};
pub use edge::{EdgeDetector, NoiseFilter};
pub use identity::{DeviceId, chip_id, device_identity};
pub use indicator::{ActivityIndicator, IndicatorState};
pub use midi::NoteMessage;
pub use monitor::{CycleError, CycleReport, Monitor, MonitorSettings, SinkFailure};
pub use session::{Peer, PeerTable, SessionCounter};
pub use sinks::{DisplaySink, EventSink, NoteProtocolSink, SinkError, TelemetryPublishSink};
pub use topic::{Topic, sensor_topic};
pub use traits::{
    DisplayDevice, DisplayError, InputError, InputSource, LedError, NoteError, NoteOutput,
    PublishError, PublishTransport, SessionState, SmartLedWriter,
};
pub use types::{CHANNEL_COUNT, Classification, Events, Level, TransitionEvent};
