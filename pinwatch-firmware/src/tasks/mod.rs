// Task-Modul: Enthält alle Embassy Tasks
//
// Der Monitor Task ist immer aktiv. MIDI und MQTT hängen an den Features
// `midi` / `telemetry` und bekommen Events über Embassy Channels.

#[cfg(feature = "midi")]
pub mod midi;
pub mod mdns;
pub mod monitor;
#[cfg(feature = "telemetry")]
pub mod mqtt;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use mdns::mdns_responder_task;
#[cfg(feature = "midi")]
pub use midi::midi_task;
pub use monitor::monitor_task;
#[cfg(feature = "telemetry")]
pub use mqtt::mqtt_task;
pub use wifi::{connection_task, dhcp_task, net_task};
