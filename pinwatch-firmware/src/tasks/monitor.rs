// Monitor Task - Überwacht die 8 Eingänge des MCP23008
//
// Teilt sich den I2C Bus mit dem SSD1306 (RefCell, ein Task).
// Jeder Zyklus: Port lesen → Flanken → Display / MIDI / MQTT → LED.
use core::cell::RefCell;

use defmt::{error, info, warn};
use embassy_futures::yield_now;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal_bus::i2c::RefCellDevice;
use esp_hal::Blocking;
use esp_hal::i2c::master::I2c;
use esp_hal::peripherals::{GPIO8, RMT};
use esp_hal_smartled::smart_led_buffer;
use heapless::Vec;
use pinwatch_core::drivers::ssd1306::COLUMNS;
use pinwatch_core::drivers::{Mcp23008, Ssd1306};
use pinwatch_core::{
    CHANNEL_COUNT, DeviceId, DisplayDevice, DisplayFormatter, DisplaySink, EventSink, Monitor,
    MonitorSettings, NoteProtocolSink, SmartLedWriter, TelemetryPublishSink,
};

use crate::config::*;
use crate::hal::RmtLedWriter;
use crate::queue::{QueuedNotes, QueuedTelemetry};
use crate::{MIDI_SESSIONS, NoteSender, TelemetrySender};

/// Monitor Task
///
/// # Ablauf
/// 1. Display initialisieren, LED leuchtet während der Initialisierung
/// 2. MCP23008 suchen und als 8 Eingänge mit Pull-Up konfigurieren
/// 3. Anfangszustand lesen, Form zeichnen, Identität anzeigen
/// 4. Endlos pollen, zwischen zwei Zyklen `yield_now()`
///
/// Ohne MCP23008 gibt es nichts zu überwachen: Fehler anzeigen und parken.
///
/// # Parameter
/// - `i2c`: I2C Bus (SDA/SCL bereits zugewiesen)
/// - `notes`: Queue zum MIDI Task (`None` ohne Feature `midi`)
/// - `telemetry`: Queue zum MQTT Task (`None` ohne Feature `telemetry`)
#[embassy_executor::task]
pub async fn monitor_task(
    i2c: I2c<'static, Blocking>,
    gpio8: GPIO8<'static>,
    rmt: RMT<'static>,
    identity: &'static DeviceId,
    notes: Option<NoteSender>,
    telemetry: Option<TelemetrySender>,
) {
    let bus = RefCell::new(i2c);

    let mut display = Ssd1306::new(RefCellDevice::new(&bus), SSD1306_ADDRESS);
    if let Err(e) = display.init() {
        // Ohne Display läuft der Monitor trotzdem (Logs, MIDI, MQTT)
        warn!("Display: Init failed: {}", e);
    }

    let mut rmt_buffer = smart_led_buffer!(1);
    let mut led = match RmtLedWriter::new(gpio8, rmt, RMT_CLOCK_MHZ, &mut rmt_buffer) {
        Ok(led) => led,
        Err(e) => {
            error!("LED: RMT init failed: {}", e);
            park().await
        }
    };
    if let Err(e) = led.write(SETUP_COLOR) {
        warn!("LED: {}", e);
    }

    let mut expander = Mcp23008::new(RefCellDevice::new(&bus), MCP23008_ADDRESS);
    if let Err(e) = expander.init() {
        error!(
            "MCP23008: No device at {=u8:#04x}: {}",
            MCP23008_ADDRESS, e
        );
        show_error(&mut display, "MCP I2C Error");
        park().await
    }
    info!("MCP23008: 8 inputs with pull-up ready");

    let settings = MonitorSettings {
        pulse_ms: ACTIVITY_PULSE_MS,
        activity_color: ACTIVITY_COLOR,
        count_triggers: COUNT_TRIGGERS,
        noise_filter: NOISE_FILTER,
    };
    let mut monitor: Monitor<_, _, CHANNEL_COUNT> = match Monitor::start(expander, led, settings) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("MCP23008: Initial read failed: {}", e);
            show_error(&mut display, "MCP I2C Error");
            park().await
        }
    };

    let formatter = DisplayFormatter::new(FIELD_LAYOUT, DISPLAY_MODE);
    if let Err(e) = formatter.draw_form(&mut display, monitor.bank()) {
        warn!("Display: Form failed: {}", e);
    }
    if let Err(e) = show_identity(&mut display, identity) {
        warn!("Display: Identity failed: {}", e);
    }

    for (index, channel) in monitor.bank().channels().iter().enumerate() {
        info!(
            "{=usize:02} {} (baseline)",
            index + 1,
            channel.stable().as_str()
        );
    }

    // Initialisierung fertig
    if let Err(e) = monitor.indicator_mut().reset() {
        warn!("LED: {}", e);
    }

    // Sinks in fester Reihenfolge: Display, MIDI, Telemetrie
    let mut display_sink = DisplaySink::new(display, formatter);
    let mut note_sink = notes.map(|sender| {
        NoteProtocolSink::new(&MIDI_SESSIONS, QueuedNotes::new(sender))
            .with_velocity(MIDI_VELOCITY)
            .with_midi_channel(MIDI_CHANNEL)
    });
    let mut telemetry_sink = telemetry
        .map(|sender| TelemetryPublishSink::new(identity.as_str(), QueuedTelemetry::new(sender)));

    let mut sinks: Vec<&mut dyn EventSink, 3> = Vec::new();
    let _ = sinks.push(&mut display_sink);
    if let Some(sink) = note_sink.as_mut() {
        let _ = sinks.push(sink);
    }
    if let Some(sink) = telemetry_sink.as_mut() {
        let _ = sinks.push(sink);
    }

    info!("Monitor: Polling {} channels", CHANNEL_COUNT);

    let mut read_failing = false;
    loop {
        yield_now().await;

        let now_ms = Instant::now().as_millis();
        match monitor.poll(now_ms, &mut sinks) {
            Ok(report) => {
                if read_failing {
                    info!("MCP23008: Reads recovered");
                    read_failing = false;
                }
                for event in report.events.iter() {
                    info!("{=usize:02} {}", event.number(), event.level.as_str());
                }
                for failure in report.failures.iter() {
                    warn!(
                        "Sink '{}' failed for channel {=usize:02}: {}",
                        failure.sink,
                        failure.channel + 1,
                        failure.error
                    );
                }
                if let Some(e) = report.indicator_error {
                    warn!("LED: {}", e);
                }
            }
            Err(e) => {
                // Zyklus entfällt, nur den ersten Fehler einer Serie loggen
                if !read_failing {
                    warn!("MCP23008: Read failed, skipping cycle: {}", e.input);
                    read_failing = true;
                }
                if let Some(e) = e.indicator_error {
                    warn!("LED: {}", e);
                }
            }
        }
    }
}

/// Geräte-Identität in der Zeile unter der Form
fn show_identity<D: DisplayDevice>(
    display: &mut D,
    identity: &DeviceId,
) -> Result<(), pinwatch_core::DisplayError> {
    display.clear_field(0, IDENTITY_ROW, COLUMNS)?;
    display.write(identity.as_str(), false)
}

fn show_error<D: DisplayDevice>(display: &mut D, message: &str) {
    let shown = display
        .clear()
        .and_then(|_| display.clear_field(0, 0, COLUMNS))
        .and_then(|_| display.write(message, true));
    if shown.is_err() {
        error!("Display: Cannot show '{}'", message);
    }
}

/// Task anhalten (fataler Fehler, Neustart nur per Reset)
async fn park() -> ! {
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
