//! Integration Tests für die Poll-Loop
//!
//! Diese Tests laufen auf dem Host (x86_64) und nutzen Mocks für
//! Eingänge, Display, LED, Session und Transporte.

use std::cell::RefCell;
use std::rc::Rc;

use pinwatch_core::{
    CHANNEL_COUNT, Classification, DisplayDevice, DisplayError, DisplayFormatter, DisplayMode,
    DisplaySink, EventSink, FieldLayout, IndicatorState, InputError, InputSource, LedError, Level,
    Monitor, MonitorSettings, NoiseFilter, NoteError, NoteMessage, NoteOutput,
    NoteProtocolSink, PublishError, PublishTransport, SessionState, SinkError, SmartLedWriter,
    TelemetryPublishSink,
};
use rgb::RGB8;

const ON: RGB8 = RGB8 { r: 0, g: 0, b: 10 };
const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

// ============================================================================
// Mock Input
// ============================================================================

/// Eingänge, die der Test nach dem Start des Monitors noch umschalten kann
#[derive(Clone)]
pub struct MockInput {
    levels: Rc<RefCell<[Level; CHANNEL_COUNT]>>,
    failing: Rc<RefCell<bool>>,
}

impl MockInput {
    /// Alle Eingänge offen (Pull-up → HIGH)
    pub fn new() -> Self {
        Self {
            levels: Rc::new(RefCell::new([Level::High; CHANNEL_COUNT])),
            failing: Rc::new(RefCell::new(false)),
        }
    }

    pub fn set(&self, channel: usize, level: Level) {
        self.levels.borrow_mut()[channel] = level;
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.borrow_mut() = failing;
    }
}

impl InputSource for MockInput {
    fn read(&mut self, channel: usize) -> Result<Level, InputError> {
        if *self.failing.borrow() {
            return Err(InputError::Bus);
        }
        Ok(self.levels.borrow()[channel])
    }
}

// ============================================================================
// Mock Display
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Clear,
    ClearField { column: u8, row: u8, width: u8 },
    Write { text: String, invert: bool },
}

#[derive(Default)]
pub struct MockDisplay {
    pub ops: Vec<DisplayOp>,
    pub fail_writes: bool,
}

impl MockDisplay {
    /// Geschriebene Texte ohne Clear-Operationen
    pub fn writes(&self) -> Vec<(&str, bool)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Write { text, invert } => Some((text.as_str(), *invert)),
                _ => None,
            })
            .collect()
    }
}

impl DisplayDevice for MockDisplay {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.ops.push(DisplayOp::Clear);
        Ok(())
    }

    fn clear_field(&mut self, column: u8, row: u8, width: u8) -> Result<(), DisplayError> {
        self.ops.push(DisplayOp::ClearField { column, row, width });
        Ok(())
    }

    fn write(&mut self, text: &str, invert: bool) -> Result<(), DisplayError> {
        if self.fail_writes {
            return Err(DisplayError::Bus);
        }
        self.ops.push(DisplayOp::Write {
            text: text.to_string(),
            invert,
        });
        Ok(())
    }
}

// ============================================================================
// Mock LED
// ============================================================================

#[derive(Default)]
pub struct MockLed {
    pub writes: Vec<RGB8>,
    pub fail_next_write: bool,
}

impl SmartLedWriter for MockLed {
    fn write(&mut self, color: RGB8) -> Result<(), LedError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(LedError::WriteFailed);
        }
        self.writes.push(color);
        Ok(())
    }
}

// ============================================================================
// Mock Session / Note-Ausgang / Publisher
// ============================================================================

pub struct MockSession {
    pub connected: u8,
}

impl SessionState for MockSession {
    fn connected_sessions(&self) -> u8 {
        self.connected
    }
}

#[derive(Default)]
pub struct MockNotes {
    pub sent: Vec<NoteMessage>,
}

impl NoteOutput for MockNotes {
    fn send(&mut self, message: NoteMessage) -> Result<(), NoteError> {
        self.sent.push(message);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPublisher {
    pub published: Vec<(String, Vec<u8>)>,
    pub queue_full: bool,
}

impl PublishTransport for MockPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.queue_full {
            return Err(PublishError::QueueFull);
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn settings(count_triggers: bool) -> MonitorSettings {
    MonitorSettings {
        pulse_ms: 10,
        activity_color: ON,
        count_triggers,
        noise_filter: None,
    }
}

fn start(
    input: &MockInput,
    count_triggers: bool,
) -> Monitor<MockInput, MockLed, CHANNEL_COUNT> {
    Monitor::start(input.clone(), MockLed::default(), settings(count_triggers)).unwrap()
}

fn display_sink(mode: DisplayMode) -> DisplaySink<MockDisplay> {
    DisplaySink::new(
        MockDisplay::default(),
        DisplayFormatter::new(FieldLayout::default(), mode),
    )
}

// ============================================================================
// Tests: Szenarien
// ============================================================================

#[test]
fn test_channel_goes_active_publishes_and_counts() {
    let input = MockInput::new();
    let mut monitor = start(&input, true);
    let mut telemetry = TelemetryPublishSink::new("dev01", MockPublisher::default());

    input.set(3, Level::Low);
    let report = monitor.poll(0, &mut [&mut telemetry]).unwrap();

    assert_eq!(report.events.len(), 1);
    let event = report.events[0];
    assert_eq!(event.channel, 3);
    assert_eq!(event.class, Classification::Active);
    assert_eq!(event.trigger_count, Some(1));
    assert_eq!(monitor.bank().trigger_count(3), 1);
    assert_eq!(
        telemetry.transport().published,
        vec![("dev01/sensor04".to_string(), b"1".to_vec())]
    );
}

#[test]
fn test_return_to_baseline_does_not_count() {
    let input = MockInput::new();
    let mut monitor = start(&input, true);
    let mut telemetry = TelemetryPublishSink::new("dev01", MockPublisher::default());

    input.set(3, Level::Low);
    monitor.poll(0, &mut [&mut telemetry]).unwrap();
    input.set(3, Level::High);
    let report = monitor.poll(1, &mut [&mut telemetry]).unwrap();

    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].class, Classification::Rest);
    assert_eq!(report.events[0].trigger_count, Some(1));
    assert_eq!(monitor.bank().trigger_count(3), 1);
    assert_eq!(
        telemetry.transport().published.last(),
        Some(&("dev01/sensor04".to_string(), b"0".to_vec()))
    );
}

#[test]
fn test_no_session_drops_notes_but_updates_display() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    let mut display = display_sink(DisplayMode::StateWord);
    let mut midi = NoteProtocolSink::new(MockSession { connected: 0 }, MockNotes::default());

    input.set(0, Level::Low);
    let report = monitor.poll(0, &mut [&mut display, &mut midi]).unwrap();

    assert_eq!(report.events.len(), 1);
    assert!(report.failures.is_empty());
    assert_eq!(
        display.display().ops,
        vec![
            DisplayOp::ClearField {
                column: 4,
                row: 0,
                width: 4
            },
            DisplayOp::Write {
                text: "LOW".to_string(),
                invert: false
            },
        ]
    );
    assert!(midi.output().sent.is_empty());
}

#[test]
fn test_simultaneous_transitions_in_channel_order() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);

    input.set(4, Level::Low);
    input.set(1, Level::Low);
    let report = monitor.poll(0, &mut []).unwrap();

    let channels: Vec<usize> = report.events.iter().map(|e| e.channel).collect();
    assert_eq!(channels, vec![1, 4]);
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);
    // Ein Puls für beide Events
    assert_eq!(monitor.indicator().led().writes, vec![ON]);
}

// ============================================================================
// Tests: Poll-Loop
// ============================================================================

#[test]
fn test_quiet_cycle_without_changes() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    let mut display = display_sink(DisplayMode::StateWord);

    let report = monitor.poll(0, &mut [&mut display]).unwrap();

    assert!(report.is_quiet());
    assert!(display.display().ops.is_empty());
    assert!(monitor.indicator().led().writes.is_empty());
}

#[test]
fn test_baseline_follows_initial_read() {
    let input = MockInput::new();
    // Kanal 5 ist beim Start geschlossen
    input.set(5, Level::Low);
    let mut monitor = start(&input, true);

    assert_eq!(monitor.bank().baseline(5), Level::Low);

    // Öffnen ist für diesen Kanal die aktive Richtung
    input.set(5, Level::High);
    let report = monitor.poll(0, &mut []).unwrap();

    assert_eq!(report.events[0].level, Level::High);
    assert_eq!(report.events[0].class, Classification::Active);
    assert_eq!(monitor.bank().trigger_count(5), 1);
}

#[test]
fn test_sinks_receive_events_in_registration_order() {
    let input = MockInput::new();
    let mut monitor = start(&input, true);

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<(&'static str, usize)>>>,
    }

    impl EventSink for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn consume(&mut self, event: &pinwatch_core::TransitionEvent) -> Result<(), SinkError> {
            self.log.borrow_mut().push((self.name, event.channel));
            Ok(())
        }
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut first = Recorder {
        name: "first",
        log: log.clone(),
    };
    let mut second = Recorder {
        name: "second",
        log: log.clone(),
    };

    input.set(2, Level::Low);
    input.set(6, Level::Low);
    monitor.poll(0, &mut [&mut first, &mut second]).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![("first", 2), ("second", 2), ("first", 6), ("second", 6)]
    );
}

#[test]
fn test_failing_sink_does_not_block_others() {
    let input = MockInput::new();
    let mut monitor = start(&input, true);
    let mut telemetry = TelemetryPublishSink::new(
        "dev01",
        MockPublisher {
            queue_full: true,
            ..Default::default()
        },
    );
    let mut display = display_sink(DisplayMode::TriggerCount);

    input.set(7, Level::Low);
    let report = monitor.poll(0, &mut [&mut telemetry, &mut display]).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].channel, 7);
    assert_eq!(report.failures[0].sink, "telemetry");
    assert_eq!(
        report.failures[0].error,
        SinkError::Publish(PublishError::QueueFull)
    );
    // Display hat trotzdem den neuen Zähler bekommen
    assert_eq!(display.display().writes(), vec![("   1", true)]);
    // Zähler bleibt trotz Publish-Fehler erhöht
    assert_eq!(monitor.bank().trigger_count(7), 1);
}

#[test]
fn test_read_error_skips_cycle() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    let mut display = display_sink(DisplayMode::StateWord);

    input.set(0, Level::Low);
    input.fail(true);
    let error = monitor.poll(0, &mut [&mut display]).unwrap_err();
    assert_eq!(error.input, InputError::Bus);
    assert_eq!(error.indicator_error, None);
    assert!(display.display().ops.is_empty());
    assert_eq!(monitor.bank().stable(0), Level::High);

    // Nach dem Fehler wird der Wechsel nachgeholt
    input.fail(false);
    let report = monitor.poll(1, &mut [&mut display]).unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].channel, 0);
}

#[test]
fn test_start_fails_without_input() {
    let input = MockInput::new();
    input.fail(true);

    let result = Monitor::<_, _, CHANNEL_COUNT>::start(
        input.clone(),
        MockLed::default(),
        MonitorSettings::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_counting_disabled_leaves_counts_untouched() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);

    input.set(3, Level::Low);
    let report = monitor.poll(0, &mut []).unwrap();

    assert_eq!(report.events[0].trigger_count, None);
    assert_eq!(monitor.bank().trigger_count(3), 0);
}

#[test]
fn test_repeated_triggers_accumulate() {
    let input = MockInput::new();
    let mut monitor = start(&input, true);
    let mut display = display_sink(DisplayMode::TriggerCount);

    for cycle in 0..3u64 {
        input.set(2, Level::Low);
        monitor.poll(cycle * 2, &mut [&mut display]).unwrap();
        input.set(2, Level::High);
        monitor.poll(cycle * 2 + 1, &mut [&mut display]).unwrap();
    }

    assert_eq!(monitor.bank().trigger_count(2), 3);
    // Rückkehr zur Baseline: Zähler normal dargestellt
    assert_eq!(display.display().writes().last(), Some(&("   3", false)));
}

// ============================================================================
// Tests: Aktivitäts-LED
// ============================================================================

#[test]
fn test_indicator_pulse_lasts_minimum_width() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);

    input.set(0, Level::Low);
    monitor.poll(100, &mut []).unwrap();
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);

    monitor.poll(105, &mut []).unwrap();
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);

    monitor.poll(110, &mut []).unwrap();
    assert_eq!(monitor.indicator().state(), IndicatorState::Idle);
    assert_eq!(monitor.indicator().led().writes, vec![ON, OFF]);
}

#[test]
fn test_indicator_extends_on_new_activity() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);

    input.set(0, Level::Low);
    monitor.poll(0, &mut []).unwrap();
    input.set(1, Level::Low);
    monitor.poll(8, &mut []).unwrap();

    // Frist ab dem zweiten Event
    monitor.poll(12, &mut []).unwrap();
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);
    monitor.poll(18, &mut []).unwrap();
    assert_eq!(monitor.indicator().state(), IndicatorState::Idle);

    // Nur je ein Schreibzugriff für An und Aus
    assert_eq!(monitor.indicator().led().writes, vec![ON, OFF]);
}

#[test]
fn test_indicator_error_is_reported_and_retried() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    monitor.indicator_mut().led_mut().fail_next_write = true;

    input.set(0, Level::Low);
    let report = monitor.poll(0, &mut []).unwrap();
    assert_eq!(report.indicator_error, Some(LedError::WriteFailed));
    assert_eq!(monitor.indicator().state(), IndicatorState::Idle);

    input.set(0, Level::High);
    let report = monitor.poll(1, &mut []).unwrap();
    assert_eq!(report.indicator_error, None);
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);
}

#[test]
fn test_indicator_failed_start_retried_on_quiet_cycle() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    monitor.indicator_mut().led_mut().fail_next_write = true;

    input.set(0, Level::Low);
    let report = monitor.poll(0, &mut []).unwrap();
    assert_eq!(report.indicator_error, Some(LedError::WriteFailed));

    // Kein neues Event, der Puls wird trotzdem nachgeholt
    let report = monitor.poll(1, &mut []).unwrap();
    assert!(report.events.is_empty());
    assert_eq!(report.indicator_error, None);
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);
    assert_eq!(monitor.indicator().led().writes, vec![ON]);
}

#[test]
fn test_indicator_error_reported_on_read_error() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);

    input.set(0, Level::Low);
    monitor.poll(0, &mut []).unwrap();
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);

    // Puls läuft ab während der Bus ausfällt, Ausschalten schlägt fehl
    input.fail(true);
    monitor.indicator_mut().led_mut().fail_next_write = true;
    let error = monitor.poll(20, &mut []).unwrap_err();
    assert_eq!(error.input, InputError::Bus);
    assert_eq!(error.indicator_error, Some(LedError::WriteFailed));
    assert_eq!(monitor.indicator().state(), IndicatorState::Active);
}

// ============================================================================
// Tests: Sinks
// ============================================================================

#[test]
fn test_note_polarity_is_absolute() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    let mut midi = NoteProtocolSink::new(MockSession { connected: 1 }, MockNotes::default());

    input.set(2, Level::Low);
    monitor.poll(0, &mut [&mut midi]).unwrap();
    input.set(2, Level::High);
    monitor.poll(1, &mut [&mut midi]).unwrap();

    assert_eq!(
        midi.output().sent,
        vec![
            NoteMessage::Off {
                note: 3,
                velocity: 64,
                channel: 1
            },
            NoteMessage::On {
                note: 3,
                velocity: 64,
                channel: 1
            },
        ]
    );
}

#[test]
fn test_note_sink_settings() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    let mut midi = NoteProtocolSink::new(MockSession { connected: 2 }, MockNotes::default())
        .with_velocity(100)
        .with_midi_channel(10);

    input.set(7, Level::Low);
    monitor.poll(0, &mut [&mut midi]).unwrap();

    assert_eq!(
        midi.output().sent,
        vec![NoteMessage::Off {
            note: 8,
            velocity: 100,
            channel: 10
        }]
    );
    assert_eq!(midi.output().sent[0].to_bytes(), [0x89, 8, 100]);
}

#[test]
fn test_display_failure_is_reported() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    let mut display = display_sink(DisplayMode::StateWord);
    display.display_mut().fail_writes = true;

    input.set(1, Level::Low);
    let report = monitor.poll(0, &mut [&mut display]).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].sink, "display");
    assert_eq!(
        report.failures[0].error,
        SinkError::Display(DisplayError::Bus)
    );
}

#[test]
fn test_field_positions_follow_channel_pairs() {
    let input = MockInput::new();
    let mut monitor = start(&input, false);
    let mut display = display_sink(DisplayMode::StateWord);

    input.set(5, Level::Low);
    monitor.poll(0, &mut [&mut display]).unwrap();

    // Kanal 5 (Label "06") steht rechts in der dritten Zeile
    assert_eq!(
        display.display().ops[0],
        DisplayOp::ClearField {
            column: 15,
            row: 2,
            width: 4
        }
    );
}

#[test]
fn test_draw_form_shows_labels_and_initial_state() {
    let input = MockInput::new();
    input.set(3, Level::Low);
    let monitor = start(&input, false);
    let mut display = MockDisplay::default();
    let formatter = DisplayFormatter::new(FieldLayout::default(), DisplayMode::StateWord);

    formatter.draw_form(&mut display, monitor.bank()).unwrap();

    assert_eq!(display.ops[0], DisplayOp::Clear);
    let writes = display.writes();
    assert_eq!(writes.len(), 2 * CHANNEL_COUNT);
    assert_eq!(writes[0], ("01: ", false));
    assert_eq!(writes[1], ("HIGH", false));
    assert_eq!(writes[6], ("04: ", false));
    assert_eq!(writes[7], ("LOW", false));
}

// ============================================================================
// Tests: Rauschfilter
// ============================================================================

#[test]
fn test_noise_filter_suppresses_glitch() {
    let input = MockInput::new();
    let mut monitor = Monitor::<_, _, CHANNEL_COUNT>::start(
        input.clone(),
        MockLed::default(),
        MonitorSettings {
            noise_filter: Some(NoiseFilter { confirm_ms: 20 }),
            ..settings(false)
        },
    )
    .unwrap();

    input.set(0, Level::Low);
    assert!(monitor.poll(0, &mut []).unwrap().events.is_empty());
    input.set(0, Level::High);
    assert!(monitor.poll(5, &mut []).unwrap().events.is_empty());

    input.set(0, Level::Low);
    assert!(monitor.poll(10, &mut []).unwrap().events.is_empty());
    let report = monitor.poll(30, &mut []).unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].level, Level::Low);
}
