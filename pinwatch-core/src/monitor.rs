//! Poll-Loop
//!
//! Ein Zyklus: alle Eingänge lesen → Flanken erkennen → Events in
//! Kanal-Reihenfolge an alle Sinks verteilen → Aktivitäts-LED nachführen.
//! Der Aufrufer (Firmware-Task) ruft `poll()` endlos auf und gibt
//! dazwischen die CPU an andere Tasks ab.

use heapless::Vec;
use rgb::RGB8;

use crate::bank::ChannelBank;
use crate::edge::{EdgeDetector, NoiseFilter};
use crate::indicator::{ActivityIndicator, DEFAULT_PULSE_MS};
use crate::sinks::{EventSink, SinkError};
use crate::traits::{InputError, InputSource, LedError, SmartLedWriter};
use crate::types::{Classification, Events};

/// Maximale Anzahl gemeldeter Sink-Fehler pro Zyklus
pub const MAX_REPORTED_FAILURES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Mindestdauer des LED-Pulses
    pub pulse_ms: u64,
    /// Farbe der LED während eines Pulses
    pub activity_color: RGB8,
    /// Trigger-Zähler pro Kanal führen (Telemetrie-Betrieb)
    pub count_triggers: bool,
    pub noise_filter: Option<NoiseFilter>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            pulse_ms: DEFAULT_PULSE_MS,
            activity_color: RGB8 { r: 0, g: 0, b: 10 },
            count_triggers: false,
            noise_filter: None,
        }
    }
}

/// Fehler eines Sinks für ein bestimmtes Event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SinkFailure {
    pub channel: usize,
    pub sink: &'static str,
    pub error: SinkError,
}

/// Ergebnis eines Zyklus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport<const N: usize> {
    pub events: Events<N>,
    /// Weitere Fehler über `MAX_REPORTED_FAILURES` hinaus werden nicht gemeldet
    pub failures: Vec<SinkFailure, MAX_REPORTED_FAILURES>,
    pub indicator_error: Option<LedError>,
}

/// Zyklus entfallen, weil das Lesen der Eingänge fehlschlug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleError {
    pub input: InputError,
    /// Fehler beim Nachführen der LED im selben Zyklus
    pub indicator_error: Option<LedError>,
}

impl<const N: usize> CycleReport<N> {
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty() && self.failures.is_empty() && self.indicator_error.is_none()
    }
}

pub struct Monitor<I, L, const N: usize> {
    bank: ChannelBank<I, N>,
    detector: EdgeDetector<N>,
    indicator: ActivityIndicator<L>,
    count_triggers: bool,
}

impl<I: InputSource, L: SmartLedWriter, const N: usize> Monitor<I, L, N> {
    /// Liest den Anfangszustand aller Kanäle
    ///
    /// Schlägt das erste Lesen fehl, gibt es keinen Monitor.
    pub fn start(input: I, led: L, settings: MonitorSettings) -> Result<Self, InputError> {
        Ok(Self {
            bank: ChannelBank::new(input)?,
            detector: EdgeDetector::with_filter(settings.noise_filter),
            indicator: ActivityIndicator::new(led, settings.activity_color, settings.pulse_ms),
            count_triggers: settings.count_triggers,
        })
    }

    pub fn bank(&self) -> &ChannelBank<I, N> {
        &self.bank
    }

    pub fn indicator(&self) -> &ActivityIndicator<L> {
        &self.indicator
    }

    pub fn indicator_mut(&mut self) -> &mut ActivityIndicator<L> {
        &mut self.indicator
    }

    /// Führt einen Zyklus aus
    ///
    /// Bei einem Lesefehler entfällt der Zyklus (keine Events), die LED
    /// wird trotzdem nachgeführt damit ein laufender Puls endet.
    pub fn poll(
        &mut self,
        now_ms: u64,
        sinks: &mut [&mut dyn EventSink],
    ) -> Result<CycleReport<N>, CycleError> {
        let raw = match self.bank.read_all() {
            Ok(raw) => raw,
            Err(input) => {
                return Err(CycleError {
                    input,
                    indicator_error: self.indicator.update(false, now_ms).err(),
                });
            }
        };

        let mut events = self.detector.detect(&mut self.bank, &raw, now_ms);

        if self.count_triggers {
            for event in events.iter_mut() {
                let count = if event.class == Classification::Active {
                    self.bank.count_trigger(event.channel)
                } else {
                    self.bank.trigger_count(event.channel)
                };
                event.trigger_count = Some(count);
            }
        }

        let mut failures = Vec::new();
        for event in events.iter() {
            for sink in sinks.iter_mut() {
                if let Err(error) = sink.consume(event) {
                    let _ = failures.push(SinkFailure {
                        channel: event.channel,
                        sink: sink.name(),
                        error,
                    });
                }
            }
        }

        let indicator_error = self.indicator.update(!events.is_empty(), now_ms).err();

        Ok(CycleReport {
            events,
            failures,
            indicator_error,
        })
    }
}
