//! Aktivitäts-LED
//!
//! Zwei Zustände: `Idle` (LED aus) und `Active` (LED an).
//! Jeder Zyklus mit mindestens einem Event startet oder verlängert
//! einen Puls von `pulse_ms`; erst ein Zyklus ohne Event nach Ablauf
//! der Deadline schaltet zurück auf `Idle`.

use rgb::RGB8;

use crate::traits::{LedError, SmartLedWriter};

/// Mindestdauer eines Aktivitäts-Pulses in Millisekunden
pub const DEFAULT_PULSE_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorState {
    Idle,
    Active,
}

pub struct ActivityIndicator<L> {
    led: L,
    color: RGB8,
    pulse_ms: u64,
    state: IndicatorState,
    deadline_ms: u64,
}

impl<L: SmartLedWriter> ActivityIndicator<L> {
    /// `color` wird während eines Pulses angezeigt, sonst ist die LED aus
    pub fn new(led: L, color: RGB8, pulse_ms: u64) -> Self {
        Self {
            led,
            color,
            pulse_ms,
            state: IndicatorState::Idle,
            deadline_ms: 0,
        }
    }

    pub fn state(&self) -> IndicatorState {
        self.state
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn led_mut(&mut self) -> &mut L {
        &mut self.led
    }

    /// Schaltet die LED an, z.B. während der Initialisierung
    pub fn hold(&mut self) -> Result<(), LedError> {
        self.led.write(self.color)?;
        self.state = IndicatorState::Active;
        self.deadline_ms = u64::MAX;
        Ok(())
    }

    /// Schaltet die LED sofort aus
    pub fn reset(&mut self) -> Result<(), LedError> {
        self.led.write(RGB8::default())?;
        self.state = IndicatorState::Idle;
        self.deadline_ms = 0;
        Ok(())
    }

    /// Einmal pro Zyklus aufrufen
    ///
    /// Schlägt das Schreiben fehl, bleibt der Zustand unverändert und der
    /// Übergang wird im nächsten Zyklus erneut versucht. Ein Puls, dessen
    /// Start fehlschlug, wird auch in ruhigen Zyklen nachgeholt, solange
    /// seine Deadline nicht abgelaufen ist.
    pub fn update(&mut self, activity: bool, now_ms: u64) -> Result<(), LedError> {
        if activity {
            self.deadline_ms = now_ms.saturating_add(self.pulse_ms);
        }
        let pulse_pending = now_ms < self.deadline_ms;

        if self.state == IndicatorState::Idle && (activity || pulse_pending) {
            self.led.write(self.color)?;
            self.state = IndicatorState::Active;
        } else if !activity
            && self.state == IndicatorState::Active
            && now_ms >= self.deadline_ms
        {
            self.led.write(RGB8::default())?;
            self.state = IndicatorState::Idle;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingLed {
        writes: usize,
        last: Option<RGB8>,
    }

    impl SmartLedWriter for CountingLed {
        fn write(&mut self, color: RGB8) -> Result<(), LedError> {
            self.writes += 1;
            self.last = Some(color);
            Ok(())
        }
    }

    const ON: RGB8 = RGB8 { r: 0, g: 10, b: 0 };

    #[test]
    fn test_pulse_holds_for_minimum_width() {
        let mut indicator = ActivityIndicator::new(CountingLed::default(), ON, 10);

        indicator.update(true, 100).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Active);
        assert_eq!(indicator.led().last, Some(ON));

        indicator.update(false, 109).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Active);

        indicator.update(false, 110).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Idle);
        assert_eq!(indicator.led().last, Some(RGB8::default()));
    }

    #[test]
    fn test_new_activity_extends_pulse() {
        let mut indicator = ActivityIndicator::new(CountingLed::default(), ON, 10);

        indicator.update(true, 0).unwrap();
        indicator.update(true, 8).unwrap();
        assert_eq!(indicator.deadline_ms(), 18);

        indicator.update(false, 12).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Active);
        // Nur ein Schreibzugriff für den gesamten Puls
        assert_eq!(indicator.led().writes, 1);

        indicator.update(false, 18).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Idle);
        assert_eq!(indicator.led().writes, 2);
    }

    #[test]
    fn test_idle_without_activity_does_not_write() {
        let mut indicator = ActivityIndicator::new(CountingLed::default(), ON, 10);
        indicator.update(false, 50).unwrap();
        assert_eq!(indicator.led().writes, 0);
    }

    struct FailingOnce {
        fail: bool,
        writes: usize,
    }

    impl SmartLedWriter for FailingOnce {
        fn write(&mut self, _color: RGB8) -> Result<(), LedError> {
            if core::mem::take(&mut self.fail) {
                return Err(LedError::WriteFailed);
            }
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_failed_pulse_start_retried_on_quiet_cycle() {
        let led = FailingOnce {
            fail: true,
            writes: 0,
        };
        let mut indicator = ActivityIndicator::new(led, ON, 10);

        assert_eq!(indicator.update(true, 0), Err(LedError::WriteFailed));
        assert_eq!(indicator.state(), IndicatorState::Idle);

        indicator.update(false, 1).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Active);
        assert_eq!(indicator.led().writes, 1);

        indicator.update(false, 10).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Idle);
    }

    #[test]
    fn test_failed_pulse_start_dropped_after_deadline() {
        let led = FailingOnce {
            fail: true,
            writes: 0,
        };
        let mut indicator = ActivityIndicator::new(led, ON, 10);

        assert!(indicator.update(true, 0).is_err());
        indicator.update(false, 10).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Idle);
        assert_eq!(indicator.led().writes, 0);
    }

    #[test]
    fn test_hold_then_reset() {
        let mut indicator = ActivityIndicator::new(CountingLed::default(), ON, 10);
        indicator.hold().unwrap();
        indicator.update(false, 1_000).unwrap();
        assert_eq!(indicator.state(), IndicatorState::Active);

        indicator.reset().unwrap();
        assert_eq!(indicator.state(), IndicatorState::Idle);
    }
}
