//! Hardware Abstraction Traits
//!
//! Diese Traits definieren die Schnittstellen zu den Kollaborateuren
//! (Eingänge, Display, LED, MIDI-Session, Publish-Transport)
//! ohne konkrete Implementierung.

use rgb::RGB8;

use crate::midi::NoteMessage;
use crate::types::Level;

// ============================================================================
// Fehler-Typen
// ============================================================================

/// Fehler beim Lesen der Eingänge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Baustein antwortet nicht auf dem Bus (fatal beim Start)
    DeviceNotFound,
    /// Bus-Transaktion fehlgeschlagen
    Bus,
}

/// Fehler beim Schreiben auf das Display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    Bus,
}

/// Fehler-Typ für LED-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    WriteFailed,
}

/// Fehler beim Veröffentlichen einer Telemetrie-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Sende-Queue ist voll, Nachricht verworfen
    QueueFull,
    /// Topic oder Payload passt nicht in den Puffer
    TooLong,
}

/// Fehler beim Senden eines Note-Events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NoteError {
    QueueFull,
}

// ============================================================================
// Traits
// ============================================================================

/// Lesezugriff auf die digitalen Eingänge
///
/// # Implementierungen
/// - **Production:** `Mcp23008` (I2C Port-Expander)
/// - **Testing:** MockInput (in-memory Mock)
pub trait InputSource {
    /// Liest den aktuellen Pegel von Kanal `channel`
    fn read(&mut self, channel: usize) -> Result<Level, InputError>;

    /// Liest alle `N` Kanäle in aufsteigender Reihenfolge
    fn read_all<const N: usize>(&mut self) -> Result<[Level; N], InputError> {
        let mut levels = [Level::DEASSERTED; N];
        for (channel, level) in levels.iter_mut().enumerate() {
            *level = self.read(channel)?;
        }
        Ok(levels)
    }
}

/// Text-Display mit Feld-Adressierung in Zeichenzellen
///
/// `clear_field` löscht das Feld und setzt den Cursor auf dessen Anfang,
/// `write` schreibt ab dem Cursor.
pub trait DisplayDevice {
    /// Löscht das komplette Display
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Löscht `width` Zeichen ab (`column`, `row`) und setzt den Cursor dorthin
    fn clear_field(&mut self, column: u8, row: u8, width: u8) -> Result<(), DisplayError>;

    /// Schreibt Text ab dem Cursor, optional invertiert (hervorgehoben)
    fn write(&mut self, text: &str, invert: bool) -> Result<(), DisplayError>;
}

/// Trait für SmartLED Hardware-Zugriff
///
/// Abstrahiert den Zugriff auf die Aktivitäts-LED (WS2812/Neopixel).
///
/// # Implementierungen
/// - **Production:** RmtLedWriter (ESP32 RMT Peripheral)
/// - **Testing:** MockLedWriter (in-memory Mock)
pub trait SmartLedWriter {
    /// Schreibt eine RGB-Farbe auf die LED
    ///
    /// # Fehlerbehandlung
    /// Gibt `LedError::WriteFailed` zurück wenn Hardware-Zugriff fehlschlägt
    fn write(&mut self, color: RGB8) -> Result<(), LedError>;
}

/// Zustand der Protokoll-Session (z.B. AppleMIDI)
///
/// Aushandlung und Transport liegen außerhalb des Cores,
/// hier wird nur die Anzahl verbundener Gegenstellen abgefragt.
pub trait SessionState {
    fn connected_sessions(&self) -> u8;

    fn is_connected(&self) -> bool {
        self.connected_sessions() > 0
    }
}

impl<T: SessionState + ?Sized> SessionState for &T {
    fn connected_sessions(&self) -> u8 {
        (**self).connected_sessions()
    }
}

/// Ausgang für Note-Events (fire-and-forget)
pub trait NoteOutput {
    fn send(&mut self, message: NoteMessage) -> Result<(), NoteError>;
}

/// Publish/Subscribe Transport (fire-and-forget, kein Retry)
pub trait PublishTransport {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}
