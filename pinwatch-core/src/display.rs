//! Display-Formatierung
//!
//! Jeder Kanal hat ein festes Feld mit 4 Zeichen Breite:
//! Spalte `columns[index % 2]`, Zeile `row_height * (index / 2)`.
//!
//! ```text
//! 01: HIGH   02: LOW
//! 03:   12   04:    3
//! ```

use core::fmt::Write;

use heapless::String;

use crate::bank::ChannelBank;
use crate::traits::{DisplayDevice, DisplayError, InputSource};
use crate::types::{Classification, Level, TransitionEvent};

/// Breite eines Wert-Feldes in Zeichen ("HIGH" oder "9999")
pub const FIELD_WIDTH: u8 = 4;

/// Breite eines Labels ("01: ")
pub const LABEL_WIDTH: u8 = 4;

/// Position eines Feldes in Zeichenzellen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldPosition {
    pub column: u8,
    pub row: u8,
}

/// Anordnung der Felder auf dem Display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Start-Spalte der Wert-Felder für gerade / ungerade Kanäle
    pub columns: [u8; 2],
    /// Zeilen pro Text-Zeile
    pub row_height: u8,
}

impl FieldLayout {
    pub const fn new(columns: [u8; 2], row_height: u8) -> Self {
        Self {
            columns,
            row_height,
        }
    }

    /// Zeilen jenseits von `u8::MAX` werden auf `u8::MAX` begrenzt
    pub fn position(&self, channel: usize) -> FieldPosition {
        let row = usize::from(self.row_height).saturating_mul(channel / 2);
        FieldPosition {
            column: self.columns[channel % 2],
            row: u8::try_from(row).unwrap_or(u8::MAX),
        }
    }

    pub fn label_position(&self, channel: usize) -> FieldPosition {
        let field = self.position(channel);
        FieldPosition {
            column: field.column.saturating_sub(LABEL_WIDTH),
            row: field.row,
        }
    }
}

impl Default for FieldLayout {
    /// Spalten passend zur Form "01: 9999   02: 9999"
    fn default() -> Self {
        Self::new([4, 15], 1)
    }
}

/// Was in einem Feld angezeigt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    /// "HIGH" / "LOW"
    StateWord,
    /// Trigger-Zähler, rechtsbündig, invertiert solange aktiv
    TriggerCount,
}

/// Rendert Übergänge in die Felder eines `DisplayDevice`
///
/// Der Formatter selbst hält keinen veränderlichen Zustand.
#[derive(Debug, Clone, Copy)]
pub struct DisplayFormatter {
    layout: FieldLayout,
    mode: DisplayMode,
}

impl DisplayFormatter {
    pub const fn new(layout: FieldLayout, mode: DisplayMode) -> Self {
        Self { layout, mode }
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Rendert das Feld des Event-Kanals neu
    pub fn render<D: DisplayDevice + ?Sized>(
        &self,
        display: &mut D,
        event: &TransitionEvent,
    ) -> Result<(), DisplayError> {
        self.render_field(
            display,
            event.channel,
            event.level,
            event.class,
            event.trigger_count.unwrap_or(0),
        )
    }

    /// Löscht das Feld in voller Breite und schreibt den neuen Inhalt
    pub fn render_field<D: DisplayDevice + ?Sized>(
        &self,
        display: &mut D,
        channel: usize,
        level: Level,
        class: Classification,
        trigger_count: u32,
    ) -> Result<(), DisplayError> {
        let position = self.layout.position(channel);
        display.clear_field(position.column, position.row, FIELD_WIDTH)?;

        match self.mode {
            DisplayMode::StateWord => display.write(level.as_str(), false),
            DisplayMode::TriggerCount => {
                // Zähler >= 10000 läuft über das Feld hinaus (nicht abgefangen)
                let text = format_count(trigger_count);
                display.write(&text, class == Classification::Active)
            }
        }
    }

    /// Zeichnet Labels und den Anfangszustand aller Kanäle
    pub fn draw_form<D, I, const N: usize>(
        &self,
        display: &mut D,
        bank: &ChannelBank<I, N>,
    ) -> Result<(), DisplayError>
    where
        D: DisplayDevice + ?Sized,
        I: InputSource,
    {
        display.clear()?;

        for (index, channel) in bank.channels().iter().enumerate() {
            let label = self.layout.label_position(index);
            display.clear_field(label.column, label.row, LABEL_WIDTH)?;
            display.write(&format_label(index), false)?;

            self.render_field(
                display,
                index,
                channel.stable(),
                channel.class(),
                channel.trigger_count(),
            )?;
        }

        Ok(())
    }
}

/// Rechtsbündiger Zähler mit Feldbreite 4
pub fn format_count(count: u32) -> String<10> {
    let mut text = String::new();
    // u32 hat höchstens 10 Stellen
    let _ = write!(text, "{:>4}", count);
    text
}

/// Label "NN: " (1-basiert, zweistellig)
pub fn format_label(channel: usize) -> String<8> {
    let mut text = String::new();
    let _ = write!(text, "{:02}: ", channel + 1);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_follows_index() {
        let layout = FieldLayout::new([4, 15], 2);
        assert_eq!(layout.position(0), FieldPosition { column: 4, row: 0 });
        assert_eq!(layout.position(1), FieldPosition { column: 15, row: 0 });
        assert_eq!(layout.position(6), FieldPosition { column: 4, row: 6 });
        assert_eq!(layout.position(7), FieldPosition { column: 15, row: 6 });
    }

    #[test]
    fn test_position_row_saturates() {
        let layout = FieldLayout::new([4, 15], 100);
        assert_eq!(layout.position(4).row, 200);
        assert_eq!(layout.position(6).row, u8::MAX);
        assert_eq!(layout.position(usize::MAX).row, u8::MAX);
    }

    #[test]
    fn test_label_precedes_field() {
        let layout = FieldLayout::default();
        assert_eq!(layout.label_position(3), FieldPosition { column: 11, row: 1 });
    }

    #[test]
    fn test_format_count_right_justified() {
        assert_eq!(format_count(1).as_str(), "   1");
        assert_eq!(format_count(42).as_str(), "  42");
        assert_eq!(format_count(9999).as_str(), "9999");
        assert_eq!(format_count(10000).as_str(), "10000");
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(0).as_str(), "01: ");
        assert_eq!(format_label(7).as_str(), "08: ");
    }
}
