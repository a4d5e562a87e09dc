//! SSD1306 OLED Display Driver
//!
//! Driver for 128x64 SSD1306-based OLED displays via I2C.
//! Text-Zellen mit 5x7 Font + 1 Pixel Abstand: 21 Spalten x 8 Zeilen,
//! eine Zeile entspricht einer Display-Page (8 Pixel).
//!
//! Gezeichnet wird in einen Frame-Buffer (`DrawTarget` für
//! `embedded-graphics`), geänderte Pages werden beim `write` übertragen.

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_5X7},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use embedded_hal::i2c::I2c;

use crate::traits::{DisplayDevice, DisplayError};

/// SSD1306 I2C address (typically 0x3C or 0x3D)
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Display dimensions
pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;
const PAGES: usize = HEIGHT / 8;

/// Font für alle Text-Ausgaben
pub const FONT: MonoFont<'static> = MonoFont {
    character_spacing: 1,
    ..FONT_5X7
};

/// Pixel pro Zeichenzelle
pub const CELL_WIDTH: usize = 6;
pub const CELL_HEIGHT: usize = 8;

/// Text-Geometrie in Zeichenzellen
pub const COLUMNS: u8 = (WIDTH / CELL_WIDTH) as u8;
pub const ROWS: u8 = PAGES as u8;

/// SSD1306 commands
#[allow(dead_code)]
mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const ENTIRE_DISPLAY_RESUME: u8 = 0xA4;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const SET_INVERSE: u8 = 0xA7;
    pub const SET_MEMORY_MODE: u8 = 0x20;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_LOW_COLUMN: u8 = 0x00;
    pub const SET_HIGH_COLUMN: u8 = 0x10;
    pub const SET_PAGE_ADDR: u8 = 0xB0;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
}

/// Control-Byte vor Kommandos bzw. Daten
const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

/// SSD1306 OLED driver
pub struct Ssd1306<I2C> {
    i2c: I2C,
    address: u8,
    /// Frame buffer (1 bit per pixel, organized as pages)
    buffer: [[u8; WIDTH]; PAGES],
    /// Bit n gesetzt = Page n muss übertragen werden
    dirty: u8,
    cursor: (u8, u8),
}

impl<I2C: I2c> Ssd1306<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            buffer: [[0; WIDTH]; PAGES],
            dirty: 0,
            cursor: (0, 0),
        }
    }

    /// Initialize the display (page addressing mode, 128x64)
    pub fn init(&mut self) -> Result<(), DisplayError> {
        let init_cmds: &[u8] = &[
            cmd::DISPLAY_OFF,
            cmd::SET_CLOCK_DIV,
            0x80,
            cmd::SET_MUX_RATIO,
            0x3F,
            cmd::SET_DISPLAY_OFFSET,
            0x00,
            cmd::SET_START_LINE,
            cmd::SET_CHARGE_PUMP,
            0x14,
            cmd::SET_MEMORY_MODE,
            0x02,
            cmd::SET_SEG_REMAP,
            cmd::SET_COM_SCAN_DEC,
            cmd::SET_COM_PINS,
            0x12,
            cmd::SET_CONTRAST,
            0xCF,
            cmd::SET_PRECHARGE,
            0xF1,
            cmd::SET_VCOM_DETECT,
            0x40,
            cmd::ENTIRE_DISPLAY_RESUME,
            cmd::SET_NORMAL,
            cmd::DISPLAY_ON,
        ];

        for &c in init_cmds {
            self.command(c)?;
        }

        Ok(())
    }

    /// Überträgt alle geänderten Pages
    pub fn flush(&mut self) -> Result<(), DisplayError> {
        for page in 0..PAGES {
            if self.dirty & (1 << page) == 0 {
                continue;
            }

            self.command(cmd::SET_PAGE_ADDR | page as u8)?;
            self.command(cmd::SET_LOW_COLUMN)?;
            self.command(cmd::SET_HIGH_COLUMN)?;

            let mut data = [0u8; WIDTH + 1];
            data[0] = CONTROL_DATA;
            data[1..].copy_from_slice(&self.buffer[page]);
            self.i2c
                .write(self.address, &data)
                .map_err(|_| DisplayError::Bus)?;

            self.dirty &= !(1 << page);
        }

        Ok(())
    }

    /// Cursor-Position in Zeichenzellen (Spalte, Zeile)
    pub fn cursor(&self) -> (u8, u8) {
        self.cursor
    }

    /// Pixel im Frame-Buffer
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && self.buffer[y / 8][x] & (1 << (y % 8)) != 0
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn command(&mut self, c: u8) -> Result<(), DisplayError> {
        self.i2c
            .write(self.address, &[CONTROL_COMMAND, c])
            .map_err(|_| DisplayError::Bus)
    }

    fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let page = y / 8;
        let bit = 1 << (y % 8);
        if on {
            self.buffer[page][x] |= bit;
        } else {
            self.buffer[page][x] &= !bit;
        }
        self.dirty |= 1 << page;
    }

    fn style<'a>(font: &'a MonoFont<'static>, invert: bool) -> MonoTextStyle<'a, BinaryColor> {
        let (text, background) = if invert {
            (BinaryColor::Off, BinaryColor::On)
        } else {
            (BinaryColor::On, BinaryColor::Off)
        };
        MonoTextStyleBuilder::new()
            .font(font)
            .text_color(text)
            .background_color(background)
            .build()
    }
}

impl<I2C> OriginDimensions for Ssd1306<I2C> {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl<I2C: I2c> DrawTarget for Ssd1306<I2C> {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<P>(&mut self, pixels: P) -> Result<(), Self::Error>
    where
        P: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Ok((x, y)) = <(u32, u32)>::try_from(point) {
                self.set_pixel(x as usize, y as usize, color.is_on());
            }
        }
        Ok(())
    }
}

impl<I2C: I2c> DisplayDevice for Ssd1306<I2C> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        for page in self.buffer.iter_mut() {
            page.fill(0);
        }
        self.dirty = u8::MAX;
        self.cursor = (0, 0);
        self.flush()
    }

    /// Löscht nur den Frame-Buffer, übertragen wird beim nächsten `write`
    fn clear_field(&mut self, column: u8, row: u8, width: u8) -> Result<(), DisplayError> {
        let start = column as usize * CELL_WIDTH;
        let end = ((column as usize + width as usize) * CELL_WIDTH).min(WIDTH);
        let page = row as usize;
        if page < PAGES && start < end {
            self.buffer[page][start..end].fill(0);
            self.dirty |= 1 << page;
        }
        self.cursor = (column, row);
        Ok(())
    }

    fn write(&mut self, text: &str, invert: bool) -> Result<(), DisplayError> {
        let (column, row) = self.cursor;
        let origin = Point::new(
            (column as usize * CELL_WIDTH) as i32,
            (row as usize * CELL_HEIGHT) as i32,
        );

        let font = FONT;
        let style = Self::style(&font, invert);
        let Ok(_) = Text::with_baseline(text, origin, style, Baseline::Top).draw(self);

        self.cursor = (column.saturating_add(text.len() as u8), row);
        self.flush()
    }
}
