//! MCP23008 8-Bit I2C Port-Expander als `InputSource`
//!
//! Alle 8 Pins als Eingang mit internem Pull-up (100 kΩ).
//! Ein `read_all` ist eine einzige Bus-Transaktion (GPIO Register).

use embedded_hal::i2c::I2c;

use crate::traits::{InputError, InputSource};
use crate::types::Level;

/// Adresse mit A0..A2 auf GND
pub const DEFAULT_ADDRESS: u8 = 0x20;

/// Anzahl der Pins
pub const PIN_COUNT: usize = 8;

/// MCP23008 Register
#[allow(dead_code)]
pub mod reg {
    pub const IODIR: u8 = 0x00;
    pub const IPOL: u8 = 0x01;
    pub const GPINTEN: u8 = 0x02;
    pub const DEFVAL: u8 = 0x03;
    pub const INTCON: u8 = 0x04;
    pub const IOCON: u8 = 0x05;
    pub const GPPU: u8 = 0x06;
    pub const INTF: u8 = 0x07;
    pub const INTCAP: u8 = 0x08;
    pub const GPIO: u8 = 0x09;
    pub const OLAT: u8 = 0x0A;
}

pub struct Mcp23008<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mcp23008<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Prüft ob der Baustein antwortet und konfiguriert alle Pins als
    /// Eingang mit Pull-up
    ///
    /// # Fehlerbehandlung
    /// `InputError::DeviceNotFound` wenn der Baustein nicht antwortet
    pub fn init(&mut self) -> Result<(), InputError> {
        let mut iodir = [0u8];
        self.i2c
            .write_read(self.address, &[reg::IODIR], &mut iodir)
            .map_err(|_| InputError::DeviceNotFound)?;

        self.write_register(reg::IODIR, 0xFF)?;
        self.write_register(reg::GPPU, 0xFF)?;
        Ok(())
    }

    /// Liest alle 8 Pins (Bit n = Pin n)
    pub fn read_port(&mut self) -> Result<u8, InputError> {
        let mut port = [0u8];
        self.i2c
            .write_read(self.address, &[reg::GPIO], &mut port)
            .map_err(|_| InputError::Bus)?;
        Ok(port[0])
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), InputError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|_| InputError::Bus)
    }
}

impl<I2C: I2c> InputSource for Mcp23008<I2C> {
    fn read(&mut self, channel: usize) -> Result<Level, InputError> {
        assert!(channel < PIN_COUNT, "MCP23008 hat nur 8 Pins");
        let port = self.read_port()?;
        Ok(Level::from(port & (1 << channel) != 0))
    }

    fn read_all<const N: usize>(&mut self) -> Result<[Level; N], InputError> {
        assert!(N <= PIN_COUNT, "MCP23008 hat nur 8 Pins");
        let port = self.read_port()?;
        let mut levels = [Level::DEASSERTED; N];
        for (pin, level) in levels.iter_mut().enumerate() {
            *level = Level::from(port & (1 << pin) != 0);
        }
        Ok(levels)
    }
}
