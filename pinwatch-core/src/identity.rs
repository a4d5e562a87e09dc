//! Geräte-Identität
//!
//! `"<prefix>-<XXXXXX>"` mit den unteren 3 Bytes der Basis-MAC als Hex,
//! z.B. `midi-A1B2C3`. Dient als Hostname, MQTT Client-ID und Topic-Präfix.

use core::fmt::Write;

use heapless::String;

pub const IDENTITY_CAPACITY: usize = 32;

pub type DeviceId = String<IDENTITY_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdentityError {
    PrefixTooLong,
}

/// Chip-ID aus der MAC-Adresse (letzte 3 Bytes)
pub fn chip_id(mac: [u8; 6]) -> u32 {
    u32::from_be_bytes([0, mac[3], mac[4], mac[5]])
}

pub fn device_identity(prefix: &str, chip_id: u32) -> Result<DeviceId, IdentityError> {
    let mut id = DeviceId::new();
    write!(id, "{}-{:06X}", prefix, chip_id & 0x00FF_FFFF).map_err(|_| IdentityError::PrefixTooLong)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_mac() {
        let mac = [0x40, 0x4C, 0xCA, 0x0A, 0xB1, 0x2C];
        let id = device_identity("midi", chip_id(mac)).unwrap();
        assert_eq!(id.as_str(), "midi-0AB12C");
    }

    #[test]
    fn test_prefix_too_long() {
        let prefix = "a-very-long-device-name-prefix";
        assert_eq!(device_identity(prefix, 1), Err(IdentityError::PrefixTooLong));
    }
}
