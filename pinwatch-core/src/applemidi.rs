//! AppleMIDI (RTP-MIDI) Paket-Codec
//!
//! Nur der Teil, den ein einfacher Session-Teilnehmer braucht:
//! Einladung annehmen (IN/OK), Session beenden (BY),
//! Uhr-Synchronisation beantworten (CK) und Note-Events senden.
//!
//! Alle Felder sind Big Endian.

use crate::midi::NoteMessage;

/// Kennung für Session-Kommandos
pub const SIGNATURE: [u8; 2] = [0xFF, 0xFF];

pub const PROTOCOL_VERSION: u32 = 2;

/// Standard-Ports: Control, Data = Control + 1
pub const CONTROL_PORT: u16 = 5004;
pub const DATA_PORT: u16 = 5005;

/// RTP Payload Type für MIDI
const RTP_PAYLOAD_TYPE: u8 = 0x61;
const RTP_VERSION: u8 = 0x80;
const RTP_HEADER_LEN: usize = 12;

const CMD_INVITATION: [u8; 2] = *b"IN";
const CMD_ACCEPT: [u8; 2] = *b"OK";
const CMD_REJECT: [u8; 2] = *b"NO";
const CMD_END: [u8; 2] = *b"BY";
const CMD_SYNC: [u8; 2] = *b"CK";

const SESSION_HEADER_LEN: usize = 16;
const SYNC_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Paket zu kurz oder keine Session-Signatur
    Malformed,
    /// Unbekanntes Kommando
    Unsupported,
    /// Ausgabepuffer zu klein
    BufferTooSmall,
}

/// Session-Kommando einer Gegenstelle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPacket<'a> {
    Invitation {
        token: u32,
        ssrc: u32,
        name: &'a str,
    },
    Accept {
        token: u32,
        ssrc: u32,
        name: &'a str,
    },
    Reject {
        token: u32,
        ssrc: u32,
    },
    End {
        token: u32,
        ssrc: u32,
    },
    Sync {
        ssrc: u32,
        count: u8,
        timestamps: [u64; 3],
    },
}

/// Prüft ob ein Datagramm ein Session-Kommando ist (sonst RTP-Daten)
pub fn is_control(packet: &[u8]) -> bool {
    packet.len() >= 4 && packet[..2] == SIGNATURE
}

pub fn parse(packet: &[u8]) -> Result<ControlPacket<'_>, PacketError> {
    if !is_control(packet) {
        return Err(PacketError::Malformed);
    }

    let command = [packet[2], packet[3]];
    if command == CMD_SYNC {
        if packet.len() < SYNC_LEN {
            return Err(PacketError::Malformed);
        }
        return Ok(ControlPacket::Sync {
            ssrc: read_u32(packet, 4),
            count: packet[8],
            timestamps: [
                read_u64(packet, 12),
                read_u64(packet, 20),
                read_u64(packet, 28),
            ],
        });
    }

    if packet.len() < SESSION_HEADER_LEN {
        return Err(PacketError::Malformed);
    }
    let token = read_u32(packet, 8);
    let ssrc = read_u32(packet, 12);

    match command {
        CMD_INVITATION => Ok(ControlPacket::Invitation {
            token,
            ssrc,
            name: read_name(&packet[SESSION_HEADER_LEN..]),
        }),
        CMD_ACCEPT => Ok(ControlPacket::Accept {
            token,
            ssrc,
            name: read_name(&packet[SESSION_HEADER_LEN..]),
        }),
        CMD_REJECT => Ok(ControlPacket::Reject { token, ssrc }),
        CMD_END => Ok(ControlPacket::End { token, ssrc }),
        _ => Err(PacketError::Unsupported),
    }
}

/// Schreibt ein Session-Kommando in `buf`, gibt die Länge zurück
pub fn encode(packet: &ControlPacket<'_>, buf: &mut [u8]) -> Result<usize, PacketError> {
    match *packet {
        ControlPacket::Invitation { token, ssrc, name } => {
            encode_session(buf, CMD_INVITATION, token, ssrc, Some(name))
        }
        ControlPacket::Accept { token, ssrc, name } => {
            encode_session(buf, CMD_ACCEPT, token, ssrc, Some(name))
        }
        ControlPacket::Reject { token, ssrc } => encode_session(buf, CMD_REJECT, token, ssrc, None),
        ControlPacket::End { token, ssrc } => encode_session(buf, CMD_END, token, ssrc, None),
        ControlPacket::Sync {
            ssrc,
            count,
            timestamps,
        } => {
            if buf.len() < SYNC_LEN {
                return Err(PacketError::BufferTooSmall);
            }
            buf[..2].copy_from_slice(&SIGNATURE);
            buf[2..4].copy_from_slice(&CMD_SYNC);
            buf[4..8].copy_from_slice(&ssrc.to_be_bytes());
            buf[8] = count;
            buf[9..12].fill(0);
            for (i, timestamp) in timestamps.iter().enumerate() {
                let offset = 12 + i * 8;
                buf[offset..offset + 8].copy_from_slice(&timestamp.to_be_bytes());
            }
            Ok(SYNC_LEN)
        }
    }
}

/// Antwort auf eine Uhr-Synchronisation, `None` wenn nichts zu senden ist
///
/// count 0: Gegenstelle startet, wir antworten mit count 1 und unserer Zeit.
/// count 1: wir hätten gestartet (tun wir nie), count 2: Austausch beendet.
pub fn sync_reply(packet: &ControlPacket<'_>, own_ssrc: u32, now: u64) -> Option<ControlPacket<'static>> {
    match *packet {
        ControlPacket::Sync {
            count: 0,
            timestamps,
            ..
        } => Some(ControlPacket::Sync {
            ssrc: own_ssrc,
            count: 1,
            timestamps: [timestamps[0], now, 0],
        }),
        _ => None,
    }
}

/// RTP-MIDI Paket mit genau einem Note-Event
pub fn encode_note(
    buf: &mut [u8],
    sequence: u16,
    timestamp: u32,
    ssrc: u32,
    message: &NoteMessage,
) -> Result<usize, PacketError> {
    let midi = message.to_bytes();
    let len = RTP_HEADER_LEN + 1 + midi.len();
    if buf.len() < len {
        return Err(PacketError::BufferTooSmall);
    }

    buf[0] = RTP_VERSION;
    buf[1] = RTP_PAYLOAD_TYPE;
    buf[2..4].copy_from_slice(&sequence.to_be_bytes());
    buf[4..8].copy_from_slice(&timestamp.to_be_bytes());
    buf[8..12].copy_from_slice(&ssrc.to_be_bytes());
    // MIDI Command Section: kurzer Header (B=0, J=0, Z=0, P=0), 4 Bit Länge
    buf[RTP_HEADER_LEN] = midi.len() as u8;
    buf[RTP_HEADER_LEN + 1..len].copy_from_slice(&midi);
    Ok(len)
}

/// Stabile SSRC aus dem Gerätenamen (FNV-1a)
pub fn session_ssrc(name: &str) -> u32 {
    name.bytes().fold(0x811C_9DC5u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}

fn encode_session(
    buf: &mut [u8],
    command: [u8; 2],
    token: u32,
    ssrc: u32,
    name: Option<&str>,
) -> Result<usize, PacketError> {
    let name_len = name.map_or(0, |name| name.len() + 1);
    let len = SESSION_HEADER_LEN + name_len;
    if buf.len() < len {
        return Err(PacketError::BufferTooSmall);
    }

    buf[..2].copy_from_slice(&SIGNATURE);
    buf[2..4].copy_from_slice(&command);
    buf[4..8].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    buf[8..12].copy_from_slice(&token.to_be_bytes());
    buf[12..16].copy_from_slice(&ssrc.to_be_bytes());
    if let Some(name) = name {
        buf[SESSION_HEADER_LEN..len - 1].copy_from_slice(name.as_bytes());
        buf[len - 1] = 0;
    }
    Ok(len)
}

fn read_u32(packet: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&packet[offset..offset + 4]);
    u32::from_be_bytes(bytes)
}

fn read_u64(packet: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&packet[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

fn read_name(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).unwrap_or("")
}
