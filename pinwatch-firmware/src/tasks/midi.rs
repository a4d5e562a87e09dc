// MIDI Task - AppleMIDI Session-Teilnehmer (RTP-MIDI über UDP)
//
// Wartet auf Einladungen (z.B. vom macOS "Audio-MIDI-Setup"),
// beantwortet Uhr-Synchronisationen und sendet Note-Events aus der
// Note-Queue an alle verbundenen Gegenstellen.
use defmt::{Debug2Format, debug, error, info, warn};
use embassy_futures::select::{Either3, select3};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Instant, Timer};
use pinwatch_core::applemidi::{self, ControlPacket};
use pinwatch_core::{DeviceId, NoteMessage, PeerTable, SessionState};

use crate::config::{
    MIDI_CONTROL_PORT, MIDI_DATA_PORT, MIDI_MAX_PEERS, MIDI_PACKET_BUFFER_SIZE,
    MIDI_RECONNECT_DELAY_SECS,
};
use crate::tasks::wifi::wait_for_network;
use crate::{MIDI_SESSIONS, NoteReceiver};

/// Über welchen Port ein Kommando kam
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Port {
    Control,
    Data,
}

/// MIDI Task
///
/// # Parameter
/// - `stack`: embassy-net Stack für Netzwerk-Zugriff
/// - `identity`: Session-Name in OK-Antworten, Basis der eigenen SSRC
/// - `notes`: Note-Queue vom Monitor Task
#[embassy_executor::task]
pub async fn midi_task(
    stack: &'static Stack<'static>,
    identity: &'static DeviceId,
    notes: NoteReceiver,
) {
    info!("MIDI: Task started, waiting for network...");
    wait_for_network(stack).await;
    info!("MIDI: Network ready");

    loop {
        match run_session(stack, identity, &notes).await {
            Ok(_) => warn!("MIDI: Session loop stopped"),
            Err(e) => error!("MIDI: Error: {}", e),
        }
        // Sockets sind weg, damit auch alle Sessions
        MIDI_SESSIONS.reset();
        info!("MIDI: Restarting in {}s...", MIDI_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MIDI_RECONNECT_DELAY_SECS)).await;
    }
}

async fn run_session(
    stack: &'static Stack<'static>,
    identity: &DeviceId,
    notes: &NoteReceiver,
) -> Result<(), MidiError> {
    let mut control_rx_meta = [PacketMetadata::EMPTY; 4];
    let mut control_tx_meta = [PacketMetadata::EMPTY; 4];
    let mut control_rx = [0u8; MIDI_PACKET_BUFFER_SIZE];
    let mut control_tx = [0u8; MIDI_PACKET_BUFFER_SIZE];
    let mut control = UdpSocket::new(
        *stack,
        &mut control_rx_meta,
        &mut control_rx,
        &mut control_tx_meta,
        &mut control_tx,
    );
    control
        .bind(MIDI_CONTROL_PORT)
        .map_err(|_| MidiError::SocketBindFailed)?;

    let mut data_rx_meta = [PacketMetadata::EMPTY; 4];
    let mut data_tx_meta = [PacketMetadata::EMPTY; 8];
    let mut data_rx = [0u8; MIDI_PACKET_BUFFER_SIZE];
    let mut data_tx = [0u8; MIDI_PACKET_BUFFER_SIZE];
    let mut data = UdpSocket::new(
        *stack,
        &mut data_rx_meta,
        &mut data_rx,
        &mut data_tx_meta,
        &mut data_tx,
    );
    data.bind(MIDI_DATA_PORT)
        .map_err(|_| MidiError::SocketBindFailed)?;

    info!(
        "MIDI: Session '{}' on ports {}/{}",
        identity.as_str(),
        MIDI_CONTROL_PORT,
        MIDI_DATA_PORT
    );

    let mut session = Session {
        name: identity.as_str(),
        ssrc: applemidi::session_ssrc(identity.as_str()),
        peers: PeerTable::new(&MIDI_SESSIONS),
        sequence: 0,
    };

    let mut control_buf = [0u8; MIDI_PACKET_BUFFER_SIZE];
    let mut data_buf = [0u8; MIDI_PACKET_BUFFER_SIZE];

    loop {
        let next = select3(
            control.recv_from(&mut control_buf),
            data.recv_from(&mut data_buf),
            notes.receive(),
        )
        .await;

        match next {
            Either3::First(Ok((len, meta))) => {
                session
                    .handle_control(&control, Port::Control, &control_buf[..len], meta.endpoint)
                    .await;
            }
            Either3::Second(Ok((len, meta))) => {
                // Eingehende RTP-MIDI Daten werden ignoriert
                if applemidi::is_control(&data_buf[..len]) {
                    session
                        .handle_control(&data, Port::Data, &data_buf[..len], meta.endpoint)
                        .await;
                }
            }
            Either3::First(Err(e)) | Either3::Second(Err(e)) => {
                warn!("MIDI: Receive failed: {}", Debug2Format(&e));
            }
            Either3::Third(message) => session.send_note(&data, &message).await,
        }
    }
}

struct Session<'a> {
    name: &'a str,
    ssrc: u32,
    /// Gegenstellen nach Einladung auf dem Data-Port
    peers: PeerTable<'static, IpEndpoint, MIDI_MAX_PEERS>,
    sequence: u16,
}

impl Session<'_> {
    async fn handle_control(
        &mut self,
        socket: &UdpSocket<'_>,
        port: Port,
        packet: &[u8],
        from: IpEndpoint,
    ) {
        let packet = match applemidi::parse(packet) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("MIDI: Ignoring packet from {}: {}", Debug2Format(&from), e);
                return;
            }
        };

        match packet {
            ControlPacket::Invitation { token, ssrc, name } => {
                // Auf dem Control-Port nur antworten, gezählt wird die Data-Einladung
                let accepted = port == Port::Control || self.peers.accept(ssrc, from);
                let reply = if accepted {
                    ControlPacket::Accept {
                        token,
                        ssrc: self.ssrc,
                        name: self.name,
                    }
                } else {
                    warn!("MIDI: Rejecting '{}', no free session slot", name);
                    ControlPacket::Reject {
                        token,
                        ssrc: self.ssrc,
                    }
                };
                if accepted && port == Port::Data {
                    info!(
                        "MIDI: Session with '{}' established ({} connected)",
                        name,
                        MIDI_SESSIONS.connected_sessions()
                    );
                }
                reply_to(socket, &reply, from).await;
            }
            ControlPacket::End { ssrc, .. } => {
                match self.peers.end(ssrc) {
                    Some(remaining) => info!("MIDI: Session ended ({} connected)", remaining),
                    None => debug!("MIDI: BY from unknown SSRC {=u32:#010x}", ssrc),
                }
            }
            sync @ ControlPacket::Sync { .. } => {
                if let Some(reply) = applemidi::sync_reply(&sync, self.ssrc, timestamp()) {
                    reply_to(socket, &reply, from).await;
                }
            }
            ControlPacket::Accept { .. } | ControlPacket::Reject { .. } => {}
        }
    }

    async fn send_note(&mut self, socket: &UdpSocket<'_>, message: &NoteMessage) {
        if self.peers.is_empty() {
            return;
        }

        let mut buf = [0u8; 32];
        let len = match applemidi::encode_note(
            &mut buf,
            self.sequence,
            timestamp() as u32,
            self.ssrc,
            message,
        ) {
            Ok(len) => len,
            Err(e) => {
                error!("MIDI: Cannot encode note: {}", e);
                return;
            }
        };
        self.sequence = self.sequence.wrapping_add(1);

        for peer in self.peers.iter() {
            if let Err(e) = socket.send_to(&buf[..len], peer.endpoint).await {
                warn!("MIDI: Send to {} failed: {}", Debug2Format(&peer.endpoint), Debug2Format(&e));
            }
        }
        debug!("MIDI: {} -> {} peer(s)", message, self.peers.len());
    }
}

async fn reply_to(socket: &UdpSocket<'_>, packet: &ControlPacket<'_>, to: IpEndpoint) {
    let mut buf = [0u8; 64];
    match applemidi::encode(packet, &mut buf) {
        Ok(len) => {
            if let Err(e) = socket.send_to(&buf[..len], to).await {
                warn!("MIDI: Reply to {} failed: {}", Debug2Format(&to), Debug2Format(&e));
            }
        }
        Err(e) => error!("MIDI: Cannot encode reply: {}", e),
    }
}

/// Zeitstempel in 100 µs Einheiten (AppleMIDI Uhr)
fn timestamp() -> u64 {
    Instant::now().as_micros() / 100
}

/// MIDI Fehler-Typen
#[derive(Debug)]
enum MidiError {
    SocketBindFailed,
}

impl defmt::Format for MidiError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MidiError::SocketBindFailed => defmt::write!(fmt, "Socket bind failed"),
        }
    }
}
