// mDNS Responder Task - Advertised "<identity>.local" via Multicast DNS
//
// Beantwortet A-Record Queries (RFC 6762) auf 224.0.0.251:5353, damit
// AppleMIDI-Gegenstellen und MQTT-Tools das Gerät per Name finden.

use defmt::{Debug2Format, error, info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};

use core::net::{Ipv4Addr, SocketAddr};
use core::sync::atomic::{AtomicU32, Ordering};

use edge_mdns::{HostAnswersMdnsHandler, buf::VecBufAccess, domain::base::Ttl, host::Host, io};
use edge_nal::{MulticastV4, UdpBind, UdpSplit};
use edge_nal_embassy::{Udp, UdpBuffers};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use pinwatch_core::DeviceId;

use crate::config::{
    MDNS_MULTICAST_ADDR, MDNS_PACKET_BUFFER_SIZE, MDNS_PORT, MDNS_RECONNECT_DELAY_SECS,
    MDNS_TTL_SECS, MDNS_UDP_BUFFER_SIZE,
};
use crate::tasks::wifi::wait_for_network;

type MdnsUdpBuffers = UdpBuffers<1, MDNS_UDP_BUFFER_SIZE, MDNS_UDP_BUFFER_SIZE>;

static RNG_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Pseudo-Zufall für mDNS Query IDs (Eindeutigkeit reicht)
fn mdns_rng(buf: &mut [u8]) {
    let mut counter = RNG_COUNTER.fetch_add(1, Ordering::Relaxed);
    for chunk in buf.chunks_mut(4) {
        let bytes = counter.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
        counter = counter.wrapping_add(1);
    }
}

/// mDNS Responder Task
///
/// Nach DHCP erreichbar unter `<identity>.local`, z.B. `midi-0AB12C.local`.
/// Bei Fehlern Neustart nach `MDNS_RECONNECT_DELAY_SECS`.
#[embassy_executor::task]
pub async fn mdns_responder_task(stack: &'static Stack<'static>, identity: &'static DeviceId) {
    info!("mDNS: Task started, waiting for network...");
    wait_for_network(stack).await;
    info!("mDNS: Network ready");

    // Einmal pro Task, Reconnects nutzen dieselben Buffer
    static UDP_BUFFERS: static_cell::StaticCell<MdnsUdpBuffers> = static_cell::StaticCell::new();
    let udp_buffers = &*UDP_BUFFERS.init_with(UdpBuffers::new);

    loop {
        match run_mdns_responder(stack, identity.as_str(), udp_buffers).await {
            Ok(_) => warn!("mDNS: Responder stopped normally"),
            Err(e) => error!("mDNS: Error: {}", e),
        }
        info!("mDNS: Reconnecting in {}s...", MDNS_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MDNS_RECONNECT_DELAY_SECS)).await;
    }
}

async fn run_mdns_responder(
    stack: &'static Stack<'static>,
    hostname: &str,
    udp_buffers: &MdnsUdpBuffers,
) -> Result<(), MdnsError> {
    // Adresse kann zwischen Reconnects wechseln (DHCP Lease)
    let our_ip = stack
        .config_v4()
        .ok_or(MdnsError::NoAddress)?
        .address
        .address();
    info!("mDNS: Using IP {}", Debug2Format(&our_ip));

    let udp_stack = Udp::new(*stack, udp_buffers);

    let mut socket = udp_stack
        .bind(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), MDNS_PORT))
        .await
        .map_err(|_| MdnsError::SocketBindFailed)?;

    socket
        .join_v4(Ipv4Addr::from(MDNS_MULTICAST_ADDR), Ipv4Addr::UNSPECIFIED)
        .await
        .map_err(|_| MdnsError::MulticastJoinFailed)?;

    let (recv, send) = socket.split();

    let host = Host {
        hostname,
        ipv4: our_ip.into(),
        // kein proto-ipv6 in smoltcp
        ipv6: [0u8; 16].into(),
        ttl: Ttl::from_secs(MDNS_TTL_SECS),
    };

    let recv_buf = VecBufAccess::<NoopRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();
    let send_buf = VecBufAccess::<NoopRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();

    // Von der API verlangt, wir senden keine Broadcasts
    let signal = Signal::<NoopRawMutex, ()>::new();

    let mdns = io::Mdns::new(
        Some(our_ip),
        None,
        recv,
        send,
        recv_buf,
        send_buf,
        mdns_rng,
        &signal,
    );

    info!("mDNS: Responder running, advertising '{}.local'", hostname);

    mdns.run(HostAnswersMdnsHandler::new(&host))
        .await
        .map_err(|_| MdnsError::ResponderFailed)?;

    Ok(())
}

#[derive(Debug)]
enum MdnsError {
    /// DHCP-Lease verloren bevor der Responder starten konnte
    NoAddress,
    SocketBindFailed,
    MulticastJoinFailed,
    ResponderFailed,
}

impl defmt::Format for MdnsError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MdnsError::NoAddress => defmt::write!(fmt, "No IPv4 address"),
            MdnsError::SocketBindFailed => defmt::write!(fmt, "Socket bind failed"),
            MdnsError::MulticastJoinFailed => defmt::write!(fmt, "Multicast join failed"),
            MdnsError::ResponderFailed => defmt::write!(fmt, "Responder failed"),
        }
    }
}
