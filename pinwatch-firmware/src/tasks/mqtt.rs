// MQTT Task - Published Eingangs-Übergänge an den MQTT Broker
use defmt::{Debug2Format, error, info, warn};
use embassy_futures::select::{Either, select};
use embassy_net::{IpAddress, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_time::{Duration, Timer, with_timeout};

use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;
use rust_mqtt::utils::types::EncodedString;

use pinwatch_core::DeviceId;

use crate::TelemetryReceiver;
use crate::config::*;
use crate::tasks::wifi::wait_for_network;

/// MQTT Task - läuft parallel zu anderen Tasks
///
/// - Wartet auf Netzwerk-Verbindung
/// - Verbindet sich mit dem Broker (Client-ID = Geräte-Identität,
///   sofern `MQTT_CLIENT_ID` nicht gesetzt ist)
/// - Leert die Telemetrie-Queue, QoS 0, nicht retained
/// - Ping nach halber Keep-Alive Zeit ohne Nachricht
/// - Automatisches Reconnect bei Fehlern
///
/// Nachrichten, die während eines Reconnects in der Queue liegen, werden
/// danach noch gesendet. Läuft die Queue voll, verwirft der Monitor.
#[embassy_executor::task]
pub async fn mqtt_task(
    stack: &'static Stack<'static>,
    identity: &'static DeviceId,
    telemetry: TelemetryReceiver,
) {
    info!("MQTT: Task started, waiting for network...");
    wait_for_network(stack).await;
    info!("MQTT: Network ready");

    let client_id = MQTT_CLIENT_ID.unwrap_or(identity.as_str());

    loop {
        match mqtt_connect_and_publish(stack, client_id, &telemetry).await {
            Ok(_) => warn!("MQTT: Connection closed normally"),
            Err(e) => error!("MQTT: Error: {}", e),
        }
        info!("MQTT: Reconnecting in {}s...", MQTT_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MQTT_RECONNECT_DELAY_SECS)).await;
    }
}

/// Verbindet mit dem Broker und published die Telemetrie-Queue
///
/// 1. DNS-Auflösung des Broker-Hostnames
/// 2. TCP-Verbindung aufbauen
/// 3. MQTT CONNECT senden
/// 4. Nachrichten aus der Queue publishen, zwischendurch Pings
///
/// Bei jedem Fehler wird die Funktion beendet und der Haupt-Loop
/// startet automatisch einen Reconnect-Versuch.
async fn mqtt_connect_and_publish(
    stack: &'static Stack<'static>,
    client_id: &str,
    telemetry: &TelemetryReceiver,
) -> Result<(), MqttError> {
    info!("MQTT: Resolving '{}'...", MQTT_BROKER);
    let broker_ip = resolve_hostname(stack, MQTT_BROKER).await?;
    info!("MQTT: Resolved to {}", Debug2Format(&broker_ip));

    let mut rx_buffer = [0u8; 2048];
    let mut tx_buffer = [0u8; 2048];
    let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(10)));

    socket
        .connect((broker_ip, MQTT_PORT))
        .await
        .map_err(|_| MqttError::ConnectionFailed)?;
    info!("MQTT: TCP connected to port {}", MQTT_PORT);

    let rng = CountingRng(20000);
    let mut config = ClientConfig::<5, _>::new(MqttVersion::MQTTv5, rng);
    config.client_id = EncodedString {
        string: client_id,
        len: client_id.len() as u16,
    };
    config.keep_alive = MQTT_KEEP_ALIVE_SECS;
    config.max_packet_size = MQTT_BUFFER_SIZE as u32;

    let mut send_buffer = [0u8; MQTT_BUFFER_SIZE];
    let mut recv_buffer = [0u8; MQTT_BUFFER_SIZE];

    let mut client = MqttClient::<_, 5, _>::new(
        socket,
        &mut send_buffer,
        MQTT_BUFFER_SIZE,
        &mut recv_buffer,
        MQTT_BUFFER_SIZE,
        config,
    );

    client
        .connect_to_broker()
        .await
        .map_err(|_| MqttError::ProtocolError)?;
    info!("MQTT: Connected to broker as '{}'", client_id);

    let ping_interval = Duration::from_secs(u64::from(MQTT_KEEP_ALIVE_SECS) / 2);

    loop {
        match select(telemetry.receive(), Timer::after(ping_interval)).await {
            Either::First(msg) => {
                client
                    .send_message(
                        msg.topic.as_str(),
                        &msg.payload,
                        QualityOfService::QoS0,
                        false,
                    )
                    .await
                    .map_err(|_| MqttError::PublishFailed)?;
                info!("MQTT: Published {}", msg);
            }
            Either::Second(_) => {
                client
                    .send_ping()
                    .await
                    .map_err(|_| MqttError::PingFailed)?;
            }
        }
    }
}

/// Löst Hostname zu IPv4-Adresse auf
///
/// Nutzt embassy-net DNS-Stack mit konfigurierbarem Timeout.
async fn resolve_hostname(
    stack: &'static Stack<'static>,
    hostname: &str,
) -> Result<embassy_net::Ipv4Address, MqttError> {
    let result = with_timeout(
        Duration::from_secs(DNS_TIMEOUT_SECS),
        stack.dns_query(hostname, DnsQueryType::A),
    )
    .await;

    match result {
        Ok(Ok(addrs)) => {
            for addr in addrs {
                if let IpAddress::Ipv4(ipv4) = addr {
                    return Ok(ipv4);
                }
            }
            Err(MqttError::DnsResolutionFailed)
        }
        Ok(Err(_)) => Err(MqttError::DnsResolutionFailed),
        Err(_) => Err(MqttError::DnsTimeout),
    }
}

/// MQTT Fehler-Typen
#[derive(Debug)]
enum MqttError {
    DnsResolutionFailed,
    DnsTimeout,
    ConnectionFailed,
    ProtocolError,
    PublishFailed,
    PingFailed,
}

impl defmt::Format for MqttError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MqttError::DnsResolutionFailed => defmt::write!(fmt, "DNS failed"),
            MqttError::DnsTimeout => defmt::write!(fmt, "DNS timeout"),
            MqttError::ConnectionFailed => defmt::write!(fmt, "Connection failed"),
            MqttError::ProtocolError => defmt::write!(fmt, "Protocol error"),
            MqttError::PublishFailed => defmt::write!(fmt, "Publish failed"),
            MqttError::PingFailed => defmt::write!(fmt, "Ping failed"),
        }
    }
}
