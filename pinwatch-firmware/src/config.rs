// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen
#![allow(dead_code)]

use pinwatch_core::{DisplayMode, FieldLayout, NoiseFilter};
use rgb::RGB8;

// ============================================================================
// Geräte-Identität
// ============================================================================

/// Präfix der Geräte-Identität ("<DEVICE_NAME>-<XXXXXX>")
/// Kann zur Build-Zeit über die Environment Variable DEVICE_NAME gesetzt werden
pub const DEVICE_NAME: &str = match option_env!("DEVICE_NAME") {
    Some(name) => name,
    None => DEFAULT_DEVICE_NAME,
};

#[cfg(feature = "telemetry")]
const DEFAULT_DEVICE_NAME: &str = "sensor";

#[cfg(all(feature = "midi", not(feature = "telemetry")))]
const DEFAULT_DEVICE_NAME: &str = "midi";

#[cfg(not(any(feature = "midi", feature = "telemetry")))]
const DEFAULT_DEVICE_NAME: &str = "pinwatch";

// ============================================================================
// I2C Bus (MCP23008 + SSD1306)
// ============================================================================

/// GPIO-Pins für den I2C Bus
pub const I2C_SDA_GPIO: u8 = 6;
pub const I2C_SCL_GPIO: u8 = 7;

/// I2C Taktfrequenz in kHz
pub const I2C_FREQUENCY_KHZ: u32 = 400;

/// I2C-Adresse des MCP23008 Port-Expanders (A0..A2 auf GND)
pub const MCP23008_ADDRESS: u8 = 0x20;

/// I2C-Adresse des SSD1306 OLED (128x64)
pub const SSD1306_ADDRESS: u8 = 0x3C;

// ============================================================================
// Eingangs-Überwachung
// ============================================================================

/// Rauschfilter für die Eingänge
/// `None` = jede Pegeländerung ist sofort ein Event
pub const NOISE_FILTER: Option<NoiseFilter> = None;

/// Mindestdauer des Aktivitäts-Pulses in Millisekunden
pub const ACTIVITY_PULSE_MS: u64 = 10;

/// Trigger-Zähler pro Kanal (nur Telemetrie-Variante)
pub const COUNT_TRIGGERS: bool = cfg!(feature = "telemetry");

// ============================================================================
// Display Konfiguration
// ============================================================================

/// Feld-Spalten passend zur Form "01: 9999   02: 9999", eine Zeile pro Kanalpaar
pub const FIELD_LAYOUT: FieldLayout = FieldLayout::new([4, 15], 1);

/// Anzeige-Modus: Zähler in der Telemetrie-Variante, sonst HIGH/LOW
pub const DISPLAY_MODE: DisplayMode = if COUNT_TRIGGERS {
    DisplayMode::TriggerCount
} else {
    DisplayMode::StateWord
};

/// Zeile für die Geräte-Identität unter der Form
pub const IDENTITY_ROW: u8 = 7;

// ============================================================================
// LED Konfiguration
// ============================================================================

/// GPIO-Pin für die RGB LED (WS2812/Neopixel)
pub const LED_GPIO_PIN: u8 = 8;

/// Helligkeits-Level für die LED (0-255)
/// Wert ist gedimmt für Augenschonung
pub const LED_BRIGHTNESS: u8 = 10;

/// Farbe der LED während eines Aktivitäts-Pulses
pub const ACTIVITY_COLOR: RGB8 = RGB8 {
    r: 0,
    g: 0,
    b: LED_BRIGHTNESS,
};

/// Farbe der LED während der Initialisierung
pub const SETUP_COLOR: RGB8 = RGB8 {
    r: LED_BRIGHTNESS,
    g: LED_BRIGHTNESS / 2,
    b: 0,
};

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
/// Setze diese in .env file (siehe .env.example)
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// WiFi Passwort
/// Wird zur Build-Zeit aus der Environment Variable WIFI_PASSWORD geladen
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Wartezeit nach fehlgeschlagenem Verbindungsversuch
pub const WIFI_RETRY_DELAY_SECS: u64 = 5;

/// Polling-Intervall beim Warten auf Link / DHCP
pub const NETWORK_POLL_MS: u64 = 500;

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

/// Sockets im embassy-net Stack
/// MQTT (1) + mDNS (1) + AppleMIDI Control/Data (2) + DNS
pub const NET_SOCKETS: usize = 6;

// ============================================================================
// AppleMIDI Konfiguration
// ============================================================================

/// UDP-Ports (Control, Data = Control + 1)
pub const MIDI_CONTROL_PORT: u16 = pinwatch_core::applemidi::CONTROL_PORT;
pub const MIDI_DATA_PORT: u16 = pinwatch_core::applemidi::DATA_PORT;

/// Maximale Anzahl gleichzeitiger Sessions
pub const MIDI_MAX_PEERS: usize = 4;

/// Velocity und MIDI-Kanal für Note-Events
pub const MIDI_VELOCITY: u8 = 64;
pub const MIDI_CHANNEL: u8 = 1;

/// Note-Queue (Monitor → MIDI Task), voll = Event verworfen
pub const MIDI_QUEUE_DEPTH: usize = 16;

/// UDP Buffer-Größe für AppleMIDI Pakete
pub const MIDI_PACKET_BUFFER_SIZE: usize = 256;

/// Wartezeit nach Socket-Fehler
pub const MIDI_RECONNECT_DELAY_SECS: u64 = 5;

// ============================================================================
// MQTT Konfiguration
// ============================================================================

/// MQTT Broker Hostname oder IP-Adresse
/// Wird zur Build-Zeit aus der Environment Variable MQTT_BROKER geladen
#[cfg(feature = "telemetry")]
pub const MQTT_BROKER: &str = env!(
    "MQTT_BROKER",
    "MQTT Broker nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// MQTT Broker Port
/// Standard: 1883 (unverschlüsselt), kann in .env überschrieben werden
pub const MQTT_PORT: u16 = parse_port(option_env!("MQTT_PORT"), 1883);

/// MQTT Client ID
/// Ohne MQTT_CLIENT_ID in .env wird die Geräte-Identität verwendet
pub const MQTT_CLIENT_ID: Option<&str> = option_env!("MQTT_CLIENT_ID");

/// MQTT Keep-Alive in Sekunden (Ping nach der Hälfte)
pub const MQTT_KEEP_ALIVE_SECS: u16 = 30;

/// MQTT Reconnect Delay in Sekunden
/// Wartezeit nach Verbindungsfehler vor erneutem Versuch
pub const MQTT_RECONNECT_DELAY_SECS: u64 = 5;

/// MQTT Buffer-Größe in Bytes
/// Muss groß genug für MQTT-Pakete sein
pub const MQTT_BUFFER_SIZE: usize = 1024;

/// Telemetrie-Queue (Monitor → MQTT Task), voll = Nachricht verworfen
pub const TELEMETRY_QUEUE_DEPTH: usize = 16;

/// DNS Query Timeout in Sekunden
pub const DNS_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// mDNS-Konfiguration
// ============================================================================

/// mDNS TTL (Time To Live) in Sekunden
/// Gibt an, wie lange andere Geräte die mDNS-Antwort cachen dürfen
pub const MDNS_TTL_SECS: u32 = 120;

/// mDNS Reconnect Delay in Sekunden
pub const MDNS_RECONNECT_DELAY_SECS: u64 = 5;

/// mDNS Port (Standard: 5353, RFC 6762)
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 Multicast-Adresse (224.0.0.251)
pub const MDNS_MULTICAST_ADDR: [u8; 4] = [224, 0, 0, 251];

/// UDP Buffer-Größen für mDNS (TX, RX in Bytes)
pub const MDNS_UDP_BUFFER_SIZE: usize = 512;

/// mDNS Receive/Send Buffer-Größen in Bytes
/// 1500 Bytes = Standard MTU für Ethernet/WiFi
pub const MDNS_PACKET_BUFFER_SIZE: usize = 1500;

/// Dezimal-Port aus der Build-Umgebung, ungültige Werte → `default`
const fn parse_port(value: Option<&str>, default: u16) -> u16 {
    let Some(value) = value else {
        return default;
    };
    let bytes = value.as_bytes();
    if bytes.is_empty() {
        return default;
    }

    let mut port: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if !digit.is_ascii_digit() {
            return default;
        }
        port = port * 10 + (digit - b'0') as u32;
        if port > u16::MAX as u32 {
            return default;
        }
        i += 1;
    }
    port as u16
}
