// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Heap Allocator (WiFi benötigt dynamischen Speicher)
extern crate alloc;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, Stack, StackResources};
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::efuse::Efuse;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

use defmt::info;
use static_cell::StaticCell;

// Projekt-Module und Konfiguration
use pinwatch_core::{DeviceId, chip_id, device_identity};
use pinwatch_firmware::config::{DEVICE_NAME, EXTRA_HEAP_SIZE, I2C_FREQUENCY_KHZ, WIFI_HEAP_SIZE};
use pinwatch_firmware::tasks::{
    connection_task, dhcp_task, mdns_responder_task, monitor_task, net_task,
};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Socket-Anzahl für embassy-net, muss eine Konstante im Typ sein
const NET_SOCKETS: usize = pinwatch_firmware::config::NET_SOCKETS;

/// Main Entry Point
///
/// Initialisiert Hardware, WiFi, startet Embassy Runtime und spawnt Tasks.
/// Danach schläft main() - alle Arbeit läuft in Tasks.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap Allocator initialisieren (WiFi braucht dynamischen Speicher!)
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // Geräte-Identität aus der Basis-MAC: "<DEVICE_NAME>-XXXXXX"
    static IDENTITY: StaticCell<DeviceId> = StaticCell::new();
    let identity: &'static DeviceId = IDENTITY.init(
        device_identity(DEVICE_NAME, chip_id(Efuse::mac_address()))
            .expect("DEVICE_NAME too long for device identity"),
    );
    info!("Device identity: {}", identity.as_str());

    // I2C Bus für MCP23008 + SSD1306 (SDA = GPIO6, SCL = GPIO7)
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .expect("Failed to initialize I2C")
    .with_sda(peripherals.GPIO6)
    .with_scl(peripherals.GPIO7);

    // WiFi Hardware initialisieren
    static RADIO_INIT: StaticCell<esp_radio::Controller> = StaticCell::new();
    let radio_init =
        RADIO_INIT.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));

    let (wifi_controller, wifi_interface) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");

    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    static RESOURCES: StaticCell<StackResources<NET_SOCKETS>> = StaticCell::new();
    let resources = RESOURCES.init(StackResources::new());

    // embassy-net erstellt Stack + Runner (nutzt STA interface für Client-Modus)
    let (stack, runner) = embassy_net::new(
        wifi_interface.sta,
        NetConfig::dhcpv4(Default::default()),
        resources,
        seed,
    );

    // Stack muss 'static sein für Tasks
    static STACK: StaticCell<Stack<'static>> = StaticCell::new();
    let stack = &*STACK.init(stack);

    // Note-Queue (Monitor → MIDI Task)
    #[cfg(feature = "midi")]
    let notes = {
        use pinwatch_firmware::NoteChannel;
        use pinwatch_firmware::tasks::midi_task;

        static NOTE_CHANNEL: StaticCell<NoteChannel> = StaticCell::new();
        let channel = &*NOTE_CHANNEL.init(NoteChannel::new());
        spawner
            .spawn(midi_task(stack, identity, channel.receiver()))
            .unwrap();
        Some(channel.sender())
    };
    #[cfg(not(feature = "midi"))]
    let notes = None;

    // Telemetrie-Queue (Monitor → MQTT Task)
    #[cfg(feature = "telemetry")]
    let telemetry = {
        use pinwatch_firmware::TelemetryChannel;
        use pinwatch_firmware::tasks::mqtt_task;

        static TELEMETRY_CHANNEL: StaticCell<TelemetryChannel> = StaticCell::new();
        let channel = &*TELEMETRY_CHANNEL.init(TelemetryChannel::new());
        spawner
            .spawn(mqtt_task(stack, identity, channel.receiver()))
            .unwrap();
        Some(channel.sender())
    };
    #[cfg(not(feature = "telemetry"))]
    let telemetry = None;

    // Spawn Monitor Task (I2C Bus, Aktivitäts-LED, Sinks)
    spawner
        .spawn(monitor_task(
            i2c,
            peripherals.GPIO8,
            peripherals.RMT,
            identity,
            notes,
            telemetry,
        ))
        .unwrap();

    // Spawn WiFi Tasks
    spawner.spawn(connection_task(wifi_controller)).unwrap();
    spawner.spawn(net_task(runner)).unwrap();
    spawner.spawn(dhcp_task(stack)).unwrap();

    // Spawn mDNS Responder Task (für <identity>.local)
    spawner.spawn(mdns_responder_task(stack, identity)).unwrap();

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
