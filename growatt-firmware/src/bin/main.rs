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
use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_net::{Stack, StackResources};
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use growatt_core::field::NewClientId;
use growatt_core::payload::build_client_id;
use growatt_core::{ConfigKey, RuntimeState, Settings};
use growatt_monitor::config::{EXTRA_HEAP_SIZE, SETTINGS, WIFI_HEAP_SIZE};
use growatt_monitor::tasks::{
    connection_task, control_task, dhcp_task, mqtt_task, net_config, net_task,
};
use growatt_monitor::{CommandChannel, OutgoingChannel, WifiLinkSignal};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Loggt alle Konfigurationsschlüssel, Passwörter geschwärzt
fn log_settings(settings: &Settings) {
    info!("Config: build {}", growatt_core::BUILD_VERSION);
    for key in ConfigKey::ALL {
        if key.is_secret() {
            info!("  {} = ***", key.name());
        } else {
            info!("  {} = {}", key.name(), settings.get(key));
        }
    }
}

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

    log_settings(&SETTINGS);

    // WiFi Hardware initialisieren
    static RADIO_INIT: static_cell::StaticCell<esp_radio::Controller> =
        static_cell::StaticCell::new();
    let radio_init =
        RADIO_INIT.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));

    let (wifi_controller, wifi_interface) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");

    // Laufzeit-Zustand, Client-ID aus Basis + MAC-Endung
    let mut state = RuntimeState::new();
    let mac = wifi_interface.sta.mac_address();
    if let Err(e) = build_client_id(&mut state, SETTINGS.mqtt.client_id, mac) {
        error!("Config: client id too long: {}", e);
    }
    let client_id = state.read::<NewClientId>();
    info!("Config: MQTT client id '{}'", client_id.as_str());

    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    // MQTT (1) + DNS
    static RESOURCES: static_cell::StaticCell<StackResources<4>> = static_cell::StaticCell::new();
    let resources = RESOURCES.init(StackResources::new());

    let (stack, runner) = embassy_net::new(wifi_interface.sta, net_config(), resources, seed);

    // Stack muss 'static sein für Tasks
    static STACK: static_cell::StaticCell<Stack<'static>> = static_cell::StaticCell::new();
    let stack = &*STACK.init(stack);

    // Control-Loop → MQTT
    static OUTGOING: static_cell::StaticCell<OutgoingChannel> = static_cell::StaticCell::new();
    let outgoing = &*OUTGOING.init(OutgoingChannel::new());

    // MQTT → Control-Loop
    static COMMANDS: static_cell::StaticCell<CommandChannel> = static_cell::StaticCell::new();
    let commands = &*COMMANDS.init(CommandChannel::new());

    // WiFi → Control-Loop
    static WIFI_LINK: static_cell::StaticCell<WifiLinkSignal> = static_cell::StaticCell::new();
    let link_signal = &*WIFI_LINK.init(WifiLinkSignal::new());

    // Spawn Control-Loop (besitzt ab hier den Zustand)
    spawner
        .spawn(control_task(
            state,
            peripherals.GPIO0,
            peripherals.RMT,
            stack,
            link_signal,
            outgoing.sender(),
            commands.receiver(),
        ))
        .unwrap();

    // Spawn WiFi Tasks
    spawner
        .spawn(connection_task(wifi_controller, link_signal))
        .unwrap();
    spawner.spawn(net_task(runner)).unwrap();
    spawner.spawn(dhcp_task(stack)).unwrap();

    // Spawn MQTT Task
    spawner
        .spawn(mqtt_task(
            stack,
            client_id,
            outgoing.receiver(),
            commands.sender(),
        ))
        .unwrap();

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
