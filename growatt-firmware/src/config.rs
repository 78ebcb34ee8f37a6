// Projekt-Konfiguration: Zugangsdaten und Firmware-Konstanten
//
// Hardware-Pins, Baudraten und Intervalle stehen in growatt_core::settings.
// Hier kommen nur die zur Build-Zeit eingebackenen Zugangsdaten dazu
// sowie Puffer-Größen, die nur die Firmware betreffen.

use growatt_core::Settings;
use growatt_core::payload::TOPIC_CAPACITY;
use growatt_core::state::PAYLOAD_CAPACITY;
use growatt_core::settings::{MQTT_PORT, MqttSettings, NetworkSettings, WifiCredentials};

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
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Ausweich-Netz, Standard: dasselbe wie das primäre
pub const WIFI_SSID_BACKUP: &str = match option_env!("WIFI_SSID_BACKUP") {
    Some(ssid) => ssid,
    None => WIFI_SSID,
};

pub const WIFI_PASSWORD_BACKUP: &str = match option_env!("WIFI_PASSWORD_BACKUP") {
    Some(password) => password,
    None => WIFI_PASSWORD,
};

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

/// Wartezeit nach fehlgeschlagenem Verbindungsversuch
pub const WIFI_RETRY_DELAY_SECS: u64 = 5;

// ============================================================================
// MQTT Konfiguration
// ============================================================================

/// MQTT Broker Hostname oder IP-Adresse
pub const MQTT_SERVER: &str = env!(
    "MQTT_SERVER",
    "MQTT Server nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

pub const MQTT_USER: &str = match option_env!("MQTT_USER") {
    Some(user) => user,
    None => "",
};

pub const MQTT_PASSWORD: &str = match option_env!("MQTT_PASSWORD") {
    Some(password) => password,
    None => "",
};

/// Basis der Client-ID, die MAC-Endung wird zur Laufzeit angehängt
pub const MQTT_CLIENT_ID: &str = match option_env!("MQTT_CLIENT_ID") {
    Some(id) => id,
    None => "growatt",
};

/// Root-Topic des Geräts
pub const MQTT_TOPIC_ROOT: &str = match option_env!("MQTT_TOPIC_ROOT") {
    Some(root) => root,
    None => "growatt",
};

/// MQTT Reconnect Delay in Sekunden
/// Wartezeit nach Verbindungsfehler vor erneutem Versuch
pub const MQTT_RECONNECT_DELAY_SECS: u64 = 5;

/// MQTT Keep-Alive in Sekunden, Ping nach der Hälfte
pub const MQTT_KEEP_ALIVE_SECS: u16 = 60;

/// MQTT Buffer-Größe in Bytes
/// Muss die größte Payload (Status, Discovery) plus Header fassen
pub const MQTT_BUFFER_SIZE: usize = 1024;

// PUBLISH-Header (Fixed Header, Topic-Länge, Properties) passt in 16 Bytes
const _: () = assert!(PAYLOAD_CAPACITY + TOPIC_CAPACITY + 16 <= MQTT_BUFFER_SIZE);

/// DNS Query Timeout in Sekunden
pub const DNS_TIMEOUT_SECS: u64 = 10;

/// Plätze in der Warteschlange Control-Loop → MQTT
pub const OUTGOING_QUEUE_SIZE: usize = 2;

/// Plätze in der Warteschlange MQTT → Control-Loop
pub const COMMAND_QUEUE_SIZE: usize = 2;

// ============================================================================
// Control-Loop / LED
// ============================================================================

/// Pause zwischen zwei Durchläufen des Control-Loops
pub const CONTROL_LOOP_INTERVAL_MS: u64 = 10;

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

// ============================================================================
// Gesamt-Konfiguration
// ============================================================================

pub const SETTINGS: Settings = Settings::new(
    NetworkSettings {
        primary: WifiCredentials {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        backup: WifiCredentials {
            ssid: WIFI_SSID_BACKUP,
            password: WIFI_PASSWORD_BACKUP,
        },
        // Some(StaticIp { .. }) für feste IP statt DHCP
        static_ip: None,
    },
    MqttSettings {
        server: MQTT_SERVER,
        port: MQTT_PORT,
        user: MQTT_USER,
        password: MQTT_PASSWORD,
        client_id: MQTT_CLIENT_ID,
        topic_root: MQTT_TOPIC_ROOT,
    },
);
