//! Statische Konfiguration
//!
//! Alle Werte stehen zur Compile-Zeit fest. Netzwerk- und MQTT-Zugangsdaten
//! setzt die Firmware aus Environment-Variablen ein (siehe `build.rs`),
//! alles andere kommt aus den Konstanten unten.
//!
//! Zugriff entweder direkt über die Struct-Felder oder über
//! [`Settings::get`] mit einem [`ConfigKey`].

use crate::timer::{PeriodicTrigger, TimerSlot};

// ============================================================================
// RS485 / Modbus
// ============================================================================

/// Modbus-Geschwindigkeit des Growatt, nicht ändern
pub const MODBUS_RATE: u32 = 9600;

/// Serielle Geschwindigkeit für Status-Ausgaben
pub const SERIAL_RATE: u32 = 9600;

/// DE-Pin am TTL/RS485-Wandler (D1)
pub const MAX485_DE: u8 = 5;

/// RE-Pin am TTL/RS485-Wandler (D2)
pub const MAX485_RE_NEG: u8 = 4;

/// RO-Pin am TTL/RS485-Wandler (D5)
pub const MAX485_RX: u8 = 14;

/// DI-Pin am TTL/RS485-Wandler (D6)
pub const MAX485_TX: u8 = 12;

/// Standard Slave-ID des Growatt
pub const SLAVE_ID: u8 = 1;

// ============================================================================
// LEDs
// ============================================================================

/// Status-LED auf dem Board (D4)
pub const STATUS_LED: u8 = 2;

/// Neopixel-Datenleitung (D3)
pub const RGBLED_PIN: u8 = 0;

pub const NUM_LEDS: u8 = 1;

/// Standard-Helligkeit der RGB LED (0-255)
pub const BRIGHTNESS: u8 = 64;

// ============================================================================
// Timing (Millisekunden)
// ============================================================================

/// Status-Nachricht per MQTT alle 30 Sekunden
pub const UPDATE_STATUS_MS: u32 = 30_000;

/// Verzögerung bis die Status-LED wieder ausgeht
pub const RGB_STATUS_DELAY_MS: u32 = 500;

/// Wie oft die WiFi-Verbindung geprüft wird
pub const WIFI_CHECK_MS: u32 = 500;

/// Minimaler Abstand zwischen zwei Modbus-Abfragen
pub const READ_GROWATT_DELAY_MS: u32 = 250;

/// Standard MQTT Port (unverschlüsselt)
pub const MQTT_PORT: u16 = 1883;

// ============================================================================
// Typen
// ============================================================================

/// Byte-Reihenfolge der adressierbaren LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorOrder {
    Rgb,
    Grb,
    Bgr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedType {
    Ws2812,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: &'static str,
    pub password: &'static str,
}

/// Feste IPv4-Konfiguration statt DHCP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticIp {
    pub address: [u8; 4],
    pub gateway: [u8; 4],
    pub subnet: [u8; 4],
    pub primary_dns: [u8; 4],
    pub secondary_dns: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSettings {
    pub primary: WifiCredentials,
    pub backup: WifiCredentials,
    /// `None` = DHCP
    pub static_ip: Option<StaticIp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttSettings {
    pub server: &'static str,
    pub port: u16,
    pub user: &'static str,
    pub password: &'static str,
    /// Basis für die dynamische Client-ID
    pub client_id: &'static str,
    pub topic_root: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rs485Settings {
    pub de_pin: u8,
    pub re_neg_pin: u8,
    pub rx_pin: u8,
    pub tx_pin: u8,
    pub baud_rate: u32,
    pub slave_id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSettings {
    pub status_led_pin: u8,
    pub rgb_pin: u8,
    pub count: u8,
    pub led_type: LedType,
    pub color_order: ColorOrder,
    pub brightness: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSettings {
    pub status_interval_ms: u32,
    pub rgb_off_delay_ms: u32,
    pub wifi_check_ms: u32,
    pub min_poll_spacing_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugSettings {
    pub serial: bool,
    pub mqtt: bool,
}

/// Komplette, unveränderliche Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub network: NetworkSettings,
    pub mqtt: MqttSettings,
    pub rs485: Rs485Settings,
    pub leds: LedSettings,
    pub timing: TimingSettings,
    pub serial_rate: u32,
    pub debug: DebugSettings,
}

impl Settings {
    /// Baut die Konfiguration aus Zugangsdaten und den Standard-Konstanten
    pub const fn new(network: NetworkSettings, mqtt: MqttSettings) -> Self {
        Self {
            network,
            mqtt,
            rs485: Rs485Settings {
                de_pin: MAX485_DE,
                re_neg_pin: MAX485_RE_NEG,
                rx_pin: MAX485_RX,
                tx_pin: MAX485_TX,
                baud_rate: MODBUS_RATE,
                slave_id: SLAVE_ID,
            },
            leds: LedSettings {
                status_led_pin: STATUS_LED,
                rgb_pin: RGBLED_PIN,
                count: NUM_LEDS,
                led_type: LedType::Ws2812,
                color_order: ColorOrder::Grb,
                brightness: BRIGHTNESS,
            },
            timing: TimingSettings {
                status_interval_ms: UPDATE_STATUS_MS,
                rgb_off_delay_ms: RGB_STATUS_DELAY_MS,
                wifi_check_ms: WIFI_CHECK_MS,
                min_poll_spacing_ms: READ_GROWATT_DELAY_MS,
            },
            serial_rate: SERIAL_RATE,
            debug: DebugSettings {
                serial: true,
                mqtt: true,
            },
        }
    }

    /// Liest einen Konfigurationswert über seinen Schlüssel
    pub const fn get(&self, key: ConfigKey) -> ConfigValue {
        use ConfigKey as K;
        use ConfigValue as V;

        let ip = self.network.static_ip;
        match key {
            K::WifiSsid => V::Text(self.network.primary.ssid),
            K::WifiPassword => V::Text(self.network.primary.password),
            K::WifiSsidBackup => V::Text(self.network.backup.ssid),
            K::WifiPasswordBackup => V::Text(self.network.backup.password),
            K::StaticIpAddress => V::Address(match ip {
                Some(ip) => Some(ip.address),
                None => None,
            }),
            K::StaticIpGateway => V::Address(match ip {
                Some(ip) => Some(ip.gateway),
                None => None,
            }),
            K::StaticIpSubnet => V::Address(match ip {
                Some(ip) => Some(ip.subnet),
                None => None,
            }),
            K::StaticIpPrimaryDns => V::Address(match ip {
                Some(ip) => Some(ip.primary_dns),
                None => None,
            }),
            K::StaticIpSecondaryDns => V::Address(match ip {
                Some(ip) => Some(ip.secondary_dns),
                None => None,
            }),
            K::MqttServer => V::Text(self.mqtt.server),
            K::MqttPort => V::Number(self.mqtt.port as u32),
            K::MqttUser => V::Text(self.mqtt.user),
            K::MqttPassword => V::Text(self.mqtt.password),
            K::MqttClientId => V::Text(self.mqtt.client_id),
            K::TopicRoot => V::Text(self.mqtt.topic_root),
            K::ModbusRate => V::Number(self.rs485.baud_rate),
            K::SerialRate => V::Number(self.serial_rate),
            K::SlaveId => V::Number(self.rs485.slave_id as u32),
            K::Max485De => V::Pin(self.rs485.de_pin),
            K::Max485ReNeg => V::Pin(self.rs485.re_neg_pin),
            K::Max485Rx => V::Pin(self.rs485.rx_pin),
            K::Max485Tx => V::Pin(self.rs485.tx_pin),
            K::StatusLed => V::Pin(self.leds.status_led_pin),
            K::RgbLedPin => V::Pin(self.leds.rgb_pin),
            K::NumLeds => V::Number(self.leds.count as u32),
            K::LedType => V::LedType(self.leds.led_type),
            K::ColorOrder => V::ColorOrder(self.leds.color_order),
            K::Brightness => V::Number(self.leds.brightness as u32),
            K::UpdateStatusMs => V::Number(self.timing.status_interval_ms),
            K::RgbStatusDelayMs => V::Number(self.timing.rgb_off_delay_ms),
            K::WifiCheckMs => V::Number(self.timing.wifi_check_ms),
            K::ReadGrowattDelayMs => V::Number(self.timing.min_poll_spacing_ms),
            K::DebugSerial => V::Flag(self.debug.serial),
            K::DebugMqtt => V::Flag(self.debug.mqtt),
        }
    }

    /// Trigger für die periodische Status-Nachricht
    pub const fn status_trigger(&self) -> PeriodicTrigger {
        PeriodicTrigger::new(TimerSlot::LastStatus, self.timing.status_interval_ms)
    }

    /// Trigger für die WiFi-Prüfung
    pub const fn wifi_check_trigger(&self) -> PeriodicTrigger {
        PeriodicTrigger::new(TimerSlot::LastWifiCheck, self.timing.wifi_check_ms)
    }

    /// Trigger für den minimalen Abstand zwischen Modbus-Abfragen
    pub const fn poll_trigger(&self) -> PeriodicTrigger {
        PeriodicTrigger::new(TimerSlot::Last485, self.timing.min_poll_spacing_ms)
    }
}

/// Alle Konfigurationsschlüssel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigKey {
    WifiSsid,
    WifiPassword,
    WifiSsidBackup,
    WifiPasswordBackup,
    StaticIpAddress,
    StaticIpGateway,
    StaticIpSubnet,
    StaticIpPrimaryDns,
    StaticIpSecondaryDns,
    MqttServer,
    MqttPort,
    MqttUser,
    MqttPassword,
    MqttClientId,
    TopicRoot,
    ModbusRate,
    SerialRate,
    SlaveId,
    Max485De,
    Max485ReNeg,
    Max485Rx,
    Max485Tx,
    StatusLed,
    RgbLedPin,
    NumLeds,
    LedType,
    ColorOrder,
    Brightness,
    UpdateStatusMs,
    RgbStatusDelayMs,
    WifiCheckMs,
    ReadGrowattDelayMs,
    DebugSerial,
    DebugMqtt,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 34] = [
        ConfigKey::WifiSsid,
        ConfigKey::WifiPassword,
        ConfigKey::WifiSsidBackup,
        ConfigKey::WifiPasswordBackup,
        ConfigKey::StaticIpAddress,
        ConfigKey::StaticIpGateway,
        ConfigKey::StaticIpSubnet,
        ConfigKey::StaticIpPrimaryDns,
        ConfigKey::StaticIpSecondaryDns,
        ConfigKey::MqttServer,
        ConfigKey::MqttPort,
        ConfigKey::MqttUser,
        ConfigKey::MqttPassword,
        ConfigKey::MqttClientId,
        ConfigKey::TopicRoot,
        ConfigKey::ModbusRate,
        ConfigKey::SerialRate,
        ConfigKey::SlaveId,
        ConfigKey::Max485De,
        ConfigKey::Max485ReNeg,
        ConfigKey::Max485Rx,
        ConfigKey::Max485Tx,
        ConfigKey::StatusLed,
        ConfigKey::RgbLedPin,
        ConfigKey::NumLeds,
        ConfigKey::LedType,
        ConfigKey::ColorOrder,
        ConfigKey::Brightness,
        ConfigKey::UpdateStatusMs,
        ConfigKey::RgbStatusDelayMs,
        ConfigKey::WifiCheckMs,
        ConfigKey::ReadGrowattDelayMs,
        ConfigKey::DebugSerial,
        ConfigKey::DebugMqtt,
    ];

    /// Name für Log-Ausgaben
    pub const fn name(self) -> &'static str {
        match self {
            ConfigKey::WifiSsid => "wifi.ssid",
            ConfigKey::WifiPassword => "wifi.password",
            ConfigKey::WifiSsidBackup => "wifi.ssid_backup",
            ConfigKey::WifiPasswordBackup => "wifi.password_backup",
            ConfigKey::StaticIpAddress => "net.address",
            ConfigKey::StaticIpGateway => "net.gateway",
            ConfigKey::StaticIpSubnet => "net.subnet",
            ConfigKey::StaticIpPrimaryDns => "net.dns1",
            ConfigKey::StaticIpSecondaryDns => "net.dns2",
            ConfigKey::MqttServer => "mqtt.server",
            ConfigKey::MqttPort => "mqtt.port",
            ConfigKey::MqttUser => "mqtt.user",
            ConfigKey::MqttPassword => "mqtt.password",
            ConfigKey::MqttClientId => "mqtt.client_id",
            ConfigKey::TopicRoot => "mqtt.topic_root",
            ConfigKey::ModbusRate => "modbus.rate",
            ConfigKey::SerialRate => "serial.rate",
            ConfigKey::SlaveId => "modbus.slave_id",
            ConfigKey::Max485De => "rs485.de",
            ConfigKey::Max485ReNeg => "rs485.re_neg",
            ConfigKey::Max485Rx => "rs485.rx",
            ConfigKey::Max485Tx => "rs485.tx",
            ConfigKey::StatusLed => "led.status_pin",
            ConfigKey::RgbLedPin => "led.rgb_pin",
            ConfigKey::NumLeds => "led.count",
            ConfigKey::LedType => "led.type",
            ConfigKey::ColorOrder => "led.color_order",
            ConfigKey::Brightness => "led.brightness",
            ConfigKey::UpdateStatusMs => "timing.status_ms",
            ConfigKey::RgbStatusDelayMs => "timing.rgb_off_ms",
            ConfigKey::WifiCheckMs => "timing.wifi_check_ms",
            ConfigKey::ReadGrowattDelayMs => "timing.poll_spacing_ms",
            ConfigKey::DebugSerial => "debug.serial",
            ConfigKey::DebugMqtt => "debug.mqtt",
        }
    }

    /// Passwörter dürfen nicht geloggt werden
    pub const fn is_secret(self) -> bool {
        matches!(
            self,
            ConfigKey::WifiPassword | ConfigKey::WifiPasswordBackup | ConfigKey::MqttPassword
        )
    }
}

/// Wert eines Konfigurationsschlüssels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigValue {
    Text(&'static str),
    Number(u32),
    Pin(u8),
    Flag(bool),
    Address(Option<[u8; 4]>),
    LedType(LedType),
    ColorOrder(ColorOrder),
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SETTINGS: Settings = Settings::new(
        NetworkSettings {
            primary: WifiCredentials {
                ssid: "primary",
                password: "secret1",
            },
            backup: WifiCredentials {
                ssid: "backup",
                password: "secret2",
            },
            static_ip: None,
        },
        MqttSettings {
            server: "mqtt.lan",
            port: MQTT_PORT,
            user: "admin",
            password: "secret3",
            client_id: "growatt",
            topic_root: "growatt",
        },
    );

    #[test]
    fn test_get_matches_fields() {
        assert_eq!(TEST_SETTINGS.get(ConfigKey::WifiSsid), ConfigValue::Text("primary"));
        assert_eq!(TEST_SETTINGS.get(ConfigKey::ModbusRate), ConfigValue::Number(9600));
        assert_eq!(TEST_SETTINGS.get(ConfigKey::Max485Rx), ConfigValue::Pin(14));
        assert_eq!(TEST_SETTINGS.get(ConfigKey::StaticIpAddress), ConfigValue::Address(None));
    }

    #[test]
    fn test_all_keys_listed_once() {
        for (i, a) in ConfigKey::ALL.iter().enumerate() {
            for b in &ConfigKey::ALL[i + 1..] {
                assert_ne!(a, b);
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn test_secret_keys() {
        let secrets = ConfigKey::ALL.iter().filter(|k| k.is_secret()).count();
        assert_eq!(secrets, 3);
        assert!(!ConfigKey::MqttUser.is_secret());
    }

    #[test]
    fn test_triggers_use_timing() {
        assert_eq!(TEST_SETTINGS.status_trigger().interval_ms(), 30_000);
        assert_eq!(TEST_SETTINGS.wifi_check_trigger().slot(), TimerSlot::LastWifiCheck);
        assert_eq!(TEST_SETTINGS.poll_trigger().interval_ms(), 250);
    }
}
