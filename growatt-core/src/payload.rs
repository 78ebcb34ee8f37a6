//! MQTT Topics, Client-ID und JSON-Payloads
//!
//! Alle Payloads werden mit `serde-json-core` in Stack-Puffer serialisiert
//! und dann in die Puffer des [`RuntimeState`] kopiert.

use heapless::String;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::command::SetCommand;
use crate::registers::{REGISTERS, Reading, Register, RegisterKind, max_data_len};
use crate::state::{PAYLOAD_CAPACITY, RuntimeState, field};
use crate::text::{BufferError, bounded_fmt, format_into, set_text};
use crate::timer::{Ticks, TimerSlot};

/// Maximale Topic-Länge
pub const TOPIC_CAPACITY: usize = 128;

/// Prefix für Home Assistant MQTT Discovery
pub const DISCOVERY_PREFIX: &str = "homeassistant";

// Ein voller Block jeder Register-Art muss in den Payload-Puffer passen
const _: () = assert!(max_data_len(REGISTERS, RegisterKind::Input) <= PAYLOAD_CAPACITY);
const _: () = assert!(max_data_len(REGISTERS, RegisterKind::Holding) <= PAYLOAD_CAPACITY);

/// Unter-Topics unterhalb des Root-Topics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Topic {
    Status,
    Data,
    /// Bestätigte Set-Kommandos
    Settings,
    Write,
}

impl Topic {
    pub const fn leaf(self) -> &'static str {
        match self {
            Topic::Status => "status",
            Topic::Data => "data",
            Topic::Settings => "settings",
            Topic::Write => "write",
        }
    }

    /// Vollständiges Topic unter `root`
    pub fn under(self, root: &str) -> Result<String<TOPIC_CAPACITY>, BufferError> {
        topic(root, self.leaf())
    }
}

/// Verbindet Root und Leaf mit genau einem `/`
///
/// ```
/// # use growatt_core::payload::topic;
/// assert_eq!(topic("growatt", "status").unwrap().as_str(), "growatt/status");
/// assert_eq!(topic("growatt/", "status").unwrap().as_str(), "growatt/status");
/// ```
pub fn topic(root: &str, leaf: &str) -> Result<String<TOPIC_CAPACITY>, BufferError> {
    let root = root.trim_end_matches('/');
    let leaf = leaf.trim_start_matches('/');
    if root.is_empty() {
        return bounded_fmt(format_args!("{leaf}"));
    }
    bounded_fmt(format_args!("{root}/{leaf}"))
}

/// Baut die Client-ID aus Basis-Namen und MAC-Adresse
///
/// Mehrere Geräte mit gleicher Basis-ID würden sich sonst gegenseitig
/// vom Broker werfen.
pub fn build_client_id(
    state: &mut RuntimeState,
    seed: &str,
    mac: [u8; 6],
) -> Result<(), BufferError> {
    format_into(
        state.field_mut::<field::NewClientId>(),
        format_args!("{}-{:02x}{:02x}{:02x}", seed, mac[3], mac[4], mac[5]),
    )
}

// ============================================================================
// Status
// ============================================================================

/// Aktueller Zustand der WiFi-Verbindung für die Status-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInfo<'a> {
    pub ssid: &'a str,
    pub rssi: i8,
    pub ip: Option<[u8; 4]>,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    uptime: u32,
    ssid: &'a str,
    rssi: i8,
    ip: &'a str,
    clientid: &'a str,
    version: &'a str,
    holdingregisters: u16,
    overflow: u32,
    setcounter: u32,
}

/// Baut die Status-Payload nach `mqtt_stat`
pub fn write_status(
    state: &mut RuntimeState,
    link: &LinkInfo<'_>,
    now: Ticks,
) -> Result<(), BufferError> {
    let ip: String<16> = match link.ip {
        Some([a, b, c, d]) => bounded_fmt(format_args!("{a}.{b}.{c}.{d}"))?,
        None => String::new(),
    };

    let mut buf = [0u8; PAYLOAD_CAPACITY];
    let report = StatusReport {
        uptime: state.elapsed_since(TimerSlot::Uptime, now) / 1000,
        ssid: link.ssid,
        rssi: link.rssi,
        ip: &ip,
        clientid: state.field::<field::NewClientId>(),
        version: state.build_version(),
        holdingregisters: state.read::<field::HoldingRegisters>(),
        overflow: state.read::<field::Overflow>(),
        setcounter: state.read::<field::SetCounter>(),
    };
    let json = serialize(&report, &mut buf)?;
    set_text(state.field_mut::<field::MqttStat>(), json)
}

/// Kurze Zusammenfassung für die serielle Debug-Ausgabe nach `msg`
pub fn write_summary(state: &mut RuntimeState, now: Ticks) -> Result<(), BufferError> {
    let uptime = state.elapsed_since(TimerSlot::Uptime, now) / 1000;
    let overflow = state.read::<field::Overflow>();
    let sets = state.read::<field::SetCounter>();
    format_into(
        state.field_mut::<field::Msg>(),
        format_args!("up {uptime}s ovf {overflow} set {sets}"),
    )
}

// ============================================================================
// Messwerte
// ============================================================================

/// JSON-Objekt `{"name": raw, ...}`
struct DataReport<'a>(&'a [Reading]);

impl Serialize for DataReport<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for reading in self.0 {
            map.serialize_entry(reading.name(), &reading.raw)?;
        }
        map.end()
    }
}

/// Baut die Messwert-Payload nach `message`
///
/// Die Werte bleiben Rohwerte; skaliert wird im Value-Template der
/// Discovery-Konfiguration.
pub fn write_data(state: &mut RuntimeState, readings: &[Reading]) -> Result<(), BufferError> {
    let mut buf = [0u8; PAYLOAD_CAPACITY];
    let json = serialize(&DataReport(readings), &mut buf)?;
    set_text(state.field_mut::<field::Message>(), json)
}

#[derive(Serialize)]
struct CommandAck<'a> {
    register: &'a str,
    address: u16,
    value: u16,
    setcounter: u32,
}

/// Baut die Bestätigung eines Set-Kommandos nach `message`
///
/// Wird auf `<root>/settings` veröffentlicht.
pub fn write_command_ack(
    state: &mut RuntimeState,
    command: &SetCommand,
) -> Result<(), BufferError> {
    let mut buf = [0u8; 128];
    let ack = CommandAck {
        register: command.register.name,
        address: command.register.address,
        value: command.value,
        setcounter: state.read::<field::SetCounter>(),
    };
    let json = serialize(&ack, &mut buf)?;
    set_text(state.field_mut::<field::Message>(), json)
}

// ============================================================================
// Home Assistant Discovery
// ============================================================================

#[derive(Serialize)]
struct DiscoveryConfig<'a> {
    name: &'a str,
    unique_id: &'a str,
    state_topic: &'a str,
    value_template: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_class: Option<&'a str>,
    device: DeviceInfo<'a>,
}

#[derive(Serialize)]
struct DeviceInfo<'a> {
    identifiers: &'a [&'a str],
    name: &'a str,
    manufacturer: &'a str,
    sw_version: &'a str,
}

/// Sensoren aus der Status-Nachricht, die der Monitor selbst befüllt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusSensor {
    Uptime,
    Rssi,
    Overflow,
    SetCounter,
}

impl StatusSensor {
    pub const ALL: [StatusSensor; 4] = [
        StatusSensor::Uptime,
        StatusSensor::Rssi,
        StatusSensor::Overflow,
        StatusSensor::SetCounter,
    ];

    /// Schlüssel im Status-JSON
    pub const fn key(self) -> &'static str {
        match self {
            StatusSensor::Uptime => "uptime",
            StatusSensor::Rssi => "rssi",
            StatusSensor::Overflow => "overflow",
            StatusSensor::SetCounter => "setcounter",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            StatusSensor::Uptime => "s",
            StatusSensor::Rssi => "dBm",
            StatusSensor::Overflow | StatusSensor::SetCounter => "",
        }
    }
}

/// Was eine Discovery-Konfiguration über einen Sensor wissen muss
struct Sensor<'a> {
    key: &'a str,
    divisor: u16,
    unit: &'a str,
    topic: Topic,
}

impl From<&Register> for Sensor<'static> {
    fn from(register: &Register) -> Self {
        Sensor {
            key: register.name,
            divisor: register.divisor,
            unit: register.unit,
            topic: Topic::Data,
        }
    }
}

impl From<StatusSensor> for Sensor<'static> {
    fn from(sensor: StatusSensor) -> Self {
        Sensor {
            key: sensor.key(),
            divisor: 1,
            unit: sensor.unit(),
            topic: Topic::Status,
        }
    }
}

/// Discovery-Topic eines Registers
pub fn discovery_topic(
    client_id: &str,
    register: &Register,
) -> Result<String<TOPIC_CAPACITY>, BufferError> {
    sensor_topic(client_id, register.name)
}

/// Discovery-Topic eines Status-Sensors
pub fn status_discovery_topic(
    client_id: &str,
    sensor: StatusSensor,
) -> Result<String<TOPIC_CAPACITY>, BufferError> {
    sensor_topic(client_id, sensor.key())
}

fn sensor_topic(client_id: &str, key: &str) -> Result<String<TOPIC_CAPACITY>, BufferError> {
    bounded_fmt(format_args!(
        "{DISCOVERY_PREFIX}/sensor/{client_id}/{key}/config"
    ))
}

/// Serialisiert die Discovery-Konfiguration eines Registers nach `out`
///
/// State-Topic ist `<root>/data`. Gibt die Länge der Payload zurück.
pub fn discovery_payload(
    topic_root: &str,
    client_id: &str,
    version: &str,
    register: &Register,
    out: &mut [u8],
) -> Result<usize, BufferError> {
    sensor_payload(topic_root, client_id, version, Sensor::from(register), out)
}

/// Wie [`discovery_payload`], aber für einen Wert aus `<root>/status`
pub fn status_discovery_payload(
    topic_root: &str,
    client_id: &str,
    version: &str,
    sensor: StatusSensor,
    out: &mut [u8],
) -> Result<usize, BufferError> {
    sensor_payload(topic_root, client_id, version, Sensor::from(sensor), out)
}

fn sensor_payload(
    topic_root: &str,
    client_id: &str,
    version: &str,
    sensor: Sensor<'_>,
    out: &mut [u8],
) -> Result<usize, BufferError> {
    let key = sensor.key;
    let unique_id: String<TOPIC_CAPACITY> = bounded_fmt(format_args!("{client_id}_{key}"))?;
    let state_topic = sensor.topic.under(topic_root)?;
    let value_template: String<96> = if sensor.divisor > 1 {
        bounded_fmt(format_args!(
            "{{{{ (value_json.{} | float / {}) | round(2) }}}}",
            key, sensor.divisor
        ))?
    } else {
        bounded_fmt(format_args!("{{{{ value_json.{key} }}}}"))?
    };

    let unit = (!sensor.unit.is_empty()).then_some(sensor.unit);
    let config = DiscoveryConfig {
        name: key,
        unique_id: &unique_id,
        state_topic: &state_topic,
        value_template: &value_template,
        unit_of_measurement: unit,
        device_class: device_class(sensor.unit),
        state_class: unit.map(|u| {
            if u == "kWh" {
                "total_increasing"
            } else {
                "measurement"
            }
        }),
        device: DeviceInfo {
            identifiers: &[client_id],
            name: client_id,
            manufacturer: "Growatt",
            sw_version: version,
        },
    };
    serde_json_core::to_slice(&config, out).map_err(|_| BufferError::Overflow {
        capacity: out.len(),
    })
}

fn device_class(unit: &str) -> Option<&'static str> {
    match unit {
        "W" => Some("power"),
        "VA" => Some("apparent_power"),
        "V" => Some("voltage"),
        "A" => Some("current"),
        "Hz" => Some("frequency"),
        "kWh" => Some("energy"),
        "°C" => Some("temperature"),
        "s" => Some("duration"),
        "dBm" => Some("signal_strength"),
        _ => None,
    }
}

fn serialize<'b, T: Serialize>(value: &T, buf: &'b mut [u8]) -> Result<&'b str, BufferError> {
    let len = serde_json_core::to_slice(value, buf).map_err(|_| BufferError::Overflow {
        capacity: buf.len(),
    })?;
    core::str::from_utf8(&buf[..len]).map_err(|_| BufferError::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::find;

    #[test]
    fn test_topic_without_root() {
        assert_eq!(topic("", "/data").unwrap().as_str(), "data");
    }

    #[test]
    fn test_client_id_uses_mac_suffix() {
        let mut state = RuntimeState::new();
        build_client_id(&mut state, "growatt", [0x24, 0x0a, 0xc4, 0xab, 0x01, 0xff]).unwrap();
        assert_eq!(state.field::<field::NewClientId>().as_str(), "growatt-ab01ff");
    }

    #[test]
    fn test_value_template_scaling() {
        let mut out = [0u8; 512];
        let pv = find("pv1_voltage").unwrap();
        let len =
            discovery_payload("growatt", "growatt-ab01ff", "20240115", pv, &mut out).unwrap();
        let json = core::str::from_utf8(&out[..len]).unwrap();
        let template = concat!(
            r#""value_template":"#,
            r#""{{ (value_json.pv1_voltage | float / 10) | round(2) }}""#
        );
        assert!(json.contains(template));
        assert!(json.contains(r#""device_class":"voltage""#));
        assert!(json.contains(r#""state_topic":"growatt/data""#));
    }

    #[test]
    fn test_discovery_without_unit() {
        let mut out = [0u8; 512];
        let derate = find("derate").unwrap();
        let len = discovery_payload("growatt", "gw", "20240115", derate, &mut out).unwrap();
        let json = core::str::from_utf8(&out[..len]).unwrap();
        assert!(!json.contains("unit_of_measurement"));
        assert!(json.contains(r#""value_template":"{{ value_json.derate }}""#));
    }

    #[test]
    fn test_status_sensor_reads_status_topic() {
        let mut out = [0u8; 512];
        let len =
            status_discovery_payload("growatt", "gw", "20240115", StatusSensor::Rssi, &mut out)
                .unwrap();
        let json = core::str::from_utf8(&out[..len]).unwrap();
        assert!(json.contains(r#""state_topic":"growatt/status""#));
        assert!(json.contains(r#""value_template":"{{ value_json.rssi }}""#));
        assert!(json.contains(r#""device_class":"signal_strength""#));
    }

    #[test]
    fn test_status_sensor_keys_not_register_names() {
        for sensor in StatusSensor::ALL {
            assert!(find(sensor.key()).is_none());
        }
    }
}
