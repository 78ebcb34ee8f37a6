//! Integration Tests für Topics, Client-ID, Status- und Discovery-Payloads

use growatt_core::command::{CommandError, command_filter, parse_set_command};
use growatt_core::field::{Message, Msg, MqttStat, NewClientId, Overflow, SetCounter};
use growatt_core::payload::{
    LinkInfo, StatusSensor, Topic, build_client_id, discovery_payload, discovery_topic,
    status_discovery_payload, status_discovery_topic, write_command_ack, write_data,
    write_status, write_summary,
};
use growatt_core::registers::{
    self, REGISTERS, Reading, RegisterKind, Width, decode, decode_block, find, max_data_len,
    span,
};
use growatt_core::text::set_text;
use growatt_core::{BufferError, RuntimeState, Ticks, TimerSlot};
use growatt_tests::TEST_SETTINGS;
use heapless::Vec;

const MAC: [u8; 6] = [0x24, 0x0a, 0xc4, 0x12, 0x34, 0x56];

fn link() -> LinkInfo<'static> {
    LinkInfo {
        ssid: "TargetCNC",
        rssi: -61,
        ip: Some([192, 168, 1, 42]),
    }
}

// ============================================================================
// Tests: Topics & Client-ID
// ============================================================================

#[test]
fn test_topics_under_root() {
    let root = TEST_SETTINGS.mqtt.topic_root;
    assert_eq!(Topic::Status.under(root).unwrap().as_str(), "growatt/status");
    assert_eq!(Topic::Data.under(root).unwrap().as_str(), "growatt/data");
    assert_eq!(Topic::Settings.under(root).unwrap().as_str(), "growatt/settings");
    assert_eq!(Topic::Write.under("growatt/").unwrap().as_str(), "growatt/write");
}

#[test]
fn test_client_id_does_not_touch_config() {
    let mut state = RuntimeState::new();
    build_client_id(&mut state, TEST_SETTINGS.mqtt.client_id, MAC).unwrap();

    assert_eq!(state.field::<NewClientId>().as_str(), "growatt-123456");
    assert_eq!(TEST_SETTINGS.mqtt.client_id, "growatt");
}

#[test]
fn test_client_id_too_long_keeps_previous() {
    let mut state = RuntimeState::new();
    build_client_id(&mut state, "growatt", MAC).unwrap();

    let long_seed = "g".repeat(80);
    assert_eq!(
        build_client_id(&mut state, &long_seed, MAC),
        Err(BufferError::Overflow { capacity: 80 })
    );
    assert_eq!(state.field::<NewClientId>().as_str(), "growatt-123456");
}

// ============================================================================
// Tests: Status
// ============================================================================

#[test]
fn test_status_payload() {
    let mut state = RuntimeState::new();
    build_client_id(&mut state, "growatt", MAC).unwrap();
    state.mark(TimerSlot::Uptime, Ticks(1_000));
    state.record_set();

    write_status(&mut state, &link(), Ticks(91_000)).unwrap();

    assert_eq!(
        state.field::<MqttStat>().as_str(),
        concat!(
            r#"{"uptime":90,"ssid":"TargetCNC","rssi":-61,"ip":"192.168.1.42","#,
            r#""clientid":"growatt-123456","version":"20240115","#,
            r#""holdingregisters":0,"overflow":0,"setcounter":1}"#
        )
    );
}

#[test]
fn test_status_uptime_across_wraparound() {
    let mut state = RuntimeState::new();
    state.mark(TimerSlot::Uptime, Ticks(u32::MAX - 4_999));

    write_status(&mut state, &link(), Ticks(5_000)).unwrap();
    assert!(state.field::<MqttStat>().starts_with(r#"{"uptime":10,"#));
}

#[test]
fn test_status_without_ip() {
    let mut state = RuntimeState::new();
    let offline = LinkInfo {
        ssid: "",
        rssi: 0,
        ip: None,
    };
    write_status(&mut state, &offline, Ticks(0)).unwrap();
    assert!(state.field::<MqttStat>().contains(r#""ip":"""#));
}

#[test]
fn test_summary_into_msg() {
    let mut state = RuntimeState::new();
    state.record_overflow();
    write_summary(&mut state, Ticks(42_000)).unwrap();
    assert_eq!(state.field::<Msg>().as_str(), "up 42s ovf 1 set 0");
}

// ============================================================================
// Tests: Messwerte
// ============================================================================

#[test]
fn test_data_payload_uses_raw_values() {
    let mut state = RuntimeState::new();
    let readings = [
        decode(find("grid_voltage").unwrap(), 38, &[2_301]).unwrap(),
        decode(find("derate").unwrap(), 104, &[0]).unwrap(),
    ];

    write_data(&mut state, &readings).unwrap();
    assert_eq!(
        state.field::<Message>().as_str(),
        r#"{"grid_voltage":2301,"derate":0}"#
    );
}

/// Liest einen vollen Block und baut daraus die Messwert-Payload
fn full_block_payload(state: &mut RuntimeState, words: &[u16]) -> usize {
    let (start, _) = span(RegisterKind::Input).unwrap();
    let mut readings: Vec<Reading, 32> = Vec::new();
    let decoded = decode_block(state, RegisterKind::Input, start, words, &mut readings).unwrap();
    assert_eq!(decoded, registers::of_kind(RegisterKind::Input).count());

    write_data(state, &readings).unwrap();
    state.field::<Message>().len()
}

#[test]
fn test_full_input_block_with_largest_values_fits() {
    let mut state = RuntimeState::new();
    let (start, count) = span(RegisterKind::Input).unwrap();
    let mut words = vec![0u16; count as usize];
    for register in registers::of_kind(RegisterKind::Input) {
        let offset = (register.address - start) as usize;
        match register.width {
            Width::Single => words[offset] = register.max as u16,
            Width::Double => {
                words[offset] = (register.max >> 16) as u16;
                words[offset + 1] = register.max as u16;
            }
        }
    }

    let len = full_block_payload(&mut state, &words);
    assert_eq!(len, max_data_len(REGISTERS, RegisterKind::Input));
    assert_eq!(state.read::<Overflow>(), 0);
    let json = state.field::<Message>();
    assert!(json.starts_with(r#"{"status":3,"pv_power":1000000,"#));
    assert!(json.ends_with(r#""fault_code":65534,"warning_code":65534}"#));
}

#[test]
fn test_full_input_block_all_zero_fits() {
    let mut state = RuntimeState::new();
    let (_, count) = span(RegisterKind::Input).unwrap();
    let words = vec![0u16; count as usize];

    full_block_payload(&mut state, &words);
    assert!(state.field::<Message>().contains(r#""derate":0"#));
}

#[test]
fn test_data_payload_empty() {
    let mut state = RuntimeState::new();
    set_text(state.field_mut::<Message>(), "old").unwrap();
    write_data(&mut state, &[]).unwrap();
    assert_eq!(state.field::<Message>().as_str(), "{}");
}

// ============================================================================
// Tests: Discovery
// ============================================================================

#[test]
fn test_discovery_topic() {
    let derate = find("derate").unwrap();
    assert_eq!(
        discovery_topic("growatt-123456", derate).unwrap().as_str(),
        "homeassistant/sensor/growatt-123456/derate/config"
    );
}

#[test]
fn test_discovery_payload_fits_for_every_input() {
    let mut out = [0u8; 512];
    for register in registers::of_kind(RegisterKind::Input) {
        let len = discovery_payload("growatt", "growatt-123456", "20240115", register, &mut out)
            .unwrap();
        let json = core::str::from_utf8(&out[..len]).unwrap();
        assert!(json.starts_with('{') && json.ends_with('}'), "{}", register.name);
        assert!(json.contains(r#""manufacturer":"Growatt""#));
    }
}

#[test]
fn test_discovery_energy_is_total_increasing() {
    let mut out = [0u8; 512];
    let energy = find("energy_total").unwrap();
    let len = discovery_payload("growatt", "gw", "20240115", energy, &mut out).unwrap();
    let json = core::str::from_utf8(&out[..len]).unwrap();
    assert!(json.contains(r#""state_class":"total_increasing""#));
    assert!(json.contains(r#""device_class":"energy""#));
    assert!(json.contains(r#""identifiers":["gw"]"#));
}

#[test]
fn test_discovery_buffer_too_small() {
    let mut out = [0u8; 16];
    let energy = find("energy_total").unwrap();
    assert!(discovery_payload("growatt", "gw", "20240115", energy, &mut out).is_err());
}

#[test]
fn test_status_discovery_for_every_status_sensor() {
    let mut out = [0u8; 512];
    for sensor in StatusSensor::ALL {
        let topic = status_discovery_topic("growatt-123456", sensor).unwrap();
        assert!(topic.ends_with("/config"));
        let len =
            status_discovery_payload("growatt", "growatt-123456", "20240115", sensor, &mut out)
                .unwrap();
        let json = core::str::from_utf8(&out[..len]).unwrap();
        assert!(json.contains(r#""state_topic":"growatt/status""#), "{}", sensor.key());
    }
    assert_eq!(
        status_discovery_topic("gw", StatusSensor::Uptime).unwrap().as_str(),
        "homeassistant/sensor/gw/uptime/config"
    );
}

// ============================================================================
// Tests: Set-Kommandos
// ============================================================================

#[test]
fn test_set_command_round_trip_over_topics() {
    let mut state = RuntimeState::new();
    let root = TEST_SETTINGS.mqtt.topic_root;

    let filter = command_filter(root).unwrap();
    assert_eq!(filter.as_str(), "growatt/write/+");

    let topic = "growatt/write/active_power_rate";
    let cmd = parse_set_command(&mut state, root, topic, b"80").unwrap();
    write_command_ack(&mut state, &cmd).unwrap();
    assert_eq!(
        state.field::<Message>().as_str(),
        r#"{"register":"active_power_rate","address":3,"value":80,"setcounter":1}"#
    );
    assert_eq!(Topic::Settings.under(root).unwrap().as_str(), "growatt/settings");
}

#[test]
fn test_set_command_counts() {
    let mut state = RuntimeState::new();
    let root = TEST_SETTINGS.mqtt.topic_root;

    parse_set_command(&mut state, root, "growatt/write/on_off", b"0").unwrap();
    parse_set_command(&mut state, root, "growatt/write/sys_hour", b"23").unwrap();
    assert_eq!(
        parse_set_command(&mut state, root, "growatt/write/sys_hour", b"24"),
        Err(CommandError::InvalidValue)
    );
    assert_eq!(state.read::<SetCounter>(), 2);
}
