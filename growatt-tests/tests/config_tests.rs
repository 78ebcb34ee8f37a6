//! Integration Tests für die statische Konfiguration
//!
//! Regressionstests gegen versehentlich geänderte Konstanten

use growatt_core::settings::{ColorOrder, LedType, StaticIp};
use growatt_core::version::is_valid_build_version;
use growatt_core::{BUILD_VERSION, ConfigKey, ConfigValue, Settings};
use growatt_tests::TEST_SETTINGS;

// ============================================================================
// Tests: get_config
// ============================================================================

#[test]
fn test_get_is_stable_for_every_key() {
    for key in ConfigKey::ALL {
        let first = TEST_SETTINGS.get(key);
        for _ in 0..3 {
            assert_eq!(TEST_SETTINGS.get(key), first, "{}", key.name());
        }
    }
}

#[test]
fn test_credentials() {
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::WifiSsid),
        ConfigValue::Text("TargetCNC")
    );
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::WifiSsidBackup),
        ConfigValue::Text("targetcnc.nl")
    );
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::MqttServer),
        ConfigValue::Text("mqtt.lan")
    );
    assert_eq!(TEST_SETTINGS.get(ConfigKey::MqttPort), ConfigValue::Number(1883));
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::TopicRoot),
        ConfigValue::Text("growatt")
    );
}

#[test]
fn test_secret_keys_are_passwords() {
    for key in ConfigKey::ALL {
        if key.is_secret() {
            assert!(key.name().ends_with("password") || key.name().ends_with("password_backup"));
        }
    }
}

// ============================================================================
// Tests: Hardware-Konstanten
// ============================================================================

#[test]
fn test_led_constants() {
    assert_eq!(TEST_SETTINGS.get(ConfigKey::Brightness), ConfigValue::Number(64));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::NumLeds), ConfigValue::Number(1));
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::ColorOrder),
        ConfigValue::ColorOrder(ColorOrder::Grb)
    );
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::LedType),
        ConfigValue::LedType(LedType::Ws2812)
    );
    assert_eq!(TEST_SETTINGS.get(ConfigKey::StatusLed), ConfigValue::Pin(2));
}

#[test]
fn test_rs485_constants() {
    assert_eq!(TEST_SETTINGS.get(ConfigKey::ModbusRate), ConfigValue::Number(9600));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::SerialRate), ConfigValue::Number(9600));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::SlaveId), ConfigValue::Number(1));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::Max485De), ConfigValue::Pin(5));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::Max485ReNeg), ConfigValue::Pin(4));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::Max485Rx), ConfigValue::Pin(14));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::Max485Tx), ConfigValue::Pin(12));
}

#[test]
fn test_timing_constants() {
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::UpdateStatusMs),
        ConfigValue::Number(30_000)
    );
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::RgbStatusDelayMs),
        ConfigValue::Number(500)
    );
    assert_eq!(TEST_SETTINGS.get(ConfigKey::WifiCheckMs), ConfigValue::Number(500));
    assert_eq!(
        TEST_SETTINGS.get(ConfigKey::ReadGrowattDelayMs),
        ConfigValue::Number(250)
    );
}

#[test]
fn test_debug_flags_enabled() {
    assert_eq!(TEST_SETTINGS.get(ConfigKey::DebugSerial), ConfigValue::Flag(true));
    assert_eq!(TEST_SETTINGS.get(ConfigKey::DebugMqtt), ConfigValue::Flag(true));
}

// ============================================================================
// Tests: Static IP
// ============================================================================

#[test]
fn test_static_ip_keys() {
    let mut settings: Settings = TEST_SETTINGS;
    assert_eq!(
        settings.get(ConfigKey::StaticIpGateway),
        ConfigValue::Address(None)
    );

    settings.network.static_ip = Some(StaticIp {
        address: [192, 168, 1, 205],
        gateway: [192, 168, 1, 254],
        subnet: [255, 255, 255, 0],
        primary_dns: [192, 168, 1, 254],
        secondary_dns: [8, 8, 4, 4],
    });
    assert_eq!(
        settings.get(ConfigKey::StaticIpAddress),
        ConfigValue::Address(Some([192, 168, 1, 205]))
    );
    assert_eq!(
        settings.get(ConfigKey::StaticIpSecondaryDns),
        ConfigValue::Address(Some([8, 8, 4, 4]))
    );
}

// ============================================================================
// Tests: Build-Version
// ============================================================================

#[test]
fn test_build_version_is_yyyymmdd() {
    assert_eq!(BUILD_VERSION.len(), 8);
    assert!(BUILD_VERSION.bytes().all(|b| b.is_ascii_digit()));
    assert!(is_valid_build_version(BUILD_VERSION));
}
