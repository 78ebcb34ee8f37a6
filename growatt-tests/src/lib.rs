//! Gemeinsame Mocks für die Host-Tests
//!
//! Ersetzen Hardware-Zugriffe (LED, Zeitquelle) durch In-Memory Varianten.

use core::cell::Cell;

use growatt_core::settings::{MQTT_PORT, MqttSettings, NetworkSettings, WifiCredentials};
use growatt_core::{Clock, LedError, Settings, SmartLedWriter, Ticks};
use rgb::RGB8;

// ============================================================================
// Mock LED Writer
// ============================================================================

#[derive(Default)]
pub struct MockLedWriter {
    pub last_color: Option<RGB8>,
    pub write_count: usize,
    pub fail_next_write: bool,
}

impl MockLedWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SmartLedWriter for MockLedWriter {
    fn write(&mut self, color: RGB8) -> Result<(), LedError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(LedError::WriteFailed);
        }

        self.last_color = Some(color);
        self.write_count += 1;
        Ok(())
    }
}

// ============================================================================
// Mock Clock
// ============================================================================

/// Manuell gestellte Uhr, läuft wie ein 32-Bit Zähler über
#[derive(Default)]
pub struct MockClock {
    millis: Cell<u32>,
}

impl MockClock {
    pub fn at(millis: u32) -> Self {
        Self {
            millis: Cell::new(millis),
        }
    }

    pub fn advance(&self, ms: u32) {
        self.millis.set(self.millis.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now(&self) -> Ticks {
        Ticks(self.millis.get())
    }
}

// ============================================================================
// Test-Konfiguration
// ============================================================================

pub const TEST_SETTINGS: Settings = Settings::new(
    NetworkSettings {
        primary: WifiCredentials {
            ssid: "TargetCNC",
            password: "primary-secret",
        },
        backup: WifiCredentials {
            ssid: "targetcnc.nl",
            password: "backup-secret",
        },
        static_ip: None,
    },
    MqttSettings {
        server: "mqtt.lan",
        port: MQTT_PORT,
        user: "admin",
        password: "mqtt-secret",
        client_id: "growatt",
        topic_root: "growatt",
    },
);
