// Library-Root: Tasks, Hardware-Adapter und Konfiguration der Firmware
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;

// Re-exports von growatt-core
pub use growatt_core::{Clock, RuntimeState, SmartLedWriter, Ticks};

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::signal::Signal;
use growatt_core::command::COMMAND_PAYLOAD_CAPACITY;
use growatt_core::payload::TOPIC_CAPACITY;
use growatt_core::state::PAYLOAD_CAPACITY;
use heapless::{String, Vec};

use crate::config::{COMMAND_QUEUE_SIZE, OUTGOING_QUEUE_SIZE};

/// Fertige MQTT-Nachricht vom Control-Loop an den MQTT-Task
///
/// Der Control-Loop besitzt den Zustand, der MQTT-Task bekommt nur Kopien.
pub struct Outgoing {
    pub topic: String<TOPIC_CAPACITY>,
    pub payload: String<PAYLOAD_CAPACITY>,
}

/// Empfangenes Set-Kommando vom MQTT-Task an den Control-Loop
///
/// Geprüft und gezählt wird erst im Control-Loop, der den Zustand besitzt.
pub struct Incoming {
    pub topic: String<TOPIC_CAPACITY>,
    pub payload: Vec<u8, COMMAND_PAYLOAD_CAPACITY>,
}

/// Verbundenes Netz und Signalstärke (vom WiFi-Task)
#[derive(Clone, Copy)]
pub struct WifiLink {
    pub ssid: &'static str,
    pub rssi: i8,
}

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================

/// Channel für ausgehende MQTT-Nachrichten (Control-Loop → MQTT Task)
pub type OutgoingChannel = Channel<NoopRawMutex, Outgoing, OUTGOING_QUEUE_SIZE>;

pub type OutgoingSender = Sender<'static, NoopRawMutex, Outgoing, OUTGOING_QUEUE_SIZE>;

pub type OutgoingReceiver = Receiver<'static, NoopRawMutex, Outgoing, OUTGOING_QUEUE_SIZE>;

/// Channel für Set-Kommandos (MQTT Task → Control-Loop)
pub type CommandChannel = Channel<NoopRawMutex, Incoming, COMMAND_QUEUE_SIZE>;

pub type CommandSender = Sender<'static, NoopRawMutex, Incoming, COMMAND_QUEUE_SIZE>;

pub type CommandReceiver = Receiver<'static, NoopRawMutex, Incoming, COMMAND_QUEUE_SIZE>;

/// Signal für WiFi-Verbindungswechsel (WiFi Task → Control-Loop)
/// Nur der jeweils neueste Wert zählt
pub type WifiLinkSignal = Signal<NoopRawMutex, WifiLink>;
