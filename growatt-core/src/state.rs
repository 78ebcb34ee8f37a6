//! Laufzeit-Zustand des Monitors
//!
//! Ein einziger Kontext, den der Control-Loop besitzt und per `&mut` an
//! alle Teilsysteme weiterreicht. Felder werden über Marker-Typen gelesen
//! und geschrieben (`state.read::<field::SetCounter>()`), so dass ein
//! unbekanntes Feld oder ein falscher Wert-Typ nicht kompiliert.

use heapless::String;

use crate::timer::{Ticks, TimerSlot};
use crate::version::BUILD_VERSION;

/// Kapazität des Scratch-Puffers für Status-Text
pub const MSG_CAPACITY: usize = 50;

/// Kapazität der MQTT-Payload-Puffer
///
/// Muss die Messwert-Payload eines vollen Input-Blocks fassen, geprüft in
/// [`crate::payload`] gegen die Registertabelle.
pub const PAYLOAD_CAPACITY: usize = 768;

/// Kapazität des dynamischen MQTT Client-ID Puffers
pub const CLIENT_ID_CAPACITY: usize = 80;

/// Gemeinsamer Zustand aller Teilsysteme
///
/// Wird einmal beim Start erzeugt (alles leer bzw. 0) und lebt so lange
/// wie der Prozess.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    msg: String<MSG_CAPACITY>,
    mqtt_stat: String<PAYLOAD_CAPACITY>,
    message: String<PAYLOAD_CAPACITY>,
    timers: [Ticks; TimerSlot::COUNT],
    set_counter: u32,
    led_off: bool,
    holding_registers: u16,
    new_client_id: String<CLIENT_ID_CAPACITY>,
    overflow: u32,
}

impl RuntimeState {
    pub const fn new() -> Self {
        Self {
            msg: String::new(),
            mqtt_stat: String::new(),
            message: String::new(),
            timers: [Ticks::ZERO; TimerSlot::COUNT],
            set_counter: 0,
            led_off: false,
            holding_registers: 0,
            new_client_id: String::new(),
            overflow: 0,
        }
    }

    /// Liest eine Kopie des Feldes `F`
    pub fn read<F: StateField>(&self) -> F::Value {
        F::get(self).clone()
    }

    /// Überschreibt das Feld `F`
    pub fn write<F: StateField>(&mut self, value: F::Value) {
        *F::get_mut(self) = value;
    }

    pub fn field<F: StateField>(&self) -> &F::Value {
        F::get(self)
    }

    /// Mutable Referenz, z.B. für [`crate::text::set_text`] auf Puffer-Feldern
    pub fn field_mut<F: StateField>(&mut self) -> &mut F::Value {
        F::get_mut(self)
    }

    pub const fn build_version(&self) -> &'static str {
        BUILD_VERSION
    }

    pub const fn stamp(&self, slot: TimerSlot) -> Ticks {
        self.timers[slot.index()]
    }

    pub fn mark(&mut self, slot: TimerSlot, now: Ticks) {
        self.timers[slot.index()] = now;
    }

    /// Verstrichene Zeit seit dem Zeitstempel in `slot` (überlaufsicher)
    pub const fn elapsed_since(&self, slot: TimerSlot, now: Ticks) -> u32 {
        now.elapsed_since(self.stamp(slot))
    }

    /// Zählt einen erkannten Überlauf in einem Messwert
    pub fn record_overflow(&mut self) {
        self.overflow = self.overflow.wrapping_add(1);
    }

    /// Zählt ein empfangenes Set-Kommando
    pub fn record_set(&mut self) {
        self.set_counter = self.set_counter.wrapping_add(1);
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Ein adressierbares Feld im [`RuntimeState`]
pub trait StateField {
    type Value: Clone;

    fn get(state: &RuntimeState) -> &Self::Value;
    fn get_mut(state: &mut RuntimeState) -> &mut Self::Value;
}

macro_rules! state_field {
    ($(#[$meta:meta])* $name:ident: $ty:ty => |$s:ident| $place:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub enum $name {}

        impl StateField for $name {
            type Value = $ty;

            fn get($s: &RuntimeState) -> &$ty {
                &$place
            }

            fn get_mut($s: &mut RuntimeState) -> &mut $ty {
                &mut $place
            }
        }
    };
}

/// Marker-Typen für alle Felder des Laufzeit-Zustands
pub mod field {
    use super::*;

    state_field!(
        /// Scratch-Puffer für ausgehenden Status-Text
        Msg: String<MSG_CAPACITY> => |s| s.msg
    );
    state_field!(
        /// Zuletzt gebaute Status-Payload
        MqttStat: String<PAYLOAD_CAPACITY> => |s| s.mqtt_stat
    );
    state_field!(
        /// Zuletzt gebaute generische Payload (Messwerte)
        Message: String<PAYLOAD_CAPACITY> => |s| s.message
    );
    state_field!(LastTick: Ticks => |s| s.timers[TimerSlot::LastTick.index()]);
    state_field!(
        /// Tick beim Boot, Uptime = `elapsed_since(Uptime)`
        Uptime: Ticks => |s| s.timers[TimerSlot::Uptime.index()]
    );
    state_field!(Seconds: Ticks => |s| s.timers[TimerSlot::Seconds.index()]);
    state_field!(LastWifiCheck: Ticks => |s| s.timers[TimerSlot::LastWifiCheck.index()]);
    state_field!(LastRgb: Ticks => |s| s.timers[TimerSlot::LastRgb.index()]);
    state_field!(Last485: Ticks => |s| s.timers[TimerSlot::Last485.index()]);
    state_field!(LastStatus: Ticks => |s| s.timers[TimerSlot::LastStatus.index()]);
    state_field!(LastNtp: Ticks => |s| s.timers[TimerSlot::LastNtp.index()]);
    state_field!(SetCounter: u32 => |s| s.set_counter);
    state_field!(
        /// Status-LED ist aktuell ausgeschaltet
        LedOff: bool => |s| s.led_off
    );
    state_field!(
        /// Anzahl zuletzt gelesener Holding-Register
        HoldingRegisters: u16 => |s| s.holding_registers
    );
    state_field!(
        /// Dynamisch gebaute MQTT Client-ID
        NewClientId: String<CLIENT_ID_CAPACITY> => |s| s.new_client_id
    );
    state_field!(Overflow: u32 => |s| s.overflow);
}
