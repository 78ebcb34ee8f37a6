//! Software-Timer auf Basis eines umlaufenden Millisekunden-Zählers
//!
//! Der Tick-Zähler ist 32 Bit breit und läuft nach ~49,7 Tagen über.
//! Alle Vergleiche laufen deshalb über modulare Subtraktion
//! (`wrapping_sub`), niemals über `<` / `>` auf den Rohwerten.

use crate::state::RuntimeState;

/// Zeitpunkt in Millisekunden seit Boot (modulo 2^32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticks(pub u32);

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    /// Schneidet einen 64-Bit Millisekunden-Wert auf 32 Bit ab
    ///
    /// Entspricht dem Verhalten eines `millis()`-Zählers, der bei
    /// `u32::MAX` auf 0 zurückspringt.
    pub const fn from_millis(ms: u64) -> Self {
        Ticks(ms as u32)
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Verstrichene Millisekunden seit `earlier`, korrekt über den Überlauf
    ///
    /// # Beispiele
    ///
    /// ```
    /// # use growatt_core::Ticks;
    /// let before = Ticks(u32::MAX - 9);
    /// let now = Ticks(20);
    /// assert_eq!(now.elapsed_since(before), 30);
    /// ```
    pub const fn elapsed_since(self, earlier: Ticks) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    pub const fn wrapping_add(self, ms: u32) -> Ticks {
        Ticks(self.0.wrapping_add(ms))
    }
}

/// Die Zeitstempel-Slots im Laufzeit-Zustand
///
/// Jeder Slot hält den Tick der letzten Ausführung einer periodischen Aktion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerSlot {
    LastTick,
    Uptime,
    Seconds,
    LastWifiCheck,
    LastRgb,
    Last485,
    LastStatus,
    LastNtp,
}

impl TimerSlot {
    pub const COUNT: usize = 8;

    pub const ALL: [TimerSlot; Self::COUNT] = [
        TimerSlot::LastTick,
        TimerSlot::Uptime,
        TimerSlot::Seconds,
        TimerSlot::LastWifiCheck,
        TimerSlot::LastRgb,
        TimerSlot::Last485,
        TimerSlot::LastStatus,
        TimerSlot::LastNtp,
    ];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Periodischer Trigger: feuert höchstens einmal pro Intervall
///
/// Der Trigger hält selbst keinen Zeitstempel, sondern nutzt den
/// zugehörigen Slot im [`RuntimeState`]. Damit bleibt der Zustand an
/// genau einer Stelle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodicTrigger {
    slot: TimerSlot,
    interval_ms: u32,
}

impl PeriodicTrigger {
    pub const fn new(slot: TimerSlot, interval_ms: u32) -> Self {
        Self { slot, interval_ms }
    }

    pub const fn slot(&self) -> TimerSlot {
        self.slot
    }

    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Prüft ohne Seiteneffekt, ob das Intervall abgelaufen ist
    pub fn is_due(&self, state: &RuntimeState, now: Ticks) -> bool {
        state.elapsed_since(self.slot, now) >= self.interval_ms
    }

    /// Feuert, wenn das Intervall abgelaufen ist, und setzt den Slot auf `now`
    ///
    /// Muss einmal pro Loop-Durchlauf aufgerufen werden.
    pub fn poll(&self, state: &mut RuntimeState, now: Ticks) -> bool {
        if !self.is_due(state, now) {
            return false;
        }
        state.mark(self.slot, now);
        true
    }

    /// Millisekunden bis zum nächsten Feuern (0 wenn fällig)
    pub fn remaining(&self, state: &RuntimeState, now: Ticks) -> u32 {
        self.interval_ms
            .saturating_sub(state.elapsed_since(self.slot, now))
    }
}
