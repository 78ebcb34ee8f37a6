//! Status-LED: kurz aufblitzen, nach Verzögerung wieder aus
//!
//! Nutzt den `LastRgb` Zeitstempel und das `LedOff` Flag im Zustand.

use rgb::RGB8;

use crate::state::{RuntimeState, field};
use crate::timer::{Ticks, TimerSlot};
use crate::traits::{LedError, SmartLedWriter};

/// Bedeutung eines Blinkens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusColor {
    /// Status gesendet
    Ok,
    /// Set-Kommando übernommen
    Busy,
    /// WiFi oder MQTT getrennt
    Error,
}

impl StatusColor {
    /// Farbe mit der konfigurierten Helligkeit
    ///
    /// ```
    /// # use growatt_core::StatusColor;
    /// # use rgb::RGB8;
    /// assert_eq!(StatusColor::Ok.rgb(64), RGB8 { r: 0, g: 64, b: 0 });
    /// ```
    pub const fn rgb(self, brightness: u8) -> RGB8 {
        match self {
            StatusColor::Ok => RGB8 {
                r: 0,
                g: brightness,
                b: 0,
            },
            StatusColor::Busy => RGB8 {
                r: 0,
                g: 0,
                b: brightness,
            },
            StatusColor::Error => RGB8 {
                r: brightness,
                g: 0,
                b: 0,
            },
        }
    }
}

pub struct StatusIndicator {
    brightness: u8,
    off_delay_ms: u32,
}

impl StatusIndicator {
    pub const fn new(brightness: u8, off_delay_ms: u32) -> Self {
        Self {
            brightness,
            off_delay_ms,
        }
    }

    /// Schaltet die LED in der Farbe von `status` ein
    pub fn flash<L: SmartLedWriter>(
        &self,
        state: &mut RuntimeState,
        led: &mut L,
        status: StatusColor,
        now: Ticks,
    ) -> Result<(), LedError> {
        led.write(status.rgb(self.brightness))?;
        state.mark(TimerSlot::LastRgb, now);
        state.write::<field::LedOff>(false);
        Ok(())
    }

    /// Schaltet die LED aus, sobald die Verzögerung abgelaufen ist
    ///
    /// Gibt `true` zurück, wenn in diesem Aufruf ausgeschaltet wurde.
    pub fn poll<L: SmartLedWriter>(
        &self,
        state: &mut RuntimeState,
        led: &mut L,
        now: Ticks,
    ) -> Result<bool, LedError> {
        if state.read::<field::LedOff>()
            || state.elapsed_since(TimerSlot::LastRgb, now) < self.off_delay_ms
        {
            return Ok(false);
        }
        led.write(RGB8::default())?;
        state.write::<field::LedOff>(true);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_use_brightness() {
        assert_eq!(StatusColor::Busy.rgb(10), RGB8 { r: 0, g: 0, b: 10 });
        assert_eq!(StatusColor::Error.rgb(10), RGB8 { r: 10, g: 0, b: 0 });
    }
}
