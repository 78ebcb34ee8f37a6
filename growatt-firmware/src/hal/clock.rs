// Zeitquelle auf Basis von embassy-time
use embassy_time::Instant;
use growatt_core::{Clock, Ticks};

/// Millisekunden seit Boot, abgeschnitten auf 32 Bit
///
/// Läuft damit wie ein klassischer `millis()` Zähler nach ~49,7 Tagen über;
/// alle Zeitvergleiche in growatt-core sind darauf ausgelegt.
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Ticks {
        Ticks::from_millis(Instant::now().as_millis())
    }
}
