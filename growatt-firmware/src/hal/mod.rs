// Hardware Abstraction Layer (HAL) Module
//
// Implementiert die Traits aus growatt-core für die echte Hardware.

pub mod clock;
pub mod led_writer;

pub use clock::EmbassyClock;
pub use led_writer::RmtLedWriter;
