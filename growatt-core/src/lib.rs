//! Growatt Core - Konfiguration und Laufzeit-Zustand
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert Konfiguration, Zustand, Registertabelle, Payloads und Traits.

#![no_std]

pub mod command;
pub mod indicator;
pub mod payload;
pub mod registers;
pub mod settings;
pub mod state;
pub mod text;
pub mod timer;
pub mod traits;
pub mod version;

// Re-exports für einfachen Zugriff
pub use indicator::{StatusColor, StatusIndicator};
pub use settings::{ConfigKey, ConfigValue, Settings};
pub use state::{RuntimeState, StateField, field};
pub use text::BufferError;
pub use timer::{PeriodicTrigger, Ticks, TimerSlot};
pub use traits::{Clock, LedError, SmartLedWriter};
pub use version::BUILD_VERSION;
