// Task-Modul: Enthält alle Embassy Tasks
//
// Jeder Task läuft asynchron und unabhängig.
// Der Control-Loop besitzt den Zustand, MQTT bekommt fertige Nachrichten
// über einen Channel, WiFi meldet Verbindungswechsel über ein Signal.

pub mod control;
pub mod mqtt;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use control::control_task;
pub use mqtt::mqtt_task;
pub use wifi::{connection_task, dhcp_task, net_config, net_task};
