//! Set-Kommandos über MQTT
//!
//! `<root>/write/<register>` mit einer Dezimalzahl als Payload setzt ein
//! Holding-Register. Hier wird nur geprüft und gezählt, das eigentliche
//! Schreiben per Modbus ist Sache des Aufrufers.

use heapless::String;

use crate::payload::{TOPIC_CAPACITY, Topic, topic};
use crate::registers::{Register, RegisterKind, find};
use crate::state::RuntimeState;
use crate::text::{BufferError, bounded_fmt};

/// Längste Payload eines Set-Kommandos, die angenommen wird
pub const COMMAND_PAYLOAD_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCommand {
    pub register: &'static Register,
    pub value: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Topic liegt nicht unter `<root>/write/`
    UnknownTopic,
    /// Kein Holding-Register mit diesem Namen
    UnknownRegister,
    /// Payload ist keine Zahl oder außerhalb des erlaubten Bereichs
    InvalidValue,
}

/// Topic-Filter für das Abonnieren aller Set-Kommandos: `<root>/write/+`
pub fn command_filter(topic_root: &str) -> Result<String<TOPIC_CAPACITY>, BufferError> {
    let leaf: String<8> = bounded_fmt(format_args!("{}/+", Topic::Write.leaf()))?;
    topic(topic_root, &leaf)
}

/// Prüft ein empfangenes Set-Kommando und zählt es im Zustand mit
pub fn parse_set_command(
    state: &mut RuntimeState,
    topic_root: &str,
    topic: &str,
    payload: &[u8],
) -> Result<SetCommand, CommandError> {
    let name = topic
        .strip_prefix(topic_root.trim_end_matches('/'))
        .and_then(|t| t.strip_prefix('/'))
        .and_then(|t| t.strip_prefix(Topic::Write.leaf()))
        .and_then(|t| t.strip_prefix('/'))
        .ok_or(CommandError::UnknownTopic)?;

    let register = find(name)
        .filter(|r| r.kind == RegisterKind::Holding)
        .ok_or(CommandError::UnknownRegister)?;

    let value: u16 = core::str::from_utf8(payload)
        .map_err(|_| CommandError::InvalidValue)?
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidValue)?;
    if u32::from(value) > register.max {
        return Err(CommandError::InvalidValue);
    }

    state.record_set();
    Ok(SetCommand { register, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::field::SetCounter;

    #[test]
    fn test_valid_command_is_counted() {
        let mut state = RuntimeState::new();
        let topic = "growatt/write/active_power_rate";
        let cmd = parse_set_command(&mut state, "growatt", topic, b" 80\n").unwrap();
        assert_eq!(cmd.register.address, 3);
        assert_eq!(cmd.value, 80);
        assert_eq!(state.read::<SetCounter>(), 1);
    }

    #[test]
    fn test_filter_matches_parsed_topics() {
        assert_eq!(command_filter("growatt").unwrap().as_str(), "growatt/write/+");
        assert_eq!(command_filter("home/pv/").unwrap().as_str(), "home/pv/write/+");
    }

    #[test]
    fn test_rejected_commands_are_not_counted() {
        let mut state = RuntimeState::new();
        assert_eq!(
            parse_set_command(&mut state, "growatt", "other/write/on_off", b"1"),
            Err(CommandError::UnknownTopic)
        );
        assert_eq!(
            parse_set_command(&mut state, "growatt", "growatt/write/derate", b"1"),
            Err(CommandError::UnknownRegister)
        );
        assert_eq!(
            parse_set_command(&mut state, "growatt", "growatt/write/active_power_rate", b"101"),
            Err(CommandError::InvalidValue)
        );
        assert_eq!(
            parse_set_command(&mut state, "growatt", "growatt/write/on_off", b"an"),
            Err(CommandError::InvalidValue)
        );
        assert_eq!(state.read::<SetCounter>(), 0);
    }
}
