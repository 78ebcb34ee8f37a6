//! Integration Tests für die Modbus-Registertabelle

use growatt_core::RuntimeState;
use growatt_core::field::{HoldingRegisters, Overflow};
use growatt_core::registers::{
    self, DecodeError, REGISTERS, Register, RegisterKind, RegisterMapError, decode,
    decode_block, decode_checked, find, span, validate,
};
use heapless::Vec;

// ============================================================================
// Tests: Tabelle
// ============================================================================

#[test]
fn test_table_validates() {
    assert_eq!(validate(REGISTERS), Ok(()));
}

#[test]
fn test_derate_is_104_exactly_once() {
    let matches: std::vec::Vec<&Register> =
        REGISTERS.iter().filter(|r| r.name == "derate").collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].address, 104);
    assert_eq!(matches[0].kind, RegisterKind::Input);

    // Adresse 103 gehört zu keinem Input-Register
    assert!(
        !registers::of_kind(RegisterKind::Input)
            .any(|r| r.address <= 103 && r.end().is_some_and(|end| 103 <= end))
    );
}

#[test]
fn test_duplicate_name_rejected() {
    let table = [Register::input("derate", 103), Register::input("derate", 104)];
    assert_eq!(
        validate(&table),
        Err(RegisterMapError::DuplicateName("derate"))
    );
}

#[test]
fn test_table_ending_past_last_address_is_rejected() {
    let table = [
        Register::input("status", 0),
        Register::input("tail", 0xFFFF).double(),
    ];
    assert_eq!(
        validate(&table),
        Err(RegisterMapError::AddressOutOfRange("tail"))
    );
    assert_eq!(Register::input("last", 0xFFFF).end(), Some(0xFFFF));
}

#[test]
fn test_spans() {
    assert_eq!(span(RegisterKind::Input), Some((0, 111)));
    assert_eq!(span(RegisterKind::Holding), Some((0, 51)));
}

#[test]
fn test_find_unknown() {
    assert!(find("does_not_exist").is_none());
}

// ============================================================================
// Tests: Dekodieren
// ============================================================================

#[test]
fn test_decode_single_word_with_offset() {
    let temp = find("inverter_temperature").unwrap();
    let mut words = [0u16; 10];
    words[3] = 412; // Block beginnt bei 90 → Adresse 93
    let reading = decode(temp, 90, &words).unwrap();
    assert_eq!(reading.raw, 412);
    assert!((reading.value() - 41.2).abs() < 0.001);
}

#[test]
fn test_decode_sentinel_is_overflow() {
    let volt = find("grid_voltage").unwrap();
    assert_eq!(
        decode(volt, 38, &[0xFFFF]),
        Err(DecodeError::Overflow { raw: 0xFFFF })
    );
}

#[test]
fn test_decode_implausible_is_overflow() {
    let percent = find("output_percent").unwrap();
    assert_eq!(
        decode(percent, 101, &[101]),
        Err(DecodeError::Overflow { raw: 101 })
    );
}

#[test]
fn test_decode_checked_counts_overflow() {
    let mut state = RuntimeState::new();
    let volt = find("pv1_voltage").unwrap();

    assert!(decode_checked(&mut state, volt, 3, &[2_345]).is_some());
    assert!(decode_checked(&mut state, volt, 3, &[0xFFFF]).is_none());
    assert!(decode_checked(&mut state, volt, 3, &[]).is_none());
    assert_eq!(state.read::<Overflow>(), 1);
}

#[test]
fn test_decode_block_input() {
    let mut state = RuntimeState::new();
    let (start, count) = span(RegisterKind::Input).unwrap();
    let mut words = std::vec![0u16; count as usize];
    words[104] = 2; // derate
    words[101] = 250; // unplausibel

    let mut out: Vec<_, 64> = Vec::new();
    let decoded = decode_block(&mut state, RegisterKind::Input, start, &words, &mut out).unwrap();

    let inputs = registers::of_kind(RegisterKind::Input).count();
    assert_eq!(decoded, inputs - 1);
    assert_eq!(state.read::<Overflow>(), 1);
    let derate = out.iter().find(|r| r.name() == "derate").unwrap();
    assert_eq!(derate.raw, 2);
    // Input-Block ändert die Holding-Anzahl nicht
    assert_eq!(state.read::<HoldingRegisters>(), 0);
}

#[test]
fn test_decode_block_holding_sets_count() {
    let mut state = RuntimeState::new();
    let (start, count) = span(RegisterKind::Holding).unwrap();
    let mut words = std::vec![0u16; count as usize];
    words[45] = 2024;
    words[46] = 1;
    words[47] = 15;

    let mut out: Vec<_, 16> = Vec::new();
    decode_block(&mut state, RegisterKind::Holding, start, &words, &mut out).unwrap();

    assert_eq!(state.read::<HoldingRegisters>(), 51);
    assert_eq!(out.iter().find(|r| r.name() == "sys_year").unwrap().raw, 2024);
}

#[test]
fn test_decode_block_oversized_holding_count_saturates() {
    let mut state = RuntimeState::new();
    let words = std::vec![0u16; 70_000];

    let mut out: Vec<_, 16> = Vec::new();
    decode_block(&mut state, RegisterKind::Holding, 0, &words, &mut out).unwrap();
    assert_eq!(state.read::<HoldingRegisters>(), u16::MAX);
}

#[test]
fn test_decode_block_output_too_small() {
    let mut state = RuntimeState::new();
    let (start, count) = span(RegisterKind::Input).unwrap();
    let words = std::vec![0u16; count as usize];

    let mut out: Vec<_, 4> = Vec::new();
    assert!(decode_block(&mut state, RegisterKind::Input, start, &words, &mut out).is_err());
    assert_eq!(out.len(), 4);
}
