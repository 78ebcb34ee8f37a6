//! Modbus-Registertabelle des Growatt Wechselrichters
//!
//! Die einzige Stelle, an der Register-Adressen stehen. Jeder benannte
//! Messwert hat genau einen Eintrag; [`validate`] stellt sicher, dass sich
//! keine Namen oder Adressbereiche doppeln.
//!
//! Achtung: `derate` liegt auf Input-Register **104**, nicht 103.

use heapless::Vec;

use crate::state::{RuntimeState, field};
use crate::text::BufferError;

/// Maximale Anzahl Register pro Lese-Anfrage (FC03/FC04)
pub const MAX_READ_REGISTERS: u16 = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterKind {
    /// Messwerte (FC04)
    Input,
    /// Einstellungen (FC03/FC06)
    Holding,
}

/// Anzahl der 16-Bit Worte eines Wertes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    Single,
    /// High-Word zuerst
    Double,
}

impl Width {
    pub const fn words(self) -> u16 {
        match self {
            Width::Single => 1,
            Width::Double => 2,
        }
    }

    /// Rohwert, den der Wechselrichter für "kein Wert" liefert
    const fn sentinel(self) -> u32 {
        match self {
            Width::Single => 0xFFFF,
            Width::Double => 0xFFFF_FFFF,
        }
    }
}

/// Ein Eintrag der Registertabelle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub name: &'static str,
    pub kind: RegisterKind,
    pub address: u16,
    pub width: Width,
    /// Rohwert / divisor = Wert in `unit`
    pub divisor: u16,
    pub unit: &'static str,
    /// Größter plausibler Rohwert, alles darüber zählt als Überlauf
    pub max: u32,
}

impl Register {
    const fn new(name: &'static str, kind: RegisterKind, address: u16) -> Self {
        Self {
            name,
            kind,
            address,
            width: Width::Single,
            divisor: 1,
            unit: "",
            max: 0xFFFE,
        }
    }

    pub const fn input(name: &'static str, address: u16) -> Self {
        Self::new(name, RegisterKind::Input, address)
    }

    pub const fn holding(name: &'static str, address: u16) -> Self {
        Self::new(name, RegisterKind::Holding, address)
    }

    pub const fn double(mut self) -> Self {
        self.width = Width::Double;
        self.max = 0xFFFF_FFFE;
        self
    }

    pub const fn scaled(mut self, divisor: u16, unit: &'static str) -> Self {
        self.divisor = divisor;
        self.unit = unit;
        self
    }

    pub const fn limit(mut self, max: u32) -> Self {
        self.max = max;
        self
    }

    /// Letzte belegte Adresse, `None` wenn der Wert über `u16::MAX` hinausragt
    pub const fn end(&self) -> Option<u16> {
        self.address.checked_add(self.width.words() - 1)
    }

    const fn overlaps(&self, other: &Register) -> bool {
        match (self.end(), other.end()) {
            (Some(end), Some(other_end)) => self.address <= other_end && other.address <= end,
            _ => false,
        }
    }
}

/// Die Registertabelle (Growatt Modbus RTU Protokoll, MIN/MIC Serie)
pub const REGISTERS: &[Register] = &[
    // Input-Register: Messwerte
    Register::input("status", 0).limit(3),
    Register::input("pv_power", 1).double().scaled(10, "W").limit(1_000_000),
    Register::input("pv1_voltage", 3).scaled(10, "V").limit(10_000),
    Register::input("pv1_current", 4).scaled(10, "A").limit(1_000),
    Register::input("pv1_power", 5).double().scaled(10, "W").limit(500_000),
    Register::input("pv2_voltage", 7).scaled(10, "V").limit(10_000),
    Register::input("pv2_current", 8).scaled(10, "A").limit(1_000),
    Register::input("pv2_power", 9).double().scaled(10, "W").limit(500_000),
    Register::input("ac_power", 35).double().scaled(10, "W").limit(1_000_000),
    Register::input("grid_frequency", 37).scaled(100, "Hz").limit(7_000),
    Register::input("grid_voltage", 38).scaled(10, "V").limit(3_000),
    Register::input("grid_current", 39).scaled(10, "A").limit(1_000),
    Register::input("grid_power", 40).double().scaled(10, "VA").limit(1_000_000),
    Register::input("energy_today", 53).double().scaled(10, "kWh").limit(100_000),
    Register::input("energy_total", 55).double().scaled(10, "kWh"),
    Register::input("work_time_total", 57).double().scaled(2, "s"),
    Register::input("pv1_energy_today", 59).double().scaled(10, "kWh").limit(100_000),
    Register::input("pv1_energy_total", 61).double().scaled(10, "kWh"),
    Register::input("pv2_energy_today", 63).double().scaled(10, "kWh").limit(100_000),
    Register::input("pv2_energy_total", 65).double().scaled(10, "kWh"),
    Register::input("pv_energy_total", 91).double().scaled(10, "kWh"),
    Register::input("inverter_temperature", 93).scaled(10, "°C").limit(2_000),
    Register::input("ipm_temperature", 94).scaled(10, "°C").limit(2_000),
    Register::input("boost_temperature", 95).scaled(10, "°C").limit(2_000),
    Register::input("p_bus_voltage", 98).scaled(10, "V").limit(10_000),
    Register::input("n_bus_voltage", 99).scaled(10, "V").limit(10_000),
    Register::input("output_percent", 101).scaled(1, "%").limit(100),
    Register::input("derate", 104).limit(0xFF),
    Register::input("fault_code", 105),
    Register::input("warning_code", 110),
    // Holding-Register: Einstellungen
    Register::holding("on_off", 0).limit(1),
    Register::holding("active_power_rate", 3).scaled(1, "%").limit(100),
    Register::holding("baud_rate", 22).limit(1),
    Register::holding("slave_address", 30).limit(247),
    Register::holding("sys_year", 45).limit(2099),
    Register::holding("sys_month", 46).limit(12),
    Register::holding("sys_day", 47).limit(31),
    Register::holding("sys_hour", 48).limit(23),
    Register::holding("sys_minute", 49).limit(59),
    Register::holding("sys_second", 50).limit(59),
];

/// Sucht einen Eintrag über seinen Namen
pub fn find(name: &str) -> Option<&'static Register> {
    REGISTERS.iter().find(|r| r.name == name)
}

/// Alle Einträge einer Register-Art
pub fn of_kind(kind: RegisterKind) -> impl Iterator<Item = &'static Register> {
    REGISTERS.iter().filter(move |r| r.kind == kind)
}

/// Fehler in einer Registertabelle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterMapError {
    DuplicateName(&'static str),
    OverlappingAddress {
        first: &'static str,
        second: &'static str,
    },
    /// Bereich passt nicht in eine Lese-Anfrage
    SpanTooLarge(RegisterKind),
    /// Ein Doppelwort beginnt auf der letzten Adresse
    AddressOutOfRange(&'static str),
}

/// Prüft eine Tabelle auf doppelte Namen und überlappende Adressen
pub fn validate(table: &[Register]) -> Result<(), RegisterMapError> {
    if let Some(r) = table.iter().find(|r| r.end().is_none()) {
        return Err(RegisterMapError::AddressOutOfRange(r.name));
    }
    for (i, a) in table.iter().enumerate() {
        for b in &table[i + 1..] {
            if a.name == b.name {
                return Err(RegisterMapError::DuplicateName(a.name));
            }
            if a.kind == b.kind && a.overlaps(b) {
                return Err(RegisterMapError::OverlappingAddress {
                    first: a.name,
                    second: b.name,
                });
            }
        }
    }
    for kind in [RegisterKind::Input, RegisterKind::Holding] {
        if let Some((_, count)) = span_of(table, kind) {
            if count > u32::from(MAX_READ_REGISTERS) {
                return Err(RegisterMapError::SpanTooLarge(kind));
            }
        }
    }
    Ok(())
}

/// Erste Adresse und Anzahl Worte, die alle Einträge von `kind` abdecken
pub fn span(kind: RegisterKind) -> Option<(u16, u16)> {
    let (start, count) = span_of(REGISTERS, kind)?;
    Some((start, u16::try_from(count).ok()?))
}

// Anzahl als u32: ein Bereich über alle 65536 Adressen passt nicht in u16
fn span_of(table: &[Register], kind: RegisterKind) -> Option<(u16, u32)> {
    let last = |r: &Register| r.end().unwrap_or(u16::MAX);
    let mut entries = table.iter().filter(|r| r.kind == kind);
    let first = entries.next()?;
    let (start, end) = entries.fold((first.address, last(first)), |(start, end), r| {
        (start.min(r.address), end.max(last(r)))
    });
    Some((start, u32::from(end - start) + 1))
}

/// Länge der größtmöglichen Messwert-Payload (`{"name":max,...}`) für `kind`
///
/// Damit lässt sich die Puffergröße zur Compile-Zeit gegen die Tabelle prüfen.
pub const fn max_data_len(table: &[Register], kind: RegisterKind) -> usize {
    let mut len = 2;
    let mut count = 0;
    let mut i = 0;
    while i < table.len() {
        let r = &table[i];
        if r.kind as u8 == kind as u8 {
            // "name":wert
            len += r.name.len() + 3 + decimal_digits(r.max);
            count += 1;
        }
        i += 1;
    }
    if count > 1 {
        len += count - 1;
    }
    len
}

const fn decimal_digits(mut value: u32) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

// ============================================================================
// Werte dekodieren
// ============================================================================

/// Ein dekodierter Rohwert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub register: &'static Register,
    pub raw: u32,
}

impl Reading {
    pub fn name(&self) -> &'static str {
        self.register.name
    }

    /// Skalierter Wert in der Einheit des Registers
    pub fn value(&self) -> f32 {
        self.raw as f32 / self.register.divisor as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Register liegt nicht im gelesenen Block
    OutOfBlock,
    /// Rohwert ist der "kein Wert"-Marker oder unplausibel groß
    Overflow { raw: u32 },
}

/// Dekodiert `register` aus einem Block, der bei `block_start` beginnt
pub fn decode(
    register: &'static Register,
    block_start: u16,
    words: &[u16],
) -> Result<Reading, DecodeError> {
    let offset = register
        .address
        .checked_sub(block_start)
        .ok_or(DecodeError::OutOfBlock)? as usize;
    let high = *words.get(offset).ok_or(DecodeError::OutOfBlock)?;
    let raw = match register.width {
        Width::Single => high as u32,
        Width::Double => {
            let low = *words.get(offset + 1).ok_or(DecodeError::OutOfBlock)?;
            ((high as u32) << 16) | low as u32
        }
    };

    if raw == register.width.sentinel() || raw > register.max {
        return Err(DecodeError::Overflow { raw });
    }
    Ok(Reading { register, raw })
}

/// Wie [`decode`], zählt Überläufe aber im Laufzeit-Zustand mit
pub fn decode_checked(
    state: &mut RuntimeState,
    register: &'static Register,
    block_start: u16,
    words: &[u16],
) -> Option<Reading> {
    match decode(register, block_start, words) {
        Ok(reading) => Some(reading),
        Err(DecodeError::Overflow { .. }) => {
            state.record_overflow();
            None
        }
        Err(DecodeError::OutOfBlock) => None,
    }
}

/// Dekodiert alle Einträge von `kind`, die in den gelesenen Block fallen
///
/// Bei Holding-Registern wird zusätzlich die Anzahl gelesener Register im
/// Zustand gespeichert.
pub fn decode_block<const N: usize>(
    state: &mut RuntimeState,
    kind: RegisterKind,
    block_start: u16,
    words: &[u16],
    out: &mut Vec<Reading, N>,
) -> Result<usize, BufferError> {
    if kind == RegisterKind::Holding {
        let count = u16::try_from(words.len()).unwrap_or(u16::MAX);
        state.write::<field::HoldingRegisters>(count);
    }

    let before = out.len();
    for register in of_kind(kind) {
        if let Some(reading) = decode_checked(state, register, block_start, words) {
            out.push(reading)
                .map_err(|_| BufferError::Overflow { capacity: N })?;
        }
    }
    Ok(out.len() - before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_valid() {
        assert_eq!(validate(REGISTERS), Ok(()));
    }

    #[test]
    fn test_derate_address() {
        let derate = find("derate").unwrap();
        assert_eq!(derate.kind, RegisterKind::Input);
        assert_eq!(derate.address, 104);
    }

    #[test]
    fn test_overlap_detected() {
        let table = [
            Register::input("a", 10).double(),
            Register::input("b", 11),
        ];
        assert_eq!(
            validate(&table),
            Err(RegisterMapError::OverlappingAddress {
                first: "a",
                second: "b"
            })
        );
    }

    #[test]
    fn test_same_address_different_kind_is_fine() {
        let table = [Register::input("a", 0), Register::holding("b", 0)];
        assert_eq!(validate(&table), Ok(()));
    }

    #[test]
    fn test_span_too_large() {
        let table = [Register::input("a", 0), Register::input("b", 125)];
        assert_eq!(
            validate(&table),
            Err(RegisterMapError::SpanTooLarge(RegisterKind::Input))
        );
    }

    #[test]
    fn test_double_word_on_last_address_rejected() {
        let table = [Register::input("a", 0xFFFF).double()];
        assert_eq!(table[0].end(), None);
        assert_eq!(
            validate(&table),
            Err(RegisterMapError::AddressOutOfRange("a"))
        );
    }

    #[test]
    fn test_span_over_whole_address_range() {
        let table = [Register::input("a", 0), Register::input("b", 0xFFFF)];
        assert_eq!(span_of(&table, RegisterKind::Input), Some((0, 65_536)));
        assert_eq!(
            validate(&table),
            Err(RegisterMapError::SpanTooLarge(RegisterKind::Input))
        );
    }

    #[test]
    fn test_max_data_len_counts_digits() {
        let table = [
            Register::input("a", 0).limit(9),
            Register::input("bc", 1).limit(100),
            Register::holding("x", 0),
        ];
        // {"a":9,"bc":100}
        assert_eq!(max_data_len(&table, RegisterKind::Input), 16);
        // {"x":65534}
        assert_eq!(max_data_len(&table, RegisterKind::Holding), 11);
    }

    #[test]
    fn test_decode_double_word() {
        let pv = find("pv_power").unwrap();
        let words = [0u16, 0x0001, 0x86A0]; // 100000 = 10 kW
        let reading = decode(pv, 0, &words).unwrap();
        assert_eq!(reading.raw, 100_000);
        assert_eq!(reading.value(), 10_000.0);
    }

    #[test]
    fn test_decode_out_of_block() {
        let derate = find("derate").unwrap();
        assert_eq!(decode(derate, 0, &[0u16; 50]), Err(DecodeError::OutOfBlock));
        assert_eq!(decode(derate, 105, &[0u16; 5]), Err(DecodeError::OutOfBlock));
    }
}
