//! Begrenzte Text-Puffer mit geprüften Schreibzugriffen
//!
//! Ersetzt feste `char[N]`-Arrays: ein Schreibvorgang, der nicht passt,
//! schlägt fehl und lässt den Puffer unverändert.

use core::fmt::{self, Write};
use heapless::String;

/// Fehler-Typ für Puffer-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// Text passt nicht in einen Puffer mit `capacity` Bytes
    Overflow { capacity: usize },
    /// Serialisierter Inhalt ist kein gültiges UTF-8
    Encoding,
}

/// Ersetzt den Inhalt von `buf` durch `text`
pub fn set_text<const N: usize>(buf: &mut String<N>, text: &str) -> Result<(), BufferError> {
    if text.len() > N {
        return Err(BufferError::Overflow { capacity: N });
    }
    buf.clear();
    buf.push_str(text)
        .map_err(|_| BufferError::Overflow { capacity: N })
}

/// Formatiert in einen Zwischenpuffer und übernimmt nur bei Erfolg
///
/// ```
/// # use growatt_core::text::format_into;
/// let mut buf: heapless::String<8> = heapless::String::new();
/// format_into(&mut buf, format_args!("{}-{}", "ab", 12)).unwrap();
/// assert_eq!(buf.as_str(), "ab-12");
/// assert!(format_into(&mut buf, format_args!("{}", "zu lang!!")).is_err());
/// assert_eq!(buf.as_str(), "ab-12");
/// ```
pub fn format_into<const N: usize>(
    buf: &mut String<N>,
    args: fmt::Arguments<'_>,
) -> Result<(), BufferError> {
    let scratch = bounded_fmt::<N>(args)?;
    *buf = scratch;
    Ok(())
}

/// Erzeugt einen neuen begrenzten String aus Format-Argumenten
pub fn bounded_fmt<const N: usize>(args: fmt::Arguments<'_>) -> Result<String<N>, BufferError> {
    let mut scratch: String<N> = String::new();
    scratch
        .write_fmt(args)
        .map_err(|_| BufferError::Overflow { capacity: N })?;
    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_text_fits() {
        let mut buf: String<5> = String::new();
        set_text(&mut buf, "hello").unwrap();
        assert_eq!(buf.as_str(), "hello");
    }

    #[test]
    fn test_set_text_too_long_keeps_old_content() {
        let mut buf: String<5> = String::new();
        set_text(&mut buf, "abc").unwrap();
        assert_eq!(
            set_text(&mut buf, "abcdef"),
            Err(BufferError::Overflow { capacity: 5 })
        );
        assert_eq!(buf.as_str(), "abc");
    }

    #[test]
    fn test_format_partial_write_is_discarded() {
        let mut buf: String<4> = String::new();
        set_text(&mut buf, "old").unwrap();
        let result = format_into(&mut buf, format_args!("{}{}", "ab", "cde"));
        assert!(result.is_err());
        assert_eq!(buf.as_str(), "old");
    }
}
