//! Build-Kennung der Firmware

/// Build-Version im Format `YYYYMMDD`
pub const BUILD_VERSION: &str = "20240115";

/// Prüft das Format `YYYYMMDD` (8 Ziffern, plausibler Monat und Tag)
pub const fn is_valid_build_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    if bytes.len() != 8 {
        return false;
    }
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            return false;
        }
        i += 1;
    }
    let month = (bytes[4] - b'0') * 10 + (bytes[5] - b'0');
    let day = (bytes[6] - b'0') * 10 + (bytes[7] - b'0');
    month >= 1 && month <= 12 && day >= 1 && day <= 31
}

const _: () = assert!(is_valid_build_version(BUILD_VERSION));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_version_format() {
        assert!(is_valid_build_version(BUILD_VERSION));
    }

    #[test]
    fn test_rejects_bad_versions() {
        assert!(!is_valid_build_version("2024011"));
        assert!(!is_valid_build_version("2024-01-15"));
        assert!(!is_valid_build_version("20241315"));
        assert!(!is_valid_build_version("20240100"));
        assert!(!is_valid_build_version("v1.3"));
    }
}
