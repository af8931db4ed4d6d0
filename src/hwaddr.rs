//! Hardware-address text <-> bytes conversions shared by `chaddr` and the
//! ClientIdentifier (61) option.
use crate::error::Error;

/// Parses a colon- or dash-separated hex hardware address, e.g. `"8C:45:00:45:12:09"`
/// or `"8c-45-00-45-12-09"`, case-insensitively.
pub fn parse(s: &str) -> Result<Vec<u8>, Error> {
    let sep = if s.contains(':') {
        ':'
    } else if s.contains('-') {
        '-'
    } else if !s.is_empty() {
        return Err(Error::InvalidValue(format!(
            "hardware address '{s}' is not colon- or dash-separated"
        )));
    } else {
        return Ok(Vec::new());
    };

    s.split(sep)
        .map(|octet| {
            u8::from_str_radix(octet, 16).map_err(|_| {
                Error::InvalidValue(format!("'{octet}' is not a valid hex octet in '{s}'"))
            })
        })
        .collect()
}

/// Renders a hardware address as canonical colon-separated, uppercase hex.
pub fn format(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_and_dash() {
        assert_eq!(
            parse("8C:45:00:45:12:09").unwrap(),
            vec![0x8c, 0x45, 0x00, 0x45, 0x12, 0x09]
        );
        assert_eq!(
            parse("8c-45-00-45-12-09").unwrap(),
            vec![0x8c, 0x45, 0x00, 0x45, 0x12, 0x09]
        );
    }

    #[test]
    fn formats_uppercase_colon() {
        assert_eq!(
            format(&[0x8c, 0x45, 0x00, 0x45, 0x12, 0x09]),
            "8C:45:00:45:12:09"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("not-hex-at-all-zz").is_err());
    }
}
