use crate::error::{ModemError, Result};

/// Parse an ASCII bit string: one `'0'` or `'1'` per bit, whitespace
/// ignored, anything else rejected.
pub fn parse_bit_string(s: &str) -> Result<Vec<bool>> {
    let mut bits = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '0' => bits.push(false),
            '1' => bits.push(true),
            c if c.is_whitespace() => {}
            c => return Err(ModemError::InvalidBitChar(c)),
        }
    }
    Ok(bits)
}

/// Serialize bits as an ASCII string of `'0'`/`'1'` characters.
pub fn format_bit_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let s = "1010110011";
        let bits = parse_bit_string(s).unwrap();
        assert_eq!(bits.len(), 10);
        assert_eq!(format_bit_string(&bits), s);
    }

    #[test]
    fn test_parse_ignores_whitespace() {
        let bits = parse_bit_string("10 01\n11\t0").unwrap();
        assert_eq!(format_bit_string(&bits), "1001110");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        match parse_bit_string("10102") {
            Err(ModemError::InvalidBitChar('2')) => {}
            other => panic!("expected InvalidBitChar, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_string_is_empty_bits() {
        assert!(parse_bit_string("").unwrap().is_empty());
        assert_eq!(format_bit_string(&[]), "");
    }
}
