//! Wire encoding for field elements.
//!
//! Elements travel as lowercase hex, optionally `0x`-prefixed, encoding the
//! canonical integer in `[0, p)` big endian.

use crate::{errors::DecodeError, modular::FieldElement};

/// Encodes a field element as lowercase hex without a prefix.
///
/// Leading zero bytes are trimmed; the zero element encodes as `"0"`.
pub fn encode_hex(element: &FieldElement) -> String {
    let bytes = element.to_be_bytes();
    let first_non_zero = bytes.iter().position(|b| *b != 0);
    match first_non_zero {
        Some(index) => hex::encode(bytes.get(index..).unwrap_or_default()),
        None => "0".to_string(),
    }
}

/// Decodes a field element from its hex wire form.
pub fn decode_hex(input: &str) -> Result<FieldElement, DecodeError> {
    let input = input.strip_prefix("0x").unwrap_or(input);
    if input.is_empty() {
        return Err(DecodeError::InvalidHex);
    }
    // Tolerate odd length inputs: "f" means 0x0f.
    let padded;
    let input = if input.len() % 2 == 1 {
        padded = format!("0{input}");
        &padded
    } else {
        input
    };
    let decoded = hex::decode(input).map_err(|_| DecodeError::InvalidHex)?;
    if decoded.len() > 32 {
        return Err(DecodeError::OutOfRange);
    }
    let mut bytes = [0u8; 32];
    let start = 32usize.saturating_sub(decoded.len());
    bytes.get_mut(start..).unwrap_or_default().copy_from_slice(&decoded);
    FieldElement::try_from_be_bytes(&bytes).map_err(|_| DecodeError::OutOfRange)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("2a", 42)]
    #[case::prefixed("0x2a", 42)]
    #[case::odd_length("f", 15)]
    #[case::uppercase_tolerated("2A", 42)]
    #[case::zero("0", 0)]
    fn decoding(#[case] input: &str, #[case] expected: u64) {
        let decoded = decode_hex(input).unwrap();
        assert_eq!(decoded, FieldElement::from_u64(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::prefix_only("0x")]
    #[case::garbage("potato")]
    #[case::partial_garbage("42zz")]
    fn invalid_digits(#[case] input: &str) {
        assert_eq!(decode_hex(input), Err(DecodeError::InvalidHex));
    }

    #[test]
    fn above_modulus_rejected() {
        // p itself is not a canonical representative.
        let encoded = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";
        assert_eq!(decode_hex(encoded), Err(DecodeError::OutOfRange));
    }

    #[test]
    fn too_wide_rejected() {
        let encoded = "01".repeat(33);
        assert_eq!(decode_hex(&encoded), Err(DecodeError::OutOfRange));
    }

    #[rstest]
    #[case(0, "0")]
    #[case(15, "0f")]
    #[case(42, "2a")]
    #[case(0xdead_beef, "deadbeef")]
    fn encoding(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(encode_hex(&FieldElement::from_u64(value)), expected);
    }

    #[test]
    fn round_trip() {
        for _ in 0..10 {
            let element = FieldElement::gen_random();
            let decoded = decode_hex(&encode_hex(&element)).unwrap();
            assert_eq!(decoded, element);
        }
    }
}
