use irma_types::Int;

/// First metadata version whose attribute values carry a presence bit.
pub const PRESENCE_BIT_VERSION: u8 = 0x03;

/// Decode an attribute value as disclosed in a proof.
///
/// Before metadata version 3 the integer bytes are the UTF-8 value. From
/// version 3 on the lowest bit says whether the attribute is present at all
/// and the value is stored in the remaining bits; `None` means absent.
pub fn decode_attribute(value: &Int, metadata_version: u8) -> Option<String> {
    if metadata_version < PRESENCE_BIT_VERSION {
        return Some(String::from_utf8_lossy(value.to_bytes_be()).into_owned());
    }
    if !value.low_bit() {
        return None;
    }
    Some(String::from_utf8_lossy(value.shr1().to_bytes_be()).into_owned())
}

/// Inverse of [`decode_attribute`].
pub fn encode_attribute(value: Option<&str>, metadata_version: u8) -> Int {
    let raw = value.map(|v| Int::from_bytes_be(v.as_bytes()));
    if metadata_version < PRESENCE_BIT_VERSION {
        return raw.unwrap_or_default();
    }
    match raw {
        Some(raw) => raw.shl1_with(true),
        None => Int::zero(),
    }
}
