use crate::encoding::BASE64;
use crate::TypesError;
use base64::Engine;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Non-negative arbitrary-size integer, stored big-endian without leading zeros.
///
/// Nonces, contexts, proof components and metadata attributes all travel as
/// base64 of their big-endian bytes; the JSON form of an `Int` is exactly that.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Int(Vec<u8>);

impl Int {
    pub fn zero() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self(bytes[start..].to_vec())
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_bytes_be(&value.to_be_bytes())
    }

    /// Minimal big-endian representation; empty for zero.
    pub fn to_bytes_be(&self) -> &[u8] {
        &self.0
    }

    /// Big-endian bytes left-padded with zeros to `len`, or `None` if the
    /// value does not fit.
    pub fn to_bytes_padded(&self, len: usize) -> Option<Vec<u8>> {
        if self.0.len() > len {
            return None;
        }
        let mut out = vec![0u8; len - self.0.len()];
        out.extend_from_slice(&self.0);
        Some(out)
    }

    pub fn to_u64(&self) -> Option<u64> {
        let padded = self.to_bytes_padded(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&padded);
        Some(u64::from_be_bytes(buf))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the least significant bit.
    pub fn low_bit(&self) -> bool {
        self.0.last().map(|b| b & 1 == 1).unwrap_or(false)
    }

    /// The value shifted right by one bit.
    pub fn shr1(&self) -> Self {
        let mut out = Vec::with_capacity(self.0.len());
        let mut carry = 0u8;
        for byte in &self.0 {
            out.push((byte >> 1) | carry);
            carry = (byte & 1) << 7;
        }
        Self::from_bytes_be(&out)
    }

    /// The value shifted left by one bit with `bit` placed in the low position.
    pub fn shl1_with(&self, bit: bool) -> Self {
        let mut out = vec![0u8; self.0.len() + 1];
        let mut carry = u8::from(bit);
        for (i, byte) in self.0.iter().enumerate().rev() {
            out[i + 1] = (byte << 1) | carry;
            carry = byte >> 7;
        }
        out[0] = carry;
        Self::from_bytes_be(&out)
    }

    pub fn from_decimal(s: &str) -> Result<Self, TypesError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypesError::InvalidDecimal(s.to_string()));
        }
        // Little-endian limbs while accumulating.
        let mut limbs: Vec<u8> = Vec::new();
        for digit in s.bytes().map(|b| b - b'0') {
            let mut carry = u32::from(digit);
            for limb in limbs.iter_mut() {
                let v = u32::from(*limb) * 10 + carry;
                *limb = (v & 0xff) as u8;
                carry = v >> 8;
            }
            while carry > 0 {
                limbs.push((carry & 0xff) as u8);
                carry >>= 8;
            }
        }
        limbs.reverse();
        Ok(Self::from_bytes_be(&limbs))
    }

    pub fn to_decimal(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut value = self.0.clone();
        let mut digits = Vec::new();
        while !value.is_empty() {
            let mut rem = 0u32;
            let mut next = Vec::with_capacity(value.len());
            for byte in &value {
                let cur = (rem << 8) | u32::from(*byte);
                let q = (cur / 10) as u8;
                rem = cur % 10;
                if !(next.is_empty() && q == 0) {
                    next.push(q);
                }
            }
            digits.push(b'0' + rem as u8);
            value = next;
        }
        digits.reverse();
        String::from_utf8_lossy(&digits).into_owned()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, TypesError> {
        Ok(Self::from_bytes_be(&BASE64.decode(s)?))
    }
}

impl fmt::Debug for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Int({})", self.to_decimal())
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl From<u64> for Int {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl Serialize for Int {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Int {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IntVisitor;

        impl Visitor<'_> for IntVisitor {
            type Value = Int;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a base64-encoded big-endian integer")
            }

            fn visit_str<E>(self, value: &str) -> Result<Int, E>
            where
                E: de::Error,
            {
                Int::from_base64(value).map_err(|e| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(IntVisitor)
    }
}
