// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const ADDRESS_BYTES: usize = 20;
const ADDRESS_PREFIX: &str = "0x";

/// EVM wallet address as reported by the wallet provider.
///
/// Parsing is case-insensitive, so `0xABC..` and `0xabc..` yield the same
/// value. The textual form is always the normalized lower-case hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(pub [u8; ADDRESS_BYTES]);

impl WalletAddress {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn zero() -> Self {
        Self([0; ADDRESS_BYTES])
    }

    /// Parses a `0x` prefixed, 40 hex digit address. Anything else is
    /// rejected rather than repaired.
    pub fn from_hex(encoded: &str) -> Result<Self, &'static str> {
        let digits = encoded
            .strip_prefix(ADDRESS_PREFIX)
            .or_else(|| encoded.strip_prefix("0X"))
            .ok_or("address must start with 0x")?;

        if digits.len() != ADDRESS_BYTES * 2 {
            return Err("invalid address length");
        }

        let mut out = Self::zero();
        hex::decode_to_slice(digits, &mut out.0).map_err(|_| "invalid address")?;
        Ok(out)
    }

    /// Normalized lower-case form
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{ADDRESS_PREFIX}{}", hex::encode(self.0))
    }

    #[cfg(test)]
    #[must_use]
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }
}

impl FromStr for WalletAddress {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WalletAddress").field(&self.to_hex()).finish()
    }
}

impl Serialize for WalletAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        String::serialize(&self.to_hex(), serializer)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D>(deserializer: D) -> Result<WalletAddress, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        WalletAddress::from_hex(&string).map_err(|err| serde::de::Error::custom(err.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_normalizes_case() {
        let upper = WalletAddress::from_hex("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        let lower = WalletAddress::from_hex("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(
            upper.to_hex(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn it_rejects_malformed_addresses() {
        assert!(WalletAddress::from_hex("").is_err());
        assert!(WalletAddress::from_hex("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(WalletAddress::from_hex("0xabcdef").is_err());
        assert!(WalletAddress::from_hex("0xabcdef0123456789abcdef0123456789abcdef0").is_err());
        assert!(WalletAddress::from_hex("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(WalletAddress::from_hex("0xabcdef0123456789abcdef0123456789abcdef0123").is_err());
    }

    #[test]
    fn it_trims_when_parsed_from_str() {
        let addr: WalletAddress = " 0x00000000000000000000000000000000000000ff\n"
            .parse()
            .unwrap();
        assert_eq!(addr.0[19], 0xff);
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr = WalletAddress::random();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let decoded: WalletAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, addr);
    }
}
