// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Object / account address
// =============================================================================

pub const ADDRESS_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("address is empty")]
    Empty,
    #[error("address has {0} hex digits, at most 64 allowed")]
    TooLong(usize),
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
    #[error("address must be {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// 32-byte ledger address, used for both accounts and objects.
///
/// Serializes as a `0x`-prefixed hex string in human readable formats
/// (JSON-RPC) and as 32 raw bytes in BCS.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectAddress([u8; ADDRESS_LENGTH]);

impl ObjectAddress {
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Well-known system objects such as `0x6`
    pub const fn from_u8_suffix(value: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = value;
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressParseError> {
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| AddressParseError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Last `n` hex digits, upper-cased
    pub fn hex_suffix(&self, n: usize) -> String {
        let hex = hex::encode(self.0);
        let start = hex.len().saturating_sub(n);
        hex[start..].to_ascii_uppercase()
    }
}

impl FromStr for ObjectAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        if digits.is_empty() {
            return Err(AddressParseError::Empty);
        }
        if digits.len() > ADDRESS_LENGTH * 2 {
            return Err(AddressParseError::TooLong(digits.len()));
        }
        // Short forms such as 0x2 are left-padded
        let padded = format!("{:0>width$}", digits, width = ADDRESS_LENGTH * 2);
        let bytes =
            hex::decode(&padded).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectAddress({})", self)
    }
}

impl Serialize for ObjectAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex_literal())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ObjectAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            ObjectAddress::from_str(&s).map_err(D::Error::custom)
        } else {
            <[u8; ADDRESS_LENGTH]>::deserialize(deserializer).map(ObjectAddress)
        }
    }
}

// =============================================================================
// Droplet id
// =============================================================================

pub const DROPLET_ID_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropletIdError {
    #[error("Droplet ID is required")]
    Empty,
    #[error("Droplet ID must be exactly 6 uppercase alphanumeric characters")]
    Malformed,
}

/// Public 6-character code of a droplet, assigned by the contract.
///
/// Always stored upper-cased; parsing upper-cases user input first.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DropletId(String);

impl DropletId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        s.len() == DROPLET_ID_LENGTH
            && s.bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }
}

impl FromStr for DropletId {
    type Err = DropletIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DropletIdError::Empty);
        }
        let upper = trimmed.to_ascii_uppercase();
        if !Self::is_valid(&upper) {
            return Err(DropletIdError::Malformed);
        }
        Ok(Self(upper))
    }
}

impl<'de> Deserialize<'de> for DropletId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DropletId::from_str(&s).map_err(D::Error::custom)
    }
}

impl fmt::Display for DropletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DropletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DropletId({})", self.0)
    }
}

impl AsRef<str> for DropletId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
