// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of BCS return values from read-only calls.
//!
//! Every typed return value goes through [`decode_return`], which is strict:
//! the whole payload must be consumed and option tags must be 0 or 1.

use crate::types::UserActivitySummary;
use droplet_json_rpc_types::DevInspectResults;
use droplet_types::{DropletId, ObjectAddress};
use serde::de::DeserializeOwned;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing return value #{0}")]
    MissingReturnValue(usize),
    #[error("malformed {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

impl DecodeError {
    /// Metric label for the kind of value that failed to decode
    pub fn value_kind(&self) -> &'static str {
        match self {
            DecodeError::MissingReturnValue(_) => "missing",
            DecodeError::Malformed { kind, .. } => kind,
        }
    }
}

pub fn decode_return<T: DeserializeOwned>(
    kind: &'static str,
    bytes: &[u8],
) -> Result<T, DecodeError> {
    bcs::from_bytes(bytes).map_err(|e| DecodeError::Malformed {
        kind,
        reason: e.to_string(),
    })
}

/// Decode a Move `Option<address>`.
///
/// An empty payload is treated the same as tag 0: nothing was found.
pub fn decode_option_address(bytes: &[u8]) -> Result<Option<ObjectAddress>, DecodeError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    decode_return::<Option<ObjectAddress>>("option_address", bytes)
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64, DecodeError> {
    decode_return("u64", bytes)
}

pub fn decode_string_vec(bytes: &[u8]) -> Result<Vec<String>, DecodeError> {
    decode_return("string_vector", bytes)
}

fn return_value(results: &DevInspectResults, index: usize) -> Result<&[u8], DecodeError> {
    results
        .return_value(index)
        .ok_or(DecodeError::MissingReturnValue(index))
}

/// Decode the four return values of `get_user_activity_summary`:
/// created ids, claimed ids, created count, claimed count.
///
/// IDs that do not parse as droplet ids are dropped with a warning.
pub fn decode_user_activity_summary(
    results: &DevInspectResults,
) -> Result<UserActivitySummary, DecodeError> {
    let created = decode_string_vec(return_value(results, 0)?)?;
    let claimed = decode_string_vec(return_value(results, 1)?)?;
    let created_count = decode_u64(return_value(results, 2)?)?;
    let claimed_count = decode_u64(return_value(results, 3)?)?;

    Ok(UserActivitySummary {
        created_ids: parse_ids(created),
        claimed_ids: parse_ids(claimed),
        created_count,
        claimed_count,
    })
}

fn parse_ids(raw: Vec<String>) -> Vec<DropletId> {
    raw.into_iter()
        .filter_map(|s| match DropletId::from_str(&s) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("[Decode] skipping malformed droplet id {:?}: {}", s, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some_address(byte: u8) -> Vec<u8> {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&[byte; 32]);
        bytes
    }

    #[test]
    fn test_option_address_some() {
        let decoded = decode_option_address(&some_address(0xaa)).unwrap();
        assert_eq!(decoded, Some(ObjectAddress::new([0xaa; 32])));
    }

    #[test]
    fn test_option_address_none_and_empty() {
        assert_eq!(decode_option_address(&[0]).unwrap(), None);
        assert_eq!(decode_option_address(&[]).unwrap(), None);
    }

    #[test]
    fn test_option_address_malformed() {
        // Tag outside {0, 1}
        let mut bad_tag = some_address(1);
        bad_tag[0] = 2;
        assert!(decode_option_address(&bad_tag).is_err());

        // Short address
        assert!(decode_option_address(&[1, 2, 3]).is_err());

        // Trailing bytes after a complete value
        let mut trailing = some_address(1);
        trailing.push(0xff);
        assert!(decode_option_address(&trailing).is_err());

        // None followed by junk
        assert!(decode_option_address(&[0, 5]).is_err());
    }

    #[test]
    fn test_decode_u64_and_strings() {
        assert_eq!(decode_u64(&7u64.to_le_bytes()).unwrap(), 7);
        assert!(decode_u64(&[1, 2]).is_err());

        let bytes = bcs::to_bytes(&vec!["A1B2C3".to_string(), "ZZZZZZ".to_string()]).unwrap();
        assert_eq!(
            decode_string_vec(&bytes).unwrap(),
            vec!["A1B2C3".to_string(), "ZZZZZZ".to_string()]
        );
    }

    #[test]
    fn test_user_activity_summary() {
        let created = bcs::to_bytes(&vec!["A1B2C3".to_string(), "bad".to_string()]).unwrap();
        let claimed = bcs::to_bytes(&vec!["ZZ9ZZ9".to_string()]).unwrap();
        let results = DevInspectResults::for_testing(vec![
            created,
            claimed,
            bcs::to_bytes(&2u64).unwrap(),
            bcs::to_bytes(&1u64).unwrap(),
        ]);
        let summary = decode_user_activity_summary(&results).unwrap();
        assert_eq!(summary.created_ids.len(), 1);
        assert_eq!(summary.created_ids[0].as_str(), "A1B2C3");
        assert_eq!(summary.claimed_ids[0].as_str(), "ZZ9ZZ9");
        assert_eq!(summary.created_count, 2);
        assert_eq!(summary.claimed_count, 1);
    }

    #[test]
    fn test_user_activity_summary_missing_value() {
        let results = DevInspectResults::for_testing(vec![bcs::to_bytes(&Vec::<String>::new())
            .unwrap()]);
        assert_eq!(
            decode_user_activity_summary(&results).unwrap_err(),
            DecodeError::MissingReturnValue(1)
        );
    }
}
