// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ledger-level types for the droplet client: addresses, droplet ids,
//! Move type tags and the BCS layout of programmable transactions used
//! for read-only calls.

pub mod base_types;
pub mod transaction;
pub mod type_tag;

pub use base_types::{
    AddressParseError, DropletId, DropletIdError, ObjectAddress, ADDRESS_LENGTH, DROPLET_ID_LENGTH,
};
pub use type_tag::{StructTag, TypeTag, TypeTagParseError};

/// Clock object shared by every Sui network
pub const CLOCK_OBJECT_ID: ObjectAddress = ObjectAddress::from_u8_suffix(0x6);

/// Shared version of the clock object, fixed at genesis
pub const CLOCK_INITIAL_SHARED_VERSION: u64 = 1;

/// Native coin type
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";
