// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::base_types::{AddressParseError, ObjectAddress};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeTagParseError {
    #[error("empty type tag")]
    Empty,
    #[error("invalid struct tag `{0}`: expected address::module::Name")]
    MalformedStruct(String),
    #[error("unbalanced type parameters in `{0}`")]
    Unbalanced(String),
    #[error(transparent)]
    Address(#[from] AddressParseError),
}

/// Move type tag. Variant order matches the on-chain BCS layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTag {
    pub address: ObjectAddress,
    pub module: String,
    pub name: String,
    pub type_params: Vec<TypeTag>,
}

impl StructTag {
    /// Parse the generic arguments of a fully qualified object type such as
    /// `0x..::dropnew::Droplet<0x2::sui::SUI>` and return the first one.
    pub fn first_type_param(type_string: &str) -> Option<TypeTag> {
        let tag = StructTag::from_str(type_string).ok()?;
        tag.type_params.into_iter().next()
    }
}

/// Text between the outermost angle brackets, untouched.
///
/// Object type strings returned by the node may use long-form addresses
/// that callers want to pass through verbatim, so this does not parse.
pub fn outer_type_argument(type_string: &str) -> Option<&str> {
    let start = type_string.find('<')?;
    let end = type_string.rfind('>')?;
    if end <= start + 1 {
        return None;
    }
    Some(type_string[start + 1..end].trim())
}

// Split on commas that are not nested inside angle brackets
fn split_top_level(s: &str) -> Result<Vec<&str>, TypeTagParseError> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut last = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return Err(TypeTagParseError::Unbalanced(s.to_string()));
                }
            }
            ',' if depth == 0 => {
                parts.push(s[last..i].trim());
                last = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(TypeTagParseError::Unbalanced(s.to_string()));
    }
    parts.push(s[last..].trim());
    Ok(parts)
}

impl FromStr for StructTag {
    type Err = TypeTagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (path, params) = match s.find('<') {
            Some(open) => {
                if !s.ends_with('>') {
                    return Err(TypeTagParseError::Unbalanced(s.to_string()));
                }
                let inner = &s[open + 1..s.len() - 1];
                let params = split_top_level(inner)?
                    .into_iter()
                    .map(TypeTag::from_str)
                    .collect::<Result<Vec<_>, _>>()?;
                (&s[..open], params)
            }
            None => (s, vec![]),
        };

        let mut segments = path.split("::");
        let (Some(address), Some(module), Some(name), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TypeTagParseError::MalformedStruct(s.to_string()));
        };
        if module.is_empty() || name.is_empty() {
            return Err(TypeTagParseError::MalformedStruct(s.to_string()));
        }

        Ok(StructTag {
            address: ObjectAddress::from_str(address)?,
            module: module.to_string(),
            name: name.to_string(),
            type_params: params,
        })
    }
}

impl FromStr for TypeTag {
    type Err = TypeTagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let tag = match s {
            "" => return Err(TypeTagParseError::Empty),
            "bool" => TypeTag::Bool,
            "u8" => TypeTag::U8,
            "u16" => TypeTag::U16,
            "u32" => TypeTag::U32,
            "u64" => TypeTag::U64,
            "u128" => TypeTag::U128,
            "u256" => TypeTag::U256,
            "address" => TypeTag::Address,
            "signer" => TypeTag::Signer,
            _ => {
                if let Some(inner) = s.strip_prefix("vector<").and_then(|r| r.strip_suffix('>')) {
                    TypeTag::Vector(Box::new(TypeTag::from_str(inner)?))
                } else {
                    TypeTag::Struct(Box::new(StructTag::from_str(s)?))
                }
            }
        };
        Ok(tag)
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)?;
        if !self.type_params.is_empty() {
            write!(f, "<")?;
            for (i, param) in self.type_params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", param)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::U8 => write!(f, "u8"),
            TypeTag::U16 => write!(f, "u16"),
            TypeTag::U32 => write!(f, "u32"),
            TypeTag::U64 => write!(f, "u64"),
            TypeTag::U128 => write!(f, "u128"),
            TypeTag::U256 => write!(f, "u256"),
            TypeTag::Address => write!(f, "address"),
            TypeTag::Signer => write!(f, "signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{}>", inner),
            TypeTag::Struct(tag) => write!(f, "{}", tag),
        }
    }
}
