// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shareable claim links: `/claim/{id}` and the legacy `/?id={id}` form.

use droplet_types::DropletId;
use std::str::FromStr;
use url::Url;

const CLAIM_SEGMENT: &str = "claim";
// Paths and bare queries are resolved against this
const LINK_BASE: &str = "http://localhost/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    // Open the claim form with this id filled in
    Claim(DropletId),
    // Anything else, including malformed claim ids, lands on the home page
    Home,
}

pub fn claim_url(origin: &str, droplet_id: &DropletId) -> String {
    format!(
        "{}/{}/{}",
        origin.trim_end_matches('/'),
        CLAIM_SEGMENT,
        droplet_id
    )
}

fn link_id(raw: &str) -> Option<DropletId> {
    if raw.len() != 6 {
        return None;
    }
    DropletId::from_str(raw).ok()
}

fn parse_url(link: &str) -> Option<Url> {
    match Url::parse(link) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(LINK_BASE).and_then(|base| base.join(link)).ok()
        }
        Err(e) => {
            tracing::debug!("[Links] unparseable link {:?}: {}", link, e);
            None
        }
    }
}

/// Route a link to where the front-end should land
pub fn parse_link(link: &str) -> LinkTarget {
    let Some(url) = parse_url(link.trim()) else {
        return LinkTarget::Home;
    };
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if segments.first() == Some(&CLAIM_SEGMENT) {
        return match segments.as_slice() {
            [_, raw] => link_id(raw).map_or(LinkTarget::Home, LinkTarget::Claim),
            _ => LinkTarget::Home,
        };
    }

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| link_id(&value))
        .map_or(LinkTarget::Home, LinkTarget::Claim)
}
