// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use droplet_json_rpc_types::Balance;
use droplet_types::{ObjectAddress, SUI_COIN_TYPE};
use std::cmp::Ordering;

use crate::droplet_client::{DropletClient, DropletClientInner};
use crate::error::{DropletError, DropletResult};
use crate::types::{format_amount, SUI_DECIMALS};

const SUI_SYMBOL: &str = "SUI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinBalance {
    pub coin_type: String,
    pub balance: u128,
    pub symbol: String,
    pub decimals: u8,
    pub formatted: String,
}

impl CoinBalance {
    pub fn from_balance(balance: &Balance) -> Self {
        let symbol = coin_symbol(&balance.coin_type);
        // Coin metadata is not fetched; every coin is assumed to use 9 decimals
        let decimals = SUI_DECIMALS;
        let places = if decimals == 9 { 4 } else { 2 };
        Self {
            coin_type: balance.coin_type.clone(),
            balance: balance.total_balance,
            formatted: format!(
                "{} {}",
                format_amount(balance.total_balance, decimals, places),
                symbol
            ),
            symbol,
            decimals,
        }
    }

    pub fn is_sui(&self) -> bool {
        self.symbol == SUI_SYMBOL
    }
}

/// Display symbol of a coin type: the last path segment, upper-cased
pub fn coin_symbol(coin_type: &str) -> String {
    if coin_type == SUI_COIN_TYPE {
        return SUI_SYMBOL.to_string();
    }
    let parts: Vec<&str> = coin_type.split("::").collect();
    if parts.len() >= 3 {
        parts[parts.len() - 1].to_uppercase()
    } else {
        "Unknown".to_string()
    }
}

/// Non-zero balances, SUI first, the rest by balance descending
pub fn coin_balances(balances: &[Balance]) -> Vec<CoinBalance> {
    let mut coins: Vec<CoinBalance> = balances
        .iter()
        .filter(|b| b.total_balance > 0)
        .map(CoinBalance::from_balance)
        .collect();
    coins.sort_by(|a, b| match (a.is_sui(), b.is_sui()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b.balance.cmp(&a.balance),
    });
    coins
}

pub async fn fetch_coin_balances<P: DropletClientInner>(
    client: &DropletClient<P>,
    owner: ObjectAddress,
) -> DropletResult<Vec<CoinBalance>> {
    let balances = client.get_all_balances(owner).await?;
    Ok(coin_balances(&balances))
}

/// Convert a decimal amount such as `"1.25"` to the coin's smallest unit.
/// Digits beyond `decimals` are rejected rather than rounded.
pub fn to_smallest_unit(amount: &str, decimals: u8) -> DropletResult<u64> {
    let amount = amount.trim();
    let invalid = || DropletError::InvalidInput(format!("Invalid amount `{amount}`"));
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals as usize {
        return Err(DropletError::InvalidInput(format!(
            "Amount `{amount}` has more than {decimals} decimal places"
        )));
    }
    let scale = 10u64
        .checked_pow(decimals as u32)
        .ok_or_else(|| DropletError::InvalidInput(format!("Unsupported decimals {decimals}")))?;
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_value: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };
    whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| DropletError::InvalidInput(format!("Amount `{amount}` is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::DropletMockClient;

    fn balance(coin_type: &str, total: u128) -> Balance {
        Balance {
            coin_type: coin_type.to_string(),
            coin_object_count: 1,
            total_balance: total,
        }
    }

    #[test]
    fn test_symbols() {
        assert_eq!(coin_symbol("0x2::sui::SUI"), "SUI");
        assert_eq!(coin_symbol("0xabc::usdc::usdc"), "USDC");
        assert_eq!(coin_symbol("weird"), "Unknown");
    }

    #[test]
    fn test_sort_and_filter() {
        let coins = coin_balances(&[
            balance("0xabc::usdc::USDC", 5_000_000_000),
            balance("0x2::sui::SUI", 1),
            balance("0xdef::zero::ZERO", 0),
            balance("0x123::big::BIG", 9_000_000_000),
        ]);
        let symbols: Vec<_> = coins.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SUI", "BIG", "USDC"]);
        assert_eq!(coins[0].formatted, "0.0000 SUI");
        assert_eq!(coins[1].formatted, "9.0000 BIG");
    }

    #[test]
    fn test_to_smallest_unit() {
        assert_eq!(to_smallest_unit("1", 9).unwrap(), 1_000_000_000);
        assert_eq!(to_smallest_unit("1.25", 9).unwrap(), 1_250_000_000);
        assert_eq!(to_smallest_unit(".5", 9).unwrap(), 500_000_000);
        assert_eq!(to_smallest_unit("0.000000001", 9).unwrap(), 1);
        assert!(to_smallest_unit("0.0000000001", 9).is_err());
        assert!(to_smallest_unit("", 9).is_err());
        assert!(to_smallest_unit(".", 9).is_err());
        assert!(to_smallest_unit("-1", 9).is_err());
        assert!(to_smallest_unit("1e9", 9).is_err());
        assert!(to_smallest_unit("99999999999999999999", 9).is_err());
    }

    #[tokio::test]
    async fn test_fetch_coin_balances() {
        let mock = DropletMockClient::default();
        let owner = ObjectAddress::from_u8_suffix(0x42);
        mock.set_balances(owner, vec![balance("0x2::sui::SUI", 2_000_000_000)]);
        let client = DropletClient::new_for_testing(mock);
        let coins = fetch_coin_balances(&client, owner).await.unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].formatted, "2.0000 SUI");
        assert!(fetch_coin_balances(&client, ObjectAddress::ZERO)
            .await
            .unwrap()
            .is_empty());
    }
}
