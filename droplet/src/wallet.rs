// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use droplet_json_rpc_types::TransactionBlockResponse;
use droplet_types::ObjectAddress;

use crate::transaction_builder::MoveCallTx;

/// Error text reported by the wallet, matched against contract abort codes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct WalletError(pub String);

/// Connection to the user's wallet. Signing and submission happen on the
/// other side of this trait.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Connected account, if any
    fn address(&self) -> Option<ObjectAddress>;

    async fn sign_and_execute(
        &self,
        tx: MoveCallTx,
    ) -> Result<TransactionBlockResponse, WalletError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Wallet with scripted responses. Records every submitted transaction.
    #[derive(Clone, Default)]
    pub struct MockWallet {
        address: Option<ObjectAddress>,
        responses: Arc<Mutex<VecDeque<Result<TransactionBlockResponse, WalletError>>>>,
        submitted: Arc<Mutex<Vec<MoveCallTx>>>,
        delay: Option<Duration>,
    }

    impl MockWallet {
        pub fn connected(address: ObjectAddress) -> Self {
            Self {
                address: Some(address),
                ..Default::default()
            }
        }

        pub fn disconnected() -> Self {
            Self::default()
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn push_response(&self, response: Result<TransactionBlockResponse, WalletError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn submitted(&self) -> Vec<MoveCallTx> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WalletAdapter for MockWallet {
        fn address(&self) -> Option<ObjectAddress> {
            self.address
        }

        async fn sign_and_execute(
            &self,
            tx: MoveCallTx,
        ) -> Result<TransactionBlockResponse, WalletError> {
            self.submitted.lock().unwrap().push(tx);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(WalletError("no scripted response".to_string())))
        }
    }
}
