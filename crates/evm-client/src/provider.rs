use crate::contract::{AttestationBridgeInstance, validator_role};
use crate::error::EvmError;
use crate::nonce::PendingNonceManager;
use alloy_network::{Ethereum, EthereumWallet};
use alloy_primitives::Address;
use alloy_provider::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy_provider::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy_rpc_client::RpcClient;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use url::Url;

/// Consecutive network-error cycles before the relay rotates to the next
/// configured RPC provider.
pub const FAILOVER_THRESHOLD: u32 = 3;

type InnerFiller =
    JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller<PendingNonceManager>, ChainIdFiller>>>;

pub type InnerProvider =
    FillProvider<JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>, RootProvider>;

/// Chain-E client with RPC failover: `[primary, ...fallbacks]`, rotating to
/// the next entry after `FAILOVER_THRESHOLD` consecutive network-error
/// cycles, wrapping back to primary, and resetting the counter to 0 on
/// success.
pub struct EvmChainClient {
    wallet: EthereumWallet,
    urls: Vec<Url>,
    nonce_manager: PendingNonceManager,
    contract_address: Address,
    cursor: AtomicU32,
    consecutive_failures: AtomicU32,
    inner: RwLock<Arc<InnerProvider>>,
}

impl EvmChainClient {
    pub async fn try_new(
        wallet: EthereumWallet,
        urls: Vec<Url>,
        contract_address: Address,
    ) -> Result<Self, EvmError> {
        if urls.is_empty() {
            return Err(EvmError::NoProviders);
        }
        let nonce_manager = PendingNonceManager::default();
        let inner = Self::connect(&wallet, &urls[0], nonce_manager.clone()).await?;
        Ok(Self {
            wallet,
            urls,
            nonce_manager,
            contract_address,
            cursor: AtomicU32::new(0),
            consecutive_failures: AtomicU32::new(0),
            inner: RwLock::new(Arc::new(inner)),
        })
    }

    async fn connect(
        wallet: &EthereumWallet,
        url: &Url,
        nonce_manager: PendingNonceManager,
    ) -> Result<InnerProvider, EvmError> {
        let client = RpcClient::builder()
            .connect(url.as_str())
            .await
            .map_err(|e| EvmError::Network(format!("connecting to {}: {e}", bridge_core::util::scrub::scrub_url(url.as_str()))))?;
        let filler = InnerFiller::default_with_nonce(nonce_manager);
        let provider = ProviderBuilder::default().filler(filler).wallet(wallet.clone()).connect_client(client);
        Ok(provider)
    }

    /// Read access to the currently active provider, for `eth_call`,
    /// `currentNonce`, `usedAttestationIds`, `hasRole`, etc.
    pub async fn provider(&self) -> Arc<InnerProvider> {
        self.inner.read().await.clone()
    }

    pub fn contract(&self, provider: Arc<InnerProvider>) -> AttestationBridgeInstance<Arc<InnerProvider>> {
        AttestationBridgeInstance::new(self.contract_address, provider)
    }

    pub fn nonce_manager(&self) -> &PendingNonceManager {
        &self.nonce_manager
    }

    pub fn signer_address(&self) -> Address {
        use alloy_network::NetworkWallet;
        NetworkWallet::<Ethereum>::default_signer_address(&self.wallet)
    }

    /// Records a network-error cycle; rotates to the next RPC provider (and
    /// rebuilds the signer/contract bindings) once `FAILOVER_THRESHOLD`
    /// consecutive failures have been observed. Returns `true` if a
    /// rotation occurred.
    pub async fn record_network_error(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures < FAILOVER_THRESHOLD {
            return false;
        }
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let next = (self.cursor.fetch_add(1, Ordering::SeqCst) + 1) % self.urls.len() as u32;
        let url = &self.urls[next as usize];
        tracing::warn!(url = %bridge_core::util::scrub::scrub_url(url.as_str()), "rotating chain-E RPC provider after repeated network errors");
        match Self::connect(&self.wallet, url, self.nonce_manager.clone()).await {
            Ok(provider) => {
                *self.inner.write().await = Arc::new(provider);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to connect to fallback RPC provider");
                false
            }
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Start-up "validator-address pinning": checks `hasRole(VALIDATOR_ROLE,
    /// addr)` for every configured validator address, failing start-up if
    /// any lacks the role.
    pub async fn assert_validator_roles(&self, addresses: &[Address]) -> Result<(), EvmError> {
        let provider = self.provider().await;
        let contract = self.contract(provider);
        let role = validator_role();
        for address in addresses {
            let has_role = contract
                .hasRole(role, *address)
                .call()
                .await
                .map_err(|e| EvmError::Network(e.to_string()))?;
            if !has_role {
                return Err(EvmError::MissingValidatorRole { address: address.to_string() });
            }
        }
        Ok(())
    }
}

trait DefaultWithNonce {
    fn default_with_nonce(nonce_manager: PendingNonceManager) -> Self;
}

impl DefaultWithNonce for InnerFiller {
    fn default_with_nonce(nonce_manager: PendingNonceManager) -> Self {
        JoinFill::new(
            GasFiller,
            JoinFill::new(BlobGasFiller::default(), JoinFill::new(NonceFiller::new(nonce_manager), ChainIdFiller::default())),
        )
    }
}
