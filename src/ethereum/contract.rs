use alloy::primitives::{address, Address, U256};
use alloy::rpc::types::BlockNumberOrTag;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::abi::Interface;
use super::cell::StateCell;
use super::codec::{decode_transaction_result, parse_hex_data};
use super::editor::{EditableTransaction, EditorView, Field, FieldState, FieldView, TransactionEditor};
use super::provider::{CallOutcome, ProviderManager, TxParams, WalletProvider};
use super::{utils, FunctionSummary, Notification, NotificationSink, ReturnValue, Severity};

/// Placeholder contract until the user enters one
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// An editable input of the contract form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Address,
    Abi,
    Transaction(Field),
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "address" | "contract" => Ok(Target::Address),
            "abi" => Ok(Target::Abi),
            other => Ok(Target::Transaction(other.parse()?)),
        }
    }
}

#[derive(Debug)]
struct AddressInput {
    value: Address,
    pending: Option<(String, Result<Address, String>)>,
}

impl AddressInput {
    fn view(&self) -> FieldView {
        match &self.pending {
            Some((text, outcome)) => FieldView {
                text: text.clone(),
                state: match outcome {
                    Ok(_) => FieldState::Editing,
                    Err(message) => FieldState::Invalid(message.clone()),
                },
            },
            None => FieldView {
                text: self.value.to_checksum(None),
                state: FieldState::Clean,
            },
        }
    }
}

/// ABI text; a valid edit is applied right away, the text is normalized
/// when the input loses focus
#[derive(Debug, Default)]
struct AbiInput {
    saved: String,
    pending: Option<(String, Option<String>)>,
}

impl AbiInput {
    fn view(&self) -> FieldView {
        match &self.pending {
            Some((text, error)) => FieldView {
                text: text.clone(),
                state: match error {
                    Some(message) => FieldState::Invalid(message.clone()),
                    None => FieldState::Editing,
                },
            },
            None => FieldView {
                text: self.saved.clone(),
                state: FieldState::Clean,
            },
        }
    }
}

#[derive(Clone)]
struct ConnectedWallet {
    provider: Arc<dyn WalletProvider>,
    address: Address,
    network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletInfo {
    pub address: String,
    pub network: String,
}

/// Everything the form currently shows
#[derive(Debug, Clone, Serialize)]
pub struct ContractState {
    pub address: FieldView,
    pub abi: FieldView,
    pub transaction: EditorView,
    pub effective_value: String,
    pub wallet: Option<WalletInfo>,
    pub return_values: Option<Vec<ReturnValue>>,
}

pub struct ContractManager {
    provider_manager: ProviderManager,
    address: AddressInput,
    abi: AbiInput,
    editor: TransactionEditor,
    wallet: Option<ConnectedWallet>,
    return_values: Option<Vec<ReturnValue>>,
    sink: Arc<dyn NotificationSink>,
}

impl ContractManager {
    pub fn new(provider_manager: ProviderManager, sink: Arc<dyn NotificationSink>) -> Self {
        let store = StateCell::local(EditableTransaction::default());
        Self::with_store(provider_manager, sink, store)
    }

    /// Commit transactions into `store`, which may be shared with readers
    /// that do not go through the manager
    pub fn with_store(
        provider_manager: ProviderManager,
        sink: Arc<dyn NotificationSink>,
        store: StateCell<EditableTransaction>,
    ) -> Self {
        Self {
            provider_manager,
            address: AddressInput {
                value: DEFAULT_CONTRACT_ADDRESS,
                pending: None,
            },
            abi: AbiInput::default(),
            editor: TransactionEditor::with_store(Interface::default(), store),
            wallet: None,
            return_values: None,
            sink,
        }
    }

    pub fn address(&self) -> Address {
        self.address.value
    }

    pub fn interface(&self) -> &Interface {
        self.editor.interface()
    }

    pub fn transaction(&self) -> EditableTransaction {
        self.editor.transaction()
    }

    pub fn return_values(&self) -> Option<&[ReturnValue]> {
        self.return_values.as_deref()
    }

    pub fn clear_return_values(&mut self) {
        self.return_values = None;
    }

    pub fn state(&self) -> ContractState {
        ContractState {
            address: self.address.view(),
            abi: self.abi.view(),
            transaction: self.editor.view(),
            effective_value: self.editor.effective_value().to_string(),
            wallet: self.wallet.as_ref().map(|w| WalletInfo {
                address: w.address.to_checksum(None),
                network: w.network.clone(),
            }),
            return_values: self.return_values.clone(),
        }
    }

    pub fn list_functions(&self) -> Vec<FunctionSummary> {
        self.interface()
            .sorted_functions()
            .into_iter()
            .map(FunctionSummary::from)
            .collect()
    }

    /// Record in-progress text for an input, settling edits pending on
    /// any other input first
    pub fn edit(&mut self, target: Target, text: &str) -> FieldState {
        self.settle_except(target);

        match target {
            Target::Address => {
                let outcome = utils::validate_address(text)
                    .map_err(|e| utils::format_error(&e.to_string()));
                self.address.pending = Some((text.to_string(), outcome));
                self.address.view().state
            }
            Target::Abi => self.edit_abi(text),
            Target::Transaction(field) => self.editor.edit(field, text),
        }
    }

    /// Focus left an input. Returns whether a new value was committed.
    pub fn blur(&mut self, target: Target) -> bool {
        match target {
            Target::Address => match self.address.pending.take() {
                Some((_, Ok(address))) => {
                    debug!("Contract address set to {}", address);
                    self.address.value = address;
                    true
                }
                _ => false,
            },
            Target::Abi => match self.abi.pending.take() {
                Some((text, None)) => {
                    self.abi.saved = if text.trim().is_empty() {
                        String::new()
                    } else {
                        self.interface().to_json().unwrap_or(text)
                    };
                    true
                }
                _ => false,
            },
            Target::Transaction(field) => self.editor.blur(field),
        }
    }

    /// Edit and blur in one step, failing with the input's error
    pub fn set(&mut self, target: Target, text: &str) -> Result<()> {
        if let FieldState::Invalid(message) = self.edit(target, text) {
            self.blur(target);
            return Err(anyhow!(message));
        }
        self.blur(target);
        Ok(())
    }

    fn edit_abi(&mut self, text: &str) -> FieldState {
        let error = match Interface::parse(text) {
            Err(e) => Some(utils::format_error(&e.to_string())),
            Ok(interface) => match self.editor.set_interface(interface) {
                Ok(()) => None,
                Err(e) => Some(format!(
                    "Could not decode transaction data with the given ABI: {}",
                    utils::format_error(&e.to_string())
                )),
            },
        };

        match error {
            None => {
                if self.interface().has_functions() {
                    info!(
                        "Loaded ABI with {} functions",
                        self.interface().functions().len()
                    );
                } else {
                    debug!("ABI has no functions");
                }
                self.abi.saved = text.to_string();
                self.return_values = None;
                self.abi.pending = Some((text.to_string(), None));
                FieldState::Editing
            }
            Some(message) => {
                self.abi.pending = Some((text.to_string(), Some(message.clone())));
                FieldState::Invalid(message)
            }
        }
    }

    fn settle_except(&mut self, target: Target) {
        if target != Target::Address {
            self.blur(Target::Address);
        }
        if target != Target::Abi {
            self.blur(Target::Abi);
        }
        if !matches!(target, Target::Transaction(_)) {
            if let Some(field) = self.editor.pending_field() {
                self.editor.blur(field);
            }
        }
    }

    fn settle(&mut self) {
        self.blur(Target::Address);
        self.blur(Target::Abi);
        if let Some(field) = self.editor.pending_field() {
            self.editor.blur(field);
        }
    }

    /// Connect the signer whose key is in the configured environment
    /// variable
    pub async fn connect_wallet(&mut self, network: Option<&str>) -> Result<Address> {
        let key_env = self
            .provider_manager
            .config()
            .wallet
            .private_key_env
            .clone();
        let private_key = std::env::var(&key_env).map_err(|_| {
            anyhow!(
                "Set the {} environment variable to the wallet's private key",
                key_env
            )
        })?;

        let wallet = self
            .provider_manager
            .connect_wallet(network, &private_key)
            .await?;
        let network = wallet.network().to_string();
        self.connect(Arc::new(wallet), network).await
    }

    pub async fn connect(
        &mut self,
        provider: Arc<dyn WalletProvider>,
        network: String,
    ) -> Result<Address> {
        let address = provider.get_address().await?;
        self.notify(
            format!("Connected {} on {}", address.to_checksum(None), network),
            Severity::Success,
        );
        self.wallet = Some(ConnectedWallet {
            provider,
            address,
            network,
        });
        Ok(address)
    }

    pub fn disconnect_wallet(&mut self) {
        if self.wallet.take().is_some() {
            self.notify("Wallet disconnected", Severity::Info);
        }
    }

    /// Simulate read-only functions, submit everything else
    pub async fn execute(&mut self, block: Option<&str>) {
        self.settle();
        let read_only = self
            .transaction()
            .selected
            .is_some_and(|fragment| fragment.is_read_only());

        if read_only {
            self.simulate(block).await;
        } else {
            self.submit(false).await;
        }
    }

    /// Submit without the pre-flight call, falling back to the default
    /// gas limit when estimation fails
    pub async fn force_submit(&mut self) {
        self.settle();
        self.submit(true).await;
    }

    async fn simulate(&mut self, block: Option<&str>) {
        self.return_values = None;

        let Some(wallet) = self.require_wallet() else {
            return;
        };
        let Some(fragment) = self.transaction().selected else {
            return;
        };
        let block = match utils::parse_block_reference(block) {
            Ok(block) => block,
            Err(e) => {
                self.notify(e.to_string(), Severity::Error);
                return;
            }
        };
        let params = match self.tx_params() {
            Ok(params) => params,
            Err(e) => {
                self.notify(e.to_string(), Severity::Error);
                return;
            }
        };

        self.notify("Simulating execution", Severity::Info);

        match wallet.provider.eth_call(&params, block).await {
            Ok(CallOutcome::Returned(output)) => {
                match decode_transaction_result(&fragment, &output) {
                    Ok(values) => {
                        self.return_values = Some(
                            fragment
                                .outputs
                                .iter()
                                .zip(values)
                                .map(|(param, value)| ReturnValue {
                                    label: param.full_format(),
                                    value,
                                })
                                .collect(),
                        );
                        self.notify("Execution succeeded!", Severity::Success);
                    }
                    Err(e) => self.notify(
                        format!(
                            "Failed to decode transaction result: {}",
                            utils::capitalize_error(&e.to_string())
                        ),
                        Severity::Error,
                    ),
                }
            }
            Ok(CallOutcome::Reverted(message)) => self.notify_revert(&message),
            Err(e) => self.notify(
                format!(
                    "Failed to simulate execution: {}",
                    utils::capitalize_error(&e.to_string())
                ),
                Severity::Error,
            ),
        }
    }

    async fn submit(&mut self, force: bool) {
        let Some(wallet) = self.require_wallet() else {
            return;
        };

        let config = self.provider_manager.config().clone();
        if !config.security.allow_write_operations {
            self.notify(
                "Write operations are disabled. Set security.allow_write_operations or pass --allow-writes",
                Severity::Error,
            );
            return;
        }

        let mut params = match self.tx_params() {
            Ok(params) => params,
            Err(e) => {
                self.notify(e.to_string(), Severity::Error);
                return;
            }
        };

        if let Some(max) = &config.security.max_transaction_value {
            match utils::parse_wei(max) {
                Ok(max) if params.value > max => {
                    self.notify(
                        format!(
                            "Transaction value {} exceeds the configured maximum of {} wei",
                            params.value, max
                        ),
                        Severity::Error,
                    );
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    self.notify(
                        format!("Invalid security.max_transaction_value: {}", e),
                        Severity::Error,
                    );
                    return;
                }
            }
        }

        let network = match config.network(Some(&wallet.network)) {
            Ok(network) => network.clone(),
            Err(e) => {
                self.notify(e.to_string(), Severity::Error);
                return;
            }
        };

        self.notify("Sending transaction", Severity::Info);

        if !force {
            match wallet
                .provider
                .eth_call(&params, BlockNumberOrTag::Latest)
                .await
            {
                Ok(CallOutcome::Returned(_)) => {}
                Ok(CallOutcome::Reverted(message)) => {
                    self.notify_revert(&message);
                    return;
                }
                Err(e) => {
                    self.notify(
                        format!(
                            "Transaction invalid: {}",
                            utils::capitalize_error(&e.to_string())
                        ),
                        Severity::Error,
                    );
                    return;
                }
            }
        }

        let gas_limit = match wallet.provider.estimate_gas(&params).await {
            Ok(gas) => gas,
            Err(e) if force => {
                warn!(
                    "Gas estimation failed, using default of {}: {}",
                    network.gas.default_gas_limit, e
                );
                network.gas.default_gas_limit
            }
            Err(e) => {
                self.notify(
                    format!(
                        "Error estimating gas required for transaction: {}",
                        utils::format_error(&e.to_string())
                    ),
                    Severity::Error,
                );
                return;
            }
        };
        params.gas_limit = Some(gas_limit);

        match wallet.provider.send_transaction(&params).await {
            Ok(hash) => {
                let hash = format!("0x{:x}", hash);
                self.notify(format!("Transaction sent! Hash: {}", hash), Severity::Success);
                if let Some(url) = network.explorer_tx_url(&hash) {
                    self.notify(format!("View on explorer: {}", url), Severity::Info);
                }
            }
            Err(e) => self.notify(
                format!(
                    "Error sending transaction: {}",
                    utils::format_error(&e.to_string())
                ),
                Severity::Error,
            ),
        }
    }

    fn require_wallet(&self) -> Option<ConnectedWallet> {
        if self.wallet.is_none() {
            self.notify("Connect a wallet first", Severity::Error);
        }
        self.wallet.clone()
    }

    fn tx_params(&self) -> Result<TxParams> {
        let tx = self.transaction();
        let data = parse_hex_data(&tx.data).map_err(|e| anyhow!("Invalid call data: {}", e))?;
        let value: U256 = self.editor.effective_value();

        Ok(TxParams {
            to: self.address(),
            data: data.into(),
            value,
            gas_limit: None,
        })
    }

    fn notify_revert(&self, message: &str) {
        self.notify(
            format!(
                "Aborting because your transaction would fail with the following error: {}",
                utils::capitalize_error(message)
            ),
            Severity::Warning,
        );
    }

    fn notify(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Error => error!("{}", message),
            Severity::Warning => warn!("{}", message),
            _ => info!("{}", message),
        }
        self.sink.notify(Notification { message, severity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ethereum::NotificationLog;
    use alloy::primitives::{Bytes, B256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ABI: &str = r#"[
        "function transfer(address to, uint256 amount) returns (bool)",
        "function deposit() payable",
        "function balanceOf(address owner) view returns (uint256 balance)"
    ]"#;

    struct MockWallet {
        call_result: std::result::Result<CallOutcome, String>,
        gas_result: std::result::Result<u64, String>,
        send_result: std::result::Result<B256, String>,
        calls: Mutex<Vec<TxParams>>,
        sent: Mutex<Vec<TxParams>>,
    }

    impl MockWallet {
        fn returning(output: Vec<u8>) -> Self {
            Self {
                call_result: Ok(CallOutcome::Returned(Bytes::from(output))),
                gas_result: Ok(50_000),
                send_result: Ok(B256::repeat_byte(0xab)),
                calls: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<TxParams> {
            self.calls.lock().unwrap().clone()
        }

        fn sent(&self) -> Vec<TxParams> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WalletProvider for MockWallet {
        async fn get_address(&self) -> Result<Address> {
            Ok(Address::repeat_byte(0x11))
        }

        async fn estimate_gas(&self, _tx: &TxParams) -> Result<u64> {
            self.gas_result.clone().map_err(|e| anyhow!(e))
        }

        async fn send_transaction(&self, tx: &TxParams) -> Result<B256> {
            self.sent.lock().unwrap().push(tx.clone());
            self.send_result.clone().map_err(|e| anyhow!(e))
        }

        async fn eth_call(&self, tx: &TxParams, _block: BlockNumberOrTag) -> Result<CallOutcome> {
            self.calls.lock().unwrap().push(tx.clone());
            self.call_result.clone().map_err(|e| anyhow!(e))
        }
    }

    fn manager(allow_writes: bool) -> (ContractManager, Arc<NotificationLog>) {
        let mut config = Config::default();
        config.security.allow_write_operations = allow_writes;
        let log = Arc::new(NotificationLog::default());
        let mut manager = ContractManager::new(ProviderManager::new(config).unwrap(), log.clone());
        manager.set(Target::Abi, ABI).unwrap();
        (manager, log)
    }

    async fn connected(
        allow_writes: bool,
        wallet: Arc<MockWallet>,
    ) -> (ContractManager, Arc<NotificationLog>) {
        let (mut manager, log) = manager(allow_writes);
        manager
            .connect(wallet, "ethereum".to_string())
            .await
            .unwrap();
        log.drain();
        (manager, log)
    }

    fn messages(log: &NotificationLog) -> Vec<(Severity, String)> {
        log.drain()
            .into_iter()
            .map(|n| (n.severity, n.message))
            .collect()
    }

    fn word(value: u8) -> Vec<u8> {
        let mut word = vec![0u8; 32];
        word[31] = value;
        word
    }

    #[tokio::test]
    async fn test_simulate_view_function() {
        let wallet = Arc::new(MockWallet::returning(word(200)));
        let (mut manager, log) = connected(false, wallet.clone()).await;

        manager
            .set(Target::Transaction(Field::Function), "balanceOf")
            .unwrap();
        manager.execute(None).await;

        assert_eq!(
            messages(&log),
            vec![
                (Severity::Info, "Simulating execution".to_string()),
                (Severity::Success, "Execution succeeded!".to_string()),
            ]
        );
        assert_eq!(
            manager.return_values().unwrap(),
            &[ReturnValue {
                label: "uint256 balance".to_string(),
                value: "200".to_string(),
            }]
        );

        let call = &wallet.calls()[0];
        assert_eq!(call.to, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(&call.data[..4], &[0x70, 0xa0, 0x82, 0x31]);

        manager.clear_return_values();
        assert!(manager.return_values().is_none());
    }

    #[tokio::test]
    async fn test_simulate_revert_is_a_warning() {
        let mut wallet = MockWallet::returning(Vec::new());
        wallet.call_result = Ok(CallOutcome::Reverted(
            "execution reverted: not owner".to_string(),
        ));
        let (mut manager, log) = connected(false, Arc::new(wallet)).await;

        manager
            .set(Target::Transaction(Field::Function), "balanceOf")
            .unwrap();
        manager.execute(None).await;

        let messages = messages(&log);
        assert_eq!(
            messages[1],
            (
                Severity::Warning,
                "Aborting because your transaction would fail with the following error: Execution reverted: not owner"
                    .to_string()
            )
        );
        assert!(manager.return_values().is_none());
    }

    #[tokio::test]
    async fn test_simulate_failures() {
        let mut wallet = MockWallet::returning(Vec::new());
        wallet.call_result = Err("header not found (block 0x10)".to_string());
        let (mut manager, log) = connected(false, Arc::new(wallet)).await;
        manager
            .set(Target::Transaction(Field::Function), "balanceOf")
            .unwrap();

        manager.execute(None).await;
        assert_eq!(
            messages(&log)[1],
            (
                Severity::Error,
                "Failed to simulate execution: Header not found (block 0x10)".to_string()
            )
        );

        let wallet = Arc::new(MockWallet::returning(Vec::new()));
        manager
            .connect(wallet, "ethereum".to_string())
            .await
            .unwrap();
        log.drain();
        manager.execute(None).await;
        assert_eq!(
            messages(&log)[1],
            (
                Severity::Error,
                "Failed to decode transaction result: Transaction returned no data, are you sure this is a contract?"
                    .to_string()
            )
        );

        manager.execute(Some("yesterday")).await;
        assert_eq!(messages(&log)[0].0, Severity::Error);
    }

    #[tokio::test]
    async fn test_submit_requires_wallet_and_permission() {
        let (mut manager, log) = manager(true);
        manager.execute(None).await;
        assert_eq!(
            messages(&log),
            vec![(Severity::Error, "Connect a wallet first".to_string())]
        );

        let wallet = Arc::new(MockWallet::returning(Vec::new()));
        let (mut manager, log) = connected(false, wallet.clone()).await;
        manager
            .set(Target::Transaction(Field::Function), "transfer")
            .unwrap();
        manager.execute(None).await;
        assert_eq!(messages(&log)[0].0, Severity::Error);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_submit_transaction() {
        let wallet = Arc::new(MockWallet::returning(word(1)));
        let (mut manager, log) = connected(true, wallet.clone()).await;

        manager
            .set(Target::Address, "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")
            .unwrap();
        manager
            .set(Target::Transaction(Field::Function), "transfer")
            .unwrap();
        manager
            .set(Target::Transaction(Field::Parameter(1)), "25")
            .unwrap();
        manager.set(Target::Transaction(Field::Value), "99").unwrap();
        manager.execute(None).await;

        let messages = messages(&log);
        assert_eq!(messages[0], (Severity::Info, "Sending transaction".to_string()));
        assert_eq!(
            messages[1],
            (
                Severity::Success,
                format!("Transaction sent! Hash: 0x{}", "ab".repeat(32))
            )
        );
        assert!(messages[2].1.starts_with("View on explorer: https://etherscan.io/tx/0x"));

        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(wallet.calls().len(), 1);
        assert_eq!(sent[0].gas_limit, Some(50_000));
        // transfer is not payable
        assert_eq!(sent[0].value, U256::ZERO);
        assert_eq!(
            sent[0].to.to_checksum(None),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[tokio::test]
    async fn test_submit_aborts_on_preflight_revert() {
        let mut wallet = MockWallet::returning(Vec::new());
        wallet.call_result = Ok(CallOutcome::Reverted("execution reverted".to_string()));
        let wallet = Arc::new(wallet);
        let (mut manager, log) = connected(true, wallet.clone()).await;

        manager
            .set(Target::Transaction(Field::Function), "deposit")
            .unwrap();
        manager.execute(None).await;

        assert_eq!(messages(&log)[1].0, Severity::Warning);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_submit_reports_gas_estimation_failure() {
        let mut wallet = MockWallet::returning(Vec::new());
        wallet.gas_result = Err("insufficient funds for gas".to_string());
        let wallet = Arc::new(wallet);
        let (mut manager, log) = connected(true, wallet.clone()).await;

        manager.execute(None).await;
        assert_eq!(
            messages(&log)[1],
            (
                Severity::Error,
                "Error estimating gas required for transaction: Insufficient funds for gas"
                    .to_string()
            )
        );
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_force_submit_uses_default_gas() {
        let mut wallet = MockWallet::returning(Vec::new());
        wallet.call_result = Ok(CallOutcome::Reverted("execution reverted".to_string()));
        wallet.gas_result = Err("execution reverted".to_string());
        let wallet = Arc::new(wallet);
        let (mut manager, log) = connected(true, wallet.clone()).await;

        manager
            .set(Target::Transaction(Field::Function), "deposit")
            .unwrap();
        manager.set(Target::Transaction(Field::Value), "0x10").unwrap();
        manager.force_submit().await;

        assert!(wallet.calls().is_empty());
        let sent = wallet.sent();
        assert_eq!(sent[0].gas_limit, Some(100_000));
        assert_eq!(sent[0].value, U256::from(16));
        assert_eq!(messages(&log)[1].0, Severity::Success);
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let mut wallet = MockWallet::returning(Vec::new());
        wallet.send_result = Err("nonce too low".to_string());
        let (mut manager, log) = connected(true, Arc::new(wallet)).await;

        manager.execute(None).await;
        assert_eq!(
            messages(&log)[1],
            (
                Severity::Error,
                "Error sending transaction: Nonce too low".to_string()
            )
        );
    }

    #[test]
    fn test_abi_input() {
        let (mut manager, _log) = manager(false);
        assert_eq!(manager.list_functions().len(), 3);
        assert_eq!(manager.list_functions()[0].signature, "deposit()");

        // Normalized to canonical JSON on blur
        let saved = manager.state().abi.text;
        assert!(saved.trim_start().starts_with('['));
        assert!(saved.contains("\"balanceOf\""));

        assert!(matches!(
            manager.edit(Target::Abi, "function oops("),
            FieldState::Invalid(_)
        ));
        assert!(!manager.blur(Target::Abi));
        assert_eq!(manager.state().abi.text, saved);
        assert_eq!(manager.list_functions().len(), 3);
    }

    #[test]
    fn test_abi_that_cannot_decode_data_is_rejected() {
        let (mut manager, _log) = manager(false);
        manager.set(Target::Abi, "").unwrap();
        manager
            .set(Target::Transaction(Field::Data), "0xa9059cbb00")
            .unwrap();

        let err = manager.set(Target::Abi, ABI).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Could not decode transaction data with the given ABI: "));
        assert!(!manager.interface().has_functions());
    }

    #[test]
    fn test_address_input() {
        let (mut manager, _log) = manager(false);
        assert_eq!(manager.address(), DEFAULT_CONTRACT_ADDRESS);

        assert!(matches!(
            manager.edit(Target::Address, "0x1234"),
            FieldState::Invalid(_)
        ));
        // Editing another input settles the address edit
        manager.edit(Target::Transaction(Field::Function), "transfer");
        assert_eq!(manager.address(), DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(manager.state().address.state, FieldState::Clean);

        assert_eq!(
            manager.edit(Target::Address, "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            FieldState::Editing
        );
        assert!(manager.blur(Target::Address));
        assert_eq!(
            manager.state().address.text,
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("abi".parse::<Target>().unwrap(), Target::Abi);
        assert_eq!("contract".parse::<Target>().unwrap(), Target::Address);
        assert_eq!(
            "param:0".parse::<Target>().unwrap(),
            Target::Transaction(Field::Parameter(0))
        );
        assert!("nonsense".parse::<Target>().is_err());
    }
}
