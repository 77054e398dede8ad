use anyhow::{anyhow, Result};
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

use crate::{
    config::Config,
    ethereum::{
        abi::Interface,
        cell::StateCell,
        codec::{decode_transaction_data, encode_transaction_data, to_hex_data},
        contract::{ContractManager, Target},
        editor::{EditableTransaction, Field},
        example::example_for,
        params::ParamType,
        provider::ProviderManager,
        NotificationLog,
    },
};

#[derive(Clone)]
pub struct TxForgeServer {
    contract_manager: Arc<tokio::sync::Mutex<ContractManager>>,
    transaction: Arc<RwLock<EditableTransaction>>,
    notifications: Arc<NotificationLog>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EditFieldRequest {
    /// `address`, `abi`, `function`, `data`, `value` or `param:<index>`
    field: String,
    text: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct BlurFieldRequest {
    field: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SelectFunctionRequest {
    /// Display label, selector, signature or name; empty to deselect
    query: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ConnectWalletRequest {
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ExecuteRequest {
    /// Block to simulate against: a number or latest, pending, safe, finalized
    block: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EncodeCalldataRequest {
    function: String,
    parameters: Vec<String>,
    /// ABI to resolve the function in; the loaded ABI when absent
    abi: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct DecodeCalldataRequest {
    data: String,
    abi: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ExampleValueRequest {
    /// Canonical ABI type, e.g. `(address,uint256)[]`
    param_type: String,
}

impl TxForgeServer {
    pub fn new(config: Config) -> Result<Self> {
        let provider_manager = ProviderManager::new(config)?;
        let notifications = Arc::new(NotificationLog::default());
        let transaction = Arc::new(RwLock::new(EditableTransaction::default()));

        let store = StateCell::shared(transaction.clone()).with_observer(|tx| {
            debug!("Published transaction with data {}", tx.data);
        });
        let manager = ContractManager::with_store(provider_manager, notifications.clone(), store);

        Ok(Self {
            contract_manager: Arc::new(tokio::sync::Mutex::new(manager)),
            transaction,
            notifications,
        })
    }

    /// Apply startup values given on the command line
    pub async fn preload(&self, abi: Option<&str>, contract: Option<&str>) -> Result<()> {
        let mut manager = self.contract_manager.lock().await;
        if let Some(abi) = abi {
            manager
                .set(Target::Abi, abi)
                .map_err(|e| anyhow!("Failed to load ABI: {}", e))?;
        }
        if let Some(contract) = contract {
            manager
                .set(Target::Address, contract)
                .map_err(|e| anyhow!("Invalid contract address: {}", e))?;
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting txforge MCP server");

        let service = self.clone().serve(stdio()).await?;

        info!("txforge MCP server started successfully");
        let _ = service.waiting().await;
        Ok(())
    }

    /// Wrap a tool result together with the notifications it produced
    fn respond(&self, result: Value) -> String {
        let response = json!({
            "result": result,
            "notifications": self.notifications.drain(),
        });
        serde_json::to_string_pretty(&response)
            .unwrap_or_else(|_| "Failed to serialize response".to_string())
    }

    fn respond_error(&self, context: &str, e: anyhow::Error) -> String {
        error!("{}: {}", context, e);
        self.respond(json!({ "error": e.to_string() }))
    }

    async fn resolve_interface(&self, abi: Option<&str>) -> Result<Interface> {
        match abi {
            Some(text) => Interface::parse(text).map_err(|e| anyhow!("{}", e)),
            None => Ok(self.contract_manager.lock().await.interface().clone()),
        }
    }
}

#[tool(tool_box)]
impl TxForgeServer {
    #[tool(description = "Show every field of the transaction form: contract address, ABI, function, parameters, call data, value, wallet and return values")]
    async fn get_state(&self) -> String {
        let manager = self.contract_manager.lock().await;
        self.respond(json!(manager.state()))
    }

    #[tool(description = "List the functions of the loaded ABI, state-changing ones first")]
    async fn list_functions(&self) -> String {
        let manager = self.contract_manager.lock().await;
        self.respond(json!(manager.list_functions()))
    }

    #[tool(description = "Type text into a field without leaving it. Valid text is shown provisionally in the other fields; invalid text only marks the field")]
    async fn edit_field(&self, #[tool(aggr)] request: EditFieldRequest) -> String {
        let target: Target = match request.field.parse() {
            Ok(target) => target,
            Err(e) => return self.respond_error("Invalid field", e),
        };

        let mut manager = self.contract_manager.lock().await;
        let field_state = manager.edit(target, &request.text);
        self.respond(json!({
            "field_state": field_state,
            "state": manager.state(),
        }))
    }

    #[tool(description = "Leave a field: commits its valid text or restores the last committed value")]
    async fn blur_field(&self, #[tool(aggr)] request: BlurFieldRequest) -> String {
        let target: Target = match request.field.parse() {
            Ok(target) => target,
            Err(e) => return self.respond_error("Invalid field", e),
        };

        let mut manager = self.contract_manager.lock().await;
        let committed = manager.blur(target);
        self.respond(json!({
            "committed": committed,
            "state": manager.state(),
        }))
    }

    #[tool(description = "Type text into a field and leave it, failing without changes if the text is invalid")]
    async fn set_field(&self, #[tool(aggr)] request: EditFieldRequest) -> String {
        let target: Target = match request.field.parse() {
            Ok(target) => target,
            Err(e) => return self.respond_error("Invalid field", e),
        };

        let mut manager = self.contract_manager.lock().await;
        match manager.set(target, &request.text) {
            Ok(()) => self.respond(json!(manager.state())),
            Err(e) => self.respond_error("Failed to set field", e),
        }
    }

    #[tool(description = "Select a function by display label, selector, signature or name and fill its parameters with examples")]
    async fn select_function(&self, #[tool(aggr)] request: SelectFunctionRequest) -> String {
        let mut manager = self.contract_manager.lock().await;
        match manager.set(Target::Transaction(Field::Function), &request.query) {
            Ok(()) => self.respond(json!(manager.state())),
            Err(e) => self.respond_error("Failed to select function", e),
        }
    }

    #[tool(description = "Connect the wallet whose private key is in the configured environment variable")]
    async fn connect_wallet(&self, #[tool(aggr)] request: ConnectWalletRequest) -> String {
        let mut manager = self.contract_manager.lock().await;
        match manager.connect_wallet(request.network.as_deref()).await {
            Ok(address) => self.respond(json!({ "address": address.to_checksum(None) })),
            Err(e) => self.respond_error("Failed to connect wallet", e),
        }
    }

    #[tool(description = "Disconnect the wallet")]
    async fn disconnect_wallet(&self) -> String {
        let mut manager = self.contract_manager.lock().await;
        manager.disconnect_wallet();
        self.respond(Value::Null)
    }

    #[tool(description = "Simulate the transaction if the selected function is read-only, otherwise send it after a pre-flight check")]
    async fn execute(&self, #[tool(aggr)] request: ExecuteRequest) -> String {
        let mut manager = self.contract_manager.lock().await;
        manager.execute(request.block.as_deref()).await;
        self.respond(json!({ "return_values": manager.return_values() }))
    }

    #[tool(description = "Send the transaction without the pre-flight check, using the default gas limit if estimation fails")]
    async fn force_submit(&self) -> String {
        let mut manager = self.contract_manager.lock().await;
        manager.force_submit().await;
        self.respond(Value::Null)
    }

    #[tool(description = "Clear the return values of the last simulation")]
    async fn clear_return_values(&self) -> String {
        let mut manager = self.contract_manager.lock().await;
        manager.clear_return_values();
        self.respond(Value::Null)
    }

    #[tool(description = "Get the committed transaction: selected function, parameters, call data and value")]
    async fn get_transaction(&self) -> String {
        let transaction = self
            .transaction
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        self.respond(json!(transaction))
    }

    #[tool(description = "Encode call data for a function and parameter strings without touching the form")]
    async fn encode_calldata(&self, #[tool(aggr)] request: EncodeCalldataRequest) -> String {
        let interface = match self.resolve_interface(request.abi.as_deref()).await {
            Ok(interface) => interface,
            Err(e) => return self.respond_error("Invalid ABI", e),
        };
        let fragment = match interface.find_function(&request.function) {
            Ok(fragment) => fragment,
            Err(e) => return self.respond_error("Unknown function", anyhow!("{}", e)),
        };

        match encode_transaction_data(Some(fragment), &request.parameters) {
            Ok(data) => self.respond(json!({ "data": to_hex_data(&data) })),
            Err(e) => self.respond_error("Failed to encode call data", anyhow!("{}", e)),
        }
    }

    #[tool(description = "Decode call data against an ABI without touching the form")]
    async fn decode_calldata(&self, #[tool(aggr)] request: DecodeCalldataRequest) -> String {
        let interface = match self.resolve_interface(request.abi.as_deref()).await {
            Ok(interface) => interface,
            Err(e) => return self.respond_error("Invalid ABI", e),
        };

        match decode_transaction_data(&interface, &request.data) {
            Ok(Some(call)) => self.respond(json!({
                "function": call.fragment.display(),
                "parameters": call.parameters,
            })),
            Ok(None) => self.respond(json!({ "function": null })),
            Err(e) => self.respond_error("Failed to decode call data", anyhow!("{}", e)),
        }
    }

    #[tool(description = "Show the example value a parameter of the given ABI type starts with")]
    async fn example_value(&self, #[tool(aggr)] request: ExampleValueRequest) -> String {
        match ParamType::parse(&request.param_type) {
            Ok(param) => self.respond(json!({ "example": example_for(&param) })),
            Err(e) => self.respond_error("Unsupported type", anyhow!("{}", e)),
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for TxForgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Build EVM contract transactions field by field. Load an ABI and contract address, pick a function, edit its parameters or the raw call data (the other side stays in sync), then simulate read-only calls or send state-changing transactions with a connected wallet.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
