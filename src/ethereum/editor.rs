//! Keeps the selected function, its parameters and the raw call data in
//! agreement while the user edits any one of them.
//!
//! Every field edit is tried against the committed transaction. A successful
//! try is shown provisionally and becomes the new baseline when the field
//! loses focus; a failed one only marks the edited field invalid.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::abi::Interface;
use super::cell::StateCell;
use super::codec::{
    decode_transaction_data, encode_transaction_data, parse_hex_data, to_hex_data, DecodeError,
};
use super::example::example_for;
use super::params::FunctionFragment;
use super::utils::{format_error, parse_wei};

/// The committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditableTransaction {
    pub selected: Option<FunctionFragment>,
    pub parameters: Vec<String>,
    /// Lowercase `0x`-prefixed call data
    pub data: String,
    /// Native value in wei
    pub value: U256,
}

impl Default for EditableTransaction {
    fn default() -> Self {
        Self {
            selected: None,
            parameters: Vec::new(),
            data: "0x".to_string(),
            value: U256::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Function,
    Parameter(usize),
    Data,
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Function => f.write_str("function"),
            Field::Parameter(index) => write!(f, "param:{}", index),
            Field::Data => f.write_str("data"),
            Field::Value => f.write_str("value"),
        }
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    /// `function`, `data`, `value` or `param:<index>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "function" => Ok(Field::Function),
            "data" => Ok(Field::Data),
            "value" => Ok(Field::Value),
            _ => {
                let index = s
                    .strip_prefix("param:")
                    .or_else(|| s.strip_prefix("parameter:"))
                    .ok_or_else(|| anyhow::anyhow!("Unknown field '{}'", s))?;
                let index = index
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid parameter index '{}'", index))?;
                Ok(Field::Parameter(index))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FieldState {
    Clean,
    Editing,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: impl fmt::Display) -> Self {
        Self {
            field,
            message: format_error(&message.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub text: String,
    #[serde(flatten)]
    pub state: FieldState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterView {
    /// Canonical type and name, e.g. `address to`
    pub label: String,
    pub text: String,
    #[serde(flatten)]
    pub state: FieldState,
}

/// What every field currently shows, provisional edits included
#[derive(Debug, Clone, Serialize)]
pub struct EditorView {
    pub function: FieldView,
    pub read_only: bool,
    pub payable: bool,
    pub parameters: Vec<ParameterView>,
    pub data: FieldView,
    pub value: FieldView,
}

#[derive(Debug)]
struct PendingEdit {
    field: Field,
    text: String,
    outcome: Result<EditableTransaction, FieldError>,
}

#[derive(Debug)]
pub struct TransactionEditor {
    interface: Interface,
    committed: StateCell<EditableTransaction>,
    pending: Option<PendingEdit>,
}

impl Default for TransactionEditor {
    fn default() -> Self {
        Self::new(Interface::default())
    }
}

impl TransactionEditor {
    pub fn new(interface: Interface) -> Self {
        Self::with_store(interface, StateCell::local(EditableTransaction::default()))
    }

    pub fn with_store(interface: Interface, store: StateCell<EditableTransaction>) -> Self {
        Self {
            interface,
            committed: store,
            pending: None,
        }
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn transaction(&self) -> EditableTransaction {
        self.committed.get()
    }

    pub fn pending_field(&self) -> Option<Field> {
        self.pending.as_ref().map(|p| p.field)
    }

    pub fn field_state(&self, field: Field) -> FieldState {
        match &self.pending {
            Some(pending) if pending.field == field => match &pending.outcome {
                Ok(_) => FieldState::Editing,
                Err(err) => FieldState::Invalid(err.message.clone()),
            },
            _ => FieldState::Clean,
        }
    }

    /// Value actually sent: zero unless no function is selected or the
    /// selected one is payable
    pub fn effective_value(&self) -> U256 {
        let tx = self.transaction();
        match &tx.selected {
            Some(fragment) if !fragment.is_payable() => U256::ZERO,
            _ => tx.value,
        }
    }

    /// Compute the transaction that results from `text` in `field`,
    /// starting from the committed one
    pub fn try_commit(&self, field: Field, text: &str) -> Result<EditableTransaction, FieldError> {
        let mut tx = self.transaction();

        match field {
            Field::Function => {
                let query = text.trim();
                if query.is_empty() {
                    tx.selected = None;
                    tx.parameters.clear();
                    tx.data = "0x".to_string();
                    return Ok(tx);
                }

                let fragment = self
                    .interface
                    .find_function(query)
                    .map_err(|e| FieldError::new(field, e))?
                    .clone();
                if tx.selected.as_ref() != Some(&fragment) {
                    tx.parameters = fragment.inputs.iter().map(example_for).collect();
                }
                tx.data = encode(&fragment, &tx.parameters)?;
                tx.selected = Some(fragment);
            }

            Field::Parameter(index) => {
                let fragment = tx
                    .selected
                    .clone()
                    .ok_or_else(|| FieldError::new(field, "no function selected"))?;
                if index >= fragment.inputs.len() {
                    return Err(FieldError::new(
                        field,
                        format!(
                            "{} takes {} parameters",
                            fragment.name,
                            fragment.inputs.len()
                        ),
                    ));
                }
                tx.parameters.resize(fragment.inputs.len(), String::new());
                tx.parameters[index] = text.to_string();
                tx.data = encode(&fragment, &tx.parameters)?;
            }

            Field::Data => {
                let bytes = parse_hex_data(text).map_err(|e| FieldError::new(field, e))?;
                match decode_transaction_data(&self.interface, text)
                    .map_err(|e| FieldError::new(field, e))?
                {
                    Some(call) => {
                        tx.selected = Some(call.fragment);
                        tx.parameters = call.parameters;
                    }
                    None => {
                        tx.selected = None;
                        tx.parameters.clear();
                    }
                }
                tx.data = to_hex_data(&bytes);
            }

            Field::Value => {
                let text = text.trim();
                tx.value = if text.is_empty() {
                    U256::ZERO
                } else {
                    parse_wei(text).map_err(|e| FieldError::new(field, e))?
                };
            }
        }

        Ok(tx)
    }

    /// Record in-progress text for a field. Any edit pending on another
    /// field is settled first.
    pub fn edit(&mut self, field: Field, text: &str) -> FieldState {
        if field == Field::Function {
            return match self.select_function(text) {
                Ok(()) => FieldState::Clean,
                Err(err) => FieldState::Invalid(err.message),
            };
        }

        if let Some(other) = self.pending_field().filter(|f| *f != field) {
            self.blur(other);
        }

        let outcome = self.try_commit(field, text);
        self.pending = Some(PendingEdit {
            field,
            text: text.to_string(),
            outcome,
        });
        self.field_state(field)
    }

    /// Focus left `field`: commit its pending edit if valid, otherwise
    /// drop it. Returns whether anything was committed.
    pub fn blur(&mut self, field: Field) -> bool {
        if self.pending_field() != Some(field) {
            return false;
        }
        match self.pending.take() {
            Some(PendingEdit { outcome: Ok(tx), .. }) => {
                self.commit(tx);
                true
            }
            _ => {
                debug!("Discarded invalid edit of {}", field);
                false
            }
        }
    }

    /// Edit and blur in one step
    pub fn set(&mut self, field: Field, text: &str) -> Result<(), FieldError> {
        self.settle();
        let tx = self.try_commit(field, text)?;
        self.commit(tx);
        Ok(())
    }

    /// Select by display label, selector, signature or name. An empty
    /// query clears the selection.
    pub fn select_function(&mut self, query: &str) -> Result<(), FieldError> {
        self.set(Field::Function, query)
    }

    /// Replace the interface, re-reading the committed data with it. The
    /// old interface stays when the data does not decode.
    pub fn set_interface(&mut self, interface: Interface) -> Result<(), DecodeError> {
        self.settle();
        let mut tx = self.transaction();

        match decode_transaction_data(&interface, &tx.data)? {
            Some(call) => {
                tx.selected = Some(call.fragment);
                tx.parameters = call.parameters;
            }
            None => {
                tx.selected = None;
                tx.parameters.clear();
            }
        }

        self.interface = interface;
        self.commit(tx);
        Ok(())
    }

    pub fn view(&self) -> EditorView {
        let committed = self.transaction();
        let (shown, pending_text) = match &self.pending {
            Some(pending) => (
                pending.outcome.as_ref().unwrap_or(&committed).clone(),
                Some((pending.field, pending.text.as_str())),
            ),
            None => (committed.clone(), None),
        };

        let field_view = |field: Field, text: String| FieldView {
            text: match pending_text {
                Some((f, raw)) if f == field => raw.to_string(),
                _ => text,
            },
            state: self.field_state(field),
        };

        let parameters = shown
            .selected
            .iter()
            .flat_map(|fragment| fragment.inputs.iter().enumerate())
            .map(|(index, input)| {
                let field = Field::Parameter(index);
                let view = field_view(
                    field,
                    shown.parameters.get(index).cloned().unwrap_or_default(),
                );
                ParameterView {
                    label: input.full_format(),
                    text: view.text,
                    state: view.state,
                }
            })
            .collect();

        EditorView {
            function: field_view(
                Field::Function,
                shown
                    .selected
                    .as_ref()
                    .map(FunctionFragment::display)
                    .unwrap_or_default(),
            ),
            read_only: shown.selected.as_ref().is_some_and(|f| f.is_read_only()),
            payable: shown.selected.as_ref().map_or(true, |f| f.is_payable()),
            parameters,
            data: field_view(Field::Data, shown.data.clone()),
            value: field_view(Field::Value, shown.value.to_string()),
        }
    }

    fn settle(&mut self) {
        if let Some(field) = self.pending_field() {
            self.blur(field);
        }
    }

    fn commit(&mut self, tx: EditableTransaction) {
        debug!(
            "Committed {} with data {}",
            tx.selected
                .as_ref()
                .map(|f| f.signature())
                .unwrap_or_else(|| "no function".to_string()),
            tx.data
        );
        self.committed.set(tx);
    }
}

fn encode(fragment: &FunctionFragment, parameters: &[String]) -> Result<String, FieldError> {
    encode_transaction_data(Some(fragment), parameters)
        .map(|data| to_hex_data(&data))
        .map_err(|e| FieldError::new(Field::Parameter(e.index), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, RwLock};

    const ABI: &str = r#"[
        "function transfer(address to, uint256 amount) returns (bool)",
        "function deposit(uint256 amount) payable",
        "function balanceOf(address owner) view returns (uint256)"
    ]"#;

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn editor() -> TransactionEditor {
        TransactionEditor::new(Interface::parse(ABI).unwrap())
    }

    fn transfer_data(amount: u64) -> String {
        format!(
            "0xa9059cbb000000000000000000000000{}{:064x}",
            RECIPIENT[2..].to_lowercase(),
            amount
        )
    }

    #[test]
    fn test_select_function_populates_examples() {
        let mut editor = editor();
        editor.select_function("transfer").unwrap();

        let tx = editor.transaction();
        assert_eq!(tx.selected.as_ref().unwrap().name, "transfer");
        assert_eq!(
            tx.parameters,
            vec!["0x0000000000000000000000000000000000000000", "0"]
        );
        assert_eq!(tx.data, format!("0xa9059cbb{}", "0".repeat(128)));
    }

    #[test]
    fn test_parameter_edit_commits_on_blur() {
        let mut editor = editor();
        editor.select_function("transfer").unwrap();

        assert_eq!(editor.edit(Field::Parameter(0), RECIPIENT), FieldState::Editing);
        assert_eq!(editor.edit(Field::Parameter(1), "5"), FieldState::Editing);
        assert_eq!(editor.pending_field(), Some(Field::Parameter(1)));

        // The first edit was committed when the second started
        assert_eq!(editor.transaction().parameters[0], RECIPIENT);

        let view = editor.view();
        assert_eq!(view.data.text, transfer_data(5));
        assert_eq!(editor.transaction().data, transfer_data(0));

        assert!(editor.blur(Field::Parameter(1)));
        assert_eq!(editor.transaction().data, transfer_data(5));
        assert_eq!(editor.field_state(Field::Parameter(1)), FieldState::Clean);
    }

    #[test]
    fn test_invalid_parameter_is_discarded_on_blur() {
        let mut editor = editor();
        editor.select_function("transfer").unwrap();
        let before = editor.transaction();

        let state = editor.edit(Field::Parameter(1), "lots");
        let FieldState::Invalid(message) = state else {
            panic!("expected an invalid state");
        };
        assert!(message.starts_with("Invalid parameter #2"));

        let view = editor.view();
        assert_eq!(view.parameters[1].text, "lots");
        assert_eq!(view.data.text, before.data);

        assert!(!editor.blur(Field::Parameter(1)));
        assert_eq!(editor.transaction(), before);
        assert_eq!(editor.view().parameters[1].text, "0");
    }

    #[test]
    fn test_data_edit_selects_function() {
        let mut editor = editor();
        let typed = transfer_data(42).to_uppercase().replace("0XA", "0xA");

        assert_eq!(editor.edit(Field::Data, &typed), FieldState::Editing);
        assert_eq!(editor.view().data.text, typed);
        assert!(editor.blur(Field::Data));

        let tx = editor.transaction();
        assert_eq!(tx.selected.unwrap().name, "transfer");
        assert_eq!(tx.parameters, vec![RECIPIENT.to_string(), "42".to_string()]);
        assert_eq!(tx.data, transfer_data(42));
    }

    #[test]
    fn test_unknown_selector_deselects() {
        let mut editor = editor();
        editor.select_function("transfer").unwrap();

        editor.set(Field::Data, "0xdeadbeef").unwrap();
        let tx = editor.transaction();
        assert!(tx.selected.is_none());
        assert!(tx.parameters.is_empty());
        assert_eq!(tx.data, "0xdeadbeef");
    }

    #[test]
    fn test_invalid_data_leaves_state() {
        let mut editor = editor();
        editor.select_function("transfer").unwrap();
        let before = editor.transaction();

        assert!(matches!(
            editor.edit(Field::Data, "0xa9059cbb00"),
            FieldState::Invalid(_)
        ));
        assert!(matches!(
            editor.edit(Field::Data, "0xnothex"),
            FieldState::Invalid(_)
        ));
        editor.blur(Field::Data);
        assert_eq!(editor.transaction(), before);
    }

    #[test]
    fn test_out_of_range_data_is_rejected() {
        let mut editor = TransactionEditor::new(
            Interface::parse(r#"["function f(uint8 small, bool flag)"]"#).unwrap(),
        );
        editor.select_function("f").unwrap();
        let before = editor.transaction();

        let selector = before.selected.as_ref().unwrap().selector_hex();
        let wide = format!("{}{:064x}{:064x}", selector, 0x1ff, 1);
        let err = editor.set(Field::Data, &wide).unwrap_err();
        assert_eq!(err.field, Field::Data);
        assert_eq!(editor.transaction(), before);

        assert_eq!(editor.edit(Field::Parameter(1), "true"), FieldState::Editing);
        assert!(editor.blur(Field::Parameter(1)));
        assert_eq!(editor.transaction().parameters, vec!["0", "true"]);
    }

    #[test]
    fn test_structured_error_names_full_type() {
        let mut editor = TransactionEditor::new(
            Interface::parse(r#"["function setPair((address,uint256) pair)"]"#).unwrap(),
        );
        editor.select_function("setPair").unwrap();

        let state = editor.edit(
            Field::Parameter(0),
            r#"["0x0000000000000000000000000000000000000000"]"#,
        );
        assert_eq!(
            state,
            FieldState::Invalid(
                "Invalid parameter #1: invalid structured value: expected 2 components for `(address,uint256)`, got 1"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_reselecting_keeps_parameters() {
        let mut editor = editor();
        editor.select_function("transfer").unwrap();
        editor.set(Field::Parameter(1), "9").unwrap();

        let label = editor.transaction().selected.unwrap().display();
        editor.select_function(&label).unwrap();
        assert_eq!(editor.transaction().parameters[1], "9");

        editor.select_function("deposit").unwrap();
        assert_eq!(editor.transaction().parameters, vec!["0"]);

        editor.select_function("").unwrap();
        let tx = editor.transaction();
        assert!(tx.selected.is_none());
        assert_eq!(tx.data, "0x");
    }

    #[test]
    fn test_unknown_function_changes_nothing() {
        let mut editor = editor();
        editor.select_function("transfer").unwrap();
        let before = editor.transaction();

        let err = editor.select_function("approve").unwrap_err();
        assert_eq!(err.field, Field::Function);
        assert_eq!(editor.transaction(), before);
    }

    #[test]
    fn test_interface_swap() {
        let mut editor = TransactionEditor::default();

        // Unresolvable with no ABI, so it is kept as raw data
        editor.set(Field::Data, &transfer_data(3)).unwrap();
        assert!(editor.transaction().selected.is_none());

        editor.set_interface(Interface::parse(ABI).unwrap()).unwrap();
        let tx = editor.transaction();
        assert_eq!(tx.selected.unwrap().name, "transfer");
        assert_eq!(tx.parameters[1], "3");

        editor.set_interface(Interface::default()).unwrap();
        assert!(editor.transaction().selected.is_none());
    }

    #[test]
    fn test_interface_swap_keeps_old_on_decode_error() {
        let mut editor = TransactionEditor::default();
        editor.set(Field::Data, "0xa9059cbb00").unwrap();

        let result = editor.set_interface(Interface::parse(ABI).unwrap());
        assert!(matches!(result, Err(DecodeError::MalformedCallData(_))));
        assert!(!editor.interface().has_functions());
        assert_eq!(editor.transaction().data, "0xa9059cbb00");
    }

    #[test]
    fn test_effective_value() {
        let mut editor = editor();
        editor.set(Field::Value, "1000").unwrap();
        assert_eq!(editor.effective_value(), U256::from(1000));

        editor.select_function("transfer").unwrap();
        assert_eq!(editor.effective_value(), U256::ZERO);

        editor.select_function("deposit").unwrap();
        assert_eq!(editor.effective_value(), U256::from(1000));

        assert!(matches!(
            editor.edit(Field::Value, "-1"),
            FieldState::Invalid(_)
        ));
    }

    #[test]
    fn test_shared_store_sees_commits() {
        let handle = Arc::new(RwLock::new(EditableTransaction::default()));
        let mut editor = TransactionEditor::with_store(
            Interface::parse(ABI).unwrap(),
            StateCell::shared(handle.clone()),
        );

        editor.select_function("balanceOf").unwrap();
        assert_eq!(
            handle.read().unwrap().selected.as_ref().unwrap().name,
            "balanceOf"
        );
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("data".parse::<Field>().unwrap(), Field::Data);
        assert_eq!("param:2".parse::<Field>().unwrap(), Field::Parameter(2));
        assert_eq!(Field::Parameter(2).to_string(), "param:2");
        assert!("gas".parse::<Field>().is_err());
    }
}
