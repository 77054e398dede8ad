pub mod abi;
pub mod cell;
pub mod codec;
pub mod contract;
pub mod editor;
pub mod example;
pub mod format;
pub mod params;
pub mod provider;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use params::FunctionFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Default,
    Error,
    Success,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// Receives user-facing messages from the simulate and submit flows
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sink that keeps notifications until the host collects them
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn drain(&self) -> Vec<Notification> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *entries)
    }
}

impl NotificationSink for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}

/// A function as listed to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub label: String,
    pub signature: String,
    pub selector: String,
    pub mutability: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl From<&FunctionFragment> for FunctionSummary {
    fn from(fragment: &FunctionFragment) -> Self {
        Self {
            label: fragment.display(),
            signature: fragment.signature(),
            selector: fragment.selector_hex(),
            mutability: fragment.mutability.to_string(),
            inputs: fragment.inputs.iter().map(|p| p.full_format()).collect(),
            outputs: fragment.outputs.iter().map(|p| p.full_format()).collect(),
        }
    }
}

/// One decoded output of a simulated call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValue {
    pub label: String,
    pub value: String,
}
