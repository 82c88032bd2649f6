use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Network, TransactionId, RECIPIENT_ADDRESS};

/// Body of the payment initiation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayRequest {
    pub amount: String,
    pub to: String,
    pub testnet: bool,
}

impl PayRequest {
    pub fn to_recipient(amount: impl Into<String>, network: Network) -> Self {
        Self {
            amount: amount.into(),
            to: RECIPIENT_ADDRESS.to_string(),
            testnet: network.is_testnet(),
        }
    }
}

/// Payment initiation result.
///
/// Payment providers disagree on where the identifier lives, so all of the
/// known field names are accepted and [`PayResponse::transaction_id`] picks
/// the first non-empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        rename = "transactionId",
        alias = "transaction_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl PayResponse {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        [&self.id, &self.transaction_id, &self.hash]
            .into_iter()
            .flatten()
            .find(|candidate| !candidate.is_empty())
            .map(|id| TransactionId(id.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusRequest {
    pub id: TransactionId,
    pub testnet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub status: RemotePaymentStatus,
}

impl PaymentStatusResponse {
    pub fn new(status: impl Into<RemotePaymentStatus>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Status string reported by the payment collaborator.
///
/// Unrecognized values are preserved verbatim so they can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemotePaymentStatus {
    Completed,
    Pending,
    Failed,
    NotFound,
    Other(String),
}

impl RemotePaymentStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether a later query could still report a different outcome.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::NotFound => "not_found",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for RemotePaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "completed" => Self::Completed,
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            "not_found" => Self::NotFound,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for RemotePaymentStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RemotePaymentStatus> for String {
    fn from(value: RemotePaymentStatus) -> Self {
        match value {
            RemotePaymentStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RemotePaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
