use crate::domain::value_objects::ProductId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub success: bool,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CheckoutOutcome {
    pub fn completed(transaction_id: impl Into<String>) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            message: Some(message.into()),
        }
    }
}

/// 決済・ストア購入フロー（プロトコル自体は扱わない）
#[async_trait]
pub trait CheckoutFlow: Send + Sync {
    async fn initiate(&self, product_id: &ProductId) -> Result<CheckoutOutcome, AppError>;
}
