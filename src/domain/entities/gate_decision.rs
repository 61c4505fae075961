use crate::domain::value_objects::{ConsumableKind, Limit, Remaining};
use serde::{Deserialize, Serialize};

pub const UNVERIFIABLE_REASON: &str = "unable to verify access";

/// 1 回の判定の到達状態（IDLE → CHECKING → いずれか）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Allowed,
    Denied,
    ErrorDefaultDenied,
}

/// 許可の根拠
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum AccessGrant {
    Plan,
    Consumable { kind: ConsumableKind, balance: u32 },
}

/// 機能利用可否の判定結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub can_use: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<Remaining>,
    pub upgrade_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<AccessGrant>,
    pub outcome: DecisionOutcome,
}

impl GateDecision {
    pub fn allowed(limit: Limit, remaining: Option<Remaining>, granted_by: AccessGrant) -> Self {
        Self {
            can_use: true,
            limit: Some(limit),
            remaining,
            upgrade_required: false,
            reason: None,
            granted_by: Some(granted_by),
            outcome: DecisionOutcome::Allowed,
        }
    }

    pub fn denied(limit: Limit, remaining: Option<Remaining>, reason: String) -> Self {
        Self {
            can_use: false,
            limit: Some(limit),
            remaining,
            upgrade_required: true,
            reason: Some(reason),
            granted_by: None,
            outcome: DecisionOutcome::Denied,
        }
    }

    /// 検証できなかった場合の既定拒否（フェイルクローズ）
    pub fn fail_closed() -> Self {
        Self {
            can_use: false,
            limit: None,
            remaining: None,
            upgrade_required: true,
            reason: Some(UNVERIFIABLE_REASON.to_string()),
            granted_by: None,
            outcome: DecisionOutcome::ErrorDefaultDenied,
        }
    }

    pub fn is_granted_by_plan(&self) -> bool {
        matches!(self.granted_by, Some(AccessGrant::Plan))
    }
}
