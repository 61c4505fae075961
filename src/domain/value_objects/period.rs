use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 利用回数カウンタの集計期間
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    Daily,
    Monthly,
}

impl UsagePeriod {
    pub fn label(&self) -> &'static str {
        match self {
            UsagePeriod::Daily => "today",
            UsagePeriod::Monthly => "this month",
        }
    }
}

/// 期間を識別するキー（UTC の暦に基づく）
///
/// 日次は `2026-10-19`、月次は `2026-10`。
/// キーが変われば前期間のカウントは引き継がない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn for_instant(period: UsagePeriod, at: DateTime<Utc>) -> Self {
        let key = match period {
            UsagePeriod::Daily => at.format("%Y-%m-%d").to_string(),
            UsagePeriod::Monthly => at.format("%Y-%m").to_string(),
        };
        Self(key)
    }

    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Period key cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
