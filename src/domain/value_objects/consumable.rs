use serde::{Deserialize, Serialize};
use std::fmt;

/// 単品購入できる消費型アイテムの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsumableKind {
    SuperLike,
    Boost,
    FilterPass,
    PhotoEnhancement,
    VideoProfile,
    Gift,
}

impl ConsumableKind {
    pub const ALL: [ConsumableKind; 6] = [
        ConsumableKind::SuperLike,
        ConsumableKind::Boost,
        ConsumableKind::FilterPass,
        ConsumableKind::PhotoEnhancement,
        ConsumableKind::VideoProfile,
        ConsumableKind::Gift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumableKind::SuperLike => "superLike",
            ConsumableKind::Boost => "boost",
            ConsumableKind::FilterPass => "filterPass",
            ConsumableKind::PhotoEnhancement => "photoEnhancement",
            ConsumableKind::VideoProfile => "videoProfile",
            ConsumableKind::Gift => "gift",
        }
    }

    /// `use-item` エンドポイントが受け付ける item type
    pub fn item_type(&self) -> &'static str {
        match self {
            ConsumableKind::SuperLike => "superlike",
            ConsumableKind::Boost => "boost",
            ConsumableKind::FilterPass => "filter",
            ConsumableKind::PhotoEnhancement => "photo",
            ConsumableKind::VideoProfile => "video",
            ConsumableKind::Gift => "gift",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConsumableKind::SuperLike => "super like",
            ConsumableKind::Boost => "boost",
            ConsumableKind::FilterPass => "filter pass",
            ConsumableKind::PhotoEnhancement => "photo enhancement",
            ConsumableKind::VideoProfile => "video profile",
            ConsumableKind::Gift => "gift",
        }
    }
}

impl fmt::Display for ConsumableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
