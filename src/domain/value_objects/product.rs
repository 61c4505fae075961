use super::consumable::ConsumableKind;
use serde::{Deserialize, Serialize};
use std::fmt;

const IOS_BUNDLE_PREFIX: &str = "com.pawfectmatch.iap.";
const ANDROID_PREFIX: &str = "iap_";
const SUBSCRIPTION_PREFIX: &str = "premium.";

/// ストアの商品 ID（iOS / Android どちらの形式も受け付ける）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

/// 商品購入で付与される消費型アイテム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductGrant {
    pub kind: ConsumableKind,
    pub quantity: u32,
}

impl ProductId {
    pub fn new(value: String) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("Product ID cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// プラットフォーム固有の接頭辞を取り除いた ID
    pub fn normalized(&self) -> String {
        let id = self.0.to_ascii_lowercase();
        let id = id.strip_prefix(IOS_BUNDLE_PREFIX).unwrap_or(&id);
        let id = id.strip_prefix(ANDROID_PREFIX).unwrap_or(id);
        let id = id.strip_prefix(SUBSCRIPTION_PREFIX).unwrap_or(id);
        id.to_string()
    }

    /// 商品 ID から付与内容を解決する。未知の商品は `None`。
    pub fn grant(&self) -> Option<ProductGrant> {
        let normalized = self.normalized();
        exact_grant(&normalized).or_else(|| pattern_grant(&normalized))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn exact_grant(normalized: &str) -> Option<ProductGrant> {
    // `.` 区切りと `_` 区切りは同一商品
    let key = normalized.replace('_', ".");
    let (kind, quantity) = match key.as_str() {
        "superlike.single" => (ConsumableKind::SuperLike, 1),
        "superlike.pack10" => (ConsumableKind::SuperLike, 10),
        "boost.30min" => (ConsumableKind::Boost, 1),
        "filters.monthly" => (ConsumableKind::FilterPass, 1),
        "photo.enhanced" => (ConsumableKind::PhotoEnhancement, 1),
        "video.profile" => (ConsumableKind::VideoProfile, 1),
        "gift.treat" | "gift.toy" | "gift.premium" => (ConsumableKind::Gift, 1),
        _ => return None,
    };
    Some(ProductGrant { kind, quantity })
}

fn pattern_grant(normalized: &str) -> Option<ProductGrant> {
    let grant = |kind, quantity| Some(ProductGrant { kind, quantity });

    if normalized.contains("superlike") {
        if normalized.contains("pack10") || normalized.contains("pack_10") || normalized.contains("10")
        {
            return grant(ConsumableKind::SuperLike, 10);
        }
        return grant(ConsumableKind::SuperLike, 1);
    }
    if normalized.contains("boost") {
        return grant(ConsumableKind::Boost, 1);
    }
    if normalized.contains("filter") {
        return grant(ConsumableKind::FilterPass, 1);
    }
    if normalized.contains("photo") || normalized.contains("enhanced") {
        return grant(ConsumableKind::PhotoEnhancement, 1);
    }
    if normalized.contains("video") {
        return grant(ConsumableKind::VideoProfile, 1);
    }
    if normalized.contains("gift") {
        return grant(ConsumableKind::Gift, 1);
    }
    None
}
