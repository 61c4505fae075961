use crate::application::ports::{CheckoutFlow, CheckoutOutcome, EntitlementAuthority};
use crate::domain::entities::{ConsumableBalance, SubscriptionRecord};
use crate::domain::value_objects::{ConsumableKind, FeatureId, ProductId};
use crate::shared::config::AuthorityConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// `{ "success": true, "data": … }` でも素のボディでも受け付ける
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
struct BalancePayload {
    super_likes: i64,
    boosts: i64,
    filters: i64,
    photos: i64,
    videos: i64,
    gifts: i64,
}

impl BalancePayload {
    fn into_balance(self) -> Result<ConsumableBalance, AppError> {
        let entries = [
            (ConsumableKind::SuperLike, self.super_likes),
            (ConsumableKind::Boost, self.boosts),
            (ConsumableKind::FilterPass, self.filters),
            (ConsumableKind::PhotoEnhancement, self.photos),
            (ConsumableKind::VideoProfile, self.videos),
            (ConsumableKind::Gift, self.gifts),
        ];

        let mut balance = ConsumableBalance::new();
        for (kind, quantity) in entries {
            let quantity = u32::try_from(quantity).map_err(|_| {
                AppError::MalformedResponse(format!("invalid {} balance: {quantity}", kind))
            })?;
            balance.set(kind, quantity);
        }
        Ok(balance)
    }
}

/// バックエンド API に対するエンタイトルメント権威
pub struct HttpEntitlementAuthority {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpEntitlementAuthority {
    pub fn new(config: &AuthorityConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn request_json<T: DeserializeOwned>(
    builder: reqwest::RequestBuilder,
) -> Result<T, AppError> {
    let response = builder.send().await.map_err(AppError::from)?;
    let status = response.status();
    let body = response.text().await.map_err(AppError::from)?;
    if !status.is_success() {
        return Err(AppError::Network(format!(
            "Entitlement API error ({status}): {body}"
        )));
    }
    serde_json::from_str::<Envelope<T>>(&body)
        .map(Envelope::into_inner)
        .map_err(|err| AppError::MalformedResponse(err.to_string()))
}

async fn request_ack(builder: reqwest::RequestBuilder) -> Result<(), AppError> {
    let response = builder.send().await.map_err(AppError::from)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Network(format!(
            "Entitlement API error ({status}): {body}"
        )));
    }
    Ok(())
}

#[async_trait]
impl EntitlementAuthority for HttpEntitlementAuthority {
    async fn fetch_subscription(&self) -> Result<SubscriptionRecord, AppError> {
        request_json(self.request(Method::GET, "/premium/status")).await
    }

    async fn fetch_balance(&self) -> Result<ConsumableBalance, AppError> {
        let payload: BalancePayload =
            request_json(self.request(Method::GET, "/iap/balance")).await?;
        payload.into_balance()
    }

    async fn report_consumption(
        &self,
        kind: ConsumableKind,
        quantity: u32,
    ) -> Result<(), AppError> {
        let builder = self
            .request(Method::POST, "/iap/use-item")
            .json(&json!({ "type": kind.item_type(), "quantity": quantity }));
        request_ack(builder).await
    }

    async fn cancel_subscription(&self) -> Result<(), AppError> {
        request_ack(self.request(Method::POST, "/premium/cancel")).await
    }

    async fn track_usage(&self, feature: FeatureId, at: DateTime<Utc>) -> Result<(), AppError> {
        let builder = self
            .request(Method::POST, "/premium/track-usage")
            .json(&json!({ "feature": feature.as_str(), "timestamp": at.to_rfc3339() }));
        request_ack(builder).await
    }
}

#[async_trait]
impl CheckoutFlow for HttpEntitlementAuthority {
    async fn initiate(&self, product_id: &ProductId) -> Result<CheckoutOutcome, AppError> {
        let builder = self
            .request(Method::POST, "/iap/process-purchase")
            .json(&json!({ "productId": product_id.as_str() }));
        request_json(builder).await
    }
}
