use moka::future::Cache;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::AppError;
use crate::provider_models::*;

/// Page size used when draining a transaction listing.
const TRANSACTIONS_PAGE_SIZE: u32 = 500;

/// The provider's API keys are short-lived (2h); refresh well before expiry.
const API_KEY_TTL: Duration = Duration::from_secs(90 * 60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    api_key: String,
}

/// Client for the Pluggy open-finance API.
///
/// Authenticates by exchanging the client id/secret pair for a short-lived
/// API key at `/auth`; the key is cached and refreshed transparently.
/// Constructed once in `main` and shared through `AppState`.
#[derive(Clone)]
pub struct PluggyClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    api_key_cache: Cache<&'static str, String>,
}

/// Optional filters for the transaction listing endpoint.
#[derive(Debug, Default, Clone)]
pub struct TransactionFilters {
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PluggyClient {
    /// Fails fast with a configuration error when either credential is empty.
    pub fn new(
        base_url: String,
        client_id: String,
        client_secret: String,
    ) -> Result<Self, AppError> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(AppError::Configuration(
                "Pluggy client id and secret are required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApi(format!("Failed to create Pluggy client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            client_id,
            client_secret,
            api_key_cache: Cache::builder()
                .time_to_live(API_KEY_TTL)
                .max_capacity(1)
                .build(),
        })
    }

    /// Exchange the credential pair for an API key.
    async fn authenticate(&self) -> Result<String, AppError> {
        let url = format!("{}/auth", self.base_url);
        tracing::debug!("Authenticating against Pluggy: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "clientId": self.client_id,
                "clientSecret": self.client_secret,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Pluggy auth request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi(format!(
                "Pluggy auth returned {}: {}",
                status, error_text
            )));
        }

        let auth: AuthResponse = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse Pluggy auth response: {}", e))
        })?;

        Ok(auth.api_key)
    }

    /// Cached API key with single-flight refresh.
    async fn api_key(&self) -> Result<String, AppError> {
        self.api_key_cache
            .try_get_with("api-key", self.authenticate())
            .await
            .map_err(|e| AppError::ExternalApi(format!("Pluggy authentication failed: {}", e)))
    }

    /// GET a provider URL, decoding the JSON body.
    ///
    /// A 401/403 invalidates the cached key and retries once with a fresh
    /// one. A 404 surfaces as `AppError::NotFound` so callers can decide
    /// whether it means "empty result".
    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, AppError> {
        let mut api_key = self.api_key().await?;

        for attempt in 0..2 {
            let response = self
                .client
                .get(url.clone())
                .header("X-API-KEY", &api_key)
                .send()
                .await
                .map_err(|e| AppError::ExternalApi(format!("Pluggy request failed: {}", e)))?;

            let status = response.status();

            if (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
                && attempt == 0
            {
                tracing::debug!("Pluggy API key rejected, re-authenticating");
                self.api_key_cache.invalidate("api-key").await;
                api_key = self.api_key().await?;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(AppError::NotFound(format!(
                    "Pluggy resource not found: {}",
                    url.path()
                )));
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AppError::ExternalApi(format!(
                    "Pluggy returned {}: {}",
                    status, error_text
                )));
            }

            return response.json().await.map_err(|e| {
                AppError::ExternalApi(format!("Failed to parse Pluggy response: {}", e))
            });
        }

        Err(AppError::ExternalApi(
            "Pluggy rejected the API key after re-authentication".to_string(),
        ))
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Url, AppError> {
        reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
            .map_err(|e| AppError::ExternalApi(format!("Failed to build URL: {}", e)))
    }

    pub async fn fetch_item(&self, item_id: &str) -> Result<ProviderItem, AppError> {
        tracing::info!("Fetching item {} from Pluggy", item_id);
        let url = self.url(&format!("/items/{}", item_id), &[])?;
        self.get_json(url).await
    }

    /// Accounts under an item; a 404 means the item has none to sync.
    pub async fn fetch_accounts(&self, item_id: &str) -> Result<Vec<ProviderAccount>, AppError> {
        let url = self.url("/accounts", &[("itemId", item_id.to_string())])?;
        match self.get_json::<PageResponse<ProviderAccount>>(url).await {
            Ok(page) => Ok(page.results),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_transactions(
        &self,
        account_id: &str,
        filters: &TransactionFilters,
    ) -> Result<PageResponse<ProviderTransaction>, AppError> {
        let mut params = vec![("accountId", account_id.to_string())];
        if let Some(ref from) = filters.from {
            params.push(("from", from.clone()));
        }
        if let Some(ref to) = filters.to {
            params.push(("to", to.clone()));
        }
        if let Some(page) = filters.page {
            params.push(("page", page.to_string()));
        }
        if let Some(page_size) = filters.page_size {
            params.push(("pageSize", page_size.to_string()));
        }

        let url = self.url("/transactions", &params)?;
        self.get_json(url).await
    }

    /// Drain every page of an account's transaction listing.
    pub async fn fetch_all_transactions(
        &self,
        account_id: &str,
    ) -> Result<Vec<ProviderTransaction>, AppError> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let filters = TransactionFilters {
                page: Some(page),
                page_size: Some(TRANSACTIONS_PAGE_SIZE),
                ..Default::default()
            };
            let response = self.fetch_transactions(account_id, &filters).await?;

            let total_pages = response.total_pages.unwrap_or(1);
            let batch_len = response.results.len();
            all.extend(response.results);

            if batch_len == 0 || page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            "Fetched {} transaction(s) for account {}",
            all.len(),
            account_id
        );
        Ok(all)
    }

    pub async fn fetch_credit_card_bills(
        &self,
        account_id: &str,
    ) -> Result<Vec<ProviderCreditCardBill>, AppError> {
        let url = self.url("/bills", &[("accountId", account_id.to_string())])?;
        match self
            .get_json::<PageResponse<ProviderCreditCardBill>>(url)
            .await
        {
            Ok(page) => Ok(page.results),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Identity is optional per item: a 404 means the product is not enabled.
    pub async fn fetch_identity_by_item(
        &self,
        item_id: &str,
    ) -> Result<Option<ProviderIdentity>, AppError> {
        let url = self.url("/identity", &[("itemId", item_id.to_string())])?;
        match self.get_json::<ProviderIdentity>(url).await {
            Ok(identity) => Ok(Some(identity)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_investments(
        &self,
        item_id: &str,
    ) -> Result<Vec<ProviderInvestment>, AppError> {
        let url = self.url("/investments", &[("itemId", item_id.to_string())])?;
        match self.get_json::<PageResponse<ProviderInvestment>>(url).await {
            Ok(page) => Ok(page.results),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_investment_transactions(
        &self,
        investment_id: &str,
    ) -> Result<Vec<ProviderInvestmentTransaction>, AppError> {
        let url = self.url(&format!("/investments/{}/transactions", investment_id), &[])?;
        match self
            .get_json::<PageResponse<ProviderInvestmentTransaction>>(url)
            .await
        {
            Ok(page) => Ok(page.results),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_loans(&self, item_id: &str) -> Result<Vec<ProviderLoan>, AppError> {
        let url = self.url("/loans", &[("itemId", item_id.to_string())])?;
        match self.get_json::<PageResponse<ProviderLoan>>(url).await {
            Ok(page) => Ok(page.results),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
