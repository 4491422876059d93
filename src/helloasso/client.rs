use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    config::HelloAssoConfig,
    error::{RenewalError, Result},
    helloasso::types::{PaymentPage, PaymentRecord, TokenResponse},
};

const SERVICE: &str = "HelloAsso";

/// Source of raw payment records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentSource: Send + Sync {
    async fn fetch_payments(&self) -> Result<Vec<PaymentRecord>>;
}

pub struct HelloAssoClient {
    http: reqwest::Client,
    config: HelloAssoConfig,
}

impl HelloAssoClient {
    pub fn new(http: reqwest::Client, config: HelloAssoConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Exchange the client credentials for a bearer token
    pub async fn get_access_token(&self) -> Result<String> {
        debug!("Requesting HelloAsso OAuth token");

        let response = self
            .http
            .post(self.url("/oauth2/token"))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenewalError::from_response(SERVICE, response).await);
        }

        let token: TokenResponse = response.json().await?;
        debug!("OAuth token obtained (expires in {}s)", token.expires_in);
        Ok(token.access_token)
    }

    /// Fetch one page of payments; pages are 1-based
    pub async fn fetch_page(&self, token: &str, page_index: u32) -> Result<PaymentPage> {
        let page_size = self.config.page_size.to_string();
        let page_index = page_index.to_string();
        let url = self.url(&format!("/v5/organizations/{}/payments", self.config.org_slug));

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("pageSize", page_size.as_str()),
                ("from", self.config.from_date.as_str()),
                ("pageIndex", page_index.as_str()),
                ("states", "Authorized"),
                ("states", "Registered"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenewalError::from_response(SERVICE, response).await);
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PaymentSource for HelloAssoClient {
    /// Walk every page until the API returns an empty one
    async fn fetch_payments(&self) -> Result<Vec<PaymentRecord>> {
        let token = self.get_access_token().await?;

        info!(
            "Fetching payments for organization {} from {}",
            self.config.org_slug, self.config.from_date
        );

        let mut payments = Vec::new();
        let mut page_index = 1u32;

        loop {
            let page = self.fetch_page(&token, page_index).await?;
            let count = page.data.len();

            if count == 0 {
                break;
            }

            payments.extend(page.data.into_iter().map(PaymentRecord::from));
            debug!("Page {}: {} payments (total {})", page_index, count, payments.len());

            page_index += 1;
        }

        info!("Fetched {} payments", payments.len());
        Ok(payments)
    }
}
