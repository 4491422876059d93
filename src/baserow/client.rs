use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    baserow::types::{MemberRecord, RowPage},
    config::BaserowConfig,
    error::{RenewalError, Result},
};

const SERVICE: &str = "Baserow";

/// Membership database: full listing plus per-row partial updates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn fetch_members(&self) -> Result<Vec<MemberRecord>>;

    async fn update_member(&self, member: &MemberRecord) -> Result<()>;
}

pub struct BaserowClient {
    http: reqwest::Client,
    config: BaserowConfig,
}

impl BaserowClient {
    pub fn new(http: reqwest::Client, config: BaserowConfig) -> Self {
        Self { http, config }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/api/database/rows/table/{}/",
            self.config.api_url.trim_end_matches('/'),
            self.config.member_table_id
        )
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.api_token)
    }

    async fn fetch_page(&self, url: &str) -> Result<RowPage> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
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
impl MemberStore for BaserowClient {
    /// Follow the `next` links until the listing is exhausted
    async fn fetch_members(&self) -> Result<Vec<MemberRecord>> {
        info!("Fetching members from table {}", self.config.member_table_id);

        let mut members = Vec::new();
        let mut next = Some(format!("{}?user_field_names=true", self.table_url()));

        while let Some(url) = next.take() {
            let page = self.fetch_page(&url).await?;
            members.extend(page.results.iter().map(MemberRecord::from_row));

            next = page.next.filter(|url| !url.is_empty());
            if let Some(url) = &next {
                debug!("Fetching next page of members: {}", url);
            }
        }

        info!("Fetched {} members", members.len());
        Ok(members)
    }

    async fn update_member(&self, member: &MemberRecord) -> Result<()> {
        debug!("Updating member {} ({})", member.id, member.email);

        let url = format!("{}{}/?user_field_names=true", self.table_url(), member.id);
        let response = self
            .http
            .patch(url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&member.to_update())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenewalError::from_response(SERVICE, response).await);
        }

        info!("Updated member {} ({})", member.id, member.email);
        Ok(())
    }
}
