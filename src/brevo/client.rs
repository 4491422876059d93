use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::{
    config::BrevoConfig,
    error::{RenewalError, Result},
};

const SERVICE: &str = "Brevo";

/// A single transactional email to one recipient
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_content: String,
    pub text_content: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
    name: &'a str,
    email: &'a str,
}

pub struct BrevoClient {
    http: reqwest::Client,
    config: BrevoConfig,
}

impl BrevoClient {
    pub fn new(http: reqwest::Client, config: BrevoConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl EmailSender for BrevoClient {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!("Sending email to {}", message.to_email);

        let request = SendEmailRequest {
            sender: Contact {
                name: &self.config.sender_name,
                email: &self.config.sender_email,
            },
            to: vec![Contact {
                name: &message.to_name,
                email: &message.to_email,
            }],
            subject: &message.subject,
            html_content: &message.html_content,
            text_content: &message.text_content,
        };

        let response = self
            .http
            .post(format!("{}/v3/smtp/email", self.config.api_url.trim_end_matches('/')))
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenewalError::from_response(SERVICE, response).await);
        }

        info!("Email sent to {}", message.to_email);
        Ok(())
    }
}
