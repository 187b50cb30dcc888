// src/services/notify.rs
//! Outbound email and SMS relays.
//!
//! Both relays are optional. When one is missing the message is logged and the
//! caller is told it was not delivered; there are no retries.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::config::Region;
use aws_sdk_sesv2::types::{Body as SesBody, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::common::config::{SesConfig, TwilioConfig};
use crate::common::helpers::safe_email_log;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email relay failed: {0}")]
    Email(String),

    #[error("SMS provider failed: {0}")]
    Sms(String),
}

#[async_trait]
pub trait EmailRelay: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait SmsRelay: Send + Sync {
    /// Returns the provider's message id
    async fn send(&self, to: &str, body: &str) -> Result<String, NotifyError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Sent { sid: Option<String> },
    LoggedOnly,
}

pub struct SesRelay {
    client: SesClient,
    from_email: String,
}

impl SesRelay {
    /// Credentials come from the default AWS provider chain.
    pub async fn connect(config: &SesConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        Self {
            client: SesClient::new(&sdk_config),
            from_email: config.from_email.clone(),
        }
    }
}

#[async_trait]
impl EmailRelay for SesRelay {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), NotifyError> {
        let destination = Destination::builder().to_addresses(to).build();

        let subject_content = Content::builder()
            .data(subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| NotifyError::Email(format!("Failed to build subject: {}", e)))?;

        let body_content = Content::builder()
            .data(text)
            .charset("UTF-8")
            .build()
            .map_err(|e| NotifyError::Email(format!("Failed to build body: {}", e)))?;

        let message = Message::builder()
            .subject(subject_content)
            .body(SesBody::builder().text(body_content).build())
            .build();

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from_email)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, to = %safe_email_log(to), "Failed to send email via SES");
                NotifyError::Email(e.to_string())
            })?;

        info!(
            to = %safe_email_log(to),
            message_id = ?result.message_id(),
            "Email sent via SES"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

pub struct TwilioRelay {
    http: Client,
    config: TwilioConfig,
}

impl TwilioRelay {
    pub fn new(http: Client, config: TwilioConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl SmsRelay for TwilioRelay {
    async fn send(&self, to: &str, body: &str) -> Result<String, NotifyError> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API, self.config.account_sid
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Sms(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(http_status = %status, body = %detail, "Twilio rejected message");
            return Err(NotifyError::Sms(format!("status {}", status)));
        }

        let message: TwilioMessage = response
            .json()
            .await
            .map_err(|e| NotifyError::Sms(e.to_string()))?;

        info!(sid = %message.sid, "SMS sent via Twilio");
        Ok(message.sid)
    }
}

pub struct NotificationService {
    email: Option<Arc<dyn EmailRelay>>,
    sms: Option<Arc<dyn SmsRelay>>,
}

impl NotificationService {
    pub fn new(email: Option<Arc<dyn EmailRelay>>, sms: Option<Arc<dyn SmsRelay>>) -> Self {
        Self { email, sms }
    }

    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        message: &str,
    ) -> Result<Delivery, NotifyError> {
        match &self.email {
            Some(relay) => {
                relay.send(to, subject, message).await?;
                Ok(Delivery::Sent { sid: None })
            }
            None => {
                info!(to = %safe_email_log(to), subject = %subject, message = %message, "[notify/email] relay not configured, logged only");
                Ok(Delivery::LoggedOnly)
            }
        }
    }

    pub async fn send_sms(&self, to: &str, message: &str) -> Result<Delivery, NotifyError> {
        match &self.sms {
            Some(relay) => {
                let sid = relay.send(to, message).await?;
                Ok(Delivery::Sent { sid: Some(sid) })
            }
            None => {
                info!(to = %to, message = %message, "[notify/sms] provider not configured, logged only");
                Ok(Delivery::LoggedOnly)
            }
        }
    }
}
