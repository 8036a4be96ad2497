use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use crate::domain::EmailAddress;

use super::notifier::{Notification, Notifier, NotifyError};

const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// Delivers notifications through the Postmark templated email API
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: EmailAddress,

    api_send_email_url: Url,
    api_auth_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        sender: EmailAddress,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_send_email_url = api_base_url
            .join("email/withTemplate")
            .context("Failed to create send email endpoint URL")?;

        Ok(Self {
            client,
            sender,
            api_send_email_url,
            api_auth_token,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailClient {
    #[tracing::instrument(
        name = "Send a templated email via API",
        skip(self, notification),
        fields(template = notification.template_id())
    )]
    async fn send(
        &self,
        recipient: &EmailAddress,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        use secrecy::ExposeSecret;

        let body = SendTemplatedEmailRequest {
            from: self.sender.as_ref(),
            to: recipient.as_ref(),
            template_alias: notification.template_id(),
            template_model: notification.context(),
        };

        self.client
            .post(self.api_send_email_url.clone())
            .header(POSTMARK_TOKEN_HEADER, self.api_auth_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendTemplatedEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    template_alias: &'a str,
    template_model: serde_json::Value,
}
