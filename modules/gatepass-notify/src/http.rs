use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::backend::{Mailer, OutboundMail};

/// Mail-relay backend: posts the rendered message as JSON to an HTTP relay
/// endpoint. The request carries its own timeout so a stalled relay can never
/// hold up a caller for long.
pub struct HttpMailer {
    endpoint: String,
    token: Option<String>,
    from: String,
    http: reqwest::Client,
}

impl HttpMailer {
    pub fn new(endpoint: String, token: Option<String>, from: String) -> Self {
        Self {
            endpoint,
            token,
            from,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client"),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
        let payload = json!({
            "from": self.from,
            "to": mail.to,
            "subject": mail.subject,
            "text": mail.body,
        });

        let mut req = self.http.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Mail relay returned non-success");
            anyhow::bail!("mail relay returned {status}");
        }

        Ok(())
    }
}
