use async_trait::async_trait;

use crate::backend::{Mailer, OutboundMail};

/// No-op mail backend for tests and mail-less deployments.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, _mail: &OutboundMail) -> anyhow::Result<()> {
        Ok(())
    }
}
