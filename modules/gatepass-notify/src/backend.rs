use async_trait::async_trait;

/// A fully rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Pluggable mail delivery backend. Delivery is fire-and-forget from the
/// workflow's perspective: callers log failures and move on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()>;
}
