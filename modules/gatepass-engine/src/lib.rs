pub mod chains;
pub mod lifecycle;
pub mod planner;
pub mod queries;
pub mod store;
pub mod templates;

use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use gatepass_common::Result;
use gatepass_notify::{Mailer, OutboundMail};

/// The approval workflow engine. Owns the Postgres pool and the mail backend;
/// handlers receive it by injection and never reach into ambient state.
pub struct ApprovalEngine {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
}

impl ApprovalEngine {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>, public_base_url: String) -> Self {
        Self {
            pool,
            mailer,
            public_base_url,
        }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Dispatch rendered mails after the enclosing transaction has committed.
    /// Each send runs on its own task: a slow or failing relay can neither
    /// extend a lock hold nor surface an error to the caller.
    pub(crate) fn dispatch(&self, mails: Vec<OutboundMail>) {
        for mail in mails {
            let mailer = Arc::clone(&self.mailer);
            tokio::spawn(async move {
                if let Err(e) = mailer.send(&mail).await {
                    warn!(to = %mail.to, error = %e, "Failed to send notification");
                }
            });
        }
    }
}
