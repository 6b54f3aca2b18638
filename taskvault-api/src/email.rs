/// Account lifecycle emails
///
/// Fire-and-forget dispatch to a SendGrid-style JSON endpoint. Sends never
/// block the response: each one runs in a spawned task, and a failure is
/// logged and dropped rather than surfaced to the caller. The API key and
/// sender address are injected once at startup via [`Mailer::new`]; with
/// no mail configuration the mailer is a no-op.

use crate::config::MailConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outbound mail dispatcher held in application state
#[derive(Clone)]
pub struct Mailer {
    inner: Option<Arc<MailerInner>>,
}

struct MailerInner {
    client: reqwest::Client,
    config: MailConfig,
}

impl Mailer {
    /// Creates a mailer from optional configuration
    ///
    /// `None` yields a disabled mailer that only logs at debug level.
    pub fn new(config: Option<MailConfig>) -> Self {
        let inner = config.map(|config| {
            Arc::new(MailerInner {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()
                    .unwrap_or_default(),
                config,
            })
        });

        Self { inner }
    }

    /// Whether email dispatch is configured
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Sends the welcome email after signup
    pub fn send_welcome(&self, email: &str, name: &str) {
        self.dispatch(
            email,
            "Thanks for joining in!",
            format!(
                "Welcome to the app, {}. Let me know how you get along with the app.",
                name
            ),
        );
    }

    /// Sends the goodbye email after account deletion
    pub fn send_goodbye(&self, email: &str, name: &str) {
        self.dispatch(
            email,
            "Sorry to see you go",
            format!("Goodbye, {}. I hope to see you back sometime soon.", name),
        );
    }

    /// Spawns the actual send; never blocks, never propagates failure
    fn dispatch(&self, to: &str, subject: &str, body: String) {
        let Some(inner) = self.inner.clone() else {
            debug!(to, subject, "Mail dispatch disabled, skipping email");
            return;
        };

        let to = to.to_string();
        let subject = subject.to_string();

        tokio::spawn(async move {
            let payload = json!({
                "personalizations": [{ "to": [{ "email": to }] }],
                "from": { "email": inner.config.from },
                "subject": subject,
                "content": [{ "type": "text/plain", "value": body }],
            });

            let result = inner
                .client
                .post(&inner.config.api_url)
                .bearer_auth(&inner.config.api_key)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(to, subject, "Email dispatched");
                }
                Ok(response) => {
                    warn!(
                        to,
                        subject,
                        status = %response.status(),
                        "Mail service rejected email"
                    );
                }
                Err(e) => {
                    warn!(to, subject, error = %e, "Failed to dispatch email");
                }
            }
        });
    }
}
