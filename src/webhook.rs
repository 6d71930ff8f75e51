//! Webhook dispatch joined to the unit of work.
//!
//! Hooks are posted from a background thread after the transaction commits,
//! otherwise the handler could run before the data it refers to is visible.
//! The price is that the caller never sees whether the post was enqueued.

use reqwest::Url;
use std::sync::Arc;

use crate::config::Settings;
use crate::dispatcher::{call_in_background, DeferredCall};
use crate::hooks::CommitHooks;
use crate::{TransactionError, TransactionResult};

pub const HOOKS_API_KEY_HEADER: &str = "HOOKS_API_KEY";
pub const TORQUE_API_KEY_HEADER: &str = "TORQUE_API_KEY";
pub const TORQUE_PASSTHROUGH_HOOKS_API_KEY_HEADER: &str = "TORQUE-PASSTHROUGH-HOOKS_API_KEY";

/// A fully resolved POST to send.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Sends webhook requests. Called from a background thread.
pub trait WebhookPoster: Send + Sync + 'static {
    /// Send `request`; a failed delivery is returned as an error.
    fn post(&self, request: WebhookRequest) -> TransactionResult<()>;
}

/// Posts with a blocking reqwest client; non-2xx responses are errors.
#[derive(Debug, Clone)]
pub struct ReqwestPoster {
    client: reqwest::blocking::Client,
}

impl ReqwestPoster {
    /// Build a poster with a default blocking client.
    pub fn new() -> TransactionResult<Self> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self { client })
    }
}

impl WebhookPoster for ReqwestPoster {
    fn post(&self, request: WebhookRequest) -> TransactionResult<()> {
        let mut builder = self.client.post(request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder.send()?.error_for_status()?;
        Ok(())
    }
}

/// State of a dispatched hook as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Joined to the transaction (or suppressed); delivery is not observed.
    Dispatched,
}

/// Where a hook was dispatched to.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub hook_path: String,
    pub status: DispatchStatus,
    pub url: Url,
}

/// Resolves webhook URLs from [`Settings`] and posts them after commit.
pub struct WebhookDispatcher<P: WebhookPoster> {
    settings: Arc<Settings>,
    application_url: Url,
    poster: Arc<P>,
}

impl<P: WebhookPoster> WebhookDispatcher<P> {
    /// Create a dispatcher. `application_url` resolves relative webhook bases.
    pub fn new(settings: Arc<Settings>, application_url: Url, poster: Arc<P>) -> Self {
        Self {
            settings,
            application_url,
            poster,
        }
    }

    /// Resolve `hook_path` against the configured webhook base.
    pub fn hook_url(&self, hook_path: &str) -> TransactionResult<Url> {
        let webhooks = self
            .settings
            .webhooks
            .as_ref()
            .ok_or_else(|| TransactionError::Configuration("webhooks.url is not set".into()))?;

        if webhooks.url.contains("://") {
            let base = parse_url(&webhooks.url)?;
            return join_url(&base, hook_path);
        }

        let path = if hook_path.starts_with('/') || webhooks.url.is_empty() {
            hook_path.to_string()
        } else {
            format!("{}/{}", webhooks.url.trim_end_matches('/'), hook_path)
        };
        join_url(&self.application_url, &path)
    }

    /// Build the request for `hook_path` and post it in the background once
    /// `tx` commits.
    pub fn dispatch<T>(&self, tx: &T, hook_path: &str, body: Option<String>) -> TransactionResult<Dispatched>
    where
        T: CommitHooks + ?Sized,
    {
        self.dispatch_with_headers(tx, hook_path, body, Vec::new())
    }

    /// Like [`dispatch`](Self::dispatch), sending `headers` along with the
    /// API-key headers. An API-key header replaces a caller header of the
    /// same name.
    pub fn dispatch_with_headers<T>(
        &self,
        tx: &T,
        hook_path: &str,
        body: Option<String>,
        headers: Vec<(String, String)>,
    ) -> TransactionResult<Dispatched>
    where
        T: CommitHooks + ?Sized,
    {
        let request = self.build_request(hook_path, body, headers)?;
        let url = request.url.clone();

        if self.settings.suppress_dispatch {
            tracing::debug!(%url, hook_path, "webhook dispatch suppressed");
        } else {
            let poster = Arc::clone(&self.poster);
            let call = DeferredCall::new(move || poster.post(request))
                .labelled(format!("webhook {hook_path}"));
            call_in_background(tx, call);
        }

        Ok(Dispatched {
            hook_path: hook_path.to_string(),
            status: DispatchStatus::Dispatched,
            url,
        })
    }

    fn build_request(
        &self,
        hook_path: &str,
        body: Option<String>,
        mut headers: Vec<(String, String)>,
    ) -> TransactionResult<WebhookRequest> {
        let hook_url = self.hook_url(hook_path)?;
        let hooks_api_key = self.settings.webhooks.as_ref().and_then(|w| w.api_key.clone());

        // Development posts straight to the handler.
        if self.settings.is_development() {
            if let Some(key) = hooks_api_key {
                set_header(&mut headers, HOOKS_API_KEY_HEADER, key);
            }
            return Ok(WebhookRequest {
                url: hook_url,
                headers,
                body,
            });
        }

        let torque = self
            .settings
            .torque
            .as_ref()
            .ok_or_else(|| TransactionError::Configuration("torque.url is not set".into()))?;
        let mut url = parse_url(&torque.url)?;
        url.query_pairs_mut().append_pair("url", hook_url.as_str());

        if let Some(key) = &torque.api_key {
            set_header(&mut headers, TORQUE_API_KEY_HEADER, key.clone());
        }
        if let Some(key) = hooks_api_key {
            set_header(&mut headers, TORQUE_PASSTHROUGH_HOOKS_API_KEY_HEADER, key);
        }

        Ok(WebhookRequest { url, headers, body })
    }
}

/// Header names are case-insensitive.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value));
}

fn parse_url(raw: &str) -> TransactionResult<Url> {
    Url::parse(raw).map_err(|e| TransactionError::Configuration(format!("invalid url {raw:?}: {e}")))
}

fn join_url(base: &Url, reference: &str) -> TransactionResult<Url> {
    base.join(reference)
        .map_err(|e| TransactionError::Configuration(format!("cannot join {reference:?} onto {base}: {e}")))
}
