use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::gateway::{status_error, GatewayError};
use crate::router::Router;
use crate::wire::{normalize, UpdatePage};

/// Long-poll loop against the platform's update feed.
///
/// Each page advances the marker, and each normalized event is routed on its
/// own task so one slow dialog cannot stall the feed. Poll failures are
/// logged and retried after a short pause; the loop itself never exits.
pub struct UpdatePoller {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    poll_timeout: Duration,
    router: Arc<Router>,
}

const RETRY_PAUSE: Duration = Duration::from_secs(1);

impl UpdatePoller {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        poll_timeout: Duration,
        router: Arc<Router>,
    ) -> Result<Self, GatewayError> {
        // the request timeout must outlast the server-side long-poll hold
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token,
            poll_timeout,
            router,
        })
    }

    pub async fn run(&self) {
        info!(base_url = %self.base_url, "update polling started");
        let mut marker: Option<i64> = None;

        loop {
            match self.poll(marker).await {
                Ok(page) => {
                    if page.marker.is_some() {
                        marker = page.marker;
                    }
                    debug!(updates = page.updates.len(), marker = ?marker, "poll page");
                    for update in page.updates {
                        let Some(event) = normalize(update) else { continue };
                        let router = self.router.clone();
                        tokio::spawn(async move {
                            router.route(event).await;
                        });
                    }
                }
                Err(error) => {
                    warn!(%error, "update poll failed");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
    }

    async fn poll(&self, marker: Option<i64>) -> Result<UpdatePage, GatewayError> {
        let mut request = self
            .http
            .get(format!("{}/updates", self.base_url))
            .query(&[("timeout", self.poll_timeout.as_secs())])
            .header("Authorization", self.token.expose_secret());
        if let Some(marker) = marker {
            request = request.query(&[("marker", marker)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response.json().await?)
    }
}
