// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signing Key Refresher
//!
//! Background task that refetches the issuer's JWKS on a fixed interval so
//! key rotations are picked up before the cache TTL runs out and request
//! paths rarely pay for a fetch.
//!
//! A failed refresh is logged and the previous key set stays in place.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::jwks::JwksManager;

/// Default interval between refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Periodic JWKS refresher.
pub struct KeySetRefresher {
    jwks: Arc<JwksManager>,
    interval: Duration,
}

impl KeySetRefresher {
    pub fn new(jwks: Arc<JwksManager>) -> Self {
        Self {
            jwks,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the refresh loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            url = %self.jwks.jwks_url(),
            "Signing key refresher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Signing key refresher shutting down");
                return;
            }

            self.refresh_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Signing key refresher shutting down");
                    return;
                }
            }
        }
    }

    async fn refresh_step(&self) {
        if let Err(e) = self.jwks.refresh().await {
            warn!(error = %e, "Signing key refresh failed, keeping previous keys");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::DEFAULT_FETCH_TIMEOUT;

    #[tokio::test]
    async fn stops_when_cancelled() {
        let jwks = Arc::new(
            JwksManager::new("http://127.0.0.1:9/.well-known/jwks.json", DEFAULT_FETCH_TIMEOUT)
                .unwrap(),
        );
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let refresher = KeySetRefresher::new(jwks).with_interval(Duration::from_secs(3600));
        tokio::time::timeout(Duration::from_secs(5), refresher.run(shutdown))
            .await
            .expect("refresher should exit after cancellation");
    }
}
