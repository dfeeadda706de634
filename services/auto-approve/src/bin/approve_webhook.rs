//! Auto-Approve Webhook Service
//!
//! Listens for GitHub `pull_request_target` deliveries and approves PRs that
//! carry the `auto-approve` label.
//!
//! ## Usage
//! ```bash
//! GITHUB_APP_ID=123456 \
//! GITHUB_PRIVATE_KEY_PATH=./key.pem \
//! GITHUB_TOKEN=<WORKFLOW_TOKEN> \
//! GITHUB_WEBHOOK_SECRET=<SECRET> \
//! approve-webhook --bind 0.0.0.0:3000
//! ```

use anyhow::{Context, Result};
use auto_approve::approver::AutoApprover;
use auto_approve::auth::AppTokenIssuer;
use auto_approve::config::Settings;
use auto_approve::review::ReviewClient;
use auto_approve::server::{router, AppState};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();
    init_tracing(settings.log_json);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let reviews = ReviewClient::new(http.clone(), &settings.api_url);
    let mut approver = AutoApprover::new(settings.policy(), Arc::new(reviews))
        .with_message(&settings.review_message);

    match settings.app_credentials()? {
        Some(credentials) => {
            info!(app_id = %credentials.app_id, "GitHub App credentials loaded");
            approver = approver.with_issuer(Arc::new(AppTokenIssuer::new(
                http.clone(),
                &settings.api_url,
                credentials,
            )));
        }
        None => warn!("GitHub App credentials missing; maintainer approvals will fail."),
    }

    match &settings.workflow_token {
        Some(token) => approver = approver.with_workflow_token(token),
        None => warn!("GITHUB_TOKEN not set; maintenance bot approvals will fail."),
    }

    if settings.webhook_secret.is_none() {
        warn!("GITHUB_WEBHOOK_SECRET not set; signature verification disabled.");
    }

    let state = AppState {
        webhook_secret: settings
            .webhook_secret
            .as_ref()
            .map(|secret| secret.as_bytes().to_vec()),
        approver: Arc::new(approver),
    };

    info!(
        label = %settings.label,
        bot_login = %settings.bot_login,
        "approve-webhook listening on {}",
        settings.bind
    );
    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
