//! Service configuration
//!
//! Every option can be passed as a flag or through the environment, so the
//! service runs unchanged in a container or a workflow step.

use base64::{engine::general_purpose, Engine as _};
use clap::Parser;
use std::fs;
use tracing::warn;

use crate::approver::DEFAULT_REVIEW_MESSAGE;
use crate::auth::AppCredentials;
use crate::error::{ApproveError, Result};
use crate::policy::{ApprovalPolicy, AUTO_APPROVE_LABEL, MAINTENANCE_BOT_LOGIN};

/// Auto-approve webhook service
#[derive(Parser, Debug, Clone)]
#[command(name = "approve-webhook")]
#[command(about = "Approve labeled GitHub pull requests on webhook delivery")]
#[command(version)]
pub struct Settings {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Secret used to verify `X-Hub-Signature-256`
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: Option<String>,

    /// GitHub App Installation ID (looked up per repository if unset)
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    pub installation_id: Option<u64>,

    /// GitHub App private key (PEM)
    #[arg(long, env = "GITHUB_APP_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// GitHub App private key (base64-encoded PEM)
    #[arg(long, env = "GITHUB_APP_PRIVATE_KEY_B64", hide_env_values = true)]
    pub private_key_b64: Option<String>,

    /// Path to the private key PEM file
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    pub private_key_path: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub api_url: String,

    /// Ambient workflow token, used for PRs opened by the maintenance bot
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub workflow_token: Option<String>,

    /// Review body
    #[arg(long, default_value = DEFAULT_REVIEW_MESSAGE)]
    pub review_message: String,

    /// Label that opts a PR into auto-approval
    #[arg(long, default_value = AUTO_APPROVE_LABEL)]
    pub label: String,

    /// Login of the maintenance bot whose PRs use the workflow token
    #[arg(long, default_value = MAINTENANCE_BOT_LOGIN)]
    pub bot_login: String,

    /// Emit logs as JSON (`LOG_JSON=1`, `true`, `yes`, ...)
    #[arg(long, env = "LOG_JSON", value_parser = clap::builder::FalseyValueParser::new())]
    pub log_json: bool,
}

impl Settings {
    pub fn policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::default()
            .label(&self.label)
            .maintenance_bot(&self.bot_login)
    }

    /// Resolve the private key. Inline PEM wins over base64, base64 over file.
    pub fn private_key(&self) -> Result<Option<Vec<u8>>> {
        if let Some(pem) = &self.private_key {
            return Ok(Some(pem.clone().into_bytes()));
        }
        if let Some(encoded) = &self.private_key_b64 {
            let decoded = general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| ApproveError::Config(format!("Invalid base64 private key: {}", e)))?;
            return Ok(Some(decoded));
        }
        if let Some(path) = &self.private_key_path {
            let key = fs::read(path).map_err(|e| {
                ApproveError::Config(format!("Failed to read private key {}: {}", path, e))
            })?;
            return Ok(Some(key));
        }
        Ok(None)
    }

    /// App credentials, if both an App ID and a key are configured
    pub fn app_credentials(&self) -> Result<Option<AppCredentials>> {
        let key = self.private_key()?;
        match (&self.app_id, key) {
            (Some(app_id), Some(private_key_pem)) => Ok(Some(AppCredentials {
                app_id: app_id.clone(),
                private_key_pem,
                installation_id: self.installation_id,
            })),
            (None, None) => Ok(None),
            (Some(_), None) => {
                warn!("GITHUB_APP_ID set without a private key; app token approvals disabled.");
                Ok(None)
            }
            (None, Some(_)) => {
                warn!("Private key set without GITHUB_APP_ID; app token approvals disabled.");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Settings {
        let mut argv = vec!["approve-webhook"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_policy_values() {
        let settings = parse(&[]);
        assert_eq!(settings.policy(), ApprovalPolicy::default());
        assert_eq!(settings.api_url, "https://api.github.com");
        assert_eq!(settings.review_message, DEFAULT_REVIEW_MESSAGE);
    }

    #[test]
    fn test_overridden_policy_values() {
        let settings = parse(&["--label", "ship-it", "--bot-login", "release[bot]"]);
        let policy = settings.policy();
        assert_eq!(policy.label, "ship-it");
        assert_eq!(policy.maintenance_bot, "release[bot]");
    }

    #[test]
    fn test_inline_key_wins() {
        let settings = parse(&[
            "--app-id",
            "42",
            "--private-key",
            "PEM",
            "--private-key-b64",
            "QkFTRTY0",
        ]);
        let creds = settings.app_credentials().unwrap().unwrap();
        assert_eq!(creds.private_key_pem, b"PEM");
        assert_eq!(creds.app_id, "42");
    }

    #[test]
    fn test_base64_key_is_decoded() {
        let settings = parse(&["--app-id", "42", "--private-key-b64", "QkFTRTY0"]);
        assert_eq!(settings.private_key().unwrap().unwrap(), b"BASE64");
    }

    #[test]
    fn test_invalid_base64_key_is_config_error() {
        let settings = parse(&["--private-key-b64", "!!!"]);
        assert!(matches!(settings.private_key(), Err(ApproveError::Config(_))));
    }

    #[test]
    fn test_key_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"FROM FILE").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let settings = parse(&[
            "--app-id",
            "42",
            "--installation-id",
            "7",
            "--private-key-path",
            &path,
        ]);
        let creds = settings.app_credentials().unwrap().unwrap();
        assert_eq!(creds.private_key_pem, b"FROM FILE");
        assert_eq!(creds.installation_id, Some(7));
    }

    #[test]
    fn test_missing_key_file_is_config_error() {
        let settings = parse(&["--private-key-path", "/nonexistent/key.pem"]);
        assert!(matches!(settings.private_key(), Err(ApproveError::Config(_))));
    }

    #[test]
    fn test_log_json_accepts_numeric_env() {
        std::env::set_var("LOG_JSON", "1");
        let enabled = Settings::try_parse_from(["approve-webhook"]);
        std::env::set_var("LOG_JSON", "0");
        let disabled = Settings::try_parse_from(["approve-webhook"]);
        std::env::remove_var("LOG_JSON");

        assert!(enabled.unwrap().log_json);
        assert!(!disabled.unwrap().log_json);
    }

    #[test]
    fn test_log_json_flag() {
        assert!(parse(&["--log-json"]).log_json);
    }

    #[test]
    fn test_app_id_without_key_disables_app_tokens() {
        let settings = parse(&["--app-id", "42"]);
        assert!(settings.app_credentials().unwrap().is_none());
    }
}
