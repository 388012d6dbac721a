use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::dto::{AuthenticatedUser, ProviderUser};
use crate::config::AuthConfig;

/// Resolves bearer tokens into users. Tokens are never verified locally.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the provider rejects the token; `Err` when it could not
    /// be asked.
    async fn user_for_token(&self, token: &str) -> anyhow::Result<Option<AuthenticatedUser>>;
}

/// Supabase-compatible auth service (`GET /auth/v1/user`).
#[derive(Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    user_url: String,
    api_key: String,
}

impl SupabaseAuth {
    pub fn new(cfg: &AuthConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build identity provider client")?;
        Ok(Self {
            client,
            user_url: user_endpoint(&cfg.url),
            api_key: cfg.api_key.clone(),
        })
    }
}

fn user_endpoint(base: &str) -> String {
    format!("{}/auth/v1/user", base.trim_end_matches('/'))
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn user_for_token(&self, token: &str) -> anyhow::Result<Option<AuthenticatedUser>> {
        let res = self
            .client
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .context("identity provider request")?;

        let status = res.status();
        if status.is_client_error() {
            debug!(%status, "identity provider rejected token");
            return Ok(None);
        }
        if status != StatusCode::OK {
            anyhow::bail!("identity provider returned {status}");
        }

        let user: ProviderUser = res.json().await.context("decode identity provider user")?;
        Ok(Some(user.into()))
    }
}
