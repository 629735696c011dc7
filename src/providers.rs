//! Hosted chat-completion providers.
//!
//! Two providers are supported, always tried in the same order:
//!
//! | Variant | Default endpoint | Default model | Timeout |
//! |---------|------------------|---------------|---------|
//! | [`Provider::Primary`] | OpenAI | `gpt-4o-mini` | none |
//! | [`Provider::Secondary`] | Groq (OpenAI-compatible) | `llama-3.1-8b-instant` | 20 s |
//!
//! Both speak the OpenAI chat-completions wire format: the transcript is
//! posted to `{base_url}/chat/completions` and the reply is read from
//! `choices[0].message.content`. There are no retries; a failed provider
//! simply hands over to the next one in the [`ProviderChain`].

use serde_json::Value;
use std::time::Duration;

use crate::config::{ProviderConfig, ProvidersConfig};
use crate::error::ProviderError;
use crate::models::ConversationTurn;

/// Connection details shared by both provider variants.
#[derive(Clone)]
pub struct Endpoint {
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    client: reqwest::Client,
}

impl Endpoint {
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
            client: builder.build()?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// One hosted completion backend.
#[derive(Clone)]
pub enum Provider {
    Primary(Endpoint),
    Secondary(Endpoint),
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Primary(_) => "primary",
            Provider::Secondary(_) => "secondary",
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Provider::Primary(endpoint) | Provider::Secondary(endpoint) => endpoint,
        }
    }

    /// Asks the provider to continue `messages`, returning the trimmed reply.
    pub async fn reply(&self, messages: &[ConversationTurn]) -> Result<String, ProviderError> {
        let provider = self.name();
        let endpoint = self.endpoint();

        let api_key = endpoint
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured {
                provider,
                env_var: endpoint.api_key_env.clone(),
            })?;

        let body = serde_json::json!({
            "model": endpoint.model,
            "messages": messages,
        });

        let response = endpoint
            .client
            .post(format!("{}/chat/completions", endpoint.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Request { provider, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider,
                status,
                body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|_| ProviderError::MalformedResponse { provider })?;

        parse_completion(provider, &json)
    }
}

/// Reads `choices[0].message.content`, trimmed.
fn parse_completion(provider: &'static str, json: &Value) -> Result<String, ProviderError> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or(ProviderError::MalformedResponse { provider })?;

    let reply = content.trim();
    if reply.is_empty() {
        return Err(ProviderError::EmptyReply { provider });
    }
    Ok(reply.to_string())
}

/// Providers in the order they are tried.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Provider>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// Primary, then secondary.
    pub fn from_config(config: &ProvidersConfig) -> anyhow::Result<Self> {
        Ok(Self::new(vec![
            Provider::Primary(Endpoint::from_config(&config.primary)?),
            Provider::Secondary(Endpoint::from_config(&config.secondary)?),
        ]))
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Returns the first successful reply, or `None` once every provider is
    /// exhausted. Failures are logged and never propagated.
    pub async fn first_reply(&self, messages: &[ConversationTurn]) -> Option<String> {
        for provider in &self.providers {
            match provider.reply(messages).await {
                Ok(reply) => {
                    tracing::debug!(provider = provider.name(), "provider replied");
                    return Some(reply);
                }
                Err(e) if e.is_not_configured() => {
                    tracing::debug!(error = %e, "skipping provider");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "provider failed");
                }
            }
        }
        None
    }
}
