//! Mastodon feed transport
//!
//! Talks to Mastodon and other Fediverse servers that implement the Mastodon
//! API through the megalodon library. The instance URL and an OAuth token
//! file come from the configuration; rate-limit state is taken from the
//! `X-RateLimit-*` headers of whatever response was seen last, since the API
//! has no dedicated status endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use megalodon::megalodon::{GetAccountStatusesInputOptions, GetHomeTimelineInputOptions};
use megalodon::{entities, Megalodon, SNS};
use std::sync::Mutex;

use crate::client::{FeedClient, FeedRef};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::types::{FeedItem, ItemEntities, Link, Media, Mention, RateLimitSnapshot, Subject};

/// Documented default for Mastodon instances: 300 requests per 5 minutes.
const DEFAULT_LIMIT: u32 = 300;

/// Megalodon-backed [`FeedClient`].
pub struct MastodonFeed {
    client: Box<dyn Megalodon + Send + Sync>,
    #[allow(dead_code)]
    instance_url: String,

    /// Most recent rate-limit headers observed on any response.
    last_limit: Mutex<Option<RateLimitSnapshot>>,
}

impl MastodonFeed {
    /// Create a client for an instance with a raw access token.
    pub fn new(instance_url: String, access_token: String) -> Result<Self> {
        let client = megalodon::generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token),
            None,
        )
        .map_err(|e| {
            FetchError::Authentication(format!("Failed to create Mastodon client: {:?}", e))
        })?;

        Ok(Self {
            client,
            instance_url,
            last_limit: Mutex::new(None),
        })
    }

    /// Create a client from configuration, reading the token file.
    pub fn from_config(config: &Config) -> Result<Self> {
        let token_path = shellexpand::full(&config.instance.token_file).map_err(|e| {
            FetchError::Authentication(format!("Failed to expand token file path: {}", e))
        })?;

        let token = std::fs::read_to_string(token_path.as_ref())
            .map_err(|e| {
                FetchError::Authentication(format!("Failed to read access token file: {}", e))
            })?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(FetchError::Authentication("Access token file is empty".to_string()).into());
        }

        let instance_url = if config.instance.url.starts_with("http://")
            || config.instance.url.starts_with("https://")
        {
            config.instance.url.clone()
        } else {
            format!("https://{}", config.instance.url)
        };

        Self::new(instance_url, token)
    }

    fn remember_limit<T>(&self, response: &megalodon::response::Response<T>) {
        let get = |name: &str| response.header.get(name).and_then(|value| value.to_str().ok());
        let parsed = (|| {
            let limit = get("x-ratelimit-limit")?.trim().parse().ok()?;
            let remaining = get("x-ratelimit-remaining")?.trim().parse().ok()?;
            let reset = DateTime::parse_from_rfc3339(get("x-ratelimit-reset")?.trim())
                .ok()?
                .with_timezone(&Utc);
            Some(RateLimitSnapshot {
                limit,
                remaining,
                reset,
            })
        })();
        if let Some(snapshot) = parsed {
            if let Ok(mut guard) = self.last_limit.lock() {
                *guard = Some(snapshot);
            }
        }
    }
}

#[async_trait]
impl FeedClient for MastodonFeed {
    async fn fetch_page(
        &self,
        feed: &FeedRef,
        page_size: u32,
        max_id: Option<&str>,
    ) -> std::result::Result<Vec<FeedItem>, FetchError> {
        let response = match feed {
            FeedRef::Home => {
                let options = GetHomeTimelineInputOptions {
                    limit: Some(page_size),
                    max_id: max_id.map(str::to_string),
                    ..Default::default()
                };
                self.client
                    .get_home_timeline(Some(&options))
                    .await
                    .map_err(|e| map_megalodon_error(e, "fetch home timeline"))?
            }
            FeedRef::Account(id) => {
                let options = GetAccountStatusesInputOptions {
                    limit: Some(page_size),
                    max_id: max_id.map(str::to_string),
                    ..Default::default()
                };
                self.client
                    .get_account_statuses(id.clone(), Some(&options))
                    .await
                    .map_err(|e| map_megalodon_error(e, "fetch account timeline"))?
            }
        };
        self.remember_limit(&response);

        Ok(response.json.into_iter().map(status_to_item).collect())
    }

    async fn list_subjects(&self) -> std::result::Result<Vec<Subject>, FetchError> {
        let me = self
            .client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "verify credentials"))?;
        self.remember_limit(&me);

        let following = self
            .client
            .get_account_following(me.json.id.clone(), None)
            .await
            .map_err(|e| map_megalodon_error(e, "list following"))?;
        self.remember_limit(&following);

        Ok(following
            .json
            .into_iter()
            .map(account_to_subject)
            .collect())
    }

    async fn lookup_subject(&self, handle: &str) -> std::result::Result<Subject, FetchError> {
        let response = self
            .client
            .lookup_account(handle.to_string())
            .await
            .map_err(|e| map_megalodon_error(e, "lookup account"))?;
        self.remember_limit(&response);

        Ok(account_to_subject(response.json))
    }

    async fn rate_limit_status(&self) -> std::result::Result<RateLimitSnapshot, FetchError> {
        let cached = self.last_limit.lock().ok().and_then(|guard| *guard);
        // Nothing observed yet means nothing has been spent either.
        Ok(cached.unwrap_or(RateLimitSnapshot {
            limit: DEFAULT_LIMIT,
            remaining: DEFAULT_LIMIT,
            reset: Utc::now(),
        }))
    }
}

fn status_to_item(status: entities::Status) -> FeedItem {
    let mut item_entities = ItemEntities::default();

    if let Some(card) = &status.card {
        item_entities.links.push(Link {
            url: card.url.clone(),
            title: if card.title.is_empty() {
                None
            } else {
                Some(card.title.clone())
            },
        });
    }
    for media in &status.media_attachments {
        item_entities.media.push(Media {
            url: media.url.clone(),
            kind: format!("{:?}", media.r#type).to_lowercase(),
            description: media.description.clone(),
        });
    }
    for tag in &status.tags {
        item_entities.hashtags.push(tag.name.clone());
    }
    for mention in &status.mentions {
        item_entities.mentions.push(Mention {
            handle: mention.acct.clone(),
            url: mention.url.clone(),
        });
    }

    FeedItem {
        id: status.id.clone(),
        created_at: status.created_at,
        text: status.content.clone(),
        entities: item_entities,
        boosts: status.reblogs_count as u32,
        favourites: status.favourites_count as u32,
        author: account_to_subject(status.account),
    }
}

fn account_to_subject(account: entities::Account) -> Subject {
    Subject {
        id: account.id,
        name: account.display_name,
        handle: account.acct,
    }
}

/// Map megalodon errors to [`FetchError`]
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> FetchError {
    classify_error(&error.to_string(), context)
}

fn classify_error(message: &str, context: &str) -> FetchError {
    let lower = message.to_lowercase();

    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("token")
    {
        FetchError::Authentication(format!(
            "Mastodon authentication failed ({}): {}. \
                Suggestion: Verify your OAuth token is valid and has not expired.",
            context, message
        ))
    } else if lower.contains("parse") || lower.contains("json") || lower.contains("deserialize") {
        FetchError::Api(format!(
            "Mastodon response parse error ({}): {}. \
                The instance may have returned an unexpected response format.",
            context, message
        ))
    } else {
        FetchError::Network(format!(
            "Mastodon error ({}): {}. \
                Suggestion: Check your network connection and instance availability.",
            context, message
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authentication_errors() {
        let err = classify_error("HTTP 401 Unauthorized", "fetch page");
        assert!(matches!(err, FetchError::Authentication(_)));

        let err = classify_error("invalid token supplied", "verify credentials");
        assert!(matches!(err, FetchError::Authentication(_)));
    }

    #[test]
    fn test_classify_parse_errors() {
        let err = classify_error("failed to deserialize response body", "fetch page");
        assert!(matches!(err, FetchError::Api(_)));
    }

    #[test]
    fn test_classify_defaults_to_network() {
        let err = classify_error("connection reset by peer", "fetch page");
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[test]
    fn test_classify_includes_context() {
        let err = classify_error("connection reset by peer", "list following");
        assert!(err.to_string().contains("list following"));
    }
}
