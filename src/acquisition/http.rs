//! Strategy that fetches a key over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode, Url, header::RETRY_AFTER};

use super::command::KEY_PLACEHOLDER;
use super::error::{SourceError, SourceResult};
use super::strategy::Strategy;
use crate::constants::DEFAULT_RATE_LIMIT_COOLDOWN_SECS;
use crate::payload::Payload;

/// GETs `url_template` with `{key}` substituted.
///
/// Status mapping: 2xx is the payload; 404, 410 and 451 mean the content is
/// gone; 401, 403 and other 4xx disable this strategy for the key; 429 is a
/// rate limit honoring `Retry-After` (seconds); 5xx and transport errors are
/// retriable.
#[derive(Debug, Clone)]
pub struct HttpStrategy {
    name: String,
    url_template: String,
    http: HttpClient,
    default_cooldown: Duration,
}

impl HttpStrategy {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            http: HttpClient::new(),
            default_cooldown: Duration::from_secs(DEFAULT_RATE_LIMIT_COOLDOWN_SECS),
        }
    }

    pub fn with_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    /// Cooldown used when a 429 carries no usable `Retry-After`.
    pub fn with_default_cooldown(mut self, cooldown: Duration) -> Self {
        self.default_cooldown = cooldown;
        self
    }

    /// Request URL for `key`, percent-encoded.
    ///
    /// `{key}` must fill a whole path segment (`/items/{key}`) or a query value
    /// (`?v={key}`); anything else, or an empty key, disables this strategy.
    pub fn url_for(&self, key: &str) -> SourceResult<Url> {
        if key.is_empty() {
            return Err(SourceError::strategy_unavailable("empty key"));
        }
        let bad_template = |detail: &str| {
            SourceError::strategy_unavailable(format!(
                "url template {:?}: {detail}",
                self.url_template
            ))
        };

        let (prefix, suffix) = self
            .url_template
            .split_once(KEY_PLACEHOLDER)
            .ok_or_else(|| bad_template("missing {key}"))?;

        let url = match prefix.split_once('?') {
            Some((_, query)) => {
                let name = query
                    .strip_suffix('=')
                    .map(|pairs| pairs.rsplit('&').next().unwrap_or(pairs))
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| bad_template("{key} must be a whole query value"))?;
                let base = prefix[..prefix.len() - name.len() - 1].trim_end_matches(['&', '?']);
                let mut url = Url::parse(base).map_err(|e| bad_template(&e.to_string()))?;
                url.query_pairs_mut().append_pair(name, key);
                url
            }
            None => {
                if !prefix.ends_with('/') {
                    return Err(bad_template("{key} must be a whole path segment"));
                }
                let mut url = Url::parse(prefix).map_err(|e| bad_template(&e.to_string()))?;
                url.path_segments_mut()
                    .map_err(|()| bad_template("not a base url"))?
                    .pop_if_empty()
                    .push(key);
                url
            }
        };

        if suffix.is_empty() {
            Ok(url)
        } else {
            Url::parse(&format!("{url}{suffix}")).map_err(|e| bad_template(&e.to_string()))
        }
    }

    fn classify(&self, status: StatusCode, retry_after: Option<Duration>) -> SourceError {
        match status.as_u16() {
            404 | 410 | 451 => SourceError::content_unavailable(format!("origin returned {status}")),
            429 => SourceError::rate_limited(retry_after.unwrap_or(self.default_cooldown)),
            500..=599 => SourceError::retriable(format!("origin returned {status}")),
            _ => SourceError::strategy_unavailable(format!("origin returned {status}")),
        }
    }
}

fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl Strategy for HttpStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, key: &str) -> SourceResult<Payload> {
        let url = self.url_for(key)?;

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::retriable(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers().get(RETRY_AFTER));
            return Err(self.classify(status, retry_after));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| SourceError::retriable(format!("failed to read body: {e}")))?;

        Ok(Payload::from(body.as_ref()))
    }
}
