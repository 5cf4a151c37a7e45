//! GitHub API error types and response classification.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::http::{HttpError, HttpResponse};
use crate::shutdown::Cancelled;

use super::pool::{RateLimitAware, RateLimitSignal};

/// Wait applied to a secondary rate limit that did not say how long to wait.
pub const DEFAULT_SECONDARY_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Secondary rate limit hit. Retry after {}s", .retry_after.as_secs())]
    SecondaryRateLimited { retry_after: Duration },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed for {route}: {message}")]
    Validation { route: String, message: String },

    #[error("GitHub API error ({status}) for {route}: {message}")]
    Api {
        status: u16,
        route: String,
        message: String,
    },

    #[error("Failed to decode response from {route}: {source}")]
    Decode {
        route: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl GitHubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound(_))
    }
}

impl RateLimitAware for GitHubError {
    fn rate_limit_signal(&self) -> Option<RateLimitSignal> {
        match self {
            GitHubError::RateLimited { reset_at } => Some(RateLimitSignal::Primary {
                reset_at: *reset_at,
            }),
            GitHubError::SecondaryRateLimited { retry_after } => {
                Some(RateLimitSignal::Secondary {
                    retry_after: *retry_after,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a non-2xx response to a [`GitHubError`].
///
/// Primary limits are 403/429 responses with `x-ratelimit-remaining: 0`.
/// Secondary limits carry a `retry-after` header or mention the secondary
/// (formerly "abuse") limit in their message.
pub fn classify_response(route: &str, response: &HttpResponse) -> GitHubError {
    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .unwrap_or_default()
        .message;

    match response.status {
        403 | 429 => {
            if let Some(retry_after) = response
                .header("retry-after")
                .and_then(|v| v.trim().parse::<u64>().ok())
            {
                return GitHubError::SecondaryRateLimited {
                    retry_after: Duration::from_secs(retry_after),
                };
            }

            let lowered = message.to_ascii_lowercase();
            if lowered.contains("secondary rate limit") || lowered.contains("abuse") {
                return GitHubError::SecondaryRateLimited {
                    retry_after: DEFAULT_SECONDARY_RETRY_AFTER,
                };
            }

            if response.header("x-ratelimit-remaining").map(str::trim) == Some("0") {
                return GitHubError::RateLimited {
                    reset_at: parse_reset(response).unwrap_or_else(Utc::now),
                };
            }

            if response.status == 429 {
                return GitHubError::SecondaryRateLimited {
                    retry_after: DEFAULT_SECONDARY_RETRY_AFTER,
                };
            }

            GitHubError::Api {
                status: response.status,
                route: route.to_string(),
                message,
            }
        }
        401 => GitHubError::AuthRequired,
        404 => GitHubError::NotFound(route.to_string()),
        422 => GitHubError::Validation {
            route: route.to_string(),
            message,
        },
        status => GitHubError::Api {
            status,
            route: route.to_string(),
            message,
        },
    }
}

fn parse_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    let epoch = response.header("x-ratelimit-reset")?.trim().parse::<i64>().ok()?;
    Utc.timestamp_opt(epoch, 0).single()
}

/// Extract a short, user-friendly error message.
pub fn short_error_message(err: &GitHubError) -> String {
    match err {
        GitHubError::RateLimited { .. } | GitHubError::SecondaryRateLimited { .. } => {
            "rate limited".to_string()
        }
        GitHubError::NotFound(_) => "not found".to_string(),
        GitHubError::AuthRequired => "authentication required".to_string(),
        GitHubError::Transport(_) => "network error".to_string(),
        GitHubError::Api { status, .. } => format!("HTTP {status}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn primary_rate_limit_carries_reset_time() {
        let resp = response(
            403,
            &[("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset", "1700000000")],
            r#"{"message":"API rate limit exceeded for user ID 1."}"#,
        );
        match classify_response("/orgs/acme", &resp) {
            GitHubError::RateLimited { reset_at } => {
                assert_eq!(reset_at.timestamp(), 1_700_000_000);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn secondary_rate_limit_from_retry_after() {
        let resp = response(403, &[("Retry-After", "42")], r#"{"message":"slow down"}"#);
        match classify_response("/orgs/acme", &resp) {
            GitHubError::SecondaryRateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(42));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn secondary_rate_limit_from_message() {
        let resp = response(
            403,
            &[],
            r#"{"message":"You have exceeded a secondary rate limit. Please wait."}"#,
        );
        assert!(matches!(
            classify_response("/r", &resp),
            GitHubError::SecondaryRateLimited { retry_after } if retry_after == DEFAULT_SECONDARY_RETRY_AFTER
        ));

        let abuse = response(403, &[], r#"{"message":"abuse detection mechanism"}"#);
        assert!(matches!(
            classify_response("/r", &abuse),
            GitHubError::SecondaryRateLimited { .. }
        ));
    }

    #[test]
    fn forbidden_without_markers_is_a_business_error() {
        let resp = response(403, &[("X-RateLimit-Remaining", "4999")], r#"{"message":"Resource not accessible"}"#);
        let err = classify_response("/repos/a/b", &resp);
        assert!(err.rate_limit_signal().is_none());
        assert!(matches!(err, GitHubError::Api { status: 403, .. }));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            classify_response("/x", &response(401, &[], "")),
            GitHubError::AuthRequired
        ));
        assert!(classify_response("/x", &response(404, &[], "")).is_not_found());
        assert!(matches!(
            classify_response("/x", &response(422, &[], r#"{"message":"Validation Failed"}"#)),
            GitHubError::Validation { message, .. } if message == "Validation Failed"
        ));
        assert!(matches!(
            classify_response("/x", &response(502, &[], "<html>")),
            GitHubError::Api { status: 502, .. }
        ));
    }

    #[test]
    fn rate_limit_signals() {
        let reset_at = Utc::now();
        assert_eq!(
            GitHubError::RateLimited { reset_at }.rate_limit_signal(),
            Some(RateLimitSignal::Primary { reset_at })
        );
        assert_eq!(
            GitHubError::SecondaryRateLimited {
                retry_after: Duration::from_secs(5)
            }
            .rate_limit_signal(),
            Some(RateLimitSignal::Secondary {
                retry_after: Duration::from_secs(5)
            })
        );
        assert!(GitHubError::AuthRequired.rate_limit_signal().is_none());
    }

    #[test]
    fn short_messages() {
        assert_eq!(
            short_error_message(&GitHubError::NotFound("/x".into())),
            "not found"
        );
        assert_eq!(
            short_error_message(&GitHubError::Api {
                status: 500,
                route: "/x".into(),
                message: String::new()
            }),
            "HTTP 500"
        );
    }
}
