use std::{io::IsTerminal, process::Command, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{
    error::{FetchError, GENERIC_FETCH_FAILURE},
    types::{Forge, PullRequest, SearchSpec, Token},
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body GitHub sends with non-success responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// REST API forge backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct GitHub {
    client: reqwest::Client,
    api_url: Url,
}

impl GitHub {
    /// Client for the API rooted at `api_url`: github.com, GitHub Enterprise
    /// (`https://host/api/v3`) or a test server.
    pub fn with_api_url(api_url: &str) -> Result<Self> {
        let api_url =
            Url::parse(api_url).with_context(|| format!("Invalid API URL: '{}'", api_url))?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("API URL must be an absolute http(s) URL, got: '{}'", api_url);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_url })
    }
}

/// Builds the closed-pulls listing URL for the search's repository and branch.
pub fn build_pulls_url(api_url: &Url, spec: &SearchSpec) -> Url {
    let mut url = api_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend([
            "repos",
            spec.repo.owner(),
            spec.repo.name(),
            "pulls",
        ]);
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("state", "closed")
        .append_pair("base", &spec.base_branch)
        .append_pair("sort", "updated")
        .append_pair("direction", "desc");
    url
}

fn request_headers(token: &Token) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, token.authorization().clone());
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
    headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
    headers
}

/// Pulls the `message` field out of an error body, falling back to a
/// generic message when the body is empty, not JSON, or has no message.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FETCH_FAILURE.to_string())
}

#[async_trait]
impl Forge for GitHub {
    async fn fetch_closed_pull_requests(
        &self,
        spec: &SearchSpec,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let url = build_pulls_url(&self.api_url, spec);
        debug!(
            %url,
            authorization = "Bearer [REDACTED]",
            accept = GITHUB_JSON,
            "API request"
        );

        let response = self
            .client
            .get(url)
            .headers(request_headers(&spec.token))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            "API response"
        );

        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), error_message(&body)));
        }

        Ok(serde_json::from_str::<Vec<PullRequest>>(&body)?)
    }
}

/// Resolves the API token.
///
/// Order: explicit value, `GITHUB_TOKEN`, `GH_TOKEN`, `gh auth token`, and
/// finally a masked prompt when stdin is interactive.
pub fn resolve_token(explicit: Option<Token>) -> Result<Token> {
    if let Some(token) = explicit {
        return Ok(token);
    }

    // Prefer environment variables over gh CLI to avoid subprocess overhead.
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var)
            && !token.trim().is_empty()
        {
            debug!(source = var, "Using token from environment");
            return Ok(Token::new(token)?);
        }
    }

    if let Some(token) = token_from_gh_cli() {
        debug!(source = "gh", "Using token from gh CLI");
        return Ok(Token::new(token)?);
    }

    if std::io::stdin().is_terminal() {
        let token = rpassword::prompt_password("GitHub token: ")
            .context("Failed to read token from terminal")?;
        return Token::new(token).context("No GitHub token entered");
    }

    anyhow::bail!(
        "No GitHub token found. Pass --token, set GITHUB_TOKEN, or run 'gh auth login' first"
    )
}

fn token_from_gh_cli() -> Option<String> {
    Command::new("gh")
        .args(["auth", "token"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MergedAfter, Repo};

    fn spec(owner: &str, name: &str) -> SearchSpec {
        SearchSpec::new(
            Token::new("ghp_test").unwrap(),
            Repo::new(owner, name).unwrap(),
            MergedAfter::parse("2024-03-01").unwrap(),
        )
    }

    #[test]
    fn test_build_pulls_url() {
        let base = Url::parse(DEFAULT_API_URL).unwrap();
        let url = build_pulls_url(&base, &spec("acme", "web"));
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/web/pulls?state=closed&base=prod&sort=updated&direction=desc"
        );
    }

    #[test]
    fn test_build_pulls_url_with_enterprise_prefix() {
        let base = Url::parse("https://ghe.example.com/api/v3/").unwrap();
        let url = build_pulls_url(&base, &spec("acme", "web"));
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/acme/web/pulls?state=closed&base=prod&sort=updated&direction=desc"
        );
    }

    #[test]
    fn test_build_pulls_url_escapes_segments() {
        let base = Url::parse(DEFAULT_API_URL).unwrap();
        let url = build_pulls_url(&base, &spec("acme", "web app"));
        assert!(url.path().ends_with("/repos/acme/web%20app/pulls"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message":"Bad credentials","documentation_url":"x"}"#),
            "Bad credentials"
        );
        assert_eq!(error_message(r#"{"documentation_url":"x"}"#), GENERIC_FETCH_FAILURE);
        assert_eq!(error_message("<html>502</html>"), GENERIC_FETCH_FAILURE);
        assert_eq!(error_message(""), GENERIC_FETCH_FAILURE);
    }

    #[test]
    fn test_request_headers() {
        let headers = request_headers(&Token::new("ghp_test").unwrap());
        assert_eq!(headers[AUTHORIZATION], "Bearer ghp_test");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers[ACCEPT], GITHUB_JSON);
        assert_eq!(headers[API_VERSION_HEADER], API_VERSION);
    }

    #[test]
    fn test_with_api_url_rejects_garbage() {
        assert!(GitHub::with_api_url("not a url").is_err());
        assert!(GitHub::with_api_url("mailto:someone@example.com").is_err());
        assert!(GitHub::with_api_url("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn test_resolve_token_prefers_explicit() {
        let token = resolve_token(Some(Token::new("  ghp_explicit  ").unwrap())).unwrap();
        assert_eq!(token.expose(), "ghp_explicit");
    }
}
