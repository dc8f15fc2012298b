use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Deserializer};

use crate::error::{FetchError, RepoError, ThresholdError, TokenError};

/// Base branch every search is scoped to.
pub const DEFAULT_BASE_BRANCH: &str = "prod";

/// Date format used for thresholds on the command line and in presets.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// GitHub occasionally sends `null` for objects we treat as always
// present (deleted accounts, for example).
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
}

/// A pull request as returned by the REST pulls listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub number: u64,
    pub html_url: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub user: Author,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// True when the PR was merged strictly after `cutoff`.
    pub fn merged_after(&self, cutoff: DateTime<Utc>) -> bool {
        self.merged_at.is_some_and(|merged| merged > cutoff)
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }

    /// The body, treating an empty string the same as a missing one.
    pub fn description(&self) -> Option<&str> {
        self.body.as_deref().filter(|body| !body.is_empty())
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.name.as_str())
    }
}

/// Repository coordinates on the forge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into().trim().to_string();
        let name = name.into().trim().to_string();

        if owner.is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.is_empty() {
            return Err(RepoError::EmptyName);
        }
        for part in [&owner, &name] {
            if part.contains('/') {
                return Err(RepoError::InvalidSegment(part.clone()));
            }
        }

        Ok(Self { owner, name })
    }

    /// Parses the combined `owner/repo` form.
    pub fn parse(value: &str) -> Result<Self, RepoError> {
        match value.trim().split_once('/') {
            Some((owner, name)) if !name.contains('/') => Self::new(owner, name),
            _ => Err(RepoError::InvalidFormat(value.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// API credential. Never printed by `Debug`.
///
/// Holds the `Authorization` header value it produces, so a token that could
/// not be sent is rejected up front.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    authorization: HeaderValue,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Result<Self, TokenError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(TokenError::Empty);
        }
        if !value.chars().all(|c| c.is_ascii_graphic()) {
            return Err(TokenError::InvalidCharacters);
        }
        let mut authorization = HeaderValue::from_str(&format!("Bearer {value}"))
            .map_err(|_| TokenError::InvalidCharacters)?;
        authorization.set_sensitive(true);

        Ok(Self {
            value,
            authorization,
        })
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    /// `Bearer` header value, marked sensitive.
    pub fn authorization(&self) -> &HeaderValue {
        &self.authorization
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token([REDACTED])")
    }
}

/// Exclusive lower bound for merge timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MergedAfter(NaiveDate);

impl MergedAfter {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn parse(value: &str) -> Result<Self, ThresholdError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ThresholdError::Empty);
        }
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Self)
            .map_err(|_| ThresholdError::Invalid(value.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Local midnight at the start of the threshold day.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff_in(&Local)
    }

    /// Midnight at the start of the threshold day in `tz`.
    ///
    /// When a DST transition skips midnight the first valid instant
    /// afterwards is used.
    pub fn cutoff_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        let midnight = self.0.and_time(NaiveTime::MIN);
        tz.from_local_datetime(&midnight)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc())
    }
}

impl fmt::Display for MergedAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// Everything needed to issue one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    pub token: Token,
    pub repo: Repo,
    pub merged_after: MergedAfter,
    pub base_branch: String,
}

impl SearchSpec {
    pub fn new(token: Token, repo: Repo, merged_after: MergedAfter) -> Self {
        Self {
            token,
            repo,
            merged_after,
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
        }
    }
}

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    List,
    Markdown,
    Quiet,
}

/// Source of closed pull requests.
#[async_trait]
pub trait Forge: Send + Sync {
    async fn fetch_closed_pull_requests(
        &self,
        spec: &SearchSpec,
    ) -> Result<Vec<PullRequest>, FetchError>;
}
