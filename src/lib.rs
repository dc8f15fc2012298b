//! merged-prs: find pull requests merged into a repository's `prod` branch
//! after a given date.
//!
//! Fetches closed pull requests from the GitHub REST API, keeps those merged
//! strictly after a threshold date, and renders them as a list or as a
//! Markdown document suitable for release notes.

pub mod cli;
pub mod error;
pub mod github;
pub mod markdown;
pub mod query;
pub mod session;
pub mod types;

pub use cli::{SearchArgs, parse_args, parse_args_at};
pub use error::{
    FetchError, FetchErrorKind, RepoError, SessionError, ThresholdError, TokenError,
};
pub use github::{DEFAULT_API_URL, GitHub, resolve_token};
pub use markdown::{NO_DESCRIPTION_PLACEHOLDER, to_markdown};
pub use query::{fetch_merged_pull_requests, filter_merged_after};
pub use session::{
    RequestTicket, SearchForm, Session, first_of_month, first_of_previous_month,
};
pub use types::{
    Author, DEFAULT_BASE_BRANCH, DisplayMode, Forge, Label, MergedAfter, PullRequest, Repo,
    SearchSpec, Token,
};
