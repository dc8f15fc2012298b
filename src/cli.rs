use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Args, Parser};

use crate::{
    github::DEFAULT_API_URL,
    session::{SearchForm, Session, first_of_month, first_of_previous_month},
    types::{DisplayMode, MergedAfter, Repo, Token},
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Args, Debug, Clone, Default)]
#[command(group(
    ArgGroup::new("threshold")
        .required(true)
        .args(["merged_after", "current_month", "previous_month"])
))]
struct ThresholdArgs {
    /// Only include PRs merged after this date (exclusive, local midnight)
    #[arg(
        short = 'm',
        long = "merged-after",
        help_heading = "Merge date",
        value_name = "YYYY-MM-DD"
    )]
    pub merged_after: Option<String>,

    /// Use the first day of the current month
    #[arg(long = "current-month", help_heading = "Merge date")]
    pub current_month: bool,

    /// Use the first day of the previous month
    #[arg(long = "previous-month", help_heading = "Merge date")]
    pub previous_month: bool,
}

#[derive(Args, Debug, Clone, Default)]
struct OutputArgs {
    /// Print the Markdown export instead of the list
    #[arg(long, help_heading = "Output", conflicts_with = "quiet")]
    pub markdown: bool,

    /// Print PR numbers only
    #[arg(short = 'q', long, help_heading = "Output")]
    pub quiet: bool,

    /// Copy the Markdown export to the clipboard
    #[arg(long, help_heading = "Output")]
    pub copy: bool,
}

#[derive(Parser, Default, Debug)]
#[command(
    name = "merged-prs",
    about = "List pull requests merged into prod after a date and export them as Markdown"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// GitHub repository in format 'owner/repo'
    #[arg(
        short = 'r',
        long = "repo",
        value_name = "OWNER/REPO",
        conflicts_with_all = ["owner", "name"]
    )]
    pub repo: Option<String>,

    /// Repository owner or organization (with --name)
    #[arg(short = 'o', long, value_name = "OWNER")]
    pub owner: Option<String>,

    /// Repository name (with --owner)
    #[arg(short = 'n', long, value_name = "NAME")]
    pub name: Option<String>,

    /// GitHub token (falls back to GH_TOKEN, 'gh auth token', then a prompt)
    #[arg(
        short = 't',
        long,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN"
    )]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(
        long = "api-url",
        env = "GITHUB_API_URL",
        default_value = DEFAULT_API_URL,
        value_name = "URL"
    )]
    pub api_url: String,

    #[command(flatten)]
    pub threshold: ThresholdArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl CliArgs {
    pub fn validate(&self) -> Result<()> {
        if self.repo.is_none() && (self.owner.is_none() || self.name.is_none()) {
            anyhow::bail!("Must specify --repo OWNER/REPO, or both --owner and --name");
        }
        Ok(())
    }
}

/// Parsed command line, ready to seed a [`Session`].
#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub repo: Repo,
    pub merged_after: MergedAfter,
    /// Explicit token, if one was given on the command line or via the
    /// environment. Resolution of other sources happens later.
    pub token: Option<Token>,
    pub api_url: String,
    pub copy: bool,
}

impl SearchArgs {
    /// Builds a session whose form holds these arguments.
    pub fn into_session(self, token: &Token) -> Session {
        Session::new(SearchForm {
            token: token.expose().to_string(),
            owner: self.repo.owner().to_string(),
            repo: self.repo.name().to_string(),
            merged_after: self.merged_after.to_string(),
        })
    }
}

fn determine_display_mode(output: &OutputArgs) -> DisplayMode {
    match (output.quiet, output.markdown) {
        (true, _) => DisplayMode::Quiet,
        (_, true) => DisplayMode::Markdown,
        _ => DisplayMode::List,
    }
}

fn resolve_threshold(threshold: &ThresholdArgs, today: NaiveDate) -> Result<MergedAfter> {
    if threshold.current_month {
        return Ok(MergedAfter::new(first_of_month(today)));
    }
    if threshold.previous_month {
        return Ok(MergedAfter::new(first_of_previous_month(today)));
    }
    let raw = threshold
        .merged_after
        .as_deref()
        .context("One of --merged-after, --current-month or --previous-month is required")?;
    MergedAfter::parse(raw).with_context(|| format!("Invalid --merged-after value '{}'", raw))
}

fn resolve_repo(cli: &CliArgs) -> Result<Repo> {
    match (&cli.repo, &cli.owner, &cli.name) {
        (Some(repo), _, _) => Repo::parse(repo)
            .map_err(|e| anyhow::anyhow!("Invalid repository format '{}': {}", repo, e)),
        (None, Some(owner), Some(name)) => Repo::new(owner.as_str(), name.as_str())
            .map_err(|e| anyhow::anyhow!("Invalid repository '{}/{}': {}", owner, name, e)),
        _ => anyhow::bail!("Must specify --repo OWNER/REPO, or both --owner and --name"),
    }
}

fn build_search_from_cli(cli: CliArgs, today: NaiveDate) -> Result<(SearchArgs, DisplayMode)> {
    cli.validate()?;

    let display_mode = determine_display_mode(&cli.output);
    let repo = resolve_repo(&cli)?;
    let merged_after = resolve_threshold(&cli.threshold, today)?;
    let token = cli
        .token
        .filter(|t| !t.trim().is_empty())
        .map(Token::new)
        .transpose()?;

    Ok((
        SearchArgs {
            repo,
            merged_after,
            token,
            api_url: cli.api_url,
            copy: cli.output.copy,
        },
        display_mode,
    ))
}

/// Parses command-line arguments into search arguments and a display mode.
///
/// Month presets are computed relative to `today`.
pub fn parse_args_at<I, T>(args: I, today: NaiveDate) -> Result<(SearchArgs, DisplayMode)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    build_search_from_cli(cli, today)
}

/// Parses command-line arguments using the local date for month presets.
pub fn parse_args<I, T>(args: I) -> Result<(SearchArgs, DisplayMode)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    parse_args_at(args, Local::now().date_naive())
}
