use std::io::{self, IsTerminal, Write};

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use merged_prs::{
    DisplayMode, FetchError, Label, NO_DESCRIPTION_PLACEHOLDER, PullRequest, to_markdown,
};
use owo_colors::OwoColorize;

const MERGED_DATE_FORMAT: &str = "%b %-d, %Y";
const TITLE_TRUNCATION_SUFFIX: &str = "...";
const MIN_TITLE_WIDTH_FOR_TRUNCATION: usize = 3;
const EMPTY_RESULT: &str = "No merged pull requests found.";

/// Terminal capabilities used when rendering the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListStyle {
    pub use_colors: bool,
    pub width: Option<usize>,
}

impl ListStyle {
    pub const fn plain() -> Self {
        Self {
            use_colors: false,
            width: None,
        }
    }

    pub fn detect() -> Self {
        let stdout = io::stdout();
        if !stdout.is_terminal() {
            return Self::plain();
        }
        Self {
            use_colors: std::env::var_os("NO_COLOR").is_none(),
            width: terminal_size::terminal_size().map(|(w, _)| w.0 as usize),
        }
    }
}

/// Parses a GitHub label color (`d73a4a`, optionally `#`-prefixed).
fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn format_label(label: &Label, use_colors: bool) -> String {
    match parse_hex_color(&label.color).filter(|_| use_colors) {
        Some((r, g, b)) => label.name.truecolor(r, g, b).bold().to_string(),
        None => label.name.clone(),
    }
}

fn format_merged_date<Tz: TimeZone>(merged_at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    merged_at
        .with_timezone(tz)
        .format(MERGED_DATE_FORMAT)
        .to_string()
}

fn truncate_to_width(text: &str, width: Option<usize>) -> String {
    let Some(width) = width else {
        return text.to_string();
    };
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width || width <= MIN_TITLE_WIDTH_FOR_TRUNCATION {
        return text.to_string();
    }
    let keep = width - TITLE_TRUNCATION_SUFFIX.len();
    format!(
        "{}{}",
        chars[..keep].iter().collect::<String>(),
        TITLE_TRUNCATION_SUFFIX
    )
}

struct PrDetailFormatter<'a> {
    pr: &'a PullRequest,
    style: &'a ListStyle,
}

impl<'a> PrDetailFormatter<'a> {
    fn new(pr: &'a PullRequest, style: &'a ListStyle) -> Self {
        Self { pr, style }
    }

    fn format<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_header(writer)?;
        self.write_metadata(writer)?;
        self.write_labels_section(writer)?;
        self.write_description(writer)?;
        Ok(())
    }

    fn write_header<W: Write>(&self, writer: &mut W) -> Result<()> {
        let header = truncate_to_width(
            &format!("● #{} {}", self.pr.number, self.pr.title),
            self.style.width,
        );
        if self.style.use_colors {
            writeln!(writer, "{}", header.bold())?;
        } else {
            writeln!(writer, "{header}")?;
        }
        Ok(())
    }

    fn write_metadata<W: Write>(&self, writer: &mut W) -> Result<()> {
        let pr = self.pr;
        writeln!(writer, "├─URL: {}", pr.html_url)?;
        writeln!(writer, "├─Author: {} ({})", pr.user.login, pr.user.html_url)?;
        writeln!(writer, "├─Avatar: {}", pr.user.avatar_url)?;
        if let Some(merged_at) = pr.merged_at {
            writeln!(writer, "├─Merged: {}", format_merged_date(merged_at, &Local))?;
        }
        Ok(())
    }

    fn write_labels_section<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "├─Labels")?;

        let labels = &self.pr.labels;
        if labels.is_empty() {
            writeln!(writer, "│ └─None")?;
        } else {
            for (i, label) in labels.iter().enumerate() {
                let prefix = if i == labels.len() - 1 {
                    "│ └─"
                } else {
                    "│ ├─"
                };
                writeln!(
                    writer,
                    "{prefix}{}",
                    format_label(label, self.style.use_colors)
                )?;
            }
        }

        Ok(())
    }

    fn write_description<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "└─Description")?;
        let body = self.pr.description().unwrap_or(NO_DESCRIPTION_PLACEHOLDER);
        for line in body.lines() {
            if line.trim().is_empty() {
                writeln!(writer)?;
            } else {
                writeln!(writer, "  {}", line.trim_end())?;
            }
        }
        Ok(())
    }
}

fn display_prs_list<W: Write>(
    prs: &[PullRequest],
    style: &ListStyle,
    writer: &mut W,
) -> Result<()> {
    if prs.is_empty() {
        writeln!(writer, "{EMPTY_RESULT}")?;
        return Ok(());
    }

    writeln!(writer, "Pull Requests ({})", prs.len())?;
    for pr in prs {
        writeln!(writer)?;
        PrDetailFormatter::new(pr, style).format(writer)?;
    }
    Ok(())
}

fn display_prs_quiet<W: Write>(prs: &[PullRequest], writer: &mut W) -> Result<()> {
    for pr in prs {
        writeln!(writer, "{}", pr.number)?;
    }
    Ok(())
}

pub fn display_prs<W: Write>(
    prs: &[PullRequest],
    mode: DisplayMode,
    style: &ListStyle,
    writer: &mut W,
) -> Result<()> {
    match mode {
        DisplayMode::Quiet => display_prs_quiet(prs, writer),
        DisplayMode::Markdown => {
            write!(writer, "{}", to_markdown(prs))?;
            Ok(())
        }
        DisplayMode::List => display_prs_list(prs, style, writer),
    }
}

/// Writes the error banner and, for well-known failures, extra guidance.
pub fn display_search_error<W: Write>(err: &FetchError, writer: &mut W) -> Result<()> {
    writeln!(writer, "Error: {err}")?;
    if let Some(hint) = err.hint() {
        writeln!(writer, "{hint}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;
    use merged_prs::Author;

    use super::*;

    fn label(id: u64, name: &str, color: &str) -> Label {
        Label {
            id,
            name: name.to_string(),
            color: color.to_string(),
            description: None,
        }
    }

    fn create_test_pr_data() -> Vec<PullRequest> {
        vec![
            PullRequest {
                title: "Add authentication system".to_string(),
                body: Some("Adds OAuth login.\n\n- token refresh".to_string()),
                number: 101,
                html_url: "https://github.com/owner/repo/pull/101".to_string(),
                labels: vec![label(1, "enhancement", "a2eeef"), label(2, "ui", "zzzzzz")],
                user: Author {
                    login: "alice".to_string(),
                    avatar_url: "https://avatars.githubusercontent.com/u/1".to_string(),
                    html_url: "https://github.com/alice".to_string(),
                },
                merged_at: Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()),
            },
            PullRequest {
                title: "Fix typo".to_string(),
                body: None,
                number: 99,
                html_url: "https://github.com/owner/repo/pull/99".to_string(),
                labels: vec![],
                user: Author {
                    login: "bob".to_string(),
                    ..Author::default()
                },
                merged_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()),
            },
        ]
    }

    fn render(mode: DisplayMode, style: &ListStyle) -> String {
        let mut output = Vec::new();
        display_prs(&create_test_pr_data(), mode, style, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_display_list_mode() {
        let result = render(DisplayMode::List, &ListStyle::plain());

        assert!(result.starts_with("Pull Requests (2)\n"));
        assert!(result.contains("● #101 Add authentication system"));
        assert!(result.contains("├─URL: https://github.com/owner/repo/pull/101"));
        assert!(result.contains("├─Author: alice (https://github.com/alice)"));
        assert!(result.contains("├─Avatar: https://avatars.githubusercontent.com/u/1"));
        assert!(result.contains("├─Merged: Mar"));
        assert!(result.contains("│ ├─enhancement"));
        assert!(result.contains("│ └─ui"));
        assert!(result.contains("  Adds OAuth login."));
        assert!(result.contains("  - token refresh"));
        assert!(result.contains("● #99 Fix typo"));
        assert!(result.contains("│ └─None"));
        assert!(result.contains(&format!("  {NO_DESCRIPTION_PLACEHOLDER}")));
        assert!(!result.contains('\x1b'));

        // Order follows the input.
        assert!(result.find("#101").unwrap() < result.find("#99").unwrap());
    }

    #[test]
    fn test_display_list_colors_labels() {
        let style = ListStyle {
            use_colors: true,
            width: None,
        };
        let result = render(DisplayMode::List, &style);
        // a2eeef -> 162;238;239 truecolor foreground.
        assert!(result.contains("38;2;162;238;239"));
        // Invalid colors fall back to the plain name.
        assert!(result.contains("│ └─ui\n"));
    }

    #[test]
    fn test_display_markdown_mode() {
        let result = render(DisplayMode::Markdown, &ListStyle::plain());
        assert_eq!(result, to_markdown(&create_test_pr_data()));
        assert!(result.contains("Labels: `enhancement`, `ui`"));
    }

    #[test]
    fn test_display_quiet_mode() {
        let result = render(DisplayMode::Quiet, &ListStyle::plain());
        assert_eq!(result, "101\n99\n");
    }

    #[test]
    fn test_empty_pr_list() {
        let mut output = Vec::new();
        display_prs(&[], DisplayMode::List, &ListStyle::plain(), &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), format!("{EMPTY_RESULT}\n"));

        let mut output = Vec::new();
        display_prs(&[], DisplayMode::Markdown, &ListStyle::plain(), &mut output).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_header_truncation() {
        let style = ListStyle {
            use_colors: false,
            width: Some(20),
        };
        let result = render(DisplayMode::List, &style);
        assert!(result.contains("● #101 Add authen...\n"));
        assert!(result.contains("● #99 Fix typo\n"));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("d73a4a"), Some((0xd7, 0x3a, 0x4a)));
        assert_eq!(parse_hex_color("#FFFFFF"), Some((255, 255, 255)));
        assert_eq!(parse_hex_color("fff"), None);
        assert_eq!(parse_hex_color("gggggg"), None);
        assert_eq!(parse_hex_color(""), None);
    }

    #[test]
    fn test_format_merged_date() {
        let merged = Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap();
        assert_eq!(format_merged_date(merged, &Utc), "Mar 1, 2024");

        let pst = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(format_merged_date(merged, &pst), "Feb 29, 2024");
    }

    #[test]
    fn test_display_search_error_with_hint() {
        let mut output = Vec::new();
        display_search_error(&FetchError::from_status(401, "Bad credentials"), &mut output)
            .unwrap();
        let result = String::from_utf8(output).unwrap();
        assert!(result.starts_with("Error: Bad credentials\n"));
        assert!(result.contains("token is valid"));

        let mut output = Vec::new();
        display_search_error(&FetchError::Network("timed out".into()), &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Error: timed out\n");
    }
}
