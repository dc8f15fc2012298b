//! Markdown export of a pull request list.

use crate::types::PullRequest;

/// Inserted in place of a missing or empty body.
pub const NO_DESCRIPTION_PLACEHOLDER: &str = "*No description provided*";

/// Renders pull requests as a flat Markdown document.
///
/// Each record becomes a level-2 heading linking the title to the PR, an
/// optional `Labels:` line with code-styled names, and the body (or the
/// placeholder). Every record ends with a blank line.
pub fn to_markdown(prs: &[PullRequest]) -> String {
    prs.iter().map(pr_section).collect()
}

fn pr_section(pr: &PullRequest) -> String {
    let mut section = format!("## [{}]({})\n\n", pr.title, pr.html_url);

    if !pr.labels.is_empty() {
        let labels = pr
            .label_names()
            .map(|name| format!("`{name}`"))
            .collect::<Vec<_>>()
            .join(", ");
        section.push_str(&format!("Labels: {labels}\n\n"));
    }

    section.push_str(pr.description().unwrap_or(NO_DESCRIPTION_PLACEHOLDER));
    section.push_str("\n\n");
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, Label};

    fn label(id: u64, name: &str) -> Label {
        Label {
            id,
            name: name.to_string(),
            color: "ededed".to_string(),
            description: None,
        }
    }

    fn pr(number: u64, title: &str, body: Option<&str>, labels: Vec<Label>) -> PullRequest {
        PullRequest {
            title: title.to_string(),
            body: body.map(str::to_string),
            number,
            html_url: format!("https://github.com/acme/web/pull/{number}"),
            labels,
            user: Author::default(),
            merged_at: None,
        }
    }

    #[test]
    fn test_single_pr_with_labels_and_body() {
        let prs = vec![pr(
            1,
            "Fix login",
            Some("Closes #3"),
            vec![label(1, "bug"), label(2, "ui")],
        )];

        assert_eq!(
            to_markdown(&prs),
            "## [Fix login](https://github.com/acme/web/pull/1)\n\n\
             Labels: `bug`, `ui`\n\n\
             Closes #3\n\n"
        );
    }

    #[test]
    fn test_labels_line_omitted_when_no_labels() {
        let out = to_markdown(&[pr(2, "Docs", Some("Typo"), vec![])]);
        assert!(!out.contains("Labels:"));
        assert_eq!(
            out,
            "## [Docs](https://github.com/acme/web/pull/2)\n\nTypo\n\n"
        );
    }

    #[test]
    fn test_placeholder_for_missing_or_empty_body() {
        let missing = to_markdown(&[pr(3, "A", None, vec![])]);
        let empty = to_markdown(&[pr(3, "A", Some(""), vec![])]);
        assert!(missing.contains("*No description provided*"));
        assert_eq!(missing, empty);
    }

    #[test]
    fn test_multiple_prs_keep_order() {
        let prs = vec![
            pr(10, "First", Some("one"), vec![]),
            pr(9, "Second", None, vec![label(1, "bug")]),
        ];
        let out = to_markdown(&prs);

        let first = out.find("First").unwrap();
        let second = out.find("Second").unwrap();
        assert!(first < second);
        assert!(out.contains("one\n\n## [Second]"));
        assert!(out.ends_with("*No description provided*\n\n"));
    }

    #[test]
    fn test_body_is_verbatim() {
        let body = "## Summary\n\n- item\n\n```rust\nfn main() {}\n```";
        let out = to_markdown(&[pr(4, "Code", Some(body), vec![])]);
        assert!(out.contains(body));
    }

    #[test]
    fn test_empty_list_renders_nothing() {
        assert_eq!(to_markdown(&[]), "");
    }

    #[test]
    fn test_deterministic() {
        let prs = vec![pr(1, "Same", Some("body"), vec![label(1, "x")])];
        assert_eq!(to_markdown(&prs), to_markdown(&prs.clone()));
    }
}
