//! Markdown fragment rendering.
//!
//! A finding renders as a level-3 heading, the summary, and then only the
//! optional blocks that carry text:
//!
//! ~~~text
//!
//! ### <title>
//!
//! <summary>
//!
//! **How to use:**
//! <usage>
//!
//! ```
//! <code snippet>
//! ```
//!
//! <details>
//!
//! *Source: [<author or "Link">](<url>)*
//! ~~~
//!
//! The fragment always starts and ends with a newline. Titles are trusted
//! to be markdown-safe and are not escaped.

use crate::models::{present, Finding};

/// Render `finding` as a markdown fragment. Pure and deterministic.
///
/// # Example
///
/// ```rust
/// use knowledge_scout_core::format::format_finding;
/// use knowledge_scout_core::models::Finding;
///
/// let f = Finding::new("Use /compact", "Compacts context.", "workflow_tips");
/// assert_eq!(format_finding(&f), "\n### Use /compact\n\nCompacts context.\n");
/// ```
pub fn format_finding(finding: &Finding) -> String {
    let mut out = format!("\n### {}\n\n{}", finding.title, finding.summary);

    if let Some(usage) = present(&finding.usage) {
        out.push_str("\n\n**How to use:**\n");
        out.push_str(usage);
    }

    if let Some(code) = present(&finding.code_snippet) {
        out.push_str("\n\n```\n");
        out.push_str(code);
        out.push_str("\n```");
    }

    if let Some(details) = present(&finding.details) {
        out.push_str("\n\n");
        out.push_str(details);
    }

    if let Some(url) = present(&finding.source_url) {
        let label = present(&finding.source_author).unwrap_or("Link");
        out.push_str(&format!("\n\n*Source: [{}]({})*", label, url));
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Finding {
        Finding::new("Use /compact", "Compacts context.", "workflow_tips")
    }

    #[test]
    fn test_title_and_summary_only() {
        assert_eq!(
            format_finding(&base()),
            "\n### Use /compact\n\nCompacts context.\n"
        );
    }

    #[test]
    fn test_usage_block() {
        let mut f = base();
        f.usage = Some("- Run `/compact`".into());
        assert_eq!(
            format_finding(&f),
            "\n### Use /compact\n\nCompacts context.\n\n**How to use:**\n- Run `/compact`\n"
        );
    }

    #[test]
    fn test_all_fields() {
        let mut f = base();
        f.usage = Some("Type it.".into());
        f.code_snippet = Some("/compact focus on tests".into());
        f.details = Some("Works mid-session.".into());
        f.source_url = Some("https://x.com/a/1".into());
        f.source_author = Some("@alice".into());
        let expected = "\n### Use /compact\n\nCompacts context.\
\n\n**How to use:**\nType it.\
\n\n```\n/compact focus on tests\n```\
\n\nWorks mid-session.\
\n\n*Source: [@alice](https://x.com/a/1)*\n";
        assert_eq!(format_finding(&f), expected);
    }

    #[test]
    fn test_source_without_author_uses_link_label() {
        let mut f = base();
        f.source_url = Some("https://example.com".into());
        assert!(format_finding(&f).ends_with("\n\n*Source: [Link](https://example.com)*\n"));
    }

    #[test]
    fn test_author_without_url_is_omitted() {
        let mut f = base();
        f.source_author = Some("@bob".into());
        assert!(!format_finding(&f).contains("Source"));
    }

    #[test]
    fn test_empty_optionals_are_omitted() {
        let mut f = base();
        f.usage = Some(String::new());
        f.code_snippet = Some(String::new());
        f.details = Some(String::new());
        assert_eq!(format_finding(&f), format_finding(&base()));
    }

    #[test]
    fn test_code_block_has_no_language_tag() {
        let mut f = base();
        f.code_snippet = Some("fn main() {}".into());
        assert!(format_finding(&f).contains("\n\n```\nfn main() {}\n```\n"));
    }

    #[test]
    fn test_deterministic() {
        let mut f = base();
        f.details = Some("d".into());
        assert_eq!(format_finding(&f), format_finding(&f.clone()));
    }
}
