//! Category → section routing.
//!
//! A fixed table maps each known category to a top-level heading of the
//! canonical document. Anything not in the table lands in
//! [`FALLBACK_SECTION`]. The result is advisory: the splicer checks that
//! the heading still exists in the live document and falls back again if
//! it does not.

/// Heading used for unmapped categories and for headings missing from the
/// live document.
pub const FALLBACK_SECTION: &str = "## Ideas & Decisions";

/// Prefix that opens a top-level section.
pub const SECTION_MARKER: &str = "## ";

/// Known categories and their target headings.
pub const SECTION_MAP: &[(&str, &str)] = &[
    ("prompting_techniques", "## Prompting Patterns"),
    ("sub_agents", "## Sub-Agents"),
    ("workflow_tips", "## Dev Environment / Workflow"),
    ("common_mistakes", "## Agent Safety Rails"),
    ("new_features", "## Dev Environment / Workflow"),
    ("mcp_servers", "## MCP Servers (Model Context Protocol)"),
    ("configuration", "## System Prompts / CLAUDE.md Config"),
    ("performance", "## Dev Environment / Workflow"),
    ("other", FALLBACK_SECTION),
];

/// Heading for `category`. Total: unknown categories yield the fallback.
pub fn route(category: &str) -> &'static str {
    SECTION_MAP
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, heading)| *heading)
        .unwrap_or(FALLBACK_SECTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_headings() {
        assert_eq!(route("new_features"), "## Dev Environment / Workflow");
        assert_eq!(route("workflow_tips"), "## Dev Environment / Workflow");
        assert_eq!(route("performance"), "## Dev Environment / Workflow");
        assert_eq!(route("prompting_techniques"), "## Prompting Patterns");
        assert_eq!(route("sub_agents"), "## Sub-Agents");
        assert_eq!(route("common_mistakes"), "## Agent Safety Rails");
        assert_eq!(
            route("mcp_servers"),
            "## MCP Servers (Model Context Protocol)"
        );
        assert_eq!(
            route("configuration"),
            "## System Prompts / CLAUDE.md Config"
        );
        assert_eq!(route("other"), FALLBACK_SECTION);
    }

    #[test]
    fn test_unmapped_falls_back() {
        for c in ["", "Workflow_Tips", "hooks", "workflow_tips ", "🤖"] {
            assert_eq!(route(c), FALLBACK_SECTION, "category {:?}", c);
        }
    }

    #[test]
    fn test_every_heading_is_a_section() {
        for (_, heading) in SECTION_MAP {
            assert!(heading.starts_with(SECTION_MARKER));
        }
    }
}
