//! Enrichment: fill a finding's content fields from its source material.
//!
//! The extraction service itself sits behind [`Extractor`]. This module
//! owns the parts that do not depend on a transport: the prompt, the
//! parsing of the service's reply, and the load → extract → save flow.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ScoutError, ScoutResult};
use crate::models::{ContentUpdate, Extraction, ExtractionInput, Finding};
use crate::store::{Extractor, FindingStore};

/// Build the instruction sent to the extraction service.
pub fn build_prompt(input: &ExtractionInput) -> String {
    let source_section = match &input.source_text {
        Some(text) => format!("## Full Source Page Content\n{}", text),
        None => String::new(),
    };

    format!(
        r#"
You are extracting structured information from a developer tip/finding for a knowledge base.

## Finding Title
{title}

## Original Content (from {source_type})
{original}

## Source Author
{author}

{source_section}

---

Extract the following fields. Be concise and actionable. If a field doesn't apply, return null.

1. **summary**: 1-2 sentences explaining what this is and why it's useful. Don't just repeat the title.

2. **usage**: How to actually use this: commands, steps to implement, example prompts. Format as a short bulleted list or commands.

3. **code_snippet**: Any code example, file structure, or configuration. Only include if there's actual code/config to show.

4. **details**: Additional context such as file/folder structures, configuration options, edge cases, and when to use it. Only include if there's meaningful detail beyond summary/usage.

Respond in this exact JSON format:
{{
  "summary": "...",
  "usage": "..." or null,
  "code_snippet": "..." or null,
  "details": "..." or null
}}
"#,
        title = input.title,
        source_type = input.source_type,
        original = input.original_content.as_deref().unwrap_or("N/A"),
        author = input.source_author.as_deref().unwrap_or("Unknown"),
        source_section = source_section,
    )
}

/// Parse the service's free-text reply into an [`Extraction`].
///
/// The outermost `{ … }` span is read as JSON. A missing or empty summary
/// keeps `current_summary`; empty optional fields become `None`.
pub fn parse_extraction(reply: &str, current_summary: &str) -> ScoutResult<Extraction> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(ScoutError::ParseFailure(
                "no JSON object found in response".to_string(),
            ))
        }
    };

    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ScoutError::ParseFailure(format!("response is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(ScoutError::ParseFailure(
            "response JSON is not an object".to_string(),
        ));
    }

    let field = |name: &str| -> Option<String> {
        value
            .get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(Extraction {
        summary: field("summary").unwrap_or_else(|| current_summary.to_string()),
        usage: field("usage"),
        details: field("details"),
        code_snippet: field("code_snippet"),
    })
}

/// Result of [`enrich_finding`].
#[derive(Debug, Clone, Serialize)]
pub struct EnrichOutcome {
    pub finding_id: String,
    pub extracted: Extraction,
    pub source_content_fetched: bool,
    pub saved: bool,
}

/// Run the extractor for an already-loaded `finding`.
///
/// `source_text` is the already-fetched plain text of the source page, if
/// any. With `save`, the four content fields are written back; on any
/// failure nothing is written.
pub async fn enrich_finding(
    findings: &dyn FindingStore,
    extractor: &dyn Extractor,
    finding: &Finding,
    source_text: Option<String>,
    save: bool,
) -> ScoutResult<EnrichOutcome> {
    let id = finding.id.as_str();
    let source_content_fetched = source_text.is_some();
    let input = ExtractionInput::from_finding(finding, source_text);

    let extracted = extractor.extract(&input).await.map_err(|e| {
        warn!(finding_id = id, extractor = extractor.name(), error = %e, "extraction failed");
        e
    })?;

    if save {
        findings
            .save_content(id, &ContentUpdate::from(&extracted))
            .await?;
        info!(finding_id = id, "enrichment saved");
    }

    Ok(EnrichOutcome {
        finding_id: id.to_string(),
        extracted,
        source_content_fetched,
        saved: save,
    })
}
