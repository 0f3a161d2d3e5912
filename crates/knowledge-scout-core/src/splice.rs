//! Insertion-point search and splicing.
//!
//! The canonical document is a sequence of top-level sections, each opened
//! by a line starting with `"## "`. A fragment is placed at the end of its
//! target section's body so it never leaks into the following section.
//!
//! # Algorithm
//!
//! 1. Split the document on `\n`.
//! 2. Find the first line starting with the target heading. If none,
//!    find the first line starting with [`FALLBACK_SECTION`].
//! 3. If neither exists, append `"\n" + fallback + "\n" + fragment` to the
//!    document.
//! 4. Otherwise scan forward for the next line starting with `"## "`.
//!    - Found: drop trailing newlines from everything before it, then
//!      insert `"\n" + fragment + "\n---\n\n"` ahead of that line.
//!    - Not found: append the fragment to the end of the document.

use serde::Serialize;

use crate::routing::{FALLBACK_SECTION, SECTION_MARKER};

/// Where the fragment ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Inserted before the next top-level section, followed by `---`.
    BeforeNextSection,
    /// The section is the last one; appended at document end.
    EndOfDocument,
    /// No usable heading existed; a fresh fallback heading was appended.
    NewFallbackSection,
}

/// Result of splicing a fragment into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Full updated document text.
    pub content: String,
    /// Heading of the section that received the fragment.
    pub section: String,
    pub placement: Placement,
}

fn find_heading(lines: &[&str], heading: &str) -> Option<usize> {
    lines.iter().position(|line| line.starts_with(heading))
}

/// Splice `fragment` into `document` under `target`, falling back to
/// [`FALLBACK_SECTION`] when `target` is absent.
pub fn insert_into_section(document: &str, target: &str, fragment: &str) -> Splice {
    let lines: Vec<&str> = document.split('\n').collect();

    let (section_index, section) = match find_heading(&lines, target) {
        Some(i) => (i, target),
        None => match find_heading(&lines, FALLBACK_SECTION) {
            Some(i) => (i, FALLBACK_SECTION),
            None => {
                return Splice {
                    content: format!("{}\n{}\n{}", document, FALLBACK_SECTION, fragment),
                    section: FALLBACK_SECTION.to_string(),
                    placement: Placement::NewFallbackSection,
                };
            }
        },
    };

    let next_section = lines
        .iter()
        .enumerate()
        .skip(section_index + 1)
        .find(|(_, line)| line.starts_with(SECTION_MARKER))
        .map(|(i, _)| i);

    match next_section {
        None => Splice {
            content: format!("{}{}", document, fragment),
            section: section.to_string(),
            placement: Placement::EndOfDocument,
        },
        Some(next) => {
            let before = lines[..next].join("\n");
            let after = lines[next..].join("\n");
            let before = before.trim_end_matches('\n');
            Splice {
                content: format!("{}\n{}\n---\n\n{}", before, fragment, after),
                section: section.to_string(),
                placement: Placement::BeforeNextSection,
            }
        }
    }
}
