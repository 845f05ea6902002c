//! Mapping the teacher's selected text onto the student's rendering.
//!
//! The two clients render the same document through different surfaces, so
//! node structures differ. The resolver therefore works on the flattened
//! text: concatenate the surface's text nodes into one string, find the
//! first occurrence of the needle there, and translate the match back into
//! per-node ranges. A needle spanning a node boundary still resolves.

use tracing::debug;

/// One text node of the rendered content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub id: String,
    pub text: String,
}

/// Byte range inside a single text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSegment {
    pub node_id: String,
    pub start: usize,
    pub end: usize,
}

/// A resolved match, possibly spanning several nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRange {
    pub segments: Vec<HighlightSegment>,
}

/// Rendered-content surface the resolver emphasizes text on. The
/// implementation should prefer a non-destructive range primitive where its
/// environment offers one; wrapping the range in inline markers is the
/// fallback.
pub trait ContentSurface: Send + Sync {
    fn text_nodes(&self) -> Vec<TextNode>;
    fn apply_highlight(&self, range: &HighlightRange);
    fn clear_highlight(&self);
}

/// Resolve the first occurrence of `needle` across the surface's flattened
/// text. `None` when the needle is empty or absent; a miss is a no-op for
/// the caller, never an error.
pub fn resolve_first(nodes: &[TextNode], needle: &str) -> Option<HighlightRange> {
    if needle.is_empty() {
        return None;
    }
    let flat: String = nodes.iter().map(|n| n.text.as_str()).collect();
    let start = flat.find(needle)?;
    let end = start + needle.len();

    let mut segments = Vec::new();
    let mut cursor = 0usize;
    for node in nodes {
        let node_start = cursor;
        let node_end = cursor + node.text.len();
        cursor = node_end;
        if node_end <= start {
            continue;
        }
        if node_start >= end {
            break;
        }
        segments.push(HighlightSegment {
            node_id: node.id.clone(),
            start: start.saturating_sub(node_start).min(node.text.len()),
            end: (end - node_start).min(node.text.len()),
        });
    }
    Some(HighlightRange { segments })
}

/// Tracks the currently applied highlight so a new value always replaces
/// the previous one and repeated values are no-ops.
pub struct HighlightResolver {
    applied: Option<String>,
}

impl HighlightResolver {
    pub fn new() -> Self {
        HighlightResolver { applied: None }
    }

    /// Apply the teacher's current selection, clearing whatever was shown
    /// before. Idempotent for an unchanged needle.
    pub fn apply(&mut self, surface: &dyn ContentSurface, needle: Option<&str>) {
        if self.applied.as_deref() == needle {
            return;
        }
        surface.clear_highlight();
        self.applied = None;
        let Some(needle) = needle else {
            return;
        };
        match resolve_first(&surface.text_nodes(), needle) {
            Some(range) => {
                surface.apply_highlight(&range);
                self.applied = Some(needle.to_string());
            }
            None => {
                // Content may not contain the teacher's text at all.
                debug!("Highlight needle not found, skipping");
                self.applied = Some(needle.to_string());
            }
        }
    }

    pub fn clear(&mut self, surface: &dyn ContentSurface) {
        if self.applied.take().is_some() {
            surface.clear_highlight();
        }
    }
}

impl Default for HighlightResolver {
    fn default() -> Self {
        Self::new()
    }
}
