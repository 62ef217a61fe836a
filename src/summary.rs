//! Reduces a decorated document to counts and last-failure detail.

use crate::dom::{Document, NodeId};

/// The `expected`/`actual` pair of a recorded assertion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvent {
    pub expected: String,
    pub actual: String,
}

/// Outcome counts scanned from a processed document.
///
/// `missing_count` is tracked for forward compatibility; no current command
/// produces the `missing` class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub success_count: usize,
    pub failure_count: usize,
    pub missing_count: usize,
    pub exception_count: usize,
    last_failed: Option<ResultEvent>,
}

impl Summary {
    pub fn scan(doc: &Document) -> Self {
        let mut summary = Summary::default();
        let mut last_failure: Option<NodeId> = None;

        for id in doc.descendants(Document::DOCUMENT) {
            let Some(el) = doc.elem(id) else { continue };
            if el.has_class("success") {
                summary.success_count += 1;
            }
            if el.has_class("failure") {
                summary.failure_count += 1;
                last_failure = Some(id);
            }
            if el.has_class("missing") {
                summary.missing_count += 1;
            }
            if el.has_class("exceptionMessage") {
                summary.exception_count += 1;
            }
        }

        summary.last_failed = last_failure.map(|failure| ResultEvent {
            expected: marker_text(doc, failure, "expected"),
            actual: marker_text(doc, failure, "actual"),
        });
        summary
    }

    /// Detail of the document's last failure, if any.
    pub fn last_failed_event(&self) -> Option<&ResultEvent> {
        self.last_failed.as_ref()
    }

    pub fn has_failed(&self) -> bool {
        self.failure_count > 0 || self.exception_count > 0
    }

    pub fn has_succeeded(&self) -> bool {
        !self.has_failed()
    }
}

fn marker_text(doc: &Document, failure: NodeId, class: &str) -> String {
    doc.descendants(failure)
        .find(|&id| doc.attr(id, "class") == Some(class))
        .map(|id| doc.text(id))
        .unwrap_or_default()
}
