//! Rewrites the document with success/failure/exception markup.

use crate::command::element_content;
use crate::dom::{Document, NodeId};
use crate::expr::EvalError;
use crate::value::Value;
use log::trace;
use std::error::Error as StdError;

const NBSP: &str = "\u{00A0}";

/// Hands out `data-exception-index` values. One per document run; the first
/// exception gets index 1.
#[derive(Debug, Default)]
pub(crate) struct Exceptions {
    issued: u32,
}

impl Exceptions {
    pub(crate) fn new() -> Self {
        Exceptions::default()
    }

    fn next(&mut self) -> u32 {
        self.issued += 1;
        self.issued
    }
}

/// Record an assertion outcome on `element`.
///
/// On failure the element's original content moves into a
/// `<del class="expected">`, followed by an `<ins class="actual">` carrying
/// `actual` (a non-breaking space when absent or falsy).
pub(crate) fn mark_status(
    doc: &mut Document,
    element: NodeId,
    successful: bool,
    actual: Option<&Value>,
) {
    // an empty cell would otherwise render invisibly
    if element_content(doc, element).is_empty() {
        doc.set_leading_text(element, NBSP);
    }

    let status = if successful { "success" } else { "failure" };
    let class = doc.attr(element, "class").unwrap_or_default();
    let class = format!("{class} {status}").trim().to_owned();
    doc.set_attr(element, "class", class);
    trace!("marked {status}");

    if successful {
        return;
    }

    let shown = match actual {
        Some(value) if value.truthy() => value.to_string(),
        _ => NBSP.to_owned(),
    };

    let expected = doc.create_element("del");
    doc.set_attr(expected, "class", "expected");
    let original: Vec<NodeId> = doc.children(element).collect();
    for child in original {
        doc.append(expected, child);
    }
    doc.append(element, expected);

    let actual = doc.create_element("ins");
    doc.set_attr(actual, "class", "actual");
    doc.append_text(actual, shown);
    doc.append(element, actual);
}

/// Record an exception against `element`: a message span, a toggle button
/// and a trace block are inserted as its next three siblings.
pub(crate) fn mark_exception(
    doc: &mut Document,
    element: NodeId,
    error: &EvalError,
    exceptions: &mut Exceptions,
) {
    let index = exceptions.next();
    trace!("marked exception {index}: {error}");

    let message = doc.create_element("span");
    doc.set_attr(message, "class", "exceptionMessage");
    doc.append_text(message, error.to_string());
    doc.insert_after(element, message);

    let button = doc.create_element("input");
    doc.set_attr(button, "class", "stackTraceButton");
    doc.set_attr(button, "data-exception-index", index.to_string());
    doc.set_attr(button, "type", "button");
    doc.set_attr(button, "value", "Toggle Stack");
    doc.insert_after(message, button);

    let trace = doc.create_element("div");
    doc.set_attr(trace, "class", format!("stackTrace {index}"));
    let heading = doc.create_element("p");
    doc.append_text(heading, "Traceback:");
    doc.append(trace, heading);
    for line in trace_lines(error) {
        let entry = doc.create_element("div");
        doc.set_attr(entry, "class", "stackTraceEntry");
        doc.append_text(entry, line);
        doc.append(trace, entry);
    }
    doc.insert_after(button, trace);
}

// The error display plus its source chain, one entry per line.
fn trace_lines(error: &EvalError) -> Vec<String> {
    let mut lines = vec![error.to_string()];
    let mut source = StdError::source(error);
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureError;

    fn spanned() -> (Document, NodeId) {
        let doc = Document::parse_str("<body><span>42</span></body>").unwrap();
        let root = doc.root_element().unwrap();
        let span = doc.children(root).next().unwrap();
        (doc, span)
    }

    #[test]
    fn success_only_touches_the_class() {
        let (mut doc, span) = spanned();
        mark_status(&mut doc, span, true, None);
        assert_eq!(doc.to_xhtml(), r#"<body><span class="success">42</span></body>"#);
    }

    #[test]
    fn class_values_accumulate() {
        let (mut doc, span) = spanned();
        doc.set_attr(span, "class", "bordered");
        mark_status(&mut doc, span, true, None);
        assert_eq!(doc.attr(span, "class"), Some("bordered success"));
    }

    #[test]
    fn failure_wraps_expected_and_actual() {
        let (mut doc, span) = spanned();
        mark_status(&mut doc, span, false, Some(&Value::from(41)));
        assert_eq!(
            doc.to_xhtml(),
            r#"<body><span class="failure"><del class="expected">42</del><ins class="actual">41</ins></span></body>"#
        );
    }

    #[test]
    fn empty_elements_get_a_visible_cell() {
        let mut doc = Document::parse_str("<body><span/></body>").unwrap();
        let root = doc.root_element().unwrap();
        let span = doc.children(root).next().unwrap();

        mark_status(&mut doc, span, false, None);
        let expected = format!(
            r#"<body><span class="failure"><del class="expected">{NBSP}</del><ins class="actual">{NBSP}</ins></span></body>"#
        );
        assert_eq!(doc.to_xhtml(), expected);
    }

    #[test]
    fn falsy_actual_values_render_as_a_space() {
        let (mut doc, span) = spanned();
        mark_status(&mut doc, span, false, Some(&Value::from("")));
        assert!(doc
            .to_xhtml()
            .contains(&format!(r#"<ins class="actual">{NBSP}</ins>"#)));
    }

    #[test]
    fn exceptions_insert_a_triple_with_increasing_indexes() {
        let mut doc =
            Document::parse_str("<body><span>a</span><span>b</span></body>").unwrap();
        let root = doc.root_element().unwrap();
        let spans: Vec<NodeId> = doc.children(root).collect();
        let mut exceptions = Exceptions::new();

        let boom = EvalError::from(FixtureError::new("kaboom"));
        mark_exception(&mut doc, spans[0], &boom, &mut exceptions);
        mark_exception(&mut doc, spans[1], &boom, &mut exceptions);

        let html = doc.to_xhtml();
        assert!(html.contains(r#"<span class="exceptionMessage">kaboom</span>"#));
        assert!(html.contains(
            r#"<input class="stackTraceButton" data-exception-index="1" type="button" value="Toggle Stack"/>"#
        ));
        assert!(html.contains(r#"<div class="stackTrace 2"><p>Traceback:</p>"#));
        assert!(html.contains(r#"<div class="stackTraceEntry">kaboom</div>"#));
    }

    #[test]
    fn triple_sits_directly_after_the_element() {
        let mut doc = Document::parse_str("<body><span>a</span><i>tail</i></body>").unwrap();
        let root = doc.root_element().unwrap();
        let span = doc.children(root).next().unwrap();
        let mut exceptions = Exceptions::new();

        let boom = EvalError::from(FixtureError::new("kaboom"));
        mark_exception(&mut doc, span, &boom, &mut exceptions);

        let tags: Vec<String> = doc
            .children(root)
            .filter_map(|id| doc.elem(id).map(|el| el.name.local.clone()))
            .collect();
        assert_eq!(tags, vec!["span", "span", "input", "div", "i"]);
    }

    #[test]
    fn trace_includes_the_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let error = EvalError::from(FixtureError::with_source("lookup failed", io));
        let lines = trace_lines(&error);
        assert_eq!(lines[0], "lookup failed");
        assert_eq!(lines[1], "caused by: disk on fire");
    }
}
