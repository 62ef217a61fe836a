//! The annotation vocabulary and the command records built from it.

use crate::dom::{Document, NodeId};
use std::fmt;

/// The namespace URI that marks an attribute as a command annotation.
pub const COMMAND_NS: &str = "http://www.concordion.org/2007/concordion";

/// The closed command vocabulary. Any other local name in the command
/// namespace is a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Run,
    Execute,
    Set,
    AssertEquals,
    AssertTrue,
    AssertFalse,
    VerifyRows,
    Echo,
}

impl CommandKind {
    pub fn from_local(name: &str) -> Option<Self> {
        match name {
            "run" => Some(CommandKind::Run),
            "execute" => Some(CommandKind::Execute),
            "set" => Some(CommandKind::Set),
            "assertEquals" => Some(CommandKind::AssertEquals),
            "assertTrue" => Some(CommandKind::AssertTrue),
            "assertFalse" => Some(CommandKind::AssertFalse),
            "verifyRows" => Some(CommandKind::VerifyRows),
            "echo" => Some(CommandKind::Echo),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Run => "run",
            CommandKind::Execute => "execute",
            CommandKind::Set => "set",
            CommandKind::AssertEquals => "assertEquals",
            CommandKind::AssertTrue => "assertTrue",
            CommandKind::AssertFalse => "assertFalse",
            CommandKind::VerifyRows => "verifyRows",
            CommandKind::Echo => "echo",
        }
    }

    // Ordering applied when one element carries several annotations: inputs
    // bind before actions, actions before assertions.
    pub(crate) fn rank(self) -> u8 {
        match self {
            CommandKind::Set => 0,
            CommandKind::Execute => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One executable unit, derived from one annotation.
///
/// `element` is deliberately mutable: table iteration rebinds a header
/// command to the current row's cell before each run.
#[derive(Debug)]
pub struct Command {
    pub element: NodeId,
    pub expression: String,
    pub kind: CommandKind,
    pub children: Vec<Command>,
    pub column: Option<usize>,
}

impl Command {
    pub fn new(kind: CommandKind, element: NodeId, expression: &str) -> Self {
        Command {
            element,
            // `#` marks fixture variables in the source vocabulary
            expression: expression.replace('#', ""),
            kind,
            children: Vec::new(),
            column: None,
        }
    }
}

/// Whitespace normalization applied to every piece of document text handed
/// to the fixture or compared against: author soft line breaks (` _` at end
/// of line) are deleted, whitespace runs collapse to one space, ends are
/// trimmed.
pub fn normalize(text: &str) -> String {
    let text = text.replace(" _\n", "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The normalized textual content of an element, nested markup stripped.
pub fn element_content(doc: &Document, id: NodeId) -> String {
    normalize(&doc.text(id))
}

/// A table's body rows: direct `<tr>` children holding at least one `<td>`.
/// Header-only rows don't count.
pub(crate) fn body_rows(doc: &Document, table: NodeId) -> Vec<NodeId> {
    doc.children(table)
        .filter(|&id| doc.elem(id).is_some_and(|el| el.is_named("tr")))
        .filter(|&row| !row_cells(doc, row).is_empty())
        .collect()
}

/// The `<td>` children of a row, in order.
pub(crate) fn row_cells(doc: &Document, row: NodeId) -> Vec<NodeId> {
    doc.children(row)
        .filter(|&id| doc.elem(id).is_some_and(|el| el.is_named("td")))
        .collect()
}
