//! Discovers annotated elements, builds the command tree, drives execution
//! and finishes the document for browser display.

use crate::assets;
use crate::command::{body_rows, element_content, row_cells, Command, CommandKind, COMMAND_NS};
use crate::decorate::{mark_exception, mark_status, Exceptions};
use crate::dom::{Document, ElementData, NodeId};
use crate::error::Error;
use crate::expr::{self, EvalError};
use crate::fixture::{Fixture, TEXT_KEY};
use crate::summary::Summary;
use crate::value::Value;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// A processed spec: the decorated document and its outcome counts.
#[derive(Debug)]
pub struct Processed {
    pub document: Document,
    pub summary: Summary,
}

type FixtureFactory = Box<dyn Fn() -> Box<dyn Fixture>>;

/// Processes spec documents against fixtures.
///
/// ```
/// use exemplar::{MapFixture, Runner};
///
/// let source = r#"<html xmlns:concordion="http://www.concordion.org/2007/concordion">
/// <body><p>The greeting is <span concordion:assertEquals="greeting">hello</span>.</p></body>
/// </html>"#;
///
/// let mut fixture = MapFixture::new().var("greeting", "hello");
/// let processed = Runner::new().process_str(source, &mut fixture).unwrap();
/// assert!(processed.summary.has_succeeded());
/// ```
pub struct Runner {
    resource_base: String,
    fixtures: HashMap<String, FixtureFactory>,
}

impl Runner {
    pub fn new() -> Self {
        Runner {
            resource_base: "resources".to_owned(),
            fixtures: HashMap::new(),
        }
    }

    /// Base path used for the `src` of the appended script tags.
    pub fn resource_base(mut self, base: impl Into<String>) -> Self {
        self.resource_base = base.into();
        self
    }

    /// Register the fixture for a spec delegated to with `run`. The stem is
    /// the target's file name without the `.html` suffix; `<stem>Test`
    /// registrations are found too.
    pub fn register<F, X>(mut self, stem: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> X + 'static,
        X: Fixture + 'static,
    {
        self.fixtures
            .insert(stem.into(), Box::new(move || Box::new(factory())));
        self
    }

    /// Process an in-memory spec. `run` commands are rejected here since
    /// there is no directory to resolve them against.
    pub fn process_str(&self, source: &str, fixture: &mut dyn Fixture) -> Result<Processed, Error> {
        let doc = Document::parse_str(source)?;
        self.process_document(doc, fixture, None)
    }

    /// Process a spec file. Delegation targets resolve relative to its
    /// directory.
    pub fn process_file(&self, path: &Path, fixture: &mut dyn Fixture) -> Result<Processed, Error> {
        let doc = Document::parse_file(path)?;
        self.process_document(doc, fixture, path.parent())
    }

    /// Materialize the bundled stylesheet and interaction script under
    /// `dir`, which should correspond to [`resource_base`](Self::resource_base).
    pub fn write_resources(&self, dir: &Path) -> io::Result<()> {
        assets::write_resources(dir)
    }

    fn process_document(
        &self,
        mut doc: Document,
        fixture: &mut dyn Fixture,
        base: Option<&Path>,
    ) -> Result<Processed, Error> {
        let mut commands = build_commands(&doc)?;

        let mut session = Session {
            doc: &mut doc,
            fixture,
            exceptions: Exceptions::new(),
            runner: self,
            base,
        };
        for (_, command) in commands.iter_mut() {
            session.run(command)?;
        }

        self.finish_document(&mut doc)?;
        let summary = Summary::scan(&doc);
        Ok(Processed {
            document: doc,
            summary,
        })
    }

    // Appends the display appendix: a meta content-type first in head
    // (synthesizing head when absent), the bundled stylesheet, and the two
    // script references on the root element.
    fn finish_document(&self, doc: &mut Document) -> Result<(), Error> {
        let root = doc.root_element().ok_or(Error::NoRoot)?;

        let meta = doc.create_element("meta");
        doc.set_attr(meta, "http-equiv", "content-type");
        doc.set_attr(meta, "content", "text/html; charset=UTF-8");

        let head = doc
            .descendants(Document::DOCUMENT)
            .find(|&id| doc.elem(id).is_some_and(|el| el.is_named("head")));
        let head = match head {
            Some(head) => {
                doc.insert_first(head, meta);
                head
            }
            None => {
                let head = doc.create_element("head");
                doc.append(head, meta);
                // everything before <body> belongs in the new head
                let absorbed: Vec<NodeId> = doc
                    .children(root)
                    .take_while(|&id| !doc.elem(id).is_some_and(|el| el.is_named("body")))
                    .collect();
                for id in absorbed {
                    doc.append(head, id);
                }
                doc.insert_first(root, head);
                head
            }
        };

        let style = doc.create_element("style");
        doc.set_attr(style, "type", "text/css");
        doc.append_text(style, assets::STYLESHEET);
        doc.append(head, style);

        for file in [assets::JQUERY_FILE, assets::INTERACTION_FILE] {
            let script = doc.create_element("script");
            doc.set_attr(script, "src", format!("{}/js/{file}", self.resource_base));
            // the space keeps the tag from self-closing
            doc.append_text(script, " ");
            doc.append(root, script);
        }
        Ok(())
    }
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new()
    }
}

fn is_annotated(el: &ElementData) -> bool {
    el.name.ns.as_deref() == Some(COMMAND_NS)
        || el.attrs.iter().any(|a| a.name.ns.as_deref() == Some(COMMAND_NS))
}

/// Walk annotated elements in document order and build the root command map.
///
/// Placement walks ancestors: the first one already present as a root adopts
/// the new command; otherwise the command becomes a root itself. Roots keep
/// insertion order, and a repeated root element replaces its command in
/// place.
fn build_commands(doc: &Document) -> Result<IndexMap<NodeId, Command>, Error> {
    let mut roots: IndexMap<NodeId, Command> = IndexMap::new();

    let annotated: Vec<NodeId> = doc
        .descendants(Document::DOCUMENT)
        .filter(|&id| doc.elem(id).is_some_and(is_annotated))
        .collect();

    for id in annotated {
        let Some(el) = doc.elem(id) else { continue };

        let mut annotations: Vec<(CommandKind, &str)> = Vec::new();
        for attr in &el.attrs {
            if attr.name.ns.as_deref() != Some(COMMAND_NS) {
                continue;
            }
            let kind = CommandKind::from_local(&attr.name.local).ok_or_else(|| {
                Error::UnknownCommand {
                    name: attr.name.local.clone(),
                }
            })?;
            annotations.push((kind, &attr.value));
        }
        // inputs bind first when one element carries several annotations
        annotations.sort_by_key(|(kind, _)| kind.rank());

        for (kind, expression) in annotations {
            let mut command = Command::new(kind, id, expression);
            if el.is_named("th") {
                command.column = Some(th_index(doc, id)?);
            }
            debug!("discovered {} command, expression {:?}", kind, command.expression);
            place(doc, &mut roots, command);
        }
    }

    Ok(roots)
}

fn place(doc: &Document, roots: &mut IndexMap<NodeId, Command>, command: Command) {
    let mut cursor = command.element;
    while let Some(parent) = doc.parent(cursor) {
        if let Some(root) = roots.get_mut(&parent) {
            root.children.push(command);
            return;
        }
        cursor = parent;
    }
    roots.insert(command.element, command);
}

// Zero-based position of a header cell among its row's `<th>` children.
fn th_index(doc: &Document, th: NodeId) -> Result<usize, Error> {
    let row = doc.parent(th).ok_or(Error::HeaderIndex)?;
    doc.children(row)
        .filter(|&id| doc.elem(id).is_some_and(|el| el.is_named("th")))
        .position(|id| id == th)
        .ok_or(Error::HeaderIndex)
}

// Barrier-caught faults stay in the left lane; internal errors abort.
enum Fault {
    Eval(EvalError),
    Fatal(Error),
}

impl From<EvalError> for Fault {
    fn from(error: EvalError) -> Self {
        Fault::Eval(error)
    }
}

impl From<Error> for Fault {
    fn from(error: Error) -> Self {
        Fault::Fatal(error)
    }
}

/// One document run: the mutation domain of a single spec execution.
struct Session<'a> {
    doc: &'a mut Document,
    fixture: &'a mut dyn Fixture,
    exceptions: Exceptions,
    runner: &'a Runner,
    base: Option<&'a Path>,
}

impl Session<'_> {
    /// Execute one command behind the fault barrier: the element's content is
    /// published as `TEXT`, and any evaluation failure becomes an exception
    /// decoration instead of propagating.
    fn run(&mut self, command: &mut Command) -> Result<(), Error> {
        let content = element_content(self.doc, command.element);
        self.fixture.set(TEXT_KEY, Value::Str(content));
        debug!("running {}", command.kind);

        match self.dispatch(command) {
            Ok(()) => Ok(()),
            Err(Fault::Eval(error)) => {
                mark_exception(self.doc, command.element, &error, &mut self.exceptions);
                Ok(())
            }
            Err(Fault::Fatal(error)) => Err(error),
        }
    }

    fn dispatch(&mut self, command: &mut Command) -> Result<(), Fault> {
        match command.kind {
            CommandKind::Run => self.run_spec(command),
            CommandKind::Execute => self.execute(command),
            CommandKind::Set => self.set(command),
            CommandKind::AssertEquals => self.assert_equals(command),
            CommandKind::AssertTrue => self.assert_bool(command, true),
            CommandKind::AssertFalse => self.assert_bool(command, false),
            CommandKind::VerifyRows => self.verify_rows(command),
            CommandKind::Echo => self.echo(command),
        }
    }

    fn execute(&mut self, command: &mut Command) -> Result<(), Fault> {
        let is_table = self
            .doc
            .elem(command.element)
            .is_some_and(|el| el.is_named("table"));
        if !is_table {
            return self.run_phased(command);
        }

        for row in body_rows(self.doc, command.element) {
            let cells = row_cells(self.doc, row);
            for child in command.children.iter_mut() {
                let column = child.column.ok_or(EvalError::NoColumn)?;
                child.element = *cells.get(column).ok_or(EvalError::MissingCell { column })?;
            }
            self.run_phased(command)?;
        }
        Ok(())
    }

    // The central interleaving rule: inputs bound, then the action, then the
    // remaining (asserting) children.
    fn run_phased(&mut self, command: &mut Command) -> Result<(), Fault> {
        for child in command.children.iter_mut() {
            if child.kind == CommandKind::Set {
                self.run(child)?;
            }
        }
        let expr = expr::parse(&command.expression)?;
        expr::evaluate(&mut *self.fixture, &expr)?;
        for child in command.children.iter_mut() {
            if child.kind != CommandKind::Set {
                self.run(child)?;
            }
        }
        Ok(())
    }

    fn set(&mut self, command: &mut Command) -> Result<(), Fault> {
        let expr = expr::parse(&command.expression)?;
        let decomposed = expr.decompose();
        if decomposed.function_name.is_some() {
            expr::evaluate(&mut *self.fixture, &expr)?;
            return Ok(());
        }
        let name = decomposed
            .variable_name
            .ok_or_else(|| EvalError::Syntax(command.expression.clone()))?
            .to_owned();
        let content = element_content(self.doc, command.element);
        self.fixture.set(&name, Value::Str(content));
        Ok(())
    }

    fn assert_equals(&mut self, command: &mut Command) -> Result<(), Fault> {
        let expr = expr::parse(&command.expression)?;
        let value = expr::evaluate(&mut *self.fixture, &expr)?;
        // authors assert absence by writing the literal (None)
        let value = if value.is_null() {
            Value::from("(None)")
        } else {
            value
        };

        let expected = element_content(self.doc, command.element);
        if crate::command::normalize(&value.to_string()) == expected {
            mark_status(self.doc, command.element, true, None);
        } else {
            mark_status(self.doc, command.element, false, Some(&value));
        }
        Ok(())
    }

    fn assert_bool(&mut self, command: &mut Command, expect_true: bool) -> Result<(), Fault> {
        let expr = expr::parse(&command.expression)?;
        let value = expr::evaluate(&mut *self.fixture, &expr)?;
        let successful = value.truthy() == expect_true;
        let marker = if expect_true { "== false" } else { "== true" };
        mark_status(
            self.doc,
            command.element,
            successful,
            Some(&Value::from(marker)),
        );
        Ok(())
    }

    fn verify_rows(&mut self, command: &mut Command) -> Result<(), Fault> {
        let expr = expr::parse(&command.expression)?;
        let var = expr
            .decompose()
            .variable_name
            .ok_or_else(|| EvalError::NoRowVariable(command.expression.clone()))?
            .to_owned();
        let value = expr::evaluate(&mut *self.fixture, &expr)?;
        let Value::List(items) = value else {
            return Err(EvalError::NotACollection(command.expression.clone()).into());
        };

        let rows = body_rows(self.doc, command.element);
        for (item, row) in items.into_iter().zip(rows) {
            self.fixture.set(&var, item);
            let cells = row_cells(self.doc, row);
            for child in command.children.iter_mut() {
                let column = child.column.ok_or(EvalError::NoColumn)?;
                child.element = *cells.get(column).ok_or(EvalError::MissingCell { column })?;
                self.run(child)?;
            }
        }
        Ok(())
    }

    fn echo(&mut self, command: &mut Command) -> Result<(), Fault> {
        let expr = expr::parse(&command.expression)?;
        let value = expr::evaluate(&mut *self.fixture, &expr)?;
        if value.is_null() {
            let em = self.doc.create_element("em");
            self.doc.append_text(em, "None");
            self.doc.append(command.element, em);
        } else {
            self.doc.set_leading_text(command.element, &value.to_string());
        }
        mark_status(self.doc, command.element, true, None);
        Ok(())
    }

    // Delegate to another spec document. The target is resolved relative to
    // the current spec's directory and processed with its registered
    // fixture; its aggregate outcome decorates the `run` element.
    fn run_spec(&mut self, command: &mut Command) -> Result<(), Fault> {
        let href = self
            .doc
            .attr(command.element, "href")
            .ok_or(Error::MissingHref)?
            .to_owned();
        let base = self.base.ok_or(Error::NoBaseDir)?;

        let path = base.join(&href);
        if !path.exists() {
            return Err(Error::MissingSpec { path }.into());
        }

        let stem = spec_stem(&href);
        let factory = self
            .runner
            .fixtures
            .get(&stem)
            .or_else(|| self.runner.fixtures.get(&format!("{stem}Test")))
            .ok_or(Error::UnknownFixture { stem })?;

        let mut fixture = factory();
        let sub = self.runner.process_file(&path, fixture.as_mut())?;
        mark_status(
            self.doc,
            command.element,
            sub.summary.has_succeeded(),
            None,
        );
        Ok(())
    }
}

fn spec_stem(href: &str) -> String {
    let trimmed = href.strip_suffix(".html").unwrap_or(href);
    Path::new(trimmed)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_owned())
}
