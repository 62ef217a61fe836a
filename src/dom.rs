//! In-place mutable document tree with namespace-aware names.
//!
//! Nodes live in a single vector owned by [`Document`]; a [`NodeId`] is an
//! index into it. Parent, sibling and child links are ids, so rebinding a
//! reference to another element is a copy and identity comparison is `==`.

pub mod parse;
pub mod write;

use std::iter;
use std::num::NonZeroU32;

/// A node identifier. Only meaningful with the [`Document`] it came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(NonZeroU32);

/// A qualified name: optional prefix, local part, and the namespace URI the
/// prefix resolved to at parse time (`None` for unprefixed attributes and
/// unbound names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub prefix: Option<String>,
    pub local: String,
    pub ns: Option<String>,
}

impl Name {
    pub fn local(local: impl Into<String>) -> Self {
        Name {
            prefix: None,
            local: local.into(),
            ns: None,
        }
    }

    /// The name as written in markup: `prefix:local` or bare `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attr {
    pub name: Name,
    pub value: String,
}

/// An element: tag name plus attributes in document order.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: Name,
    pub attrs: Vec<Attr>,
}

impl ElementData {
    /// Tag name check, ignoring ASCII case. Namespaces are not consulted;
    /// spec documents use plain HTML tag names.
    pub fn is_named(&self, local: &str) -> bool {
        self.name.local.eq_ignore_ascii_case(local)
    }

    /// Look up an unprefixed attribute by name.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.prefix.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, local: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|a| a.name.prefix.is_none() && a.name.local == local)
        {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attr {
                name: Name::local(local),
                value,
            }),
        }
    }

    /// True when the space-delimited `class` attribute contains `token`.
    pub fn has_class(&self, token: &str) -> bool {
        self.attr("class")
            .unwrap_or("")
            .split_whitespace()
            .any(|t| t == token)
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
    Pi(String),
}

#[derive(Debug)]
pub(crate) struct Node {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Node {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            data,
        }
    }
}

/// A document tree. All mutation happens in place.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// The id of the document node itself, parent of the root element and of
    /// any doctype or top-level comments.
    pub const DOCUMENT: NodeId = match NonZeroU32::new(1) {
        Some(id) => NodeId(id),
        None => unreachable!(),
    };

    pub(crate) fn new() -> Self {
        Document {
            // index 0 is padding so ids can be non-zero
            nodes: vec![Node::new(NodeData::Document), Node::new(NodeData::Document)],
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0.get() as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0.get() as usize]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let index = u32::try_from(self.nodes.len()).expect("document node index overflow");
        self.nodes.push(Node::new(data));
        match NonZeroU32::new(index) {
            Some(id) => NodeId(id),
            // the two seed nodes guarantee a non-zero index
            None => unreachable!(),
        }
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn elem(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn elem_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Shorthand for an unprefixed attribute lookup on an element node.
    pub fn attr(&self, id: NodeId, local: &str) -> Option<&str> {
        self.elem(id).and_then(|el| el.attr(local))
    }

    pub fn set_attr(&mut self, id: NodeId, local: &str, value: impl Into<String>) {
        if let Some(el) = self.elem_mut(id) {
            el.set_attr(local, value);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Direct children, in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(self.node(id).first_child, move |&child| {
            self.node(child).next_sibling
        })
    }

    /// The node and its ancestors up to the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(Some(id), move |&node| self.node(node).parent)
    }

    /// All descendants of `id`, depth first, in document order. `id` itself
    /// is not yielded.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        iter::from_fn(move || {
            let id = stack.pop()?;
            let at = stack.len();
            stack.extend(self.children(id));
            stack[at..].reverse();
            Some(id)
        })
    }

    /// The root element, if the document has one.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(Document::DOCUMENT)
            .find(|&id| self.elem(id).is_some())
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: Name::local(tag),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub(crate) fn append_node(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.push(data);
        self.append(parent, id);
        id
    }

    /// Append a text child.
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.create_text(text);
        self.append(parent, id);
        id
    }

    /// Unlink a node from its parent and siblings. The node stays in the
    /// arena and can be re-attached.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.node_mut(id);
            (
                node.parent.take(),
                node.prev_sibling.take(),
                node.next_sibling.take(),
            )
        };

        if let Some(next) = next {
            self.node_mut(next).prev_sibling = prev;
        } else if let Some(parent) = parent {
            self.node_mut(parent).last_child = prev;
        }

        if let Some(prev) = prev {
            self.node_mut(prev).next_sibling = next;
        } else if let Some(parent) = parent {
            self.node_mut(parent).first_child = next;
        }
    }

    /// Move `child` (detaching it first) to the end of `parent`'s children.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        if let Some(last) = self.node_mut(parent).last_child.take() {
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(last).next_sibling = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// Move `new` (detaching it first) to sit immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new: NodeId) {
        self.detach(new);
        self.node_mut(new).parent = self.node(sibling).parent;
        self.node_mut(new).next_sibling = Some(sibling);
        if let Some(prev) = self.node_mut(sibling).prev_sibling.take() {
            self.node_mut(new).prev_sibling = Some(prev);
            self.node_mut(prev).next_sibling = Some(new);
        } else if let Some(parent) = self.node(sibling).parent {
            self.node_mut(parent).first_child = Some(new);
        }
        self.node_mut(sibling).prev_sibling = Some(new);
    }

    /// Move `new` (detaching it first) to sit immediately after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) {
        match self.node(sibling).next_sibling {
            Some(next) => self.insert_before(next, new),
            None => {
                if let Some(parent) = self.node(sibling).parent {
                    self.append(parent, new);
                }
            }
        }
    }

    /// Move `new` (detaching it first) to be `parent`'s first child.
    pub fn insert_first(&mut self, parent: NodeId, new: NodeId) {
        match self.node(parent).first_child {
            Some(first) => self.insert_before(first, new),
            None => self.append(parent, new),
        }
    }

    /// Concatenated text of all descendant text nodes, in document order.
    /// For a text node, its own text.
    pub fn text(&self, id: NodeId) -> String {
        if let NodeData::Text(t) = self.data(id) {
            return t.clone();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeData::Text(t) = self.data(node) {
                out.push_str(t);
            }
        }
        out
    }

    /// Replace the text that leads the node's children (the text before the
    /// first child element), creating a text node when there is none. Child
    /// elements are untouched.
    pub fn set_leading_text(&mut self, id: NodeId, text: &str) {
        match self.node(id).first_child {
            Some(first) => {
                if let NodeData::Text(t) = &mut self.node_mut(first).data {
                    *t = text.to_owned();
                } else {
                    let new = self.create_text(text);
                    self.insert_before(first, new);
                }
            }
            None => {
                self.append_text(id, text);
            }
        }
    }

    pub(crate) fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_a_tree() {
        let mut doc = Document::new();
        let root = doc.create_element("html");
        doc.append(Document::DOCUMENT, root);
        let body = doc.create_element("body");
        doc.append(root, body);
        doc.append_text(body, "hello");

        assert_eq!(doc.root_element(), Some(root));
        assert_eq!(doc.children(root).count(), 1);
        assert_eq!(doc.text(root), "hello");
        assert!(doc.elem(body).unwrap().is_named("BODY"));
    }

    #[test]
    fn text_concatenates_descendants() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append(Document::DOCUMENT, p);
        doc.append_text(p, "a ");
        let b = doc.create_element("b");
        doc.append(p, b);
        doc.append_text(b, "bold");
        doc.append_text(p, " z");

        assert_eq!(doc.text(p), "a bold z");
    }

    #[test]
    fn descendants_in_document_order() {
        let mut doc = Document::new();
        let root = doc.create_element("r");
        doc.append(Document::DOCUMENT, root);
        let a = doc.create_element("a");
        doc.append(root, a);
        let b = doc.create_element("b");
        doc.append(a, b);
        let c = doc.create_element("c");
        doc.append(root, c);

        let order: Vec<NodeId> = doc.descendants(root).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn insertion_ordering() {
        let mut doc = Document::new();
        let root = doc.create_element("r");
        doc.append(Document::DOCUMENT, root);
        let a = doc.create_element("a");
        doc.append(root, a);
        let b = doc.create_element("b");
        doc.insert_after(a, b);
        let c = doc.create_element("c");
        doc.insert_after(b, c);
        let z = doc.create_element("z");
        doc.insert_first(root, z);

        let tags: Vec<String> = doc
            .children(root)
            .map(|id| doc.elem(id).unwrap().name.local.clone())
            .collect();
        assert_eq!(tags, vec!["z", "a", "b", "c"]);
    }

    #[test]
    fn detach_and_reattach() {
        let mut doc = Document::new();
        let root = doc.create_element("r");
        doc.append(Document::DOCUMENT, root);
        let a = doc.create_element("a");
        doc.append(root, a);
        let b = doc.create_element("b");
        doc.append(root, b);

        doc.detach(a);
        assert_eq!(doc.children(root).count(), 1);
        doc.append(b, a);
        assert_eq!(doc.parent(a), Some(b));
    }

    #[test]
    fn leading_text_replacement() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.append(Document::DOCUMENT, span);

        doc.set_leading_text(span, "one");
        assert_eq!(doc.text(span), "one");

        doc.set_leading_text(span, "two");
        assert_eq!(doc.text(span), "two");
        assert_eq!(doc.children(span).count(), 1);

        // a leading element gets a fresh text node in front of it
        let em = doc.create_element("em");
        doc.insert_first(span, em);
        doc.set_leading_text(span, "three");
        assert_eq!(doc.text(span), "threetwo");
    }

    #[test]
    fn class_tokens() {
        let mut doc = Document::new();
        let el = doc.create_element("td");
        doc.append(Document::DOCUMENT, el);
        doc.set_attr(el, "class", "bordered success");

        let data = doc.elem(el).unwrap();
        assert!(data.has_class("success"));
        assert!(data.has_class("bordered"));
        assert!(!data.has_class("succ"));
    }
}
