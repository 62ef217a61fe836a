//! Namespace-resolving parser built on `quick_xml`.

use super::{Attr, Document, ElementData, Name, NodeData, NodeId};
use crate::error::Error;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{QName, ResolveResult};
use quick_xml::reader::NsReader;
use std::fs;
use std::path::Path;

impl Document {
    pub fn parse_file(path: &Path) -> Result<Self, Error> {
        let source = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse_str(&source)
    }

    pub fn parse_str(source: &str) -> Result<Self, Error> {
        let mut reader = NsReader::from_str(source);
        let mut doc = Document::new();
        let mut open: Vec<NodeId> = vec![Document::DOCUMENT];

        loop {
            let (resolution, event) = reader.read_resolved_event()?;
            let parent = open.last().copied().unwrap_or(Document::DOCUMENT);
            match event {
                Event::Start(start) => {
                    let name = qualify(start.name(), &resolution);
                    let data = element(&reader, name, &start)?;
                    let id = doc.append_node(parent, NodeData::Element(data));
                    open.push(id);
                }
                Event::Empty(start) => {
                    let name = qualify(start.name(), &resolution);
                    let data = element(&reader, name, &start)?;
                    doc.append_node(parent, NodeData::Element(data));
                }
                Event::End(_) => {
                    if open.len() > 1 {
                        open.pop();
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    doc.append_node(parent, NodeData::Text(text));
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    doc.append_node(parent, NodeData::Text(text));
                }
                Event::Comment(comment) => {
                    let text = comment.unescape()?.into_owned();
                    doc.append_node(parent, NodeData::Comment(text));
                }
                Event::DocType(doctype) => {
                    let text = String::from_utf8_lossy(&doctype).trim().to_owned();
                    doc.append_node(parent, NodeData::Doctype(text));
                }
                Event::PI(pi) => {
                    let text = String::from_utf8_lossy(&pi).into_owned();
                    doc.append_node(parent, NodeData::Pi(text));
                }
                Event::Decl(_) => {}
                Event::Eof => break,
            }
        }

        Ok(doc)
    }
}

fn element(
    reader: &NsReader<&[u8]>,
    name: Name,
    start: &BytesStart,
) -> Result<ElementData, Error> {
    let mut attrs = Vec::new();

    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key;
        let value = attr.unescape_value()?.into_owned();

        // xmlns declarations stay plain attributes so they round-trip
        let name = if key.into_inner() == b"xmlns" || key.into_inner().starts_with(b"xmlns:") {
            qualify(key, &ResolveResult::Unbound)
        } else {
            let (resolution, _) = reader.resolve_attribute(key);
            qualify(key, &resolution)
        };

        attrs.push(Attr { name, value });
    }

    Ok(ElementData { name, attrs })
}

fn qualify(qname: QName, resolution: &ResolveResult) -> Name {
    let prefix = qname
        .prefix()
        .map(|p| String::from_utf8_lossy(p.into_inner()).into_owned());
    let local = String::from_utf8_lossy(qname.local_name().into_inner()).into_owned();
    let ns = match resolution {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.into_inner()).into_owned()),
        _ => None,
    };
    Name { prefix, local, ns }
}
