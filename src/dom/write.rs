//! Serializer. Childless elements self-close, which is why appended
//! `<script>` tags carry a single-space text node.

use super::{Document, NodeData, NodeId};
use crate::encode;
use std::fmt::{self, Write as _};
use std::io;

enum Step {
    Open(NodeId),
    Close(NodeId),
}

impl Document {
    pub fn to_xhtml(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out)
            .expect("writing to a string should not fail");
        out
    }

    pub fn write_to<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(self.to_xhtml().as_bytes())
    }

    fn write_markup(&self, out: &mut String) -> fmt::Result {
        let mut steps: Vec<Step> = self.children(Document::DOCUMENT).map(Step::Open).collect();
        steps.reverse();

        while let Some(step) = steps.pop() {
            match step {
                Step::Open(id) => match self.data(id) {
                    NodeData::Element(el) => {
                        write!(out, "<{}", el.name.qualified())?;
                        for attr in &el.attrs {
                            write!(
                                out,
                                " {}=\"{}\"",
                                attr.name.qualified(),
                                encode::attr(&attr.value)
                            )?;
                        }
                        if self.first_child(id).is_none() {
                            out.push_str("/>");
                        } else {
                            out.push('>');
                            steps.push(Step::Close(id));
                            let at = steps.len();
                            steps.extend(self.children(id).map(Step::Open));
                            steps[at..].reverse();
                        }
                    }
                    NodeData::Text(text) => out.push_str(&encode::text(text)),
                    NodeData::Comment(text) => write!(out, "<!--{text}-->")?,
                    NodeData::Doctype(text) => write!(out, "<!DOCTYPE {text}>")?,
                    NodeData::Pi(text) => write!(out, "<?{text}?>")?,
                    NodeData::Document => {}
                },
                Step::Close(id) => {
                    if let NodeData::Element(el) = self.data(id) {
                        write!(out, "</{}>", el.name.qualified())?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn assert_round_trip(source: &str) {
        let doc = Document::parse_str(source).unwrap();
        assert_eq!(doc.to_xhtml(), source);
    }

    #[test]
    fn round_trips() {
        assert_round_trip("<html><body><p>hi <b>there</b></p></body></html>");
        assert_round_trip(r#"<html a="1" b="2"><br/>tail</html>"#);
        assert_round_trip("<!DOCTYPE html><html><!-- note --><body/></html>");
        assert_round_trip(
            r#"<html xmlns:concordion="http://www.concordion.org/2007/concordion"><span concordion:echo="x"/></html>"#,
        );
    }

    #[test]
    fn escapes_on_the_way_out() {
        let doc = Document::parse_str("<p>a &amp; b</p>").unwrap();
        assert_eq!(doc.to_xhtml(), "<p>a &amp; b</p>");

        let mut doc = Document::parse_str("<p/>").unwrap();
        let root = doc.root_element().unwrap();
        doc.set_attr(root, "title", "say \"hi\"");
        assert_eq!(doc.to_xhtml(), r#"<p title="say &quot;hi&quot;"/>"#);
    }

    #[test]
    fn childless_elements_self_close() {
        let mut doc = Document::parse_str("<div></div>").unwrap();
        assert_eq!(doc.to_xhtml(), "<div/>");

        // a lone space keeps the element open
        let root = doc.root_element().unwrap();
        doc.append_text(root, " ");
        assert_eq!(doc.to_xhtml(), "<div> </div>");
    }

    #[test]
    fn write_to_matches_to_xhtml() {
        let doc = Document::parse_str("<p>x</p>").unwrap();
        let mut buf = Vec::new();
        doc.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), doc.to_xhtml());
    }
}
