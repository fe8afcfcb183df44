use std::fs;
use std::path::Path;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{Attribute, LocalName, QualName, namespace_url, ns, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::error::DocumentError;
use crate::report::SectionKeywordSet;
use crate::structure::{NodeKind, StructuralNode, find_section};

/// Read-only view of a parsed HTML report, plus the few mutations the normalizer needs.
pub struct HtmlDocument {
    dom: RcDom,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Result<Self, DocumentError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|e| DocumentError::Html(e.to_string()))?;
        Ok(Self { dom })
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let bytes = fs::read(path).map_err(|e| DocumentError::io(path, e))?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    pub fn root(&self) -> HtmlNode {
        HtmlNode(self.dom.document.clone())
    }

    /// Every node below the document root in document order.
    pub fn nodes(&self) -> Vec<HtmlNode> {
        self.root().descendants()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<HtmlNode> {
        self.nodes()
            .into_iter()
            .filter(|node| node.is_element(tag))
            .collect()
    }

    pub fn body(&self) -> Option<HtmlNode> {
        self.elements_by_tag("body").into_iter().next()
    }

    pub fn find_section(&self, keywords: &SectionKeywordSet) -> Option<HtmlNode> {
        find_section(self.nodes(), keywords)
    }

    pub fn serialize(&self) -> Result<String, DocumentError> {
        let handle: SerializableHandle = self.dom.document.clone().into();
        let mut bytes = Vec::new();
        serialize(&mut bytes, &handle, SerializeOpts::default())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Handle to one node of an [`HtmlDocument`].
#[derive(Clone)]
pub struct HtmlNode(Handle);

fn parent_handle(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

impl HtmlNode {
    pub fn handle(&self) -> &Handle {
        &self.0
    }

    pub fn tag_name(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Element { name, .. } => Some(name.local.as_ref().to_ascii_lowercase()),
            _ => None,
        }
    }

    pub fn is_element(&self, tag: &str) -> bool {
        match &self.0.data {
            NodeData::Element { name, .. } => name.local.as_ref().eq_ignore_ascii_case(tag),
            _ => false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.data, NodeData::Text { .. })
    }

    pub fn children(&self) -> Vec<HtmlNode> {
        self.0
            .children
            .borrow()
            .iter()
            .map(|child| HtmlNode(child.clone()))
            .collect()
    }

    /// Descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<HtmlNode> {
        fn walk(node: &Handle, out: &mut Vec<HtmlNode>) {
            for child in node.children.borrow().iter() {
                out.push(HtmlNode(child.clone()));
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.0, &mut out);
        out
    }

    pub fn is_descendant_of(&self, ancestor: &HtmlNode) -> bool {
        let mut current = parent_handle(&self.0);
        while let Some(node) = current {
            if Rc::ptr_eq(&node, &ancestor.0) {
                return true;
            }
            current = parent_handle(&node);
        }
        false
    }

    pub fn same_node(&self, other: &HtmlNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
                .map(|attr| attr.value.to_string()),
            _ => None,
        }
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        let NodeData::Element { attrs, .. } = &self.0.data else {
            return;
        };
        let mut attrs = attrs.borrow_mut();
        if let Some(existing) = attrs
            .iter_mut()
            .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
        {
            existing.value = StrTendril::from(value.to_string());
        } else {
            attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(name)),
                value: StrTendril::from(value.to_string()),
            });
        }
    }

    pub fn remove_attr(&self, name: &str) {
        if let NodeData::Element { attrs, .. } = &self.0.data {
            attrs
                .borrow_mut()
                .retain(|attr| !attr.name.local.as_ref().eq_ignore_ascii_case(name));
        }
    }

    /// Raw contents of a text node.
    pub fn text_contents(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        }
    }

    pub fn set_text_contents(&self, text: &str) {
        if let NodeData::Text { contents } = &self.0.data {
            *contents.borrow_mut() = StrTendril::from(text.to_string());
        }
    }

    /// Unlinks the node from its parent.
    pub fn detach(&self) {
        if let Some(parent) = parent_handle(&self.0) {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(child, &self.0));
        }
        self.0.parent.set(None);
    }

    fn sibling(&self, offset: isize) -> Option<HtmlNode> {
        let parent = parent_handle(&self.0)?;
        let children = parent.children.borrow();
        let index = children.iter().position(|c| Rc::ptr_eq(c, &self.0))?;
        let target = index.checked_add_signed(offset)?;
        children.get(target).map(|node| HtmlNode(node.clone()))
    }
}

fn collect_text(node: &Handle, output: &mut String) {
    match &node.data {
        NodeData::Text { contents } => output.push_str(&contents.borrow()),
        NodeData::Element { name, .. } => match name.local.as_ref() {
            "script" | "style" | "template" => {}
            "br" => output.push('\n'),
            _ => {
                for child in node.children.borrow().iter() {
                    collect_text(child, output);
                }
            }
        },
        NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, output);
            }
        }
    }
}

impl StructuralNode for HtmlNode {
    fn kind(&self) -> NodeKind {
        match &self.0.data {
            NodeData::Text { .. } => NodeKind::TextRun,
            NodeData::Element { name, .. } => match name.local.as_ref() {
                "h1" => NodeKind::Heading(1),
                "h2" => NodeKind::Heading(2),
                "h3" => NodeKind::Heading(3),
                "h4" => NodeKind::Heading(4),
                "h5" => NodeKind::Heading(5),
                "h6" => NodeKind::Heading(6),
                "p" => NodeKind::Paragraph,
                "ul" | "ol" => NodeKind::List,
                "li" => NodeKind::ListItem,
                "table" => NodeKind::Table,
                "tr" => NodeKind::TableRow,
                "td" | "th" => NodeKind::TableCell,
                _ => NodeKind::Other,
            },
            _ => NodeKind::Other,
        }
    }

    fn next_sibling(&self) -> Option<Self> {
        self.sibling(1)
    }

    fn previous_sibling(&self) -> Option<Self> {
        self.sibling(-1)
    }

    fn parent(&self) -> Option<Self> {
        parent_handle(&self.0).map(HtmlNode)
    }

    fn text(&self) -> String {
        let mut output = String::new();
        collect_text(&self.0, &mut output);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_navigation() {
        let doc = HtmlDocument::parse(
            "<html><body><h2>Risks</h2><p>Intro</p><table><tr><td>x</td></tr></table></body></html>",
        )
        .unwrap();
        let heading = doc.elements_by_tag("h2").remove(0);
        assert_eq!(heading.kind(), NodeKind::Heading(2));

        let paragraph = heading.next_sibling().unwrap();
        assert_eq!(paragraph.kind(), NodeKind::Paragraph);
        assert_eq!(paragraph.text(), "Intro");

        let table = paragraph.next_sibling().unwrap();
        assert_eq!(table.kind(), NodeKind::Table);
        assert!(table.next_sibling().is_none());
        assert!(table.previous_sibling().unwrap().same_node(&paragraph));
        assert!(table.parent().unwrap().is_element("body"));
    }

    #[test]
    fn test_text_skips_scripts_and_keeps_breaks() {
        let doc = HtmlDocument::parse(
            "<div id='x'>one<br>two<script>var a = 1;</script><style>p{}</style></div>",
        )
        .unwrap();
        let div = doc.elements_by_tag("div").remove(0);
        assert_eq!(div.text(), "one\ntwo");
    }

    #[test]
    fn test_attribute_mutation() {
        let doc = HtmlDocument::parse("<p dir='rtl' class='a'>hi</p>").unwrap();
        let p = doc.elements_by_tag("p").remove(0);
        assert_eq!(p.attr("dir").as_deref(), Some("rtl"));
        p.set_attr("dir", "ltr");
        assert_eq!(p.attr("dir").as_deref(), Some("ltr"));
        p.set_attr("lang", "en");
        assert_eq!(p.attr("lang").as_deref(), Some("en"));
        p.remove_attr("class");
        assert!(p.attr("class").is_none());
    }

    #[test]
    fn test_detach_and_serialize() {
        let doc = HtmlDocument::parse("<body><p>keep</p><script>bad()</script></body>").unwrap();
        for script in doc.elements_by_tag("script") {
            script.detach();
        }
        let html = doc.serialize().unwrap();
        assert!(html.contains("<p>keep</p>"));
        assert!(!html.contains("bad()"));
    }

    #[test]
    fn test_find_section_uses_first_matching_heading() {
        let doc = HtmlDocument::parse(
            "<h1>Status Report</h1><h2>This Week</h2><h2>Current Week Accomplishments</h2>",
        )
        .unwrap();
        let heading = doc.find_section(&SectionKeywordSet::current_week()).unwrap();
        assert_eq!(heading.text(), "This Week");
    }
}
