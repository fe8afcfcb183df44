//! Node capability shared by the HTML source tree and the output document tree.
//!
//! The section locator only needs to know what a node is, how to reach its neighbours and
//! what text it carries. Both trees implement [`StructuralNode`] through thin adapters
//! (`parsing::HtmlNode` and `docx::DocNode`), so heading matching is written once.

use crate::report::SectionKeywordSet;

/// Deepest heading level that delimits a report section.
pub const MAX_SECTION_HEADING_LEVEL: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Heading(u8),
    Paragraph,
    List,
    ListItem,
    Table,
    TableRow,
    TableCell,
    TextRun,
    Other,
}

pub trait StructuralNode: Clone {
    fn kind(&self) -> NodeKind;
    fn next_sibling(&self) -> Option<Self>;
    fn previous_sibling(&self) -> Option<Self>;
    fn parent(&self) -> Option<Self>;
    /// Full text of the node and its descendants.
    fn text(&self) -> String;

    /// Whether this node delimits a section.
    fn is_heading(&self) -> bool {
        matches!(self.kind(), NodeKind::Heading(level) if (1..=MAX_SECTION_HEADING_LEVEL).contains(&level))
    }

    /// Siblings after this node, stopping before the next heading.
    fn section_siblings(&self) -> Vec<Self> {
        let mut nodes = Vec::new();
        let mut current = self.next_sibling();
        while let Some(node) = current {
            if node.is_heading() {
                break;
            }
            current = node.next_sibling();
            nodes.push(node);
        }
        nodes
    }
}

/// Returns the first heading, in the order `nodes` yields them, whose lowercased text
/// contains any keyword. `None` means the section is absent; callers skip it.
pub fn find_section<N, I>(nodes: I, keywords: &SectionKeywordSet) -> Option<N>
where
    N: StructuralNode,
    I: IntoIterator<Item = N>,
{
    nodes
        .into_iter()
        .filter(|node| node.is_heading())
        .find(|node| keywords.matches(&node.text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// Flat sibling list, enough to exercise the locator without either real tree.
    #[derive(Clone)]
    struct FlatNode {
        items: Rc<Vec<(NodeKind, &'static str)>>,
        index: usize,
    }

    impl StructuralNode for FlatNode {
        fn kind(&self) -> NodeKind {
            self.items[self.index].0
        }

        fn next_sibling(&self) -> Option<Self> {
            (self.index + 1 < self.items.len()).then(|| FlatNode {
                items: self.items.clone(),
                index: self.index + 1,
            })
        }

        fn previous_sibling(&self) -> Option<Self> {
            self.index.checked_sub(1).map(|index| FlatNode {
                items: self.items.clone(),
                index,
            })
        }

        fn parent(&self) -> Option<Self> {
            None
        }

        fn text(&self) -> String {
            self.items[self.index].1.to_string()
        }
    }

    fn flat(items: Vec<(NodeKind, &'static str)>) -> Vec<FlatNode> {
        let items = Rc::new(items);
        (0..items.len())
            .map(|index| FlatNode {
                items: items.clone(),
                index,
            })
            .collect()
    }

    #[test]
    fn test_finds_single_matching_heading() {
        let nodes = flat(vec![
            (NodeKind::Heading(1), "Weekly Report"),
            (NodeKind::Paragraph, "intro"),
            (NodeKind::Heading(2), "Key Risks"),
            (NodeKind::Paragraph, "none"),
        ]);
        let found = find_section(nodes, &SectionKeywordSet::risks()).unwrap();
        assert_eq!(found.index, 2);
    }

    #[test]
    fn test_not_found_is_none() {
        let nodes = flat(vec![
            (NodeKind::Heading(1), "Weekly Report"),
            (NodeKind::Paragraph, "risk is mentioned in a paragraph only"),
        ]);
        assert!(find_section(nodes, &SectionKeywordSet::risks()).is_none());
    }

    #[test]
    fn test_earliest_heading_wins() {
        let nodes = flat(vec![
            (NodeKind::Heading(2), "Upcoming milestones"),
            (NodeKind::Heading(2), "Next Week Goals"),
        ]);
        let found = find_section(nodes, &SectionKeywordSet::next_week()).unwrap();
        assert_eq!(found.index, 0);
    }

    #[test]
    fn test_deep_headings_do_not_count() {
        let nodes = flat(vec![(NodeKind::Heading(5), "Risks")]);
        assert!(find_section(nodes, &SectionKeywordSet::risks()).is_none());
    }

    #[test]
    fn test_section_siblings_stop_at_next_heading() {
        let nodes = flat(vec![
            (NodeKind::Heading(2), "Risks"),
            (NodeKind::Paragraph, "a"),
            (NodeKind::Table, "b"),
            (NodeKind::Heading(2), "Next"),
            (NodeKind::Paragraph, "c"),
        ]);
        let siblings = nodes[0].section_siblings();
        let texts: Vec<String> = siblings.iter().map(|n| n.text()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
