//! Reads a `.docx` package into a [`Document`].
//!
//! Paragraphs, plain runs, tables and the primary header/footer become model nodes. Any
//! other element is kept as raw XML in place, and every part the model does not own is
//! carried in [`Package::parts`] so it is written back untouched.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, warn};
use zip::ZipArchive;

use crate::docx::format::{
    Alignment, CellFormat, Font, ParagraphFormat, PreservedProperty, RowFormat, StyleId, TableFormat,
};
use crate::docx::xml::{
    CONTENT_TYPES_NS, PKG_REL_NS, REL_FOOTER, REL_HEADER, REL_NS, REL_OFFICE_DOCUMENT, WML_NS, is_wml,
    raw_xml, twips_attr, wml, wml_bool,
};
use crate::docx::{BreakKind, Document, HeaderFooterKind, NodeData, NodeId, Package, Relationship};
use crate::error::DocumentError;

pub(crate) const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";
const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

/// Run children the model represents; runs with anything else stay raw.
const PLAIN_RUN_CHILDREN: &[&str] = &["rPr", "t", "tab", "br", "cr", "lastRenderedPageBreak"];

pub fn read_docx(path: &Path) -> Result<Document, DocumentError> {
    let file = File::open(path).map_err(|e| DocumentError::io(path, e))?;
    let mut archive = ZipArchive::new(file)?;
    let mut parts = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| DocumentError::io(path, e))?;
        parts.insert(entry.name().to_string(), bytes);
    }
    debug!("Read {} parts from {}", parts.len(), path.display());
    read_parts(parts)
}

/// Builds a document from already extracted package parts.
pub fn read_parts(mut parts: BTreeMap<String, Vec<u8>>) -> Result<Document, DocumentError> {
    let mut doc = Document::new();
    let mut package = Package::default();

    if let Some(bytes) = parts.remove("[Content_Types].xml") {
        let text = part_text(&bytes);
        let xml = parse_part("[Content_Types].xml", &text)?;
        for node in xml.root_element().children().filter(|n| n.is_element()) {
            if node.tag_name().namespace() != Some(CONTENT_TYPES_NS) {
                continue;
            }
            match (node.tag_name().name(), node.attribute("ContentType")) {
                ("Default", Some(ct)) => {
                    if let Some(ext) = node.attribute("Extension") {
                        package
                            .content_type_defaults
                            .push((ext.to_ascii_lowercase(), ct.to_string()));
                    }
                }
                ("Override", Some(ct)) => {
                    if let Some(name) = node.attribute("PartName") {
                        package.content_type_overrides.push((name.to_string(), ct.to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    let document_part = match parts.get("_rels/.rels") {
        Some(bytes) => parse_relationships("_rels/.rels", &part_text(bytes))?
            .into_iter()
            .find(|rel| rel.rel_type == REL_OFFICE_DOCUMENT)
            .map(|rel| resolve_target("", &rel.target))
            .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string()),
        None => DEFAULT_DOCUMENT_PART.to_string(),
    };
    let bytes = parts
        .remove(&document_part)
        .ok_or_else(|| DocumentError::MissingPart(document_part.clone()))?;
    if let Some(rels) = parts.remove(&rels_part_name(&document_part)) {
        package.relationships = parse_relationships(&document_part, &part_text(&rels))?;
    }
    if document_part != DEFAULT_DOCUMENT_PART {
        package.document_part = Some(document_part.clone());
    }

    let text = part_text(&bytes);
    let xml = parse_part(&document_part, &text)?;
    let root = xml.root_element();
    collect_namespaces(&mut package.namespaces, root);
    package.ignorable = root.attribute((MC_NS, "Ignorable")).map(str::to_string);

    let body_node = wml(root, "body").ok_or_else(|| DocumentError::MissingPart(format!("{document_part}#body")))?;
    let body = doc.body();
    read_blocks(&mut doc, &text, body, body_node);

    let base_dir = part_directory(&document_part);
    let section = body_node.children().filter(|n| is_wml(*n, "sectPr")).last();
    if let Some(section) = section {
        for child in section.children().filter(|n| n.is_element()) {
            let kind = if is_wml(child, "headerReference") {
                Some(HeaderFooterKind::HeaderPrimary)
            } else if is_wml(child, "footerReference") {
                Some(HeaderFooterKind::FooterPrimary)
            } else {
                None
            };
            let primary = child.attribute((WML_NS, "type")).is_none_or(|t| t == "default");
            let rel_id = child.attribute((REL_NS, "id"));
            if let (Some(kind), true, Some(rel_id)) = (kind, primary, rel_id) {
                match load_header_footer(&mut doc, &mut package, &mut parts, &base_dir, kind, rel_id) {
                    Ok(()) => continue,
                    Err(e) => warn!("Keeping {rel_id} as raw section property: {e}"),
                }
            }
            package.section_properties.push(raw_xml(&text, child).to_string());
        }
    }

    package.parts = parts;
    doc.package = package;
    Ok(doc)
}

fn load_header_footer(
    doc: &mut Document,
    package: &mut Package,
    parts: &mut BTreeMap<String, Vec<u8>>,
    base_dir: &str,
    kind: HeaderFooterKind,
    rel_id: &str,
) -> Result<(), DocumentError> {
    let expected_type = match kind {
        HeaderFooterKind::HeaderPrimary => REL_HEADER,
        HeaderFooterKind::FooterPrimary => REL_FOOTER,
    };
    let index = package
        .relationships
        .iter()
        .position(|rel| rel.id == rel_id && rel.rel_type == expected_type)
        .ok_or_else(|| DocumentError::MissingPart(format!("relationship {rel_id}")))?;
    let part = resolve_target(base_dir, &package.relationships[index].target);
    let bytes = parts
        .get(&part)
        .ok_or_else(|| DocumentError::MissingPart(part.clone()))?;
    let text = part_text(bytes);
    let xml = parse_part(&part, &text)?;
    let root = xml.root_element();
    collect_namespaces(&mut package.namespaces, root);

    let container = doc.ensure_header_footer(kind);
    read_blocks(doc, &text, container, root);

    parts.remove(&part);
    package.relationships.remove(index);
    match kind {
        HeaderFooterKind::HeaderPrimary => package.header_part = Some(part),
        HeaderFooterKind::FooterPrimary => package.footer_part = Some(part),
    }
    Ok(())
}

fn part_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

fn parse_part<'a>(part: &str, text: &'a str) -> Result<roxmltree::Document<'a>, DocumentError> {
    roxmltree::Document::parse(text).map_err(|source| DocumentError::Xml {
        part: part.to_string(),
        source,
    })
}

fn collect_namespaces(into: &mut Vec<(String, String)>, root: roxmltree::Node) {
    for ns in root.namespaces() {
        let Some(prefix) = ns.name() else {
            continue;
        };
        if prefix == "xml" || into.iter().any(|(p, _)| p == prefix) {
            continue;
        }
        into.push((prefix.to_string(), ns.uri().to_string()));
    }
}

pub(crate) fn parse_relationships(part: &str, text: &str) -> Result<Vec<Relationship>, DocumentError> {
    let xml = parse_part(part, text)?;
    Ok(xml
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter(|n| n.tag_name().namespace() == Some(PKG_REL_NS))
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type")?.to_string(),
                target: n.attribute("Target")?.to_string(),
                external: n.attribute("TargetMode") == Some("External"),
            })
        })
        .collect())
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub(crate) fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

pub(crate) fn part_directory(part: &str) -> String {
    part.rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default()
}

/// Zip path of a relationship target relative to `base_dir`.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn visible_text(node: roxmltree::Node) -> String {
    node.descendants()
        .filter(|n| is_wml(*n, "t"))
        .filter_map(|n| n.text())
        .collect()
}

fn append_raw(doc: &mut Document, source: &str, parent: NodeId, node: roxmltree::Node) {
    doc.append_child(
        parent,
        NodeData::Raw {
            xml: raw_xml(source, node).to_string(),
            text: visible_text(node),
        },
    );
}

fn preserve(source: &str, node: roxmltree::Node) -> PreservedProperty {
    PreservedProperty {
        name: node.tag_name().name().to_string(),
        xml: raw_xml(source, node).to_string(),
    }
}

/// Block-level children of a body, header, footer or cell. Section properties are left to
/// the caller.
fn read_blocks(doc: &mut Document, source: &str, container: NodeId, parent: roxmltree::Node) {
    for child in parent.children().filter(|n| n.is_element()) {
        if is_wml(child, "p") {
            read_paragraph(doc, source, container, child);
        } else if is_wml(child, "tbl") {
            read_table(doc, source, container, child);
        } else if is_wml(child, "sectPr") || is_wml(child, "tcPr") {
            continue;
        } else {
            append_raw(doc, source, container, child);
        }
    }
}

fn read_paragraph(doc: &mut Document, source: &str, container: NodeId, node: roxmltree::Node) {
    let format = wml(node, "pPr")
        .map(|ppr| read_ppr(source, ppr))
        .unwrap_or_default();
    let paragraph = doc.append_child(container, NodeData::Paragraph(format));
    for child in node.children().filter(|n| n.is_element()) {
        if is_wml(child, "pPr") {
            continue;
        }
        if is_wml(child, "r") && is_plain_run(child) {
            read_run(doc, source, paragraph, child);
        } else {
            append_raw(doc, source, paragraph, child);
        }
    }
}

fn is_plain_run(run: roxmltree::Node) -> bool {
    run.children()
        .filter(|n| n.is_element())
        .all(|n| PLAIN_RUN_CHILDREN.iter().any(|name| is_wml(n, name)))
}

fn read_run(doc: &mut Document, source: &str, paragraph: NodeId, node: roxmltree::Node) {
    let font = wml(node, "rPr")
        .map(|rpr| read_rpr(source, rpr))
        .unwrap_or_default();
    let mut text = String::new();
    let flush = |doc: &mut Document, text: &mut String| {
        if !text.is_empty() {
            doc.append_child(
                paragraph,
                NodeData::Run {
                    text: std::mem::take(text),
                    font: font.clone(),
                },
            );
        }
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "t" => text.push_str(child.text().unwrap_or_default()),
            "tab" => text.push('\t'),
            "br" | "cr" => {
                flush(doc, &mut text);
                let kind = match child.attribute((WML_NS, "type")) {
                    Some("page") => BreakKind::Page,
                    _ => BreakKind::Line,
                };
                doc.append_child(paragraph, NodeData::Break(kind));
            }
            _ => {}
        }
    }
    flush(doc, &mut text);
}

fn read_ppr(source: &str, ppr: roxmltree::Node) -> ParagraphFormat {
    let mut format = ParagraphFormat::default();
    for child in ppr.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() == Some(WML_NS) {
            let val = child.attribute((WML_NS, "val"));
            match child.tag_name().name() {
                "pStyle" => {
                    if let Some(style) = val {
                        format.style = StyleId::from_style_id(style);
                        continue;
                    }
                }
                "keepNext" => {
                    format.keep_with_next = wml_bool(ppr, "keepNext").unwrap_or(false);
                    continue;
                }
                "pageBreakBefore" => {
                    format.page_break_before = wml_bool(ppr, "pageBreakBefore").unwrap_or(false);
                    continue;
                }
                "jc" => {
                    if let Some(alignment) = val.and_then(Alignment::from_wml) {
                        format.alignment = Some(alignment);
                        continue;
                    }
                }
                "spacing" => {
                    // Also preserved so line spacing survives a rewrite.
                    format.space_before = twips_attr(child, "before");
                    format.space_after = twips_attr(child, "after");
                }
                _ => {}
            }
        }
        format.preserved.push(preserve(source, child));
    }
    format
}

fn read_rpr(source: &str, rpr: roxmltree::Node) -> Font {
    let mut font = Font::default();
    for child in rpr.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() == Some(WML_NS) {
            match child.tag_name().name() {
                "rFonts" => {
                    if let Some(name) = child.attribute((WML_NS, "ascii")) {
                        font.name = Some(name.to_string());
                        continue;
                    }
                }
                "b" => {
                    font.bold = wml_bool(rpr, "b").unwrap_or(false);
                    continue;
                }
                "i" => {
                    font.italic = wml_bool(rpr, "i").unwrap_or(false);
                    continue;
                }
                "sz" => {
                    if let Some(half_points) = child
                        .attribute((WML_NS, "val"))
                        .and_then(|v| v.parse::<f64>().ok())
                    {
                        font.size = Some(half_points / 2.0);
                        continue;
                    }
                }
                _ => {}
            }
        }
        font.preserved.push(preserve(source, child));
    }
    font
}

fn read_table(doc: &mut Document, source: &str, container: NodeId, node: roxmltree::Node) {
    let preserved = node
        .children()
        .filter(|n| is_wml(*n, "tblPr") || is_wml(*n, "tblGrid"))
        .map(|n| preserve(source, n))
        .collect();
    let table = doc.append_child(container, NodeData::Table(TableFormat { preserved }));
    for child in node.children().filter(|n| n.is_element()) {
        if is_wml(child, "tblPr") || is_wml(child, "tblGrid") {
            continue;
        }
        if is_wml(child, "tr") {
            read_row(doc, source, table, child);
        } else {
            append_raw(doc, source, table, child);
        }
    }
}

fn read_row(doc: &mut Document, source: &str, table: NodeId, node: roxmltree::Node) {
    let mut format = RowFormat::default();
    if let Some(trpr) = wml(node, "trPr") {
        for child in trpr.children().filter(|n| n.is_element()) {
            if is_wml(child, "tblHeader") {
                format.heading_format = wml_bool(trpr, "tblHeader").unwrap_or(false);
            } else {
                format.preserved.push(preserve(source, child));
            }
        }
    }
    let row = doc.append_child(table, NodeData::Row(format));
    for child in node.children().filter(|n| n.is_element()) {
        if is_wml(child, "trPr") {
            continue;
        }
        if is_wml(child, "tc") {
            let mut format = CellFormat::default();
            if let Some(tcpr) = wml(child, "tcPr") {
                for property in tcpr.children().filter(|n| n.is_element()) {
                    let dxa = property
                        .attribute((WML_NS, "type"))
                        .is_none_or(|t| t == "dxa");
                    match twips_attr(property, "w") {
                        Some(width) if is_wml(property, "tcW") && dxa => format.width = Some(width),
                        _ => format.preserved.push(preserve(source, property)),
                    }
                }
            }
            let cell = doc.append_child(row, NodeData::Cell(format));
            read_blocks(doc, source, cell, child);
        } else {
            append_raw(doc, source, row, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(document: &str) -> BTreeMap<String, Vec<u8>> {
        let mut parts = BTreeMap::new();
        parts.insert("word/document.xml".to_string(), document.as_bytes().to_vec());
        parts
    }

    #[test]
    fn test_paths() {
        assert_eq!(rels_part_name("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(resolve_target("word", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("", "/word/document.xml"), "word/document.xml");
    }

    #[test]
    fn test_paragraph_properties_and_runs() {
        let xml = format!(
            r#"<w:document xmlns:w="{WML_NS}" xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml"><w:body>
            <w:p><w:pPr><w:pStyle w:val="Heading2"/><w:keepNext/><w:spacing w:before="240" w:line="276"/><w:ind w:left="720"/></w:pPr>
              <w:r><w:rPr><w:b/><w:sz w:val="28"/><w:color w:val="FF0000"/></w:rPr><w:t xml:space="preserve">Risks </w:t><w:tab/><w:t>list</w:t><w:br/><w:t>x</w:t></w:r>
              <w:bookmarkStart w:id="0" w:name="r"/>
            </w:p>
            <w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>
            </w:body></w:document>"#
        );
        let doc = read_parts(package(&xml)).unwrap();
        let paragraph = doc.children(doc.body())[0];
        let format = doc.paragraph_format(paragraph).unwrap();
        assert_eq!(format.style, StyleId::Heading(2));
        assert!(format.keep_with_next);
        assert_eq!(format.space_before, Some(12.0));
        let preserved: Vec<&str> = format.preserved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(preserved, vec!["spacing", "ind"]);

        assert_eq!(doc.text(paragraph), "Risks \tlist\nx");
        let font = doc.first_run_font(paragraph).unwrap();
        assert!(font.bold);
        assert_eq!(font.size, Some(14.0));
        assert_eq!(font.preserved.len(), 1);

        let children = doc.children(paragraph);
        assert!(matches!(doc.data(*children.last().unwrap()), NodeData::Raw { .. }));
        assert_eq!(doc.package.section_properties.len(), 1);
        assert!(doc.package.namespaces.iter().any(|(p, _)| p == "w14"));
    }

    #[test]
    fn test_tables_and_raw_runs() {
        let xml = format!(
            r#"<w:document xmlns:w="{WML_NS}"><w:body>
            <w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/></w:tblPr><w:tblGrid><w:gridCol w:w="1000"/></w:tblGrid>
              <w:tr><w:trPr><w:tblHeader/></w:trPr><w:tc><w:tcPr><w:tcW w:w="1000" w:type="dxa"/><w:shd w:fill="EEEEEE"/></w:tcPr><w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r></w:p></w:tc></w:tr>
            </w:tbl>
            </w:body></w:document>"#
        );
        let doc = read_parts(package(&xml)).unwrap();
        let table = doc.tables()[0];
        assert!(matches!(doc.data(table), NodeData::Table(f) if f.preserved.len() == 2));
        let row = doc.first_row(table).unwrap();
        assert!(matches!(doc.data(row), NodeData::Row(f) if f.heading_format));
        let cell = doc.children(row)[0];
        assert!(matches!(doc.data(cell), NodeData::Cell(f) if f.width == Some(50.0) && f.preserved.len() == 1));
        let paragraph = doc.children(cell)[0];
        assert!(matches!(doc.data(doc.children(paragraph)[0]), NodeData::Raw { .. }));
    }

    #[test]
    fn test_primary_header_is_loaded_into_container() {
        let document = format!(
            r#"<w:document xmlns:w="{WML_NS}" xmlns:r="{REL_NS}"><w:body><w:p/>
            <w:sectPr><w:headerReference w:type="default" r:id="rId7"/><w:headerReference w:type="first" r:id="rId8"/><w:pgMar w:top="1440"/></w:sectPr>
            </w:body></w:document>"#
        );
        let rels = format!(
            r#"<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId7" Type="{REL_HEADER}" Target="header1.xml"/><Relationship Id="rId8" Type="{REL_HEADER}" Target="header2.xml"/></Relationships>"#
        );
        let header = format!(r#"<w:hdr xmlns:w="{WML_NS}"><w:p><w:r><w:t>Weekly</w:t></w:r></w:p></w:hdr>"#);
        let mut parts = package(&document);
        parts.insert("word/_rels/document.xml.rels".to_string(), rels.into_bytes());
        parts.insert("word/header1.xml".to_string(), header.clone().into_bytes());
        parts.insert("word/header2.xml".to_string(), header.into_bytes());

        let doc = read_parts(parts).unwrap();
        let container = doc.header_footer(HeaderFooterKind::HeaderPrimary).unwrap();
        assert_eq!(doc.text(container), "Weekly");
        assert_eq!(doc.package.header_part.as_deref(), Some("word/header1.xml"));
        assert!(!doc.package.parts.contains_key("word/header1.xml"));
        assert!(doc.package.parts.contains_key("word/header2.xml"));
        assert_eq!(doc.package.relationships.len(), 1);
        assert_eq!(doc.package.section_properties.len(), 2);
    }

    #[test]
    fn test_missing_document_part() {
        assert!(matches!(
            read_parts(BTreeMap::new()),
            Err(DocumentError::MissingPart(_))
        ));
    }
}
