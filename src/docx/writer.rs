//! Serializes a [`Document`] into a `.docx` package.
//!
//! Parts carried over from a template are written back byte for byte. The main document,
//! its relationships, the primary header/footer, chart parts, media and the content types
//! are regenerated from the model.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use html_escape::{encode_double_quoted_attribute, encode_text};
use log::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::docx::chart::ChartShape;
use crate::docx::format::TableFormat;
use crate::docx::reader::{DEFAULT_DOCUMENT_PART, parse_relationships, part_directory, rels_part_name};
use crate::docx::xml::{
    CHART_NS, CONTENT_TYPES_NS, CT_CHART, CT_DOCUMENT, CT_FOOTER, CT_HEADER, CT_RELATIONSHIPS, CT_STYLES,
    DML_NS, PIC_NS, PKG_REL_NS, REL_CHART, REL_FOOTER, REL_HEADER, REL_IMAGE, REL_OFFICE_DOCUMENT,
    REL_STYLES, STANDARD_NAMESPACES, emu, twips,
};
use crate::docx::{BreakKind, Document, HeaderFooterKind, NodeData, NodeId, Picture, Relationship};
use crate::error::DocumentError;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const FIRST_DRAWING_ID: usize = 1000;
/// Grid column width for cells without an explicit width, in points.
const DEFAULT_COLUMN_WIDTH: f64 = 72.0;

pub fn write_docx(doc: &Document, path: &Path) -> Result<(), DocumentError> {
    let parts = render_package(doc)?;
    let file = File::create(path).map_err(|e| DocumentError::io(path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in &parts {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }
    zip.finish()?;
    debug!("Wrote {} parts to {}", parts.len(), path.display());
    Ok(())
}

/// Every part of the package in write order, `[Content_Types].xml` first.
pub fn render_package(doc: &Document) -> Result<Vec<(String, Vec<u8>)>, DocumentError> {
    let package = &doc.package;
    let document_part = package
        .document_part
        .clone()
        .unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string());
    let mut writer = PackageWriter {
        doc,
        parts: package.parts.clone(),
        defaults: package.content_type_defaults.clone(),
        overrides: package.content_type_overrides.clone(),
        next_drawing_id: FIRST_DRAWING_ID,
        namespaces: namespace_declarations(doc),
    };
    for (extension, content_type) in [("rels", CT_RELATIONSHIPS), ("xml", "application/xml")] {
        writer.add_default(extension, content_type);
    }

    let mut rels = PartRels::new(&document_part, package.relationships.clone());
    if !writer.parts.contains_key("_rels/.rels") {
        let root_rels = vec![Relationship {
            id: "rId1".to_string(),
            rel_type: REL_OFFICE_DOCUMENT.to_string(),
            target: document_part.clone(),
            external: false,
        }];
        writer
            .parts
            .insert("_rels/.rels".to_string(), relationships_xml(&root_rels).into_bytes());
    }
    if !rels.rels.iter().any(|r| r.rel_type == REL_STYLES) {
        let styles_part = format!("{}/styles.xml", part_directory(&document_part));
        if !writer.parts.contains_key(&styles_part) {
            writer.parts.insert(styles_part.clone(), default_styles_xml().into_bytes());
        }
        writer.add_override(&styles_part, CT_STYLES);
        rels.add(REL_STYLES, &styles_part);
    }

    let mut references = String::new();
    for (kind, tag) in [
        (HeaderFooterKind::HeaderPrimary, "headerReference"),
        (HeaderFooterKind::FooterPrimary, "footerReference"),
    ] {
        let Some(container) = doc.header_footer(kind) else {
            continue;
        };
        let part = writer.header_footer_part(kind, container, &document_part)?;
        let rel_type = match kind {
            HeaderFooterKind::HeaderPrimary => REL_HEADER,
            HeaderFooterKind::FooterPrimary => REL_FOOTER,
        };
        let id = rels.add(rel_type, &part);
        let _ = write!(references, r#"<w:{tag} w:type="default" r:id="{id}"/>"#);
    }

    let mut body = String::new();
    for child in doc.children(doc.body()) {
        writer.write_block(&mut body, &mut rels, *child);
    }
    let mut xml = String::from(XML_DECLARATION);
    let _ = write!(
        xml,
        "\n<w:document{}><w:body>{body}<w:sectPr>{references}",
        writer.namespaces
    );
    if package.section_properties.is_empty() {
        xml.push_str(
            r#"<w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>"#,
        );
    } else {
        xml.extend(package.section_properties.iter().map(String::as_str));
    }
    xml.push_str("</w:sectPr></w:body></w:document>");

    writer.add_override(&document_part, CT_DOCUMENT);
    writer.parts.insert(document_part.clone(), xml.into_bytes());
    writer
        .parts
        .insert(rels_part_name(&document_part), relationships_xml(&rels.rels).into_bytes());

    let content_types = writer.content_types_xml();
    let mut out = vec![("[Content_Types].xml".to_string(), content_types.into_bytes())];
    out.extend(writer.parts);
    Ok(out)
}

fn namespace_declarations(doc: &Document) -> String {
    let mut declared: Vec<(&str, &str)> = doc
        .package
        .namespaces
        .iter()
        .map(|(p, u)| (p.as_str(), u.as_str()))
        .collect();
    for &(prefix, uri) in STANDARD_NAMESPACES {
        if !declared.iter().any(|(p, _)| *p == prefix) {
            declared.push((prefix, uri));
        }
    }
    let mut out = String::new();
    for (prefix, uri) in &declared {
        let _ = write!(out, r#" xmlns:{prefix}="{}""#, encode_double_quoted_attribute(uri));
    }
    if let Some(ignorable) = &doc.package.ignorable {
        if declared.iter().any(|(p, _)| *p == "mc") {
            let _ = write!(out, r#" mc:Ignorable="{}""#, encode_double_quoted_attribute(ignorable));
        }
    }
    out
}

fn relationships_xml(rels: &[Relationship]) -> String {
    let mut out = String::from(XML_DECLARATION);
    let _ = write!(out, "\n<Relationships xmlns=\"{PKG_REL_NS}\">");
    for rel in rels {
        let _ = write!(
            out,
            r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
            encode_double_quoted_attribute(&rel.id),
            encode_double_quoted_attribute(&rel.rel_type),
            encode_double_quoted_attribute(&rel.target),
            if rel.external { r#" TargetMode="External""# } else { "" }
        );
    }
    out.push_str("</Relationships>");
    out
}

/// Relationships of one part, with fresh ids that never collide with loaded ones.
struct PartRels {
    base_dir: String,
    rels: Vec<Relationship>,
    counter: usize,
}

impl PartRels {
    fn new(part: &str, rels: Vec<Relationship>) -> Self {
        Self {
            base_dir: part_directory(part),
            rels,
            counter: 0,
        }
    }

    /// Adds a relationship to `part` (a zip path) and returns its id.
    fn add(&mut self, rel_type: &str, part: &str) -> String {
        let id = loop {
            self.counter += 1;
            let candidate = format!("rIdRm{}", self.counter);
            if !self.rels.iter().any(|r| r.id == candidate) {
                break candidate;
            }
        };
        let prefix = format!("{}/", self.base_dir);
        let target = match part.strip_prefix(&prefix) {
            Some(relative) if !self.base_dir.is_empty() => relative.to_string(),
            _ => format!("/{part}"),
        };
        self.rels.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target,
            external: false,
        });
        id
    }
}

struct PackageWriter<'d> {
    doc: &'d Document,
    parts: BTreeMap<String, Vec<u8>>,
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
    next_drawing_id: usize,
    namespaces: String,
}

impl PackageWriter<'_> {
    fn add_default(&mut self, extension: &str, content_type: &str) {
        if !self.defaults.iter().any(|(e, _)| e.eq_ignore_ascii_case(extension)) {
            self.defaults.push((extension.to_string(), content_type.to_string()));
        }
    }

    fn add_override(&mut self, part: &str, content_type: &str) {
        let name = format!("/{part}");
        if !self.overrides.iter().any(|(n, _)| *n == name) {
            self.overrides.push((name, content_type.to_string()));
        }
    }

    /// First `{stem}{n}.{extension}` not yet in the package.
    fn free_part_name(&self, stem: &str, extension: &str) -> String {
        (1..)
            .map(|n| format!("{stem}{n}.{extension}"))
            .find(|name| !self.parts.contains_key(name))
            .unwrap_or_else(|| format!("{stem}.{extension}"))
    }

    fn header_footer_part(
        &mut self,
        kind: HeaderFooterKind,
        container: NodeId,
        document_part: &str,
    ) -> Result<String, DocumentError> {
        let doc = self.doc;
        let (existing, root, stem, content_type) = match kind {
            HeaderFooterKind::HeaderPrimary => (&doc.package.header_part, "hdr", "header_rm", CT_HEADER),
            HeaderFooterKind::FooterPrimary => (&doc.package.footer_part, "ftr", "footer_rm", CT_FOOTER),
        };
        let part = match existing {
            Some(part) => part.clone(),
            None => self.free_part_name(&format!("{}/{stem}", part_directory(document_part)), "xml"),
        };
        let rels_name = rels_part_name(&part);
        let loaded = match self.parts.get(&rels_name) {
            Some(bytes) => parse_relationships(&rels_name, &String::from_utf8_lossy(bytes))?,
            None => Vec::new(),
        };
        let mut rels = PartRels::new(&part, loaded);

        let mut content = String::new();
        for child in doc.children(container) {
            self.write_block(&mut content, &mut rels, *child);
        }
        if !matches!(
            doc.children(container).last().map(|c| doc.data(*c)),
            Some(NodeData::Paragraph(_))
        ) {
            content.push_str("<w:p/>");
        }
        let xml = format!("{XML_DECLARATION}\n<w:{root}{}>{content}</w:{root}>", self.namespaces);
        self.parts.insert(part.clone(), xml.into_bytes());
        if !rels.rels.is_empty() {
            self.parts
                .insert(rels_name, relationships_xml(&rels.rels).into_bytes());
        }
        self.add_override(&part, content_type);
        Ok(part)
    }

    fn write_block(&mut self, out: &mut String, rels: &mut PartRels, id: NodeId) {
        let doc = self.doc;
        match doc.data(id) {
            NodeData::Paragraph(format) => {
                out.push_str("<w:p>");
                format.write_ppr(out);
                for child in doc.children(id) {
                    self.write_inline(out, rels, *child);
                }
                out.push_str("</w:p>");
            }
            NodeData::Table(format) => self.write_table(out, rels, id, format),
            NodeData::Raw { xml, .. } => out.push_str(xml),
            NodeData::Run { .. }
            | NodeData::Break(_)
            | NodeData::Field { .. }
            | NodeData::Chart(_)
            | NodeData::Picture(_) => {
                out.push_str("<w:p>");
                self.write_inline(out, rels, id);
                out.push_str("</w:p>");
            }
            other => warn!("Skipping {other:?} at block level"),
        }
    }

    fn write_inline(&mut self, out: &mut String, rels: &mut PartRels, id: NodeId) {
        let doc = self.doc;
        match doc.data(id) {
            NodeData::Run { text, font } => {
                out.push_str("<w:r>");
                font.write_rpr(out);
                write_run_text(out, text);
                out.push_str("</w:r>");
            }
            NodeData::Break(BreakKind::Line) => out.push_str("<w:r><w:br/></w:r>"),
            NodeData::Break(BreakKind::Page) => out.push_str(r#"<w:r><w:br w:type="page"/></w:r>"#),
            NodeData::Field { kind, font } => {
                let _ = write!(out, r#"<w:fldSimple w:instr=" {} \* MERGEFORMAT "><w:r>"#, kind.instruction());
                font.write_rpr(out);
                out.push_str("<w:t>1</w:t></w:r></w:fldSimple>");
            }
            NodeData::Chart(chart) => self.write_chart(out, rels, chart),
            NodeData::Picture(picture) => self.write_picture(out, rels, picture),
            NodeData::Raw { xml, .. } => out.push_str(xml),
            other => warn!("Skipping {other:?} inside a paragraph"),
        }
    }

    fn write_table(&mut self, out: &mut String, rels: &mut PartRels, table: NodeId, format: &TableFormat) {
        out.push_str("<w:tbl>");
        match format.preserved.iter().find(|p| p.name == "tblPr") {
            Some(tblpr) => out.push_str(&tblpr.xml),
            None => out.push_str(
                r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/></w:tblBorders><w:tblLook w:val="04A0"/></w:tblPr>"#,
            ),
        }
        match format.preserved.iter().find(|p| p.name == "tblGrid") {
            Some(grid) => out.push_str(&grid.xml),
            None => {
                out.push_str("<w:tblGrid>");
                for width in self.grid_columns(table) {
                    let _ = write!(out, r#"<w:gridCol w:w="{}"/>"#, twips(width));
                }
                out.push_str("</w:tblGrid>");
            }
        }
        let doc = self.doc;
        for row in doc.children(table) {
            match doc.data(*row) {
                NodeData::Row(row_format) => {
                    out.push_str("<w:tr>");
                    row_format.write_trpr(out);
                    for cell in doc.children(*row) {
                        self.write_cell(out, rels, *cell);
                    }
                    out.push_str("</w:tr>");
                }
                NodeData::Raw { xml, .. } => out.push_str(xml),
                other => warn!("Skipping {other:?} inside a table"),
            }
        }
        out.push_str("</w:tbl>");
    }

    fn write_cell(&mut self, out: &mut String, rels: &mut PartRels, cell: NodeId) {
        let doc = self.doc;
        match doc.data(cell) {
            NodeData::Cell(format) => {
                out.push_str("<w:tc>");
                format.write_tcpr(out);
                let children = doc.children(cell);
                for child in children {
                    self.write_block(out, rels, *child);
                }
                // A cell must end with a paragraph.
                if !matches!(children.last().map(|c| doc.data(*c)), Some(NodeData::Paragraph(_))) {
                    out.push_str("<w:p/>");
                }
                out.push_str("</w:tc>");
            }
            NodeData::Raw { xml, .. } => out.push_str(xml),
            other => warn!("Skipping {other:?} inside a row"),
        }
    }

    /// Column widths for a generated table: the widest row decides the column count, the
    /// first explicit width seen in each column wins.
    fn grid_columns(&self, table: NodeId) -> Vec<f64> {
        let mut columns: Vec<Option<f64>> = Vec::new();
        for row in self.doc.children(table) {
            for (index, cell) in self.doc.children(*row).iter().enumerate() {
                let width = match self.doc.data(*cell) {
                    NodeData::Cell(format) => format.width,
                    _ => None,
                };
                if index >= columns.len() {
                    columns.push(width);
                } else if columns[index].is_none() {
                    columns[index] = width;
                }
            }
        }
        columns
            .into_iter()
            .map(|w| w.unwrap_or(DEFAULT_COLUMN_WIDTH))
            .collect()
    }

    fn drawing_id(&mut self) -> usize {
        self.next_drawing_id += 1;
        self.next_drawing_id
    }

    fn write_chart(&mut self, out: &mut String, rels: &mut PartRels, chart: &ChartShape) {
        let part = self.free_part_name(&format!("{}/charts/chart", rels.base_dir), "xml");
        self.parts.insert(part.clone(), chart.to_chart_xml().into_bytes());
        self.add_override(&part, CT_CHART);
        let rel_id = rels.add(REL_CHART, &part);
        let drawing_id = self.drawing_id();
        let name = chart.title.as_deref().unwrap_or("Chart");
        let _ = write!(
            out,
            r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{}" cy="{}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{drawing_id}" name="{}"/><wp:cNvGraphicFramePr/><a:graphic xmlns:a="{DML_NS}"><a:graphicData uri="{CHART_NS}"><c:chart xmlns:c="{CHART_NS}" r:id="{rel_id}"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
            emu(chart.width),
            emu(chart.height),
            encode_double_quoted_attribute(name)
        );
    }

    fn write_picture(&mut self, out: &mut String, rels: &mut PartRels, picture: &Picture) {
        let extension = picture.extension.to_ascii_lowercase();
        let part = self.free_part_name(&format!("{}/media/rm_image", rels.base_dir), &extension);
        self.parts.insert(part.clone(), picture.data.clone());
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg".to_string(),
            "svg" => "image/svg+xml".to_string(),
            "tif" | "tiff" => "image/tiff".to_string(),
            other => format!("image/{other}"),
        };
        self.add_default(&extension, &content_type);
        let rel_id = rels.add(REL_IMAGE, &part);
        let drawing_id = self.drawing_id();
        let (cx, cy) = (emu(picture.width), emu(picture.height));
        let description = encode_double_quoted_attribute(&picture.description);
        let _ = write!(
            out,
            r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{drawing_id}" name="Picture {drawing_id}" descr="{description}"/><wp:cNvGraphicFramePr/><a:graphic xmlns:a="{DML_NS}"><a:graphicData uri="{PIC_NS}"><pic:pic xmlns:pic="{PIC_NS}"><pic:nvPicPr><pic:cNvPr id="0" name="Picture {drawing_id}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
        );
    }

    fn content_types_xml(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        let _ = write!(out, "\n<Types xmlns=\"{CONTENT_TYPES_NS}\">");
        for (extension, content_type) in &self.defaults {
            let _ = write!(
                out,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                encode_double_quoted_attribute(extension),
                encode_double_quoted_attribute(content_type)
            );
        }
        for (part, content_type) in &self.overrides {
            let _ = write!(
                out,
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                encode_double_quoted_attribute(part),
                encode_double_quoted_attribute(content_type)
            );
        }
        out.push_str("</Types>");
        out
    }
}

/// Run content with tabs and line feeds turned into their own elements.
fn write_run_text(out: &mut String, text: &str) {
    let mut segment = String::new();
    let flush = |out: &mut String, segment: &mut String| {
        if !segment.is_empty() {
            let _ = write!(out, r#"<w:t xml:space="preserve">{}</w:t>"#, encode_text(segment));
            segment.clear();
        }
    };
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(out, &mut segment);
                out.push_str("<w:tab/>");
            }
            '\n' => {
                flush(out, &mut segment);
                out.push_str("<w:br/>");
            }
            '\r' => {}
            other => segment.push(other),
        }
    }
    flush(out, &mut segment);
}

fn default_styles_xml() -> String {
    let mut headings = String::new();
    for (level, half_points) in [(1, 32), (2, 26), (3, 24), (4, 22), (5, 22), (6, 22)] {
        let _ = write!(
            headings,
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:uiPriority w:val="9"/><w:qFormat/><w:pPr><w:keepNext/><w:keepLines/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{}"/></w:pPr><w:rPr><w:b/><w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/></w:rPr></w:style>"#,
            level - 1
        );
    }
    format!(
        r#"{XML_DECLARATION}
<w:styles xmlns:w="{}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>{headings}<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:rPr><w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr><w:ind w:left="720"/><w:contextualSpacing/></w:pPr></w:style><w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#,
        crate::docx::xml::WML_NS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::builder::DocumentBuilder;
    use crate::docx::chart::ChartType;
    use crate::docx::format::{Font, StyleId};
    use crate::docx::{FieldKind, reader};

    fn part<'a>(parts: &'a [(String, Vec<u8>)], name: &str) -> &'a str {
        let bytes = &parts.iter().find(|(n, _)| n == name).unwrap().1;
        std::str::from_utf8(bytes).unwrap()
    }

    fn sample() -> Document {
        let mut doc = Document::new();
        let mut builder = DocumentBuilder::new(&mut doc);
        builder.paragraph_format().style = StyleId::Heading(1);
        builder.writeln("Risks & Issues").unwrap();
        builder.paragraph_format().style = StyleId::Normal;
        builder.start_table().unwrap();
        builder.insert_cell().unwrap();
        builder.cell_format().width = Some(50.0);
        builder.row_format().heading_format = true;
        builder.write("ID");
        builder.end_row().unwrap();
        builder.end_table().unwrap();
        builder.insert_chart(ChartType::Pie, 288.0, 288.0);
        builder.move_to_header_footer(HeaderFooterKind::FooterPrimary);
        builder.font().name = Some("Arial".to_string());
        builder.write("Page ");
        builder.insert_field(FieldKind::Page);
        doc
    }

    #[test]
    fn test_render_package_parts() {
        let parts = render_package(&sample()).unwrap();
        assert_eq!(parts[0].0, "[Content_Types].xml");
        let content_types = part(&parts, "[Content_Types].xml");
        assert!(content_types.contains("/word/charts/chart1.xml"));
        assert!(content_types.contains("/word/footer_rm1.xml"));
        assert!(content_types.contains(CT_STYLES));

        let document = part(&parts, "word/document.xml");
        assert!(document.contains("Risks &amp; Issues"));
        assert!(document.contains("<w:tblHeader/>"));
        assert!(document.contains(r#"<w:gridCol w:w="1000"/>"#));
        assert!(document.contains(r#"<w:footerReference w:type="default" r:id="rIdRm2"/>"#));
        roxmltree::Document::parse(document).unwrap();

        let footer = part(&parts, "word/footer_rm1.xml");
        assert!(footer.contains(r#"w:instr=" PAGE \* MERGEFORMAT ""#));
        let rels = part(&parts, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Target="charts/chart1.xml""#));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        sample().save(&path).unwrap();

        let reloaded = reader::read_docx(&path).unwrap();
        let first = reloaded.children(reloaded.body())[0];
        assert_eq!(reloaded.paragraph_format(first).unwrap().style, StyleId::Heading(1));
        assert_eq!(reloaded.text(first), "Risks & Issues");
        assert_eq!(reloaded.tables().len(), 1);
        let footer = reloaded.header_footer(HeaderFooterKind::FooterPrimary).unwrap();
        assert!(reloaded.text(footer).starts_with("Page "));
        assert_eq!(reloaded.package.footer_part.as_deref(), Some("word/footer_rm1.xml"));
        assert!(reloaded.package.parts.contains_key("word/charts/chart1.xml"));

        // A second save keeps the template parts and adds no duplicate footer.
        let again = render_package(&reloaded).unwrap();
        assert!(again.iter().all(|(name, _)| name != "word/footer_rm2.xml"));
    }

    #[test]
    fn test_markup_characters_survive_save() {
        let mut doc = Document::new();
        let mut builder = DocumentBuilder::new(&mut doc);
        builder.font().name = Some(r#"Odd "Quoted" <Font>"#.to_string());
        builder.writeln("p95 < 5ms & errors > 0").unwrap();
        let parts = render_package(&doc).unwrap();
        let document = part(&parts, "word/document.xml");
        assert!(document.contains("p95 &lt; 5ms &amp; errors &gt; 0"));

        let parsed = roxmltree::Document::parse(document).unwrap();
        let fonts = parsed
            .descendants()
            .find(|n| n.tag_name().name() == "rFonts")
            .unwrap();
        assert_eq!(fonts.attribute((crate::docx::xml::WML_NS, "ascii")), Some(r#"Odd "Quoted" <Font>"#));
    }

    #[test]
    fn test_run_text_elements() {
        let mut out = String::new();
        write_run_text(&mut out, "a\tb\nc");
        assert_eq!(
            out,
            r#"<w:t xml:space="preserve">a</w:t><w:tab/><w:t xml:space="preserve">b</w:t><w:br/><w:t xml:space="preserve">c</w:t>"#
        );
        let mut rpr = String::new();
        Font::bold().write_rpr(&mut rpr);
        assert_eq!(rpr, "<w:rPr><w:b/></w:rPr>");
    }
}
