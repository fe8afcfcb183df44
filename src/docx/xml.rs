//! Namespaces, element lookups and unit helpers shared by the package reader and writer.

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
pub const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const CHART_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
pub const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const REL_HEADER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
pub const REL_FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
pub const REL_CHART: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
pub const CT_HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
pub const CT_FOOTER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
pub const CT_CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
pub const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Prefixes every part root written by this crate declares.
pub const STANDARD_NAMESPACES: &[(&str, &str)] = &[
    ("w", WML_NS),
    ("r", REL_NS),
    ("wp", WPD_NS),
    ("a", DML_NS),
    ("pic", PIC_NS),
    ("c", CHART_NS),
];

/// Points to twentieths of a point.
pub fn twips(points: f64) -> i64 {
    (points * 20.0).round() as i64
}

/// Points to English Metric Units.
pub fn emu(points: f64) -> i64 {
    (points * 12700.0).round() as i64
}

pub fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

pub fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

pub fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

/// A WML toggle element (`w:b`, `w:keepNext`). Present without `val`, or with a val other
/// than `0`/`false`, means on.
pub fn wml_bool(parent: roxmltree::Node, name: &str) -> Option<bool> {
    wml(parent, name).map(|n| {
        n.attribute((WML_NS, "val"))
            .is_none_or(|v| v != "0" && v != "false" && v != "off")
    })
}

/// Twips attribute of a WML element converted to points.
pub fn twips_attr(node: roxmltree::Node, attr: &str) -> Option<f64> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| v / 20.0)
}

/// Source text of an element, prefixes as written in the part.
pub fn raw_xml<'a>(source: &'a str, node: roxmltree::Node) -> &'a str {
    &source[node.range()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(twips(50.0), 1000);
        assert_eq!(emu(288.0), 3_657_600);
    }

    #[test]
    fn test_wml_bool() {
        let xml = format!(
            r#"<w:rPr xmlns:w="{WML_NS}"><w:b/><w:i w:val="0"/></w:rPr>"#
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let rpr = doc.root_element();
        assert_eq!(wml_bool(rpr, "b"), Some(true));
        assert_eq!(wml_bool(rpr, "i"), Some(false));
        assert_eq!(wml_bool(rpr, "u"), None);
    }
}
