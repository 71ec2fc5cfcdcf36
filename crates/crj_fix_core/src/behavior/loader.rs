use std::fs;
use std::path::Path;

use super::tree::{Attribute, ElementTree, NodeId, NodeKind};
use super::{BehaviorDocument, ByteRange, MODEL_BEHAVIORS_TAG, MODEL_INFO_TAG};
use crate::error::{CoreError, CoreErrorCode};

// Synthetic root that lets a strict parser accept the two top-level elements.
const FRAGMENT_ROOT: &str = "crj-behavior-fragment";

pub fn load_file(path: &Path) -> Result<BehaviorDocument, CoreError> {
    let bytes = fs::read(path).map_err(|e| CoreError::io("read", path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Parse,
            format!("{} is not valid UTF-8: {e}", path.display()),
        )
    })?;
    load_str(&text)
        .map_err(|e| CoreError::new(e.code, format!("{}: {}", path.display(), e.message)))
}

/// Splits a behavior file into its verbatim `ModelInfo` header and a mutable
/// tree built from the `ModelBehaviors` element that follows it.
pub fn load_str(source: &str) -> Result<BehaviorDocument, CoreError> {
    let body_start = prolog_end(source);
    let open_tag = format!("<{FRAGMENT_ROOT}>");
    let wrapped = format!("{open_tag}{}</{FRAGMENT_ROOT}>", &source[body_start..]);

    let parsed = roxmltree::Document::parse(&wrapped).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Parse,
            format!("behavior fragment is not well-formed: {e}"),
        )
    })?;
    let fragment = parsed.root_element();

    let model_info = fragment
        .descendants()
        .find(|node| node.has_tag_name(MODEL_INFO_TAG))
        .ok_or_else(|| missing_node(MODEL_INFO_TAG))?;
    let info_range = model_info.range();

    let model_behaviors = fragment
        .descendants()
        .find(|node| node.has_tag_name(MODEL_BEHAVIORS_TAG) && node.range().start >= info_range.end)
        .ok_or_else(|| missing_node(MODEL_BEHAVIORS_TAG))?;

    let to_source = |pos: usize| pos - open_tag.len() + body_start;
    Ok(BehaviorDocument {
        header: wrapped[info_range.clone()].to_string(),
        header_range: ByteRange {
            start: to_source(info_range.start),
            end: to_source(info_range.end),
        },
        tree: build_tree(model_behaviors),
    })
}

fn missing_node(tag: &str) -> CoreError {
    CoreError::new(
        CoreErrorCode::MissingRequiredNode,
        format!("required top-level node <{tag}> not found"),
    )
}

/// Byte offset just past a leading BOM and XML declaration, if present.
fn prolog_end(source: &str) -> usize {
    let start = if source.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };
    let rest = &source[start..];
    let is_declaration = rest
        .strip_prefix("<?xml")
        .is_some_and(|tail| tail.starts_with(|c: char| c.is_ascii_whitespace()));
    if is_declaration && let Some(end) = rest.find("?>") {
        return start + end + 2;
    }
    start
}

fn build_tree(element: roxmltree::Node<'_, '_>) -> ElementTree {
    let mut tree = ElementTree::new(element.tag_name().name(), collect_attributes(element));
    let root = tree.root();
    append_children(&mut tree, root, element);
    tree
}

fn append_children(tree: &mut ElementTree, parent: NodeId, source: roxmltree::Node<'_, '_>) {
    for child in source.children() {
        if child.is_element() {
            let node = tree.append_child(
                parent,
                NodeKind::Element {
                    name: child.tag_name().name().to_string(),
                    attributes: collect_attributes(child),
                },
            );
            append_children(tree, node, child);
        } else if child.is_text() {
            let text = child.text().unwrap_or_default();
            if !is_xml_whitespace(text) {
                tree.append_child(parent, NodeKind::Text(text.to_string()));
            }
        } else if child.is_comment() {
            let text = child.text().unwrap_or_default();
            tree.append_child(parent, NodeKind::Comment(text.to_string()));
        } else if let Some(pi) = child.pi() {
            tree.append_child(
                parent,
                NodeKind::ProcessingInstruction {
                    target: pi.target.to_string(),
                    value: pi.value.map(str::to_string),
                },
            );
        }
    }
}

fn collect_attributes(element: roxmltree::Node<'_, '_>) -> Vec<Attribute> {
    element
        .attributes()
        .map(|attr| Attribute {
            name: attr.name().to_string(),
            value: attr.value().to_string(),
        })
        .collect()
}

fn is_xml_whitespace(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

#[cfg(test)]
mod tests {
    use super::load_str;
    use crate::behavior::NodeKind;
    use crate::error::CoreErrorCode;

    const HEADER: &str = "<ModelInfo version=\"1.1\" guid=\"{6f4a5c2e}\">\r\n\t<LODS>\r\n\t\t<LOD minSize=\"0\" ModelFile=\"CRJ550_Interior.gltf\"/>\r\n\t</LODS>\r\n</ModelInfo>";

    fn sample(prefix: &str, behaviors: &str) -> String {
        format!("{prefix}{HEADER}\r\n{behaviors}\r\n")
    }

    #[test]
    fn header_is_captured_byte_for_byte() {
        let source = sample(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n",
            "<ModelBehaviors><Component ID=\"A\"/></ModelBehaviors>",
        );
        let doc = load_str(&source).expect("sample should load");

        assert_eq!(doc.header(), HEADER);
        let range = doc.header_range();
        assert_eq!(&source[range.start..range.end], HEADER);
        assert_eq!(range.len(), HEADER.len());
        assert!(!range.is_empty());
    }

    #[test]
    fn bom_and_declaration_are_skipped() {
        let source = sample(
            "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- exported -->\n",
            "<ModelBehaviors/>",
        );
        let doc = load_str(&source).expect("sample should load");

        assert_eq!(doc.header(), HEADER);
        assert_eq!(&source[doc.header_range().start..doc.header_range().end], HEADER);
        assert_eq!(doc.tree.name(doc.tree.root()), Some("ModelBehaviors"));
    }

    #[test]
    fn whitespace_only_text_is_dropped_but_comments_and_text_survive() {
        let source = sample(
            "",
            "<ModelBehaviors>\n\t<!-- knobs -->\n\t<Component ID=\"K\">\n\t\t<UseTemplate Name=\"T\">\n\t\t\t<NODE_ID>knob</NODE_ID>\n\t\t</UseTemplate>\n\t</Component>\n</ModelBehaviors>",
        );
        let doc = load_str(&source).expect("sample should load");
        let tree = &doc.tree;
        let root = tree.root();

        let children = tree.children(root);
        assert_eq!(children.len(), 2);
        assert_eq!(
            tree.kind(children[0]),
            &NodeKind::Comment(" knobs ".to_string())
        );

        let knob = tree.find_by_id("K").expect("knob should be indexed");
        let template = tree.first_element_child(knob).expect("knob has a template");
        assert_eq!(tree.children(knob).len(), 1);
        assert_eq!(tree.attribute(template, "Name"), Some("T"));
        assert_eq!(tree.text_content(template), "knob");
    }

    #[test]
    fn missing_model_info_is_reported() {
        let err = load_str("<ModelBehaviors/>").expect_err("no header present");
        assert_eq!(err.code, CoreErrorCode::MissingRequiredNode);
    }

    #[test]
    fn missing_model_behaviors_is_reported() {
        let err = load_str(HEADER).expect_err("no behaviors present");
        assert_eq!(err.code, CoreErrorCode::MissingRequiredNode);
    }

    #[test]
    fn behaviors_before_model_info_are_not_accepted() {
        let source = format!("<ModelBehaviors/>{HEADER}");
        let err = load_str(&source).expect_err("behaviors must follow the header");
        assert_eq!(err.code, CoreErrorCode::MissingRequiredNode);
    }

    #[test]
    fn malformed_fragment_is_a_parse_error() {
        let source = sample("", "<ModelBehaviors><Component></ModelBehaviors>");
        let err = load_str(&source).expect_err("unbalanced tags");
        assert_eq!(err.code, CoreErrorCode::Parse);
    }
}
