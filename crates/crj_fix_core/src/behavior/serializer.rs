use super::BehaviorDocument;
use super::tree::{ElementTree, NodeId, NodeKind};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

const NEWLINE: &str = "\r\n";
const INDENT: char = '\t';

/// Renders a document the way the simulator's own tooling writes these files:
/// declaration, the untouched header, then the tree indented with tabs and
/// CRLF line breaks. The result is meant to be stored as UTF-8 without a BOM.
pub fn serialize(document: &BehaviorDocument) -> String {
    let mut out = String::with_capacity(document.header().len() * 4);
    out.push_str(XML_DECLARATION);
    out.push_str(NEWLINE);
    out.push_str(document.header());

    let tree = &document.tree;
    write_node(&mut out, tree, tree.root(), 0, true);
    out
}

fn write_node(out: &mut String, tree: &ElementTree, node: NodeId, depth: usize, indent: bool) {
    if indent {
        out.push_str(NEWLINE);
        out.extend(std::iter::repeat_n(INDENT, depth));
    }

    match tree.kind(node) {
        NodeKind::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attribute(out, &attr.value);
                out.push('"');
            }

            let children = tree.children(node);
            if children.is_empty() {
                out.push_str(" />");
                return;
            }
            out.push('>');

            // Mixed content is written inline so no whitespace leaks into text.
            let mixed = children
                .iter()
                .any(|&child| matches!(tree.kind(child), NodeKind::Text(_)));
            let indent_children = indent && !mixed;
            for &child in children {
                write_node(out, tree, child, depth + 1, indent_children);
            }
            if indent_children {
                out.push_str(NEWLINE);
                out.extend(std::iter::repeat_n(INDENT, depth));
            }

            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Text(text) => escape_text(out, text),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            push_normalized_newlines(out, text);
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction { target, value } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(value) = value {
                out.push(' ');
                out.push_str(value);
            }
            out.push_str("?>");
        }
    }
}

fn escape_text(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(NEWLINE);
            }
            '\n' => out.push_str(NEWLINE),
            other => out.push(other),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
}

fn push_normalized_newlines(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(NEWLINE);
            }
            '\n' => out.push_str(NEWLINE),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{XML_DECLARATION, serialize};
    use crate::behavior::{apply_entry, load_str};
    use crate::catalog::ModificationEntry;

    const HEADER: &str = "<ModelInfo version=\"1.1\">\n  <LODS/>\n</ModelInfo>";

    #[test]
    fn writes_declaration_header_and_tab_indented_tree() {
        let source = format!(
            "{HEADER}\n<ModelBehaviors>\n  <!-- panel -->\n  <Component ID=\"A\" Node=\"a&amp;b\">\n    <UseTemplate Name=\"T\">\n      <NODE_ID>x &lt; y</NODE_ID>\n      <EMPTY/>\n    </UseTemplate>\n  </Component>\n</ModelBehaviors>\n"
        );
        let doc = load_str(&source).expect("sample should load");

        let expected = [
            XML_DECLARATION,
            "\r\n",
            HEADER,
            "\r\n<ModelBehaviors>",
            "\r\n\t<!-- panel -->",
            "\r\n\t<Component ID=\"A\" Node=\"a&amp;b\">",
            "\r\n\t\t<UseTemplate Name=\"T\">",
            "\r\n\t\t\t<NODE_ID>x &lt; y</NODE_ID>",
            "\r\n\t\t\t<EMPTY />",
            "\r\n\t\t</UseTemplate>",
            "\r\n\t</Component>",
            "\r\n</ModelBehaviors>",
        ]
        .concat();
        assert_eq!(serialize(&doc), expected);
    }

    #[test]
    fn mixed_content_is_written_inline() {
        let source = format!("{HEADER}<ModelBehaviors><Code>(A:X) <b>1</b> +</Code></ModelBehaviors>");
        let doc = load_str(&source).expect("sample should load");
        let text = serialize(&doc);
        assert!(text.ends_with("\r\n\t<Code>(A:X) <b>1</b> +</Code>\r\n</ModelBehaviors>"));
    }

    #[test]
    fn multiline_text_uses_crlf() {
        let source = format!(
            "{HEADER}<ModelBehaviors><CallbackCode>\n\t(L:A) 1 +\n\t(&gt;L:A)\n</CallbackCode></ModelBehaviors>"
        );
        let doc = load_str(&source).expect("sample should load");
        let text = serialize(&doc);
        assert!(text.contains("<CallbackCode>\r\n\t(L:A) 1 +\r\n\t(&gt;L:A)\r\n</CallbackCode>"));
        let tree_part = &text[text.find("</ModelInfo>").expect("header present")..];
        assert!(!tree_part.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let source = format!("{HEADER}<ModelBehaviors><C Tip=\"&quot;a&quot; &lt;b&gt;\"/></ModelBehaviors>");
        let doc = load_str(&source).expect("sample should load");
        assert!(serialize(&doc).contains("<C Tip=\"&quot;a&quot; &lt;b&gt;\" />"));
    }

    #[test]
    fn rewritten_knob_matches_expected_markup() {
        let source = format!(
            "{HEADER}<ModelBehaviors><Component ID=\"PUSH_1\"/><Component ID=\"KNOB_1\"><Template/></Component></ModelBehaviors>"
        );
        let mut doc = load_str(&source).expect("sample should load");
        let entry = ModificationEntry {
            button_id: "PUSH_1".to_string(),
            knob_id: "KNOB_1".to_string(),
            knob_anim_name: "A".to_string(),
            knob_change_name: "B".to_string(),
            push_anim_name: "C".to_string(),
            push_name: "D".to_string(),
        };
        apply_entry(&mut doc.tree, &entry).expect("entry should apply");

        let expected_tree = [
            "\r\n<ModelBehaviors>",
            "\r\n\t<Component ID=\"KNOB_1\">",
            "\r\n\t\t<Template Name=\"ASCRJ_Knob_Infinite_Push_Template\">",
            "\r\n\t\t\t<KNOB_ANIM_NAME>A</KNOB_ANIM_NAME>",
            "\r\n\t\t\t<CHANGE_VAR_NAME>B</CHANGE_VAR_NAME>",
            "\r\n\t\t\t<PB_ANIM_NAME>C</PB_ANIM_NAME>",
            "\r\n\t\t\t<PB_TRIGGER_NAME>D</PB_TRIGGER_NAME>",
            "\r\n\t\t\t<KNOB_CHANGE_NAME>B</KNOB_CHANGE_NAME>",
            "\r\n\t\t\t<PUSH_ANIM_NAME>C</PUSH_ANIM_NAME>",
            "\r\n\t\t\t<PUSH_NAME>D</PUSH_NAME>",
            "\r\n\t\t</Template>",
            "\r\n\t</Component>",
            "\r\n</ModelBehaviors>",
        ]
        .concat();
        let text = serialize(&doc);
        assert!(text.ends_with(&expected_tree), "{text}");
        assert!(!text.contains("PUSH_1"));
    }

    #[test]
    fn empty_parameter_value_keeps_end_tag() {
        let source = format!(
            "{HEADER}<ModelBehaviors><Component ID=\"PUSH_1\"/><Component ID=\"KNOB_1\"><Template/></Component></ModelBehaviors>"
        );
        let mut doc = load_str(&source).expect("sample should load");
        let entry = ModificationEntry {
            button_id: "PUSH_1".to_string(),
            knob_id: "KNOB_1".to_string(),
            knob_anim_name: "A".to_string(),
            knob_change_name: "B".to_string(),
            push_anim_name: "C".to_string(),
            push_name: String::new(),
        };
        apply_entry(&mut doc.tree, &entry).expect("entry should apply");

        let text = serialize(&doc);
        assert!(text.contains("\r\n\t\t\t<PB_TRIGGER_NAME></PB_TRIGGER_NAME>"));
        assert!(text.contains("\r\n\t\t\t<PUSH_NAME></PUSH_NAME>"));
        assert!(!text.contains("<PUSH_NAME />"));
    }
}
