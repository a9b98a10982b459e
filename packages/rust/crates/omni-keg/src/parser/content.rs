use comrak::nodes::{AstNode, NodeValue};

enum Block {
    Title,
    Paragraph,
    Other,
}

fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for descendant in node.descendants() {
        match &descendant.data().value {
            NodeValue::Text(text) => out.push_str(text),
            NodeValue::Code(code) => out.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => {}
        }
    }
    normalize_whitespace(&out)
}

/// Title is the first level-1 heading. Lead is the first non-empty paragraph
/// after it, or the first paragraph of the document when there is no title.
pub(super) fn extract_title_and_lead<'a>(root: &'a AstNode<'a>) -> (String, String) {
    let mut title: Option<String> = None;
    let mut first_paragraph: Option<String> = None;
    let mut lead_after_title: Option<String> = None;

    for child in root.children() {
        let block = match &child.data().value {
            NodeValue::Heading(heading) if heading.level == 1 => Block::Title,
            NodeValue::Paragraph => Block::Paragraph,
            _ => Block::Other,
        };
        match block {
            Block::Title if title.is_none() => title = Some(collect_text(child)),
            Block::Paragraph => {
                let text = collect_text(child);
                if text.is_empty() {
                    continue;
                }
                if title.is_some() {
                    lead_after_title = Some(text);
                    break;
                }
                if first_paragraph.is_none() {
                    first_paragraph = Some(text);
                }
            }
            _ => {}
        }
    }

    match title {
        Some(title) => (title, lead_after_title.unwrap_or_default()),
        None => (String::new(), first_paragraph.unwrap_or_default()),
    }
}
