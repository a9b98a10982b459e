use crate::error::{KegError, KegResult};

const FENCE: &str = "---";

fn is_fence(line: &str, closing: bool) -> bool {
    let trimmed = line.trim_end();
    trimmed == FENCE || (closing && trimmed == "...")
}

/// Split a `---`-fenced YAML block off the front of `text`.
///
/// Returns `(None, text)` when there is no leading fence.
///
/// # Errors
///
/// Returns [`KegError::ParseFailure`] when the block is opened but never closed.
pub fn split_frontmatter(text: &str) -> KegResult<(Option<&str>, &str)> {
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, text));
    };
    if !is_fence(first, false) {
        return Ok((None, text));
    }
    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_fence(line, true) {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }
    Err(KegError::parse("frontmatter", "missing closing '---' fence"))
}

/// Join a YAML block and a body into a single editable document.
#[must_use]
pub fn compose_document(yaml: &str, body: &str) -> String {
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(yaml);
    if !yaml.is_empty() && !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(body);
    out
}
