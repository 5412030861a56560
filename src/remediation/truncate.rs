//! Length capping for HTML snippets shown in reports.
//!
//! Cutting serialized HTML at an arbitrary character leaves tags open. The
//! repair here is deliberately shallow: a dangling partial tag is dropped and
//! only the innermost unmatched element is closed, so deeply nested cuts can
//! still leave outer elements open.

use crate::dom::fragment::is_void;

/// Result of scanning an HTML string for tag structure.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagScan {
    /// Elements opened and not yet closed, outermost first.
    pub open: Vec<String>,
    /// Byte offset of a tag that starts but never reaches its `>`.
    pub dangling_from: Option<usize>,
}

/// Tags opened but never closed in `html`, outermost first.
pub fn unmatched_open_tags(html: &str) -> Vec<String> {
    scan(html).open
}

pub fn scan(html: &str) -> TagScan {
    let bytes = html.as_bytes();
    let mut result = TagScan::default();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let start = i;
        let next = bytes.get(i + 1).copied();
        match next {
            Some(b'/') => {
                let Some(end) = find_tag_end(bytes, i + 2) else {
                    result.dangling_from = Some(start);
                    break;
                };
                let name = tag_name(&html[i + 2..end]);
                if let Some(pos) = result.open.iter().rposition(|t| *t == name) {
                    result.open.truncate(pos);
                }
                i = end + 1;
            }
            Some(b'!') | Some(b'?') => match html[i..].find('>') {
                Some(off) => i += off + 1,
                None => {
                    result.dangling_from = Some(start);
                    break;
                }
            },
            Some(c) if c.is_ascii_alphabetic() => {
                let Some(end) = find_tag_end(bytes, i + 1) else {
                    result.dangling_from = Some(start);
                    break;
                };
                let inner = &html[i + 1..end];
                let name = tag_name(inner);
                let self_closing = inner.trim_end().ends_with('/');
                if !self_closing && !is_void(&name) {
                    result.open.push(name);
                }
                i = end + 1;
            }
            // a bare '<' in text
            Some(_) => i += 1,
            None => {
                result.dangling_from = Some(start);
                break;
            }
        }
    }

    result
}

/// Index of the `>` closing a tag, skipping quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (offset, &b) in bytes.get(from..)?.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(from + offset),
            None => {}
        }
    }
    None
}

fn tag_name(inner: &str) -> String {
    inner
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Caps `html` at `max_chars` characters with a best-effort tag repair.
pub fn truncate_html(html: &str, max_chars: usize) -> String {
    let Some((cut_at, _)) = html.char_indices().nth(max_chars) else {
        return html.to_string();
    };
    let mut cut = &html[..cut_at];

    let scanned = scan(cut);
    if let Some(dangling) = scanned.dangling_from {
        cut = &cut[..dangling];
    }
    let open = unmatched_open_tags(cut);

    let mut out = String::with_capacity(cut.len() + 16);
    out.push_str(cut);
    out.push_str("...");
    if let Some(innermost) = open.last() {
        out.push_str("</");
        out.push_str(innermost);
        out.push('>');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_markup_has_no_unmatched_tags() {
        let html = "<div class=\"a\"><img src=\"x\"><br/><p>t</p></div>";
        assert!(unmatched_open_tags(html).is_empty());
    }

    #[test]
    fn quoted_angle_brackets_do_not_end_tags() {
        let html = "<a title=\"1 > 0\" href='<x>'>go</a>";
        assert!(unmatched_open_tags(html).is_empty());
    }

    #[test]
    fn reports_open_tags_outermost_first() {
        assert_eq!(
            unmatched_open_tags("<ul><li>One<li><b>Two"),
            vec!["ul", "li", "li", "b"]
        );
    }

    #[test]
    fn short_input_is_unchanged() {
        let html = "<p>hello</p>";
        assert_eq!(truncate_html(html, 500), html);
    }

    #[test]
    fn cut_drops_partial_tag_and_closes_innermost() {
        let html = format!("<div><p>{}</p><span class=\"x\">tail</span></div>", "a".repeat(20));
        // cut lands inside the opening <span ...> tag
        let out = truncate_html(&html, 35);
        assert_eq!(out, format!("<div><p>{}</p>...</div>", "a".repeat(20)));
    }

    #[test]
    fn cut_inside_text_closes_innermost_only() {
        let html = format!("<section><p>{}</p></section>", "b".repeat(50));
        let out = truncate_html(&html, 30);
        assert!(out.ends_with("...</p>"), "got {out}");
        assert_eq!(unmatched_open_tags(&out), vec!["section"]);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let html = format!("<p>{}</p>", "é".repeat(10));
        let out = truncate_html(&html, 8);
        assert_eq!(out, "<p>ééééé...</p>");
    }
}
