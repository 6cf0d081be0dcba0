//! HTML cleanup helpers for feed text.
//!
//! Feed titles and summaries routinely embed markup; everything stored in
//! the cache is reduced to whitespace-normalized plain text.

/// Strip HTML tags and decode common entities, normalizing whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '&' if !in_tag => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                match entity.as_str() {
                    "amp" => result.push('&'),
                    "lt" => result.push('<'),
                    "gt" => result.push('>'),
                    "quot" => result.push('"'),
                    "apos" => result.push('\''),
                    "nbsp" => result.push(' '),
                    _ if entity.starts_with('#') => {
                        if let Some(code) = parse_numeric_entity(&entity) {
                            if let Some(c) = char::from_u32(code) {
                                result.push(c);
                            }
                        }
                    }
                    _ => {
                        // Unknown entity, keep as-is
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            _ if in_entity => {
                entity.push(ch);
            }
            _ if !in_tag => {
                result.push(ch);
            }
            _ => {}
        }
    }

    normalize_whitespace(&result)
}

/// Collapse whitespace runs into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if entity.starts_with("#x") || entity.starts_with("#X") {
        u32::from_str_radix(&entity[2..], 16).ok()
    } else if let Some(rest) = entity.strip_prefix('#') {
        rest.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
        assert_eq!(strip_html("<b>Bold</b> text"), "Bold text");
        assert_eq!(strip_html("<div><p>Nested</p></div>"), "Nested");
    }

    #[test]
    fn test_strip_html_entities() {
        assert_eq!(strip_html("&amp;"), "&");
        assert_eq!(strip_html("&lt;tag&gt;"), "<tag>");
        assert_eq!(strip_html("&quot;quoted&quot;"), "\"quoted\"");
        assert_eq!(strip_html("A&nbsp;B"), "A B");
    }

    #[test]
    fn test_strip_html_numeric_entities() {
        assert_eq!(strip_html("&#65;"), "A");
        assert_eq!(strip_html("&#x41;"), "A");
        assert_eq!(strip_html("&#x3042;"), "あ");
    }

    #[test]
    fn test_strip_html_whitespace() {
        assert_eq!(
            strip_html("<p>  Multiple   spaces  </p>"),
            "Multiple spaces"
        );
        assert_eq!(
            strip_html("<p>\n\tNewlines\n\tand\ttabs\n</p>"),
            "Newlines and tabs"
        );
    }

    #[test]
    fn test_strip_html_unknown_entity_kept() {
        assert_eq!(strip_html("&copy;"), "&copy;");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\t c "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_parse_numeric_entity() {
        assert_eq!(parse_numeric_entity("#65"), Some(65));
        assert_eq!(parse_numeric_entity("#x41"), Some(65));
        assert_eq!(parse_numeric_entity("#X41"), Some(65));
        assert_eq!(parse_numeric_entity("invalid"), None);
    }
}
