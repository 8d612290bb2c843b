//! Paragraph-boundary summary derivation.
//!
//! Derives a `Document.summary` from its plaintext `content`: take whole
//! paragraphs (split on `\n\n`) until the running word count would exceed
//! the cap, then stop. Mirrors the paragraph-boundary splitting approach
//! used for sample-code doc comments, applied here to produce a single
//! capped excerpt rather than a sequence of chunks.

/// Default cap, in words, for a derived document summary (spec §3).
pub const DEFAULT_SUMMARY_WORD_CAP: usize = 200;

/// Derive a summary from `content`, keeping whole paragraphs until the
/// word cap would be exceeded. Returns `(summary, truncated)`.
///
/// If the first paragraph alone exceeds the cap, it is truncated at a
/// word boundary and `truncated` is `true`.
pub fn derive_summary(content: &str, word_cap: usize) -> (String, bool) {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return (String::new(), false);
    }

    let mut words_used = 0usize;
    let mut buf = String::new();

    for para in trimmed.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        let para_words: Vec<&str> = para.split_whitespace().collect();

        if words_used + para_words.len() <= word_cap {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(para);
            words_used += para_words.len();
            if words_used == word_cap {
                let has_more = trimmed.len() > buf.len();
                return (buf, has_more);
            }
            continue;
        }

        // This paragraph alone would overflow the cap: take as many of
        // its words as fit and stop.
        let remaining = word_cap - words_used;
        if remaining > 0 {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(&para_words[..remaining].join(" "));
        }
        return (buf, true);
    }

    (buf, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content() {
        let (s, t) = derive_summary("", 200);
        assert_eq!(s, "");
        assert!(!t);
    }

    #[test]
    fn short_content_untruncated() {
        let (s, t) = derive_summary("A short paragraph.\n\nAnother one.", 200);
        assert!(s.contains("A short paragraph."));
        assert!(s.contains("Another one."));
        assert!(!t);
    }

    #[test]
    fn long_single_paragraph_truncates_at_word_boundary() {
        let words: Vec<String> = (0..500).map(|i| format!("w{i}")).collect();
        let content = words.join(" ");
        let (s, t) = derive_summary(&content, 200);
        assert!(t);
        assert_eq!(s.split_whitespace().count(), 200);
    }

    #[test]
    fn stops_before_overflowing_paragraph() {
        let p1 = (0..150).map(|i| format!("a{i}")).collect::<Vec<_>>().join(" ");
        let p2 = (0..150).map(|i| format!("b{i}")).collect::<Vec<_>>().join(" ");
        let content = format!("{p1}\n\n{p2}");
        let (s, t) = derive_summary(&content, 200);
        assert!(t);
        assert!(s.contains("a0"));
        assert_eq!(s.split_whitespace().count(), 200);
    }
}
