//! Markup stripping for synthesis
//!
//! Generated text carries document formatting that must not be vocalized.

/// Remove bold/italic/code/list markers from a sentence before synthesis.
///
/// `**` is removed before `*` so bold pairs don't leave stray asterisks.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    text.replace("**", "")
        .replace('*', "")
        .replace('`', "")
        .replace("- ", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_italic_code_and_bullets() {
        assert_eq!(
            strip_markup("**bold** *italic* `code` - item"),
            "bold italic code item"
        );
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(strip_markup("nothing to strip here."), "nothing to strip here.");
    }

    #[test]
    fn nested_emphasis() {
        assert_eq!(strip_markup("***very* important**"), "very important");
    }
}
