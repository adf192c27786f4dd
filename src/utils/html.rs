/// Clean user-supplied quiz text using the ammonia library.
///
/// Whitelist-based: safe inline tags survive, `<script>` (with its content),
/// `<iframe>` and event-handler attributes are removed.
///
/// Only applied to display text (titles, prompts, explanations). Options and
/// answer keys are compared verbatim when grading and are stored untouched.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_keeps_text() {
        assert_eq!(clean_html("Hi<script>alert(1)</script>"), "Hi");
        assert_eq!(clean_html("<b>bold</b>"), "<b>bold</b>");
        assert!(!clean_html("<p onclick=\"x()\">x</p>").contains("onclick"));
    }
}
