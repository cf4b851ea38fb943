use ammonia;

/// Clean instructor-authored text (quiz titles, descriptions, question prompts)
/// before it is stored and later rendered by clients.
///
/// Whitelist-based: safe inline tags such as <b> survive, <script>/<iframe> and
/// event-handler attributes are stripped. Answer keys and student answers are
/// never passed through here, since rewriting them would change scoring.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
