const FENCE: &str = "```";
const ROLE_PREFIX: &str = "assistant:";
const LANGUAGE_TAGS: [&str; 2] = ["bash", "sh"];

/// Pulls a single command out of a free-form reply.
///
/// Takes the first fenced block when there is one (dropping a `bash`/`sh`
/// language tag), then strips an `assistant:` prefix and one pair of
/// wrapping backticks. Only ever removes text from the input; an empty
/// result means nothing usable came back.
pub fn extract_command(raw: &str) -> String {
    let mut text = raw.trim();

    if text.contains(FENCE) {
        text = text.split(FENCE).nth(1).unwrap_or_default().trim();
        if let Some((first, rest)) = text.split_once('\n') {
            if is_language_tag(first) {
                text = rest.trim();
            }
        } else if is_language_tag(text) {
            text = "";
        }
    }

    if let Some(head) = text.get(..ROLE_PREFIX.len()) {
        if head.eq_ignore_ascii_case(ROLE_PREFIX) {
            text = text[ROLE_PREFIX.len()..].trim();
        }
    }

    if text.len() >= 2 && text.starts_with('`') && text.ends_with('`') {
        text = text[1..text.len() - 1].trim();
    }

    text.to_string()
}

/// The `!`-prefixed line offered as the next prompt's prefill. Multi-line
/// commands are folded onto one line.
pub fn shell_escape_form(command: &str) -> String {
    let folded = command.lines().collect::<Vec<_>>().join(" ");
    format!("!{}", folded.trim())
}

fn is_language_tag(line: &str) -> bool {
    let line = line.trim();
    LANGUAGE_TAGS
        .iter()
        .any(|tag| line.eq_ignore_ascii_case(tag))
}
