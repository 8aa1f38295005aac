use regex::Regex;
use std::sync::LazyLock;

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z0-9_]+)").expect("mention regex"));

/// Pulls `@username` handles out of post content, deduplicated in order
/// of first appearance.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for capture in MENTION_RE.captures_iter(content) {
        let handle = capture[1].to_string();
        if !seen.contains(&handle) {
            seen.push(handle);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_handles_in_order_of_first_appearance() {
        let mentions = extract_mentions("hey @alice, did @bob_42 see this? cc @alice");
        assert_eq!(mentions, vec!["alice", "bob_42"]);
    }

    #[test]
    fn ignores_content_without_mentions() {
        assert!(extract_mentions("no handles here, just an email a@").is_empty());
        assert!(extract_mentions("").is_empty());
    }

    #[test]
    fn stops_handles_at_punctuation() {
        let mentions = extract_mentions("(@carol) and @dave!");
        assert_eq!(mentions, vec!["carol", "dave"]);
    }
}
