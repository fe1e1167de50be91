//! User-agent bot classification
//!
//! Gates scan recording only; a bot still gets redirected, it just
//! doesn't produce a scan event.

/// Known bot, crawler and link-preview signatures, matched
/// case-insensitively as substrings of the user-agent.
const BOT_SIGNATURES: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "crawling",
    "facebookexternalhit",
    "whatsapp",
    "telegram",
    "slack",
    "discord",
    "preview",
    "fetch",
    "curl",
    "wget",
    "python",
    "java",
    "go-http",
    "axios",
    "node-fetch",
    "postman",
];

/// Classify a user-agent string. Empty or unmatched input is treated as
/// human.
pub fn is_bot(user_agent: &str) -> bool {
    if user_agent.is_empty() {
        return false;
    }

    let ua = user_agent.to_ascii_lowercase();
    BOT_SIGNATURES.iter().any(|sig| ua.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_crawlers() {
        assert!(is_bot(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
        ));
        assert!(is_bot("facebookexternalhit/1.1"));
        assert!(is_bot("WhatsApp/2.23.20.0"));
        assert!(is_bot("curl/8.5.0"));
        assert!(is_bot("python-requests/2.31.0"));
        assert!(is_bot("PostmanRuntime/7.36.0"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(is_bot("GOOGLEBOT"));
        assert!(is_bot("Slack-ImgProxy"));
    }

    #[test]
    fn browsers_are_not_bots() {
        assert!(!is_bot(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        ));
        assert!(!is_bot(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"
        ));
    }

    #[test]
    fn empty_user_agent_is_not_a_bot() {
        assert!(!is_bot(""));
    }
}
