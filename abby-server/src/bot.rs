/// User-Agent fragments that mark automated traffic. Checked lowercase.
const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawler",
    "crawling",
    "spider",
    "slurp",
    "headless",
    "phantomjs",
    "python-requests",
    "curl/",
    "wget/",
    "go-http-client",
    "facebookexternalhit",
    "bingpreview",
    "lighthouse",
];

/// Whether a request's User-Agent marks it as automated traffic.
///
/// Bot events are rejected synchronously and never enqueued; they would skew
/// analytics and burn the project's quota. A missing User-Agent is not treated
/// as a bot.
pub fn is_bot(user_agent: Option<&str>) -> bool {
    let Some(user_agent) = user_agent else {
        return false;
    };
    let user_agent = user_agent.to_ascii_lowercase();
    BOT_MARKERS.iter().any(|marker| user_agent.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browsers_pass() {
        assert!(!is_bot(Some(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        )));
        assert!(!is_bot(None));
    }

    #[test]
    fn known_bots_are_flagged() {
        assert!(is_bot(Some(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
        )));
        assert!(is_bot(Some("curl/8.4.0")));
        assert!(is_bot(Some("python-requests/2.31.0")));
        assert!(is_bot(Some(
            "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/119.0"
        )));
    }
}
