use std::sync::LazyLock;

use regex::Regex;

static URL_USERINFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<scheme>[a-zA-Z][a-zA-Z0-9+.-]*://)[^/@\s]+@").unwrap());

/// Replace the userinfo part of any URL in `text` with `***`, so tokens
/// embedded in remote URLs never reach logs or migration results.
pub fn redact_credentials(text: &str) -> String {
    URL_USERINFO_RE
        .replace_all(text, "${scheme}***@")
        .into_owned()
}
