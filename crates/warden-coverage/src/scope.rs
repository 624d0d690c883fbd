use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Kind of external target found in tool arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalTarget {
    Url,
    Email,
    Domain,
}

impl ExternalTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalTarget::Url => "url",
            ExternalTarget::Email => "email address",
            ExternalTarget::Domain => "domain name",
        }
    }
}

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z][a-z0-9+.\-]*://[^\s]+").expect("static URL pattern")
});

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").expect("static email pattern")
});

static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?\.)+(?:com|net|org|io|ai|dev|co|gov|edu|info|biz|app|cloud|xyz)\b",
    )
    .expect("static domain pattern")
});

/// Scan tool arguments, recursing through arrays and objects, for the first
/// value that points outside the agent's environment.
pub fn find_external_target(args: &Value) -> Option<(ExternalTarget, String)> {
    match args {
        Value::String(s) => classify(s).map(|kind| (kind, s.clone())),
        Value::Array(items) => items.iter().find_map(find_external_target),
        Value::Object(map) => map.values().find_map(find_external_target),
        _ => None,
    }
}

fn classify(text: &str) -> Option<ExternalTarget> {
    if URL_PATTERN.is_match(text) {
        Some(ExternalTarget::Url)
    } else if EMAIL_PATTERN.is_match(text) {
        Some(ExternalTarget::Email)
    } else if DOMAIN_PATTERN.is_match(text) {
        Some(ExternalTarget::Domain)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_url() {
        let found = find_external_target(&json!({"target": "https://example.org/upload"}));
        assert_eq!(found.unwrap().0, ExternalTarget::Url);
    }

    #[test]
    fn finds_email_in_nested_array() {
        let args = json!({"message": {"recipients": ["ops", "alice@example.com"]}});
        let (kind, value) = find_external_target(&args).unwrap();
        assert_eq!(kind, ExternalTarget::Email);
        assert_eq!(value, "alice@example.com");
    }

    #[test]
    fn finds_bare_domain() {
        let found = find_external_target(&json!(["sync to files.acme.io"]));
        assert_eq!(found.unwrap().0, ExternalTarget::Domain);
    }

    #[test]
    fn local_paths_are_not_external() {
        let args = json!({"path": "/var/data/report.csv", "lines": 20, "recursive": true});
        assert!(find_external_target(&args).is_none());
    }
}
