use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Classes of secret or personal data the floor refuses to pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveDataKind {
    GovernmentId,
    ApiKey,
    CloudAccessKey,
    RepositoryToken,
    ChatBotToken,
    PaymentCard,
    BearerToken,
    PrivateKey,
    SecretAssignment,
}

impl SensitiveDataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveDataKind::GovernmentId => "government_id",
            SensitiveDataKind::ApiKey => "api_key",
            SensitiveDataKind::CloudAccessKey => "cloud_access_key",
            SensitiveDataKind::RepositoryToken => "repository_token",
            SensitiveDataKind::ChatBotToken => "chat_bot_token",
            SensitiveDataKind::PaymentCard => "payment_card",
            SensitiveDataKind::BearerToken => "bearer_token",
            SensitiveDataKind::PrivateKey => "private_key",
            SensitiveDataKind::SecretAssignment => "secret_assignment",
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static sensitive-data pattern")
}

static SIGNATURES: LazyLock<Vec<(SensitiveDataKind, Regex)>> = LazyLock::new(|| {
    vec![
        (SensitiveDataKind::GovernmentId, compile(r"\b\d{3}-\d{2}-\d{4}\b")),
        (
            SensitiveDataKind::ApiKey,
            compile(r"\b(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]{16,}\b"),
        ),
        (SensitiveDataKind::ApiKey, compile(r"\bsk-[A-Za-z0-9_-]{20,}")),
        (SensitiveDataKind::ApiKey, compile(r"\bAIza[0-9A-Za-z_-]{35}")),
        (
            SensitiveDataKind::CloudAccessKey,
            compile(r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b"),
        ),
        (
            SensitiveDataKind::RepositoryToken,
            compile(r"\bgh[pousr]_[A-Za-z0-9]{36,}\b"),
        ),
        (
            SensitiveDataKind::RepositoryToken,
            compile(r"\bgithub_pat_[A-Za-z0-9_]{22,}"),
        ),
        (SensitiveDataKind::RepositoryToken, compile(r"\bglpat-[A-Za-z0-9_-]{20,}")),
        (
            SensitiveDataKind::ChatBotToken,
            compile(r"\bxox[abprs]-[A-Za-z0-9-]{10,}"),
        ),
        (
            SensitiveDataKind::BearerToken,
            compile(r"(?i)\bbearer\s+[A-Za-z0-9._~+/-]{20,}=*"),
        ),
        (
            SensitiveDataKind::BearerToken,
            compile(r"\beyJ[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}\.[A-Za-z0-9_-]{8,}"),
        ),
        (
            SensitiveDataKind::PrivateKey,
            compile(r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----"),
        ),
        (
            SensitiveDataKind::SecretAssignment,
            compile(r#"(?i)\b(?:secret|password|passwd|api_key)\s*[:=]\s*["']?[^\s"']{4,}"#),
        ),
    ]
});

/// Digit runs of at least card length, allowing single space or dash
/// separators between groups.
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| compile(r"\b\d(?:[ -]?\d){12,}\b"));

/// Every signature class present in `text`, in declaration order.
pub fn detect_sensitive_data(text: &str) -> Vec<SensitiveDataKind> {
    let mut found: Vec<SensitiveDataKind> = Vec::new();
    for (kind, re) in SIGNATURES.iter() {
        if !found.contains(kind) && re.is_match(text) {
            found.push(*kind);
        }
    }
    if DIGIT_RUN.find_iter(text).any(|m| run_contains_card(m.as_str())) {
        found.push(SensitiveDataKind::PaymentCard);
    }
    found.sort();
    found
}

pub fn contains_sensitive_data(text: &str) -> bool {
    !detect_sensitive_data(text).is_empty()
}

/// Whether any span of whole groups in `run` is a card number, so a card
/// followed or preceded by another short number is still caught.
fn run_contains_card(run: &str) -> bool {
    let groups: Vec<&str> = run.split([' ', '-']).filter(|g| !g.is_empty()).collect();
    (0..groups.len()).any(|start| {
        let mut candidate = String::new();
        groups[start..].iter().any(|group| {
            candidate.push_str(group);
            luhn_valid(&candidate)
        })
    })
}

/// Luhn checksum over the digits of `candidate`.
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
