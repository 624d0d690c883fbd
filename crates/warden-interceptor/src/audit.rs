use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of entries retained; older entries are dropped first.
pub const AUDIT_LOG_CAPACITY: usize = 10_000;

/// What the interceptor observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Allowed,
    LowParseConfidence,
    ToolNotBound,
    InsufficientCoverage,
    RateLimited,
    Forbidden,
    /// Forbidden constraint carrying the `decoy` extension.
    DecoyTriggered,
    /// Post-execution confidence check.
    PostAudit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    Allowed,
    Blocked,
}

/// One append-only audit record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub audit_id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub event_type: AuditEventType,
    /// Frame text as supplied by the agent.
    pub frame: String,
    pub decision: AuditDecision,
    /// Tool, reason and any gate-specific data.
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_confidence: Option<f64>,
}

/// Bounded FIFO of audit entries.
///
/// Appends past [`AUDIT_LOG_CAPACITY`] drop the oldest entries; order is never
/// rearranged.
#[derive(Clone, Debug)]
pub struct AuditLog {
    entries: VecDeque<AuditLogEntry>,
    capacity: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(AUDIT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, then trim to capacity from the front.
    pub fn append(&mut self, entry: AuditLogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<&AuditLogEntry> {
        self.entries.iter().collect()
    }

    pub fn for_agent(&self, agent_id: &str) -> Vec<&AuditLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .collect()
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&AuditLogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    pub fn find(&self, audit_id: &str) -> Option<&AuditLogEntry> {
        self.entries.iter().rev().find(|e| e.audit_id == audit_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: usize, agent: &str) -> AuditLogEntry {
        AuditLogEntry {
            audit_id: format!("aud-{id}"),
            timestamp: Utc::now(),
            agent_id: agent.into(),
            event_type: AuditEventType::Allowed,
            frame: "◆Ⓓ◉".into(),
            decision: AuditDecision::Allowed,
            details: json!({"tool": "read_file"}),
            coverage_confidence: Some(1.0),
        }
    }

    #[test]
    fn append_and_query_by_agent() {
        let mut log = AuditLog::new();
        log.append(entry(1, "alpha"));
        log.append(entry(2, "beta"));
        log.append(entry(3, "alpha"));

        assert_eq!(log.len(), 3);
        let alpha = log.for_agent("alpha");
        assert_eq!(alpha.len(), 2);
        assert_eq!(alpha[1].audit_id, "aud-3");
    }

    #[test]
    fn trims_oldest_first_preserving_order() {
        let mut log = AuditLog::with_capacity(3);
        for i in 0..5 {
            log.append(entry(i, "alpha"));
        }
        let ids: Vec<_> = log.entries().iter().map(|e| e.audit_id.clone()).collect();
        assert_eq!(ids, vec!["aud-2", "aud-3", "aud-4"]);
    }

    #[test]
    fn default_capacity_is_ten_thousand() {
        let mut log = AuditLog::new();
        for i in 0..AUDIT_LOG_CAPACITY + 25 {
            log.append(entry(i, "alpha"));
        }
        assert_eq!(log.len(), AUDIT_LOG_CAPACITY);
        assert_eq!(log.entries()[0].audit_id, "aud-25");
    }

    #[test]
    fn recent_returns_tail() {
        let mut log = AuditLog::new();
        for i in 0..10 {
            log.append(entry(i, "alpha"));
        }
        let recent = log.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].audit_id, "aud-7");
        assert_eq!(log.recent(50).len(), 10);
    }

    #[test]
    fn clear_empties_log() {
        let mut log = AuditLog::new();
        log.append(entry(1, "alpha"));
        log.clear();
        assert!(log.is_empty());
        assert!(log.find("aud-1").is_none());
    }
}
