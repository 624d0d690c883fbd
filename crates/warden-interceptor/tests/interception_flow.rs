//! End-to-end flows through the interception pipeline.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use warden_frame::parse;
use warden_interceptor::{
    ActionInterceptor, AuditDecision, AuditEventType, AUDIT_LOG_CAPACITY,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Default deny
// ---------------------------------------------------------------------------

#[test]
fn unlisted_tool_denied_and_audited() {
    init_tracing();
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◈Ⓓ◉ | allow=read_*;block=delete_*").unwrap();

    let decision = interceptor.intercept(&frame, "execute_command", &json!({}), "agent-7");

    assert!(!decision.allowed);
    let entries = interceptor.audit_log();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].audit_id, decision.audit_id);
    assert_eq!(entries[0].agent_id, "agent-7");
    assert_eq!(entries[0].event_type, AuditEventType::ToolNotBound);
    assert_eq!(entries[0].decision, AuditDecision::Blocked);
}

#[test]
fn frame_without_bindings_denies_everything() {
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◈Ⓓ◉").unwrap();
    let decision = interceptor.intercept(&frame, "read_file", &json!({}), "agent-7");
    assert!(!decision.allowed);
    assert_eq!(decision.event_type, AuditEventType::ToolNotBound);
}

#[test]
fn blocked_pattern_beats_wildcard_allow() {
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◆Ⓓ✂ | allow=*;block=delete_*").unwrap();

    let decision = interceptor.intercept(&frame, "delete_file", &json!({}), "agent-7");
    assert!(!decision.allowed);
    assert!(decision.reason.contains("delete_*"));
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[test]
fn rate_limit_denies_within_window_and_recovers() {
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◈Ⓓ◉ | allow=read_file;rate=2/min").unwrap();
    let args = json!({"path": "report.csv"});

    assert!(interceptor.intercept_at(&frame, "read_file", &args, "a", t0()).allowed);
    assert!(
        interceptor
            .intercept_at(&frame, "read_file", &args, "a", t0() + Duration::seconds(10))
            .allowed
    );

    let third = interceptor.intercept_at(&frame, "read_file", &args, "a", t0() + Duration::seconds(15));
    assert!(!third.allowed);
    assert_eq!(third.event_type, AuditEventType::RateLimited);
    assert!(third.reason.contains("45s"), "{}", third.reason);

    // Another agent has its own window.
    assert!(interceptor.intercept_at(&frame, "read_file", &args, "b", t0() + Duration::seconds(15)).allowed);

    // Window elapses.
    assert!(
        interceptor
            .intercept_at(&frame, "read_file", &args, "a", t0() + Duration::seconds(60))
            .allowed
    );
}

#[test]
fn reset_rate_limits_clears_windows() {
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◈Ⓓ◉ | allow=read_file;rate=1/hour").unwrap();

    assert!(interceptor.intercept_at(&frame, "read_file", &json!({}), "a", t0()).allowed);
    assert!(!interceptor.intercept_at(&frame, "read_file", &json!({}), "a", t0()).allowed);
    interceptor.reset_rate_limits();
    assert!(interceptor.intercept_at(&frame, "read_file", &json!({}), "a", t0()).allowed);
}

// ---------------------------------------------------------------------------
// Forbidden and decoy
// ---------------------------------------------------------------------------

#[test]
fn decoy_frame_never_reports_success() {
    init_tracing();
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◆Ⓕ⇄⊗[decoy] | allow=transfer_funds").unwrap();

    let decision = interceptor.intercept(
        &frame,
        "transfer_funds",
        &json!({"amount": 50, "to": "acct-1"}),
        "agent-9",
    );

    assert!(!decision.allowed);
    assert_eq!(decision.event_type, AuditEventType::DecoyTriggered);
    let entry = &interceptor.audit_log_for_agent("agent-9")[0];
    assert_eq!(entry.decision, AuditDecision::Blocked);
    assert_eq!(entry.details["mode"], "decoy");
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[test]
fn internal_frame_cannot_reach_external_url() {
    let mut interceptor = ActionInterceptor::new();
    // Network domain, read action, risky tool under a loose mode.
    let frame = parse("◇Ⓝ[internal]◉ | allow=http_request").unwrap();

    let decision = interceptor.intercept(
        &frame,
        "http_request",
        &json!({"url": "https://example.com/data"}),
        "agent-3",
    );

    // 1.0 - risk 0.2 - scope 0.2 = 0.6 sits exactly at the minimum.
    assert!(decision.allowed, "{}", decision.reason);
    assert!((decision.coverage_confidence.unwrap() - 0.6).abs() < 1e-9);

    let strict = parse("◆Ⓝ[internal]◉ | allow=http_request").unwrap();
    let decision = interceptor.intercept(
        &strict,
        "http_request",
        &json!({"url": "https://example.com/data"}),
        "agent-3",
    );
    assert!((decision.coverage_confidence.unwrap() - 0.8).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Audit buffer
// ---------------------------------------------------------------------------

#[test]
fn audit_buffer_keeps_last_entries_in_order() {
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◈Ⓓ◉ | allow=read_file").unwrap();

    let mut last_ids = Vec::new();
    for i in 0..AUDIT_LOG_CAPACITY + 5 {
        let d = interceptor.intercept_at(&frame, "read_file", &json!({}), "bulk", t0() + Duration::milliseconds(i as i64));
        if i >= AUDIT_LOG_CAPACITY + 2 {
            last_ids.push(d.audit_id);
        }
    }

    assert_eq!(interceptor.audit_log().len(), AUDIT_LOG_CAPACITY);
    let recent: Vec<_> = interceptor.recent(3).into_iter().map(|e| e.audit_id.clone()).collect();
    assert_eq!(recent, last_ids);

    let timestamps: Vec<_> = interceptor.audit_log().iter().map(|e| e.timestamp).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn audit_entries_serialize_as_json() {
    let mut interceptor = ActionInterceptor::new();
    let frame = parse("◈Ⓓ◉ | allow=read_file").unwrap();
    interceptor.intercept(&frame, "read_file", &json!({}), "agent-1");

    let value = serde_json::to_value(interceptor.audit_log()[0]).unwrap();
    assert_eq!(value["event_type"], "allowed");
    assert_eq!(value["decision"], "allowed");
    assert_eq!(value["details"]["tool"], "read_file");
}
