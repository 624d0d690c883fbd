//! # warden-interceptor
//!
//! The interception pipeline that sits between an agent and its tools.
//!
//! ## Gate order
//!
//! 1. **Parse confidence**: ambiguous frames are refused
//! 2. **Tool binding**: blocked patterns first, then allowed; no match is a
//!    default deny
//! 3. **Coverage**: the frame must justify this particular call
//! 4. **Rate limit**: per `(agent, limit)` window
//! 5. **Forbidden constraint**: refused outright; decoy frames are logged
//!    distinctly but are still a denial
//!
//! The first failing gate short-circuits. Every outcome, allowed or not, is
//! appended to a bounded audit ring buffer. Denial is a normal return value:
//! the interceptor never raises for a governance decision.

#![deny(unsafe_code)]

pub mod audit;
pub mod binding;
pub mod error;
pub mod interceptor;
pub mod rate_limit;
pub mod thresholds;

pub use audit::{AuditDecision, AuditEventType, AuditLog, AuditLogEntry, AUDIT_LOG_CAPACITY};
pub use binding::{
    match_tool, match_tool_with, pattern_matches, BindingMatch, PatternCache, PATTERN_CACHE_CAPACITY,
};
pub use error::InterceptorError;
pub use interceptor::{ActionInterceptor, InterceptorDecision, PostAuditReport};
pub use rate_limit::{RateLimitOutcome, RateLimitWindow, RateLimiter};
pub use thresholds::ConfidenceThresholds;
