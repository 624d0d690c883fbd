//! # warden
//!
//! Symbolic directive gating for autonomous agent tool calls.
//!
//! An agent attaches a frame to each proposed tool call. Warden parses and
//! validates the frame, scores how well it covers the call, runs the
//! interception gates and, for adaptive checks, modulates gate thresholds by
//! mode, uncertainty and calibration behind a fixed safety floor.
//!
//! ```no_run
//! use serde_json::json;
//! use warden::{Warden, WardenConfig};
//!
//! let config = WardenConfig::from_file("warden.yaml")?;
//! let mut warden = Warden::from_config(config)?;
//!
//! let frame = warden.parse_frame("◈Ⓓ◉⊞ | allow=read_file")?;
//! let decision = warden.intercept(&frame, "read_file", &json!({"path": "a.csv"}), "agent-1");
//! assert!(decision.allowed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod session;

pub use config::WardenConfig;
pub use error::{ConfigError, WardenError, WardenResult};
pub use session::Warden;

pub use warden_coverage as coverage;
pub use warden_frame as frame;
pub use warden_governance as governance;
pub use warden_interceptor as interceptor;
