//! Engine library for the SmartClass sidecar: grade aggregation, period
//! date gating, status-code translation, the versioned view-state cache,
//! and write reconciliation against the remote academic service.

pub mod aggregate;
pub mod cache;
pub mod client;
pub mod codec;
pub mod ipc;
pub mod model;
pub mod reconcile;
pub mod window;
