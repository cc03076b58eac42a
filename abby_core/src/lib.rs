//! `abby_core` is the engine behind abby: it distributes feature-flag,
//! remote-config, and A/B-test definitions, deterministically assigns each
//! visitor to a variant or rule-evaluated flag value, and records usage events
//! for analytics and plan-quota enforcement.
//!
//! # Overview
//!
//! `abby_core` is organized as a set of building blocks; the HTTP service and
//! the per-framework adapters are thin consumers of this crate.
//!
//! [`ProjectConfig`](config::ProjectConfig) is an immutable, environment-scoped
//! snapshot of a project's tests and flags. Snapshots come from a
//! [`ConfigSource`](config_source::ConfigSource) — HTTP-backed in production —
//! and are served through the [`ConfigCache`](cache::ConfigCache), a two-tier
//! cache with fresh/stale semantics at the edge and a fixed-TTL origin tier in
//! front of the source.
//!
//! [`rules::evaluate`] is a pure function resolving a flag's rule tree against
//! a [`UserContext`]. [`assignment::assign`] picks a test variant from the
//! weight distribution and keeps it sticky through a
//! [`StorageAdapter`](storage::StorageAdapter), the seam that lets the same
//! algorithm run identically in any host environment.
//!
//! [`events::EventPipeline`] ingests usage events: validated intake, a bounded
//! queue, and a fixed worker pool that persists events to an
//! [`EventSink`](events::EventSink) and feeds the
//! [`QuotaEnforcer`](quota::QuotaEnforcer), whose limit check gates config
//! reads on the hot path.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod assignment;
pub mod cache;
pub mod config;
pub mod config_source;
pub mod events;
pub mod quota;
pub mod rules;
pub mod storage;

mod attributes;
mod error;

pub use attributes::{AttributeValue, UserContext};
pub use config::{AttributeKind, FlagType, FlagValue};
pub use error::{Error, Result};
