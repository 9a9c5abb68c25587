//! course-store - Structured course storage and ordering engine
//!
//! Courses contain ordered chapters; chapters contain ordered lessons. The
//! hard part is the ordering subsystem: every sibling scope keeps a strict,
//! gap-free, zero-based position sequence, and drag-and-drop reorders arrive
//! as bulk position reassignments that must apply atomically.
//!
//! ## Architecture
//!
//! - **Position model** (`ordering`) - pure rules for contiguous positions
//! - **Repositories** (`db`) - SQLite rows, the reorder engine, the scope
//!   guard, cascade deletes with renumbering, the consistency verifier
//! - **Services** (`services`) - the mutation boundary: abuse protection,
//!   authorization, validation, events for view invalidation
//!
//! ## Ordering contract
//!
//! A reorder must be a *total permutation* of one scope: every current child
//! exactly once, target positions exactly `{0..n-1}`. Sparse patches are
//! rejected so the contiguity invariant stays provable. Same-scope writers
//! are serialized by the store; a writer that loses a race against a
//! structural change fails with `ConcurrentModification` instead of merging.

pub mod config;
pub mod db;
pub mod error;
pub mod ordering;
pub mod services;

// Re-exports
pub use config::Config;
pub use db::CourseDb;
pub use error::StoreError;
pub use ordering::{PositionUpdate, PositionViolation};
pub use services::{ApiResponse, CourseService, CurriculumEvent, EventBus, Principal, Services};
