//! Service layer for course-store
//!
//! Services encapsulate business logic between callers and repositories.
//! Each mutating operation runs through the same boundary:
//! - Abuse-protection check (external collaborator)
//! - Authorization check (external collaborator)
//! - Input validation
//! - Transactional repository operation
//! - Event emission for view invalidation
//!
//! ## Architecture
//!
//! ```text
//! Caller (UI actions / CLI)
//!     ↓
//! Service Layer (mutation boundary)
//!     ↓
//! Repository Layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod access;
pub mod response;
pub mod events;
pub mod course_service;

// Re-exports
pub use access::{
    AbuseDecision, AbuseGuard, AllowAll, AlwaysRateLimited, Authorizer, DenyAll,
    FixedWindowLimiter, NoProtection, Principal,
};
pub use course_service::CourseService;
pub use events::{CurriculumEvent, EventBus, EventListener};
pub use response::{from_result, user_message, ApiResponse};

use crate::db::CourseDb;
use std::sync::Arc;

/// Service container for dependency injection
pub struct Services {
    pub course: Arc<CourseService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create all services with the given collaborators
    pub fn new(
        db: Arc<CourseDb>,
        authorizer: Arc<dyn Authorizer>,
        abuse: Arc<dyn AbuseGuard>,
    ) -> Self {
        let events = Arc::new(EventBus::new());

        Self {
            course: Arc::new(CourseService::new(
                db,
                authorizer,
                abuse,
                events.clone(),
            )),
            events,
        }
    }

    /// Create services with permissive collaborators (for testing and
    /// single-author deployments)
    pub fn new_permissive(db: Arc<CourseDb>) -> Self {
        Self::new(db, Arc::new(AllowAll), Arc::new(NoProtection))
    }
}
