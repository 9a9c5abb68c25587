//! Event system for curriculum mutations
//!
//! Provides an event bus for notifying listeners about successful mutations.
//! This is the view-invalidation seam: cached course listings subscribe and
//! refresh the affected scope. Fire-and-forget; not part of the transactional
//! guarantee.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Events emitted by the course service after a committed mutation
#[derive(Debug, Clone)]
pub enum CurriculumEvent {
    CourseCreated {
        id: String,
        title: String,
    },
    CourseUpdated {
        id: String,
    },
    CourseDeleted {
        id: String,
    },

    ChapterCreated {
        id: String,
        course_id: String,
    },
    ChapterDeleted {
        id: String,
        course_id: String,
    },
    ChaptersReordered {
        course_id: String,
    },

    LessonCreated {
        id: String,
        chapter_id: String,
    },
    LessonDeleted {
        id: String,
        chapter_id: String,
        course_id: String,
    },
    LessonsReordered {
        chapter_id: String,
        course_id: String,
    },
}

impl CurriculumEvent {
    /// The course whose cached listing should be refreshed.
    pub fn invalidates_course(&self) -> &str {
        match self {
            CurriculumEvent::CourseCreated { id, .. }
            | CurriculumEvent::CourseUpdated { id }
            | CurriculumEvent::CourseDeleted { id } => id,
            CurriculumEvent::ChapterCreated { course_id, .. }
            | CurriculumEvent::ChapterDeleted { course_id, .. }
            | CurriculumEvent::ChaptersReordered { course_id }
            | CurriculumEvent::LessonDeleted { course_id, .. }
            | CurriculumEvent::LessonsReordered { course_id, .. } => course_id,
            CurriculumEvent::LessonCreated { chapter_id, .. } => chapter_id,
        }
    }
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: &CurriculumEvent);
}

/// Event bus for broadcasting curriculum events
pub struct EventBus {
    sender: broadcast::Sender<CurriculumEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: CurriculumEvent) {
        trace!(event = ?event, "Emitting curriculum event");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<CurriculumEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &CurriculumEvent) {
        match event {
            CurriculumEvent::CourseCreated { id, title } => {
                debug!(id = %id, title = %title, "Course created");
            }
            CurriculumEvent::CourseDeleted { id } => {
                debug!(id = %id, "Course deleted");
            }
            CurriculumEvent::ChaptersReordered { course_id } => {
                debug!(course = %course_id, "Chapters reordered");
            }
            CurriculumEvent::LessonsReordered {
                chapter_id,
                course_id,
            } => {
                debug!(chapter = %chapter_id, course = %course_id, "Lessons reordered");
            }
            _ => {
                trace!(event = ?event, "Curriculum event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}
