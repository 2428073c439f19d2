// What asked the recorder to run

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic beat from the worker, carrying wall-clock time.
    Heartbeat(DateTime<Utc>),
    /// On-demand refresh (HTTP or tests).
    Manual,
}
