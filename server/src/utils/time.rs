//! Time utility functions

use chrono::{DateTime, Duration, Utc};

/// Whether `ts` falls within the last `window` from now.
pub fn within_window(ts: DateTime<Utc>, window: Duration) -> bool {
    ts > Utc::now() - window
}
