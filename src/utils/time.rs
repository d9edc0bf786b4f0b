use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch, used to keep storage keys unique.
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}
