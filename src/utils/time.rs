use chrono::{DateTime, FixedOffset, Utc};

pub fn format_time(datetime: DateTime<Utc>, offset: FixedOffset) -> String {
    datetime.with_timezone(&offset).format("%H:%M").to_string()
}

pub fn format_duration_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;

    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

/// Human readable time left, rounded up to the minute so that an entry never
/// shows "0m" while it is still listed.
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let seconds = remaining.num_seconds();
    if seconds <= 0 {
        return "now".to_string();
    }

    let minutes = (seconds + 59) / 60;
    format!("in {}", format_duration_minutes(minutes))
}
