//! One-way calendar export: each schedule entry becomes an event-creation URL
//! for an external calendar provider, stamped onto a concrete local date.

use crate::model::ScheduleEntry;
use chrono::NaiveDate;

pub const DEFAULT_TIMEZONE: &str = "Europe/London";

const PROVIDER_BASE: &str = "https://calendar.google.com/calendar/render?action=TEMPLATE";

/// Build the provider URL for one entry on `date`.
pub fn event_url(entry: &ScheduleEntry, date: NaiveDate, timezone: &str) -> String {
    let mut url = format!(
        "{}&text={}&dates={}/{}&ctz={}",
        PROVIDER_BASE,
        urlencoding::encode(&entry.name),
        stamp(date, entry.start),
        stamp(date, entry.end),
        urlencoding::encode(timezone),
    );
    if let Some(location) = entry.location.as_deref() {
        if !location.is_empty() {
            url.push_str("&location=");
            url.push_str(&urlencoding::encode(location));
        }
    }
    if let (Some(length), Some(intensity)) = (entry.length, entry.intensity) {
        let details = format!("{:.1}h, {}", length, intensity.as_str());
        url.push_str("&details=");
        url.push_str(&urlencoding::encode(&details));
    }
    url
}

/// Provider timestamp: local date plus the entry's time-of-day.
fn stamp(date: NaiveDate, minutes: i32) -> String {
    format!(
        "{}T{:02}{:02}00",
        date.format("%Y%m%d"),
        minutes / 60,
        minutes % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Intensity;

    fn entry() -> ScheduleEntry {
        ScheduleEntry {
            name: "Write essay & notes".into(),
            start: 540,
            end: 630,
            flexible: true,
            length: Some(1.5),
            intensity: Some(Intensity::Light),
            location: Some("Home office".into()),
        }
    }

    #[test]
    fn url_encodes_title_and_location() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let url = event_url(&entry(), date, DEFAULT_TIMEZONE);
        assert!(url.starts_with(PROVIDER_BASE));
        assert!(url.contains("text=Write%20essay%20%26%20notes"));
        assert!(url.contains("location=Home%20office"));
        assert!(!url.contains("Write essay"));
    }

    #[test]
    fn dates_span_the_entry_on_the_given_day() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let url = event_url(&entry(), date, DEFAULT_TIMEZONE);
        assert!(url.contains("dates=20250314T090000/20250314T103000"));
        assert!(url.contains("ctz=Europe%2FLondon"));
    }

    #[test]
    fn fixed_entries_skip_the_flexible_details() {
        let mut fixed = entry();
        fixed.flexible = false;
        fixed.length = None;
        fixed.intensity = None;
        fixed.location = None;
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let url = event_url(&fixed, date, DEFAULT_TIMEZONE);
        assert!(!url.contains("details="));
        assert!(!url.contains("location="));
    }
}
