use chrono::NaiveDate;

use crate::db::models::Notification;

/// Filter broadcasts by text and calendar day, newest first.
///
/// The text filter is a case-insensitive substring match over the content
/// and the message key. The day filter compares UTC calendar dates.
pub fn filter_notifications(
    notifications: &[Notification],
    query: &str,
    day: Option<NaiveDate>,
) -> Vec<Notification> {
    let needle = query.trim().to_lowercase();

    let mut filtered: Vec<Notification> = notifications
        .iter()
        .filter(|n| day.map_or(true, |d| n.timestamp.date_naive() == d))
        .filter(|n| {
            needle.is_empty()
                || n.content.to_lowercase().contains(&needle)
                || n.id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn notification(n: i64, content: &str, y: i32, m: u32, d: u32, h: u32) -> Notification {
        Notification {
            id: format!("Message{n}"),
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            message_number: n,
        }
    }

    fn sample() -> Vec<Notification> {
        vec![
            notification(1, "Blood camp on Sunday", 2024, 5, 1, 9),
            notification(2, "New ICU beds at Ruby Hall", 2024, 5, 1, 17),
            notification(3, "App update available", 2024, 5, 2, 8),
        ]
    }

    #[test]
    fn test_newest_first() {
        let ids: Vec<String> = filter_notifications(&sample(), "", None)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["Message3", "Message2", "Message1"]);
    }

    #[test]
    fn test_text_filter_over_content_and_key() {
        assert_eq!(filter_notifications(&sample(), "icu", None).len(), 1);
        assert_eq!(filter_notifications(&sample(), "message1", None).len(), 1);
        assert_eq!(filter_notifications(&sample(), "  ", None).len(), 3);
    }

    #[test]
    fn test_day_filter() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1);
        let ids: Vec<String> = filter_notifications(&sample(), "", day)
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["Message2", "Message1"]);

        let combined = filter_notifications(&sample(), "blood", day);
        assert_eq!(combined.len(), 1);
    }
}
