use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::db::models::Facility;

/// Sort order for the facility list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Alphabetical by display name.
    #[default]
    Name,
    /// Most recently updated first; undated records last.
    Date,
}

/// Case-insensitive substring match over name, id, place id, address and
/// phone. An empty query matches every record.
pub fn matches_query(facility: &Facility, query: &str) -> bool {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return true;
    }

    [
        &facility.name,
        &facility.id,
        &facility.place_id,
        &facility.full_address,
        &facility.phone_number,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Base letters only: decomposed, combining marks dropped, lowercased.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Compare display names ignoring case and accents. Lowercased text, then
/// exact bytes, break ties so the order stays total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Compare by last update, newest first. `None` sorts after any date.
pub fn compare_recency(a: &Facility, b: &Facility) -> Ordering {
    b.updated_at.cmp(&a.updated_at)
}

/// Filter and sort a slice of facilities for display.
pub fn filter_and_sort<'a>(
    facilities: &'a [Facility],
    query: &str,
    sort: SortKey,
) -> Vec<&'a Facility> {
    let mut view: Vec<&Facility> = facilities
        .iter()
        .filter(|f| matches_query(f, query))
        .collect();

    match sort {
        SortKey::Name => view.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortKey::Date => view.sort_by(|a, b| compare_recency(a, b)),
    }
    view
}

/// `tel:` URI for dialling a facility, or `None` when it has no number.
pub fn tel_uri(phone_number: &str) -> Option<String> {
    let dialable: String = phone_number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if dialable.is_empty() {
        None
    } else {
        Some(format!("tel:{}", dialable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn facility(id: &str, name: &str, updated: Option<i64>) -> Facility {
        let mut f = Facility::placeholder(id, Utc::now());
        f.name = name.to_string();
        f.full_address = format!("{name} Road, Pune");
        f.phone_number = "+91 20 5555 0101".to_string();
        f.updated_at = updated.map(|s| DateTime::from_timestamp(s, 0).unwrap());
        f
    }

    #[test]
    fn test_query_matches_any_field() {
        let f = facility("ChIJabc", "Ruby Hall Clinic", None);

        assert!(matches_query(&f, "ruby"));
        assert!(matches_query(&f, "CHIJABC"));
        assert!(matches_query(&f, "road, pune"));
        assert!(matches_query(&f, "5555"));
        assert!(!matches_query(&f, "jehangir"));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let f = facility("p1", "", None);
        assert!(matches_query(&f, ""));
    }

    #[test]
    fn test_predicate_agrees_with_definition() {
        let records = vec![
            facility("a1", "Sahyadri", None),
            facility("b2", "Noble", None),
            facility("c3", "Deenanath", None),
        ];
        for query in ["a", "NO", "c3", "road", "xyz", ""] {
            for f in &records {
                let q = query.to_lowercase();
                let expected = [&f.name, &f.id, &f.full_address, &f.phone_number]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&q));
                assert_eq!(matches_query(f, query), expected, "query {query:?} on {}", f.id);
            }
        }
    }

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let records = vec![
            facility("1", "sahyadri", None),
            facility("2", "Aditya Birla", None),
            facility("3", "Noble", None),
        ];
        let sorted: Vec<&str> = filter_and_sort(&records, "", SortKey::Name)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(sorted, vec!["Aditya Birla", "Noble", "sahyadri"]);
    }

    #[test]
    fn test_name_order_ignores_accents() {
        assert_eq!(compare_names("Émergence", "Zeta"), Ordering::Less);
        assert_eq!(compare_names("émergence", "Emergence"), Ordering::Greater);
        assert_eq!(compare_names("Jehangir", "jehangir"), Ordering::Less);

        let records = vec![
            facility("1", "Zeta", None),
            facility("2", "Émergence", None),
            facility("3", "Ekta", None),
        ];
        let sorted: Vec<&str> = filter_and_sort(&records, "", SortKey::Name)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(sorted, vec!["Ekta", "Émergence", "Zeta"]);
    }

    #[test]
    fn test_sort_by_date_newest_first_undated_last() {
        let records = vec![
            facility("old", "Old", Some(100)),
            facility("none", "Undated", None),
            facility("new", "New", Some(200)),
        ];
        let sorted: Vec<&str> = filter_and_sort(&records, "", SortKey::Date)
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(sorted, vec!["new", "old", "none"]);

        let windows = filter_and_sort(&records, "", SortKey::Date);
        for pair in windows.windows(2) {
            assert!(pair[0].updated_at >= pair[1].updated_at);
        }
    }

    #[test]
    fn test_tel_uri() {
        assert_eq!(tel_uri("+91 20 5555-0101"), Some("tel:+912055550101".to_string()));
        assert_eq!(tel_uri(""), None);
        assert_eq!(tel_uri("n/a"), None);
    }
}
