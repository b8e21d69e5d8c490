use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hospital entry stored in the `hospitals` collection.
///
/// The document key is the externally supplied place identifier. A freshly
/// reserved record carries only `placeId` and `createdAt`; the remaining
/// fields are filled in when the creation wizard completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_address: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(rename = "logoURL", default)]
    pub logo_url: String,
    /// Per-record access secret. Absent on placeholders and legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Facility {
    /// Build the stub written when a place id is reserved.
    pub fn placeholder(place_id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: place_id.to_string(),
            place_id: place_id.to_string(),
            name: String::new(),
            full_address: String::new(),
            phone_number: String::new(),
            logo_url: String::new(),
            master_password: None,
            created_at: Some(created_at),
            updated_at: None,
        }
    }

    /// A record is still a bare placeholder until the wizard has written
    /// its required fields.
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && self.full_address.is_empty()
    }

    /// The editable contact fields of this record.
    pub fn fields(&self) -> FacilityFields {
        FacilityFields {
            name: self.name.clone(),
            full_address: self.full_address.clone(),
            phone_number: self.phone_number.clone(),
            logo_url: self.logo_url.clone(),
        }
    }
}

/// The contact fields an operator can edit on a facility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_address: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(rename = "logoURL", default)]
    pub logo_url: String,
}

/// What the console shows for a facility. Never carries the access secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitySummary {
    pub id: String,
    pub place_id: String,
    pub name: String,
    pub full_address: String,
    pub phone_number: String,
    #[serde(rename = "logoURL")]
    pub logo_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub placeholder: bool,
}

impl From<&Facility> for FacilitySummary {
    fn from(f: &Facility) -> Self {
        Self {
            id: f.id.clone(),
            place_id: f.place_id.clone(),
            name: f.name.clone(),
            full_address: f.full_address.clone(),
            phone_number: f.phone_number.clone(),
            logo_url: f.logo_url.clone(),
            created_at: f.created_at,
            updated_at: f.updated_at,
            placeholder: f.is_placeholder(),
        }
    }
}

/// An operator broadcast stored in the `notifications` collection under
/// the key `Message<N>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message_number: i64,
}

/// A chat-style message in the `secret-chat` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
    /// Viewers who have acknowledged this message.
    #[serde(default)]
    pub seen_by: Vec<String>,
}

impl Mention {
    /// Returns `true` when `viewer` neither wrote nor acknowledged this
    /// message.
    pub fn is_unseen_by(&self, viewer: &str) -> bool {
        self.sender != viewer && !self.seen_by.iter().any(|v| v == viewer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facility_wire_names() {
        let mut facility = Facility::placeholder("ChIJ-123", Utc::now());
        facility.name = "City Hospital".to_string();
        facility.logo_url = "https://cdn.example/logo.png".to_string();
        facility.master_password = Some("s3cret".to_string());

        let json = serde_json::to_value(&facility).unwrap();
        assert_eq!(json["_id"], "ChIJ-123");
        assert_eq!(json["placeId"], "ChIJ-123");
        assert_eq!(json["logoURL"], "https://cdn.example/logo.png");
        assert_eq!(json["masterPassword"], "s3cret");
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn test_placeholder_document_defaults() {
        // Stub written on reservation: only the place id and creation time.
        let json = r###"{
            "_id": "ChIJ-9",
            "placeId": "ChIJ-9",
            "createdAt": "2024-01-01T00:00:00Z"
        }"###;

        let facility: Facility = serde_json::from_str(json).unwrap();
        assert!(facility.is_placeholder());
        assert_eq!(facility.master_password, None);
        assert_eq!(facility.updated_at, None);
    }

    #[test]
    fn test_summary_hides_secret() {
        let mut facility = Facility::placeholder("p1", Utc::now());
        facility.name = "General".to_string();
        facility.master_password = Some("hidden".to_string());

        let json = serde_json::to_string(&FacilitySummary::from(&facility)).unwrap();
        assert!(!json.contains("hidden"));
        assert!(json.contains("\"placeholder\":false"));
    }

    #[test]
    fn test_mention_unseen_rules() {
        let mention = Mention {
            id: "m1".to_string(),
            text: "hello".to_string(),
            sender: "alice".to_string(),
            timestamp: Utc::now(),
            seen_by: vec!["carol".to_string()],
        };

        assert!(mention.is_unseen_by("bob"));
        assert!(!mention.is_unseen_by("alice"));
        assert!(!mention.is_unseen_by("carol"));
    }

    #[test]
    fn test_mention_missing_seen_by_defaults_empty() {
        let json = r###"{
            "_id": "m2",
            "text": "hi",
            "sender": "alice",
            "timestamp": "2024-03-01T10:00:00Z"
        }"###;
        let mention: Mention = serde_json::from_str(json).unwrap();
        assert!(mention.seen_by.is_empty());
    }
}
