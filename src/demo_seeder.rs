use chrono::{Duration, Utc};

use crate::broadcast::composer::message_key;
use crate::db::facility_repository::FacilityRepository;
use crate::db::mention_repository::MentionRepository;
use crate::db::models::{Facility, FacilityFields, Mention, Notification};
use crate::db::notification_repository::NotificationRepository;

struct DemoFacility {
    place_id: &'static str,
    name: &'static str,
    full_address: &'static str,
    phone_number: &'static str,
    master_password: &'static str,
}

const DEMO_FACILITIES: &[DemoFacility] = &[
    DemoFacility {
        place_id: "ChIJdemo-ruby-hall",
        name: "Ruby Hall Clinic",
        full_address: "40 Sassoon Road, Pune 411001",
        phone_number: "+91 20 6645 5100",
        master_password: "ruby-demo",
    },
    DemoFacility {
        place_id: "ChIJdemo-jupiter",
        name: "Jupiter Hospital",
        full_address: "Baner Road, Pune 411045",
        phone_number: "+91 20 2799 2799",
        master_password: "jupiter-demo",
    },
    DemoFacility {
        place_id: "ChIJdemo-sahyadri",
        name: "Sahyadri Hospital",
        full_address: "Karve Road, Deccan Gymkhana, Pune 411004",
        phone_number: "",
        master_password: "",
    },
];

const DEMO_BROADCASTS: &[&str] = &[
    "Welcome to the hospital directory, {UserName}!",
    "Blood donation camp this Sunday at Ruby Hall Clinic.",
];

/// Populate an empty store with a few records for demo mode.
///
/// Existing records are left untouched; failures are logged and skipped.
pub async fn seed_demo_data(
    facilities: &dyn FacilityRepository,
    notifications: &dyn NotificationRepository,
    mentions: &dyn MentionRepository,
    operators: &[String],
) {
    tracing::info!("Starting demo data seeding...");
    let now = Utc::now();

    for (offset, demo) in DEMO_FACILITIES.iter().enumerate() {
        match facilities.find_by_id(demo.place_id).await {
            Ok(Some(_)) => {
                tracing::info!("Hospital '{}' already exists, skipping.", demo.place_id);
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to check for hospital '{}': {}", demo.place_id, e);
                continue;
            }
            Ok(None) => {}
        }

        let created_at = now - Duration::days(offset as i64 + 1);
        if let Err(e) = facilities
            .insert_placeholder(Facility::placeholder(demo.place_id, created_at))
            .await
        {
            tracing::error!("Failed to insert hospital '{}': {}", demo.place_id, e);
            continue;
        }

        let fields = FacilityFields {
            name: demo.name.to_string(),
            full_address: demo.full_address.to_string(),
            phone_number: demo.phone_number.to_string(),
            logo_url: String::new(),
        };
        match facilities
            .complete(
                demo.place_id,
                &fields,
                demo.master_password,
                created_at + Duration::hours(1),
            )
            .await
        {
            Ok(()) => tracing::info!("Inserted hospital '{}'.", demo.name),
            Err(e) => tracing::error!("Failed to fill in hospital '{}': {}", demo.place_id, e),
        }
    }

    match notifications.max_message_number().await {
        Ok(None) => {
            for (i, content) in DEMO_BROADCASTS.iter().enumerate() {
                let number = i as i64 + 1;
                let notification = Notification {
                    id: message_key(number),
                    content: content.to_string(),
                    timestamp: now - Duration::hours(DEMO_BROADCASTS.len() as i64 - i as i64),
                    message_number: number,
                };
                if let Err(e) = notifications.put(notification).await {
                    tracing::error!("Failed to insert broadcast {}: {}", number, e);
                }
            }
        }
        Ok(Some(_)) => tracing::info!("Broadcasts already present, skipping."),
        Err(e) => tracing::error!("Failed to check broadcasts: {}", e),
    }

    if let Some(sender) = operators.last() {
        match mentions.snapshot().await {
            Ok(existing) if existing.is_empty() => {
                let mention = Mention {
                    id: "demo-welcome".to_string(),
                    text: "Ward 3 list is updated, please review.".to_string(),
                    sender: sender.clone(),
                    timestamp: now,
                    seen_by: vec![],
                };
                if let Err(e) = mentions.post(mention).await {
                    tracing::error!("Failed to insert demo chat message: {}", e);
                }
            }
            Ok(_) => tracing::info!("Chat already has messages, skipping."),
            Err(e) => tracing::error!("Failed to check chat messages: {}", e),
        }
    }

    tracing::info!("Demo data seeding completed.");
}
