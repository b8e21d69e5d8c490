pub mod error;
pub mod config;
pub mod demo_seeder;
pub mod db {
    pub mod models;
    pub mod facility_repository;
    pub mod notification_repository;
    pub mod mention_repository;
    pub mod memory;
}
pub mod auth {
    pub mod models;
    pub mod gate;
    pub mod session;
}
pub mod records {
    pub mod query;
    pub mod list;
    pub mod confirm;
    pub mod wizard;
}
pub mod broadcast {
    pub mod composer;
    pub mod listing;
    pub mod template;
}
pub mod feed {
    pub mod synchronizer;
    pub mod chat;
}

#[cfg(feature = "server")]
pub mod app;
#[cfg(feature = "server")]
pub mod api {
    pub mod errors;
    pub mod facilities;
    pub mod broadcasts;
    pub mod mentions;
}
