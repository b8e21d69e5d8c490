use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::db::mention_repository::MentionRepository;
use crate::error::AppError;
use crate::feed::synchronizer::MentionFeed;
use crate::records::list::RecordList;

/// Server-side state of one signed-in operator.
///
/// Opening a session starts the operator's mention feed; dropping it (or
/// calling `close`) stops the feed.
pub struct ConsoleSession {
    token: String,
    operator: String,
    chat_prompt_pending: AtomicBool,
    chat_unlocked: AtomicBool,
    records: Mutex<RecordList>,
    reservations: Mutex<HashSet<String>>,
    last_active: Mutex<Instant>,
    feed: MentionFeed,
}

impl ConsoleSession {
    /// Must be called from within a Tokio runtime.
    pub fn open(operator: impl Into<String>, mentions: Arc<dyn MentionRepository>) -> Self {
        let operator = operator.into();
        let feed = MentionFeed::new(operator.clone(), mentions);
        feed.start();

        Self {
            token: Uuid::new_v4().to_string(),
            operator,
            chat_prompt_pending: AtomicBool::new(false),
            chat_unlocked: AtomicBool::new(false),
            records: Mutex::new(RecordList::default()),
            reservations: Mutex::new(HashSet::new()),
            last_active: Mutex::new(Instant::now()),
            feed,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn feed(&self) -> &MentionFeed {
        &self.feed
    }

    /// The session's local copy of the facilities collection.
    pub fn records(&self) -> Result<MutexGuard<'_, RecordList>, AppError> {
        self.records
            .lock()
            .map_err(|_| AppError::Internal("Session record list lock poisoned".into()))
    }

    /// Record activity on the session.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_active.lock() {
            *last = Instant::now();
        }
    }

    /// Time since the last request made with this session.
    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or(Duration::MAX)
    }

    /// Remember a placeholder reserved by this session's wizard.
    pub fn claim_reservation(&self, place_id: &str) {
        if let Ok(mut reservations) = self.reservations.lock() {
            reservations.insert(place_id.to_string());
        }
    }

    /// Fails unless this session reserved `place_id`.
    pub fn require_reservation(&self, place_id: &str) -> Result<(), AppError> {
        let owned = self
            .reservations
            .lock()
            .map(|reservations| reservations.contains(place_id))
            .unwrap_or(false);
        if owned {
            Ok(())
        } else {
            Err(AppError::Auth(format!(
                "Reservation '{}' belongs to another session",
                place_id
            )))
        }
    }

    /// Forget a reservation once it is completed or abandoned.
    pub fn release_reservation(&self, place_id: &str) {
        if let Ok(mut reservations) = self.reservations.lock() {
            reservations.remove(place_id);
        }
    }

    /// The composer saw the unlock phrase; the passcode prompt is now open.
    pub fn request_chat_prompt(&self) {
        self.chat_prompt_pending.store(true, Ordering::SeqCst);
    }

    pub fn chat_prompt_pending(&self) -> bool {
        self.chat_prompt_pending.load(Ordering::SeqCst)
    }

    /// Accept a verified passcode. Only valid while the prompt is open.
    pub fn unlock_chat(&self) -> Result<(), AppError> {
        if !self.chat_prompt_pending.swap(false, Ordering::SeqCst) {
            return Err(AppError::BadRequest("Chat passcode was not requested".into()));
        }
        self.chat_unlocked.store(true, Ordering::SeqCst);
        tracing::info!("Chat unlocked for {}", self.operator);
        Ok(())
    }

    pub fn chat_unlocked(&self) -> bool {
        self.chat_unlocked.load(Ordering::SeqCst)
    }

    pub fn require_chat(&self) -> Result<(), AppError> {
        if self.chat_unlocked() {
            Ok(())
        } else {
            Err(AppError::Auth("Chat is locked".into()))
        }
    }

    /// Tear down the live parts of the session.
    pub fn close(&self) {
        self.feed.stop();
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl Drop for ConsoleSession {
    fn drop(&mut self) {
        self.feed.stop();
    }
}

/// Live sessions keyed by their cookie token.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ConsoleSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: ConsoleSession) -> Result<Arc<ConsoleSession>, AppError> {
        let session = Arc::new(session);
        self.sessions
            .write()
            .map_err(|_| AppError::Internal("Session registry lock poisoned".into()))?
            .insert(session.token().to_string(), session.clone());
        Ok(session)
    }

    pub fn get(&self, token: &str) -> Option<Arc<ConsoleSession>> {
        self.sessions.read().ok()?.get(token).cloned()
    }

    /// Remove and close a session. Returns `false` if the token was unknown.
    pub fn remove(&self, token: &str) -> bool {
        let removed = match self.sessions.write() {
            Ok(mut sessions) => sessions.remove(token),
            Err(_) => None,
        };
        match removed {
            Some(session) => {
                session.close();
                tracing::info!("Session closed for {}", session.operator());
                true
            }
            None => false,
        }
    }

    /// Close every session signed in as `operator`. Returns how many were closed.
    pub fn remove_operator(&self, operator: &str) -> usize {
        self.remove_where(|session| session.operator() == operator)
    }

    /// Close every session idle for longer than `max_idle`.
    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        self.remove_where(|session| session.idle_for() > max_idle)
    }

    fn remove_where(&self, predicate: impl Fn(&ConsoleSession) -> bool) -> usize {
        let removed: Vec<Arc<ConsoleSession>> = match self.sessions.write() {
            Ok(mut sessions) => {
                let tokens: Vec<String> = sessions
                    .iter()
                    .filter(|(_, session)| predicate(session.as_ref()))
                    .map(|(token, _)| token.clone())
                    .collect();
                tokens
                    .iter()
                    .filter_map(|token| sessions.remove(token))
                    .collect()
            }
            Err(_) => Vec::new(),
        };
        for session in &removed {
            session.close();
            tracing::info!("Session closed for {}", session.operator());
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically close sessions that have gone idle, so a browser that
/// never signs out does not keep its feed running.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_session_sweeper(
    registry: Arc<SessionRegistry>,
    max_idle: Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let expired = registry.expire_idle(max_idle);
            if expired > 0 {
                tracing::info!("Expired {} idle session(s)", expired);
            }
        }
    })
}

/// The session named by the request's session cookie.
#[cfg(feature = "server")]
pub struct CurrentSession(pub Arc<ConsoleSession>);

#[cfg(feature = "server")]
impl axum::extract::FromRequestParts<crate::app::AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &crate::app::AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = axum_extra::extract::CookieJar::from_headers(&parts.headers);
        let cookie = jar
            .get(crate::auth::gate::SESSION_COOKIE)
            .ok_or_else(|| AppError::Auth("Not logged in".into()))?;

        let session = state
            .sessions
            .get(cookie.value())
            .ok_or_else(|| AppError::Auth("Session expired".into()))?;
        session.touch();
        Ok(CurrentSession(session))
    }
}
