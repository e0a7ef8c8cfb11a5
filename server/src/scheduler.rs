//! Session registry and the fault wall that keeps one broken session from
//! stopping the others.

use crate::connection::Connection;
use crate::session::Session;
use npong_shared::config::GameConfig;
use npong_shared::protocol::GameSummary;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

pub const SESSION_ID_LEN: usize = 5;
const SESSION_ID_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Why a participant could not be placed in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// No session with that id, and no open session to fall back to
    SessionNotFound,
    SessionFull(String),
    /// The participant already plays in this session
    AlreadyInSession(String),
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinError::SessionNotFound => write!(f, "no game available to join"),
            JoinError::SessionFull(id) => write!(f, "game {} is full", id),
            JoinError::AlreadyInSession(id) => write!(f, "already playing in game {}", id),
        }
    }
}

pub struct Scheduler {
    config: Arc<GameConfig>,
    sessions: HashMap<String, Session>,
    /// Session ids in creation order
    order: Vec<String>,
    rng: ChaCha8Rng,
}

impl Scheduler {
    pub fn new(config: GameConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config: Arc::new(config),
            sessions: HashMap::new(),
            order: Vec::new(),
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn generate_session_id(&mut self) -> String {
        loop {
            let id: String = (0..SESSION_ID_LEN)
                .map(|_| SESSION_ID_CHARS[self.rng.gen_range(0..SESSION_ID_CHARS.len())] as char)
                .collect();
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }

    /// Register a new, empty session. It is dropped at the next tick unless
    /// someone joins, so callers outside the crate go through `create_and_join`.
    pub(crate) fn create_session(
        &mut self,
        name: Option<String>,
        max_players: Option<usize>,
        public: bool,
    ) -> &mut Session {
        let id = self.generate_session_id();
        let rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
        let session = Session::new(
            id.clone(),
            name,
            max_players,
            public,
            Arc::clone(&self.config),
            rng,
        );
        tracing::info!(
            session = %id,
            name = %session.name(),
            max_players = session.max_players(),
            public,
            "session created"
        );
        self.order.push(id.clone());
        self.sessions.entry(id).or_insert(session)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn session_by_participant(&self, player_id: &str) -> Option<&Session> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .find(|s| s.has_player(player_id))
    }

    pub fn public_sessions(&self) -> Vec<&Session> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .filter(|s| s.is_public())
            .collect()
    }

    pub fn list_public(&self) -> Vec<GameSummary> {
        self.public_sessions().iter().map(|s| s.summary()).collect()
    }

    pub fn random_session(&mut self) -> Option<&Session> {
        let id = self.order.choose(&mut self.rng)?;
        self.sessions.get(id)
    }

    /// A random session that still has room.
    fn random_open_session_id(&mut self) -> Option<String> {
        let open: Vec<&String> = self
            .order
            .iter()
            .filter(|id| self.sessions.get(*id).is_some_and(|s| !s.is_full()))
            .collect();
        open.choose(&mut self.rng).map(|id| (*id).clone())
    }

    pub fn remove_session(&mut self, id: &str) -> Option<Session> {
        let session = self.sessions.remove(id);
        match &session {
            Some(_) => {
                self.order.retain(|s| s != id);
                tracing::info!(session = %id, "session removed");
            }
            None => tracing::info!(session = %id, "session does not exist"),
        }
        session
    }

    /// Create a session and put the creator in it.
    pub fn create_and_join(
        &mut self,
        name: Option<String>,
        max_players: Option<usize>,
        public: bool,
        connection: Connection,
        now: Instant,
    ) -> Result<String, JoinError> {
        if let Some(current) = self.session_by_participant(connection.id()) {
            return Err(JoinError::AlreadyInSession(current.id().to_string()));
        }
        let session = self.create_session(name, max_players, public);
        let id = session.id().to_string();
        if session.add_player(connection, now).is_none() {
            self.remove_session(&id);
            return Err(JoinError::SessionFull(id));
        }
        Ok(id)
    }

    /// Join the session `id`, or a random open one when `id` is missing or unknown.
    pub fn join_session(
        &mut self,
        id: Option<&str>,
        connection: Connection,
        now: Instant,
    ) -> Result<String, JoinError> {
        if let Some(current) = self.session_by_participant(connection.id()) {
            return Err(JoinError::AlreadyInSession(current.id().to_string()));
        }
        let target = match id.filter(|id| self.sessions.contains_key(*id)) {
            Some(id) => id.to_string(),
            None => self
                .random_open_session_id()
                .ok_or(JoinError::SessionNotFound)?,
        };
        let session = self
            .sessions
            .get_mut(&target)
            .ok_or(JoinError::SessionNotFound)?;
        match session.add_player(connection, now) {
            Some(_) => Ok(target),
            None => Err(JoinError::SessionFull(target)),
        }
    }

    /// Take a participant out of whatever session they are in.
    /// Sessions left empty are removed straight away.
    pub fn leave(&mut self, player_id: &str, now: Instant) -> bool {
        let Some(id) = self
            .session_by_participant(player_id)
            .map(|s| s.id().to_string())
        else {
            return false;
        };
        let emptied = match self.sessions.get_mut(&id) {
            Some(session) => {
                session.remove_player(player_id, now);
                session.is_empty()
            }
            None => false,
        };
        if emptied {
            self.remove_session(&id);
        }
        true
    }

    pub fn update_player_position(&mut self, player_id: &str, x: f64, y: f64, now: Instant) -> bool {
        let Some(id) = self
            .session_by_participant(player_id)
            .map(|s| s.id().to_string())
        else {
            tracing::debug!(player = %player_id, "position update outside any session");
            return false;
        };
        self.sessions
            .get_mut(&id)
            .is_some_and(|s| s.update_player_position(player_id, x, y, now))
    }

    /// Run one simulation step on every session.
    pub fn tick(&mut self, now: Instant) {
        for id in &self.order {
            if let Some(session) = self.sessions.get_mut(id) {
                guarded(session, "update", |s| s.update(now));
            }
        }
        self.remove_empty_sessions();
    }

    /// Step board and paddle animations on every session.
    pub fn animate(&mut self, now: Instant) {
        for id in &self.order {
            if let Some(session) = self.sessions.get_mut(id) {
                guarded(session, "animate", |s| s.animate(now));
            }
        }
        self.remove_empty_sessions();
    }

    fn remove_empty_sessions(&mut self) {
        let empty: Vec<String> = self
            .order
            .iter()
            .filter(|id| self.sessions.get(*id).map_or(true, Session::is_empty))
            .cloned()
            .collect();
        for id in empty {
            self.remove_session(&id);
        }
    }
}

/// Run `f` on `session`, catching and logging any panic it raises.
fn guarded(session: &mut Session, stage: &str, f: impl FnOnce(&mut Session)) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| f(session)));
    if let Err(payload) = result {
        session.record_fault();
        tracing::error!(
            session = %session.id(),
            faults = session.faults(),
            "uncaught fault in session {}: {}",
            stage,
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
