//! Process-wide registry of active sessions.
//!
//! Single source of truth for "is this session currently joinable". The
//! concurrency discipline is per-session exclusion: every mutating operation
//! on one session is serialized through that session's own lock, while
//! operations on different sessions proceed in parallel. The one
//! registry-wide exclusive section is the code index, which the allocation
//! step must reason over as a whole — the uniqueness check and the insertion
//! claiming the code happen under a single lock so two concurrent creations
//! cannot race onto the same code.
//!
//! Write-through ordering: where an operation persists (creation, lifecycle
//! transitions, answers), the durable write completes before the in-memory
//! commit, and the session lock is not held across the durable I/O. Readers
//! may observe the pre-transition state until the commit; they never observe
//! memory ahead of the durable store.

pub mod code;
pub mod error;
pub mod session;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

pub use error::RegistryError;
pub use session::{ActiveSession, LifecycleState, Player, PlayerAnswer};

use crate::stores::SessionStore;
use crate::template::TemplateSnapshot;

/// Concurrency-safe table of live sessions, keyed by session id and by join
/// code. Initialized empty at process start and never persisted itself; the
/// durable store keeps the parallel record.
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    sessions: DashMap<Uuid, Arc<Mutex<ActiveSession>>>,
    /// Join code → session id. Guarded by one lock so reserve-and-register
    /// is atomic; held only for in-memory work, never across I/O.
    codes: StdMutex<HashMap<u32, Uuid>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            codes: StdMutex::new(HashMap::new()),
        }
    }

    fn lock_codes(&self) -> std::sync::MutexGuard<'_, HashMap<u32, Uuid>> {
        self.codes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, session_id: Uuid) -> Result<Arc<Mutex<ActiveSession>>, RegistryError> {
        self.sessions
            .get(&session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(RegistryError::NotFound)
    }

    /// Allocate a unique code and register a fresh session atomically with
    /// the allocation.
    ///
    /// The code is reserved under the index lock, the durable record is then
    /// written, and only then is the session published. A durable failure
    /// releases the reservation, so no half-created session is ever visible.
    ///
    /// # Errors
    ///
    /// `CodeSpaceExhausted` when the bounded allocation retry budget runs
    /// out; `Unavailable` when the durable insert fails.
    pub async fn create_and_register(
        &self,
        host: Uuid,
        template: TemplateSnapshot,
    ) -> Result<ActiveSession, RegistryError> {
        let id = Uuid::new_v4();

        let code = {
            let mut codes = self.lock_codes();
            let existing: HashSet<u32> = codes.keys().copied().collect();
            let code = code::allocate(&existing)?;
            codes.insert(code, id);
            code
        };

        let session = ActiveSession::new(id, code, host, template);

        if let Err(err) = self.store.insert(&session).await {
            self.lock_codes().remove(&code);
            return Err(err.into());
        }

        self.sessions
            .insert(id, Arc::new(Mutex::new(session.clone())));

        tracing::info!(session_id = %id, code, %host, "session registered");
        Ok(session)
    }

    /// Snapshot of a session looked up by join code.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown or no-longer-active codes.
    pub async fn find_by_code(&self, code: u32) -> Result<ActiveSession, RegistryError> {
        let id = {
            let codes = self.lock_codes();
            codes.get(&code).copied()
        }
        .ok_or(RegistryError::NotFound)?;
        self.find_by_id(id).await
    }

    /// Snapshot of a session looked up by id.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown or evicted ids.
    pub async fn find_by_id(&self, session_id: Uuid) -> Result<ActiveSession, RegistryError> {
        let slot = self.slot(session_id)?;
        let session = slot.lock().await;
        Ok(session.clone())
    }

    /// Add a player to a joinable session.
    ///
    /// In-memory only: the durable store has no per-player operation. The
    /// `after_commit` hook runs while the session lock is still held, so any
    /// broadcast it performs is observed in the order joins were applied.
    ///
    /// # Errors
    ///
    /// `NotFound` (unknown or finished session), `AlreadyStarted` (joining
    /// closed), `DuplicatePlayer` (principal already on the roster; the
    /// roster is unchanged).
    pub async fn add_player<F>(
        &self,
        session_id: Uuid,
        player: Player,
        after_commit: F,
    ) -> Result<(), RegistryError>
    where
        F: FnOnce(&ActiveSession),
    {
        let slot = self.slot(session_id)?;
        let mut session = slot.lock().await;

        match session.state {
            LifecycleState::Created => {}
            LifecycleState::Started => return Err(RegistryError::AlreadyStarted),
            // Finished sessions are as good as gone.
            LifecycleState::Finished => return Err(RegistryError::NotFound),
        }

        if session.has_player(player.principal_id) {
            return Err(RegistryError::DuplicatePlayer);
        }

        session.players.push(player);
        after_commit(&session);
        Ok(())
    }

    /// Apply a lifecycle transition, write-through.
    ///
    /// The edge is validated, the durable store is updated with the lock
    /// released, then the transition is re-validated and committed in
    /// memory. If the durable write fails the in-memory state is untouched
    /// and the caller gets a retryable `Unavailable`. `after_commit` runs
    /// under the session lock, after the commit.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidTransition`, or `Unavailable`.
    pub async fn transition<F>(
        &self,
        session_id: Uuid,
        target: LifecycleState,
        after_commit: F,
    ) -> Result<(), RegistryError>
    where
        F: FnOnce(&ActiveSession),
    {
        let slot = self.slot(session_id)?;

        {
            let session = slot.lock().await;
            if !session.state.can_transition_to(target) {
                return Err(RegistryError::InvalidTransition {
                    from: session.state,
                    to: target,
                });
            }
        }

        self.store.update_lifecycle(session_id, target).await?;

        let mut session = slot.lock().await;
        // Transitions are host-gated, so a raced edge here means the host
        // issued conflicting calls; the durable store already holds the
        // target state and the loser gets the error.
        if !session.state.can_transition_to(target) {
            return Err(RegistryError::InvalidTransition {
                from: session.state,
                to: target,
            });
        }
        session.state = target;
        tracing::info!(session_id = %session_id, state = target.as_str(), "session transitioned");
        after_commit(&session);
        Ok(())
    }

    /// Append a player answer, write-through.
    ///
    /// Requires the session to be in play and the principal to be on the
    /// roster. The answer list is append-only; this also moves the player's
    /// `current_question` marker to the answered slide.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidAnswer`, or `Unavailable`.
    pub async fn record_answer(
        &self,
        session_id: Uuid,
        answer: PlayerAnswer,
    ) -> Result<(), RegistryError> {
        let slot = self.slot(session_id)?;

        {
            let session = slot.lock().await;
            Self::validate_answer(&session, &answer)?;
        }

        self.store.append_answer(session_id, &answer).await?;

        let mut session = slot.lock().await;
        Self::validate_answer(&session, &answer)?;
        session
            .current_question
            .insert(answer.principal_id, answer.slide_index);
        session.answers.push(answer);
        Ok(())
    }

    fn validate_answer(
        session: &ActiveSession,
        answer: &PlayerAnswer,
    ) -> Result<(), RegistryError> {
        if session.state != LifecycleState::Started {
            return Err(RegistryError::InvalidAnswer(
                "Session is not accepting answers.".to_string(),
            ));
        }
        if !session.has_player(answer.principal_id) {
            return Err(RegistryError::InvalidAnswer(
                "Player is not part of this session.".to_string(),
            ));
        }
        if answer.slide_index >= session.template.slide_count() {
            return Err(RegistryError::InvalidAnswer(
                "Slide index out of range.".to_string(),
            ));
        }
        Ok(())
    }

    /// Evict a finished session from the live table and free its code for
    /// reuse. The durable record remains.
    ///
    /// # Errors
    ///
    /// `NotFound` or `NotFinished`.
    pub async fn remove(&self, session_id: Uuid) -> Result<(), RegistryError> {
        let slot = self.slot(session_id)?;
        let code = {
            let session = slot.lock().await;
            if session.state != LifecycleState::Finished {
                return Err(RegistryError::NotFinished);
            }
            session.code
        };

        self.sessions.remove(&session_id);
        self.lock_codes().remove(&code);
        tracing::info!(session_id = %session_id, code, "session evicted");
        Ok(())
    }

    /// Number of currently active sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::stores::StoreUnavailable;
    use crate::template::{Slide, TemplateSnapshot};

    /// Stub durable store with switchable failure injection per operation.
    #[derive(Default)]
    struct StubStore {
        fail_insert: AtomicBool,
        fail_update: AtomicBool,
        fail_append: AtomicBool,
    }

    impl StubStore {
        fn failing() -> StoreUnavailable {
            StoreUnavailable(anyhow::anyhow!("injected failure"))
        }
    }

    #[async_trait]
    impl SessionStore for StubStore {
        async fn insert(&self, _session: &ActiveSession) -> Result<(), StoreUnavailable> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(Self::failing());
            }
            Ok(())
        }

        async fn update_lifecycle(
            &self,
            _id: Uuid,
            _state: LifecycleState,
        ) -> Result<(), StoreUnavailable> {
            if self.fail_update.load(Ordering::SeqCst) {
                return Err(Self::failing());
            }
            Ok(())
        }

        async fn append_answer(
            &self,
            _id: Uuid,
            _answer: &PlayerAnswer,
        ) -> Result<(), StoreUnavailable> {
            if self.fail_append.load(Ordering::SeqCst) {
                return Err(Self::failing());
            }
            Ok(())
        }
    }

    fn template() -> TemplateSnapshot {
        TemplateSnapshot {
            id: Uuid::new_v4(),
            name: "Geography".to_string(),
            slides: vec![
                Slide {
                    duration_secs: 20,
                    prompt: "Capital of Norway?".to_string(),
                    options: vec!["Oslo".to_string(), "Bergen".to_string()],
                    correct: vec![0],
                    multiple_answer: false,
                },
                Slide {
                    duration_secs: 20,
                    prompt: "Nordic countries?".to_string(),
                    options: vec![
                        "Norway".to_string(),
                        "Sweden".to_string(),
                        "Poland".to_string(),
                    ],
                    correct: vec![0, 1],
                    multiple_answer: true,
                },
            ],
        }
    }

    fn player(name: &str) -> Player {
        Player {
            principal_id: Uuid::new_v4(),
            display_name: name.to_string(),
            is_registered: false,
        }
    }

    fn registry() -> (SessionRegistry, Arc<StubStore>) {
        let store = Arc::new(StubStore::default());
        (SessionRegistry::new(store.clone()), store)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creations_never_share_a_code() {
        let (registry, _store) = registry();
        let registry = Arc::new(registry);
        let host = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..100 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.create_and_register(host, template()).await
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            let session = handle
                .await
                .ok()
                .and_then(Result::ok)
                .map(|s| s.code)
                .unwrap_or_default();
            codes.insert(session);
        }

        assert_eq!(codes.len(), 100, "every creation got a distinct code");
        assert_eq!(registry.active_count(), 100);
        assert!(codes.iter().all(|c| (10_000..=99_999).contains(c)));
    }

    #[tokio::test]
    async fn failed_durable_insert_leaves_nothing_behind() {
        let (registry, store) = registry();
        store.fail_insert.store(true, Ordering::SeqCst);

        let result = registry
            .create_and_register(Uuid::new_v4(), template())
            .await;

        assert!(matches!(result, Err(RegistryError::Unavailable(_))));
        assert_eq!(registry.active_count(), 0);
        assert!(registry.lock_codes().is_empty(), "reservation was released");
    }

    #[tokio::test]
    async fn find_by_code_round_trip() {
        let (registry, _store) = registry();
        let created = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .ok();
        let created = created.map(|s| (s.id, s.code)).unwrap_or_default();

        let found = registry.find_by_code(created.1).await.ok().map(|s| s.id);
        assert_eq!(found, Some(created.0));

        assert!(matches!(
            registry.find_by_code(9_999).await,
            Err(RegistryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn join_is_rejected_once_started() {
        let (registry, _store) = registry();
        let session = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .map(|s| s.id)
            .unwrap_or_default();

        let ok = registry
            .add_player(session, player("first"), |_| {})
            .await;
        assert!(ok.is_ok());

        let started = registry
            .transition(session, LifecycleState::Started, |_| {})
            .await;
        assert!(started.is_ok());

        let rejected = registry.add_player(session, player("late"), |_| {}).await;
        assert!(matches!(rejected, Err(RegistryError::AlreadyStarted)));

        let roster = registry
            .find_by_id(session)
            .await
            .map(|s| s.players.len())
            .unwrap_or_default();
        assert_eq!(roster, 1, "rejected join must not mutate the roster");
    }

    #[tokio::test]
    async fn join_on_finished_session_reads_as_not_found() {
        let (registry, _store) = registry();
        let session = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .map(|s| s.id)
            .unwrap_or_default();

        let _ = registry
            .transition(session, LifecycleState::Finished, |_| {})
            .await;

        let rejected = registry.add_player(session, player("late"), |_| {}).await;
        assert!(matches!(rejected, Err(RegistryError::NotFound)));
    }

    #[tokio::test]
    async fn duplicate_join_is_signalled_and_roster_keeps_one_entry() {
        let (registry, _store) = registry();
        let session = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .map(|s| s.id)
            .unwrap_or_default();

        let joiner = player("guest-42");
        assert!(
            registry
                .add_player(session, joiner.clone(), |_| {})
                .await
                .is_ok()
        );

        let second = registry.add_player(session, joiner.clone(), |_| {}).await;
        assert!(matches!(second, Err(RegistryError::DuplicatePlayer)));

        let players = registry
            .find_by_id(session)
            .await
            .map(|s| s.players)
            .unwrap_or_default();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].principal_id, joiner.principal_id);
    }

    #[tokio::test]
    async fn illegal_edges_fail_and_leave_state_unchanged() {
        let (registry, _store) = registry();
        let session = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .map(|s| s.id)
            .unwrap_or_default();

        // Created -> Created is not an edge.
        let same = registry
            .transition(session, LifecycleState::Created, |_| {})
            .await;
        assert!(matches!(
            same,
            Err(RegistryError::InvalidTransition { .. })
        ));

        let _ = registry
            .transition(session, LifecycleState::Finished, |_| {})
            .await;

        // Finished -> Started is not an edge either.
        let backwards = registry
            .transition(session, LifecycleState::Started, |_| {})
            .await;
        assert!(matches!(
            backwards,
            Err(RegistryError::InvalidTransition { .. })
        ));

        let state = registry.find_by_id(session).await.map(|s| s.state).ok();
        assert_eq!(state, Some(LifecycleState::Finished));
    }

    #[tokio::test]
    async fn durable_failure_rolls_back_transition() {
        let (registry, store) = registry();
        let session = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .map(|s| s.id)
            .unwrap_or_default();

        store.fail_update.store(true, Ordering::SeqCst);
        let result = registry
            .transition(session, LifecycleState::Started, |_| {})
            .await;
        assert!(matches!(result, Err(RegistryError::Unavailable(_))));

        let state = registry.find_by_id(session).await.map(|s| s.state).ok();
        assert_eq!(
            state,
            Some(LifecycleState::Created),
            "in-memory state never runs ahead of the durable store"
        );

        // The same transition succeeds once the store recovers.
        store.fail_update.store(false, Ordering::SeqCst);
        assert!(
            registry
                .transition(session, LifecycleState::Started, |_| {})
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn answers_are_appended_and_advance_the_marker() {
        let (registry, store) = registry();
        let session = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .map(|s| s.id)
            .unwrap_or_default();
        let joiner = player("guest-42");
        let _ = registry.add_player(session, joiner.clone(), |_| {}).await;

        // Not started yet: answers rejected.
        let early = registry
            .record_answer(
                session,
                PlayerAnswer {
                    principal_id: joiner.principal_id,
                    slide_index: 0,
                    selected: vec![0],
                    answered_at_offset_ms: 1200,
                },
            )
            .await;
        assert!(matches!(early, Err(RegistryError::InvalidAnswer(_))));

        let _ = registry
            .transition(session, LifecycleState::Started, |_| {})
            .await;

        let ok = registry
            .record_answer(
                session,
                PlayerAnswer {
                    principal_id: joiner.principal_id,
                    slide_index: 0,
                    selected: vec![0],
                    answered_at_offset_ms: 1200,
                },
            )
            .await;
        assert!(ok.is_ok());

        // Out-of-range slide index is rejected at the boundary.
        let bad = registry
            .record_answer(
                session,
                PlayerAnswer {
                    principal_id: joiner.principal_id,
                    slide_index: 99,
                    selected: vec![0],
                    answered_at_offset_ms: 1500,
                },
            )
            .await;
        assert!(matches!(bad, Err(RegistryError::InvalidAnswer(_))));

        // Durable append failure leaves the log untouched.
        store.fail_append.store(true, Ordering::SeqCst);
        let unavailable = registry
            .record_answer(
                session,
                PlayerAnswer {
                    principal_id: joiner.principal_id,
                    slide_index: 1,
                    selected: vec![0, 1],
                    answered_at_offset_ms: 800,
                },
            )
            .await;
        assert!(matches!(unavailable, Err(RegistryError::Unavailable(_))));

        let snapshot = registry.find_by_id(session).await.ok();
        let answers = snapshot.as_ref().map(|s| s.answers.len()).unwrap_or_default();
        let marker = snapshot
            .as_ref()
            .and_then(|s| s.current_question.get(&joiner.principal_id).copied());
        assert_eq!(answers, 1);
        assert_eq!(marker, Some(0));
    }

    #[tokio::test]
    async fn eviction_requires_finish_and_frees_the_code() {
        let (registry, _store) = registry();
        let created = registry
            .create_and_register(Uuid::new_v4(), template())
            .await
            .ok();
        let (session, old_code) = created.map(|s| (s.id, s.code)).unwrap_or_default();

        assert!(matches!(
            registry.remove(session).await,
            Err(RegistryError::NotFinished)
        ));

        let _ = registry
            .transition(session, LifecycleState::Finished, |_| {})
            .await;
        assert!(registry.remove(session).await.is_ok());
        assert_eq!(registry.active_count(), 0);

        // The code is free for the next session.
        assert!(matches!(
            registry.find_by_code(old_code).await,
            Err(RegistryError::NotFound)
        ));
        assert!(!registry.lock_codes().contains_key(&old_code));
    }
}
