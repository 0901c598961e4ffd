use crate::codec::{canonical_json, sign, verify};
use crate::state_machine::{validate_transition, Transition};
use brain_core::clock::Clock;
use brain_core::error::{BrainError, ErrorContext, Result};
use brain_core::note::NoteStore;
use brain_core::session::SessionState;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SESSIONS_FOLDER: &str = "sessions";
const CURRENT_SESSION_TITLE: &str = "current-session";
const DEFAULT_MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_MS: u64 = 50;
const BACKOFF_CAP_MS: u64 = 500;

fn session_title(session_id: &str) -> String {
    format!("session-{session_id}")
}

fn session_permalink(session_id: &str) -> String {
    format!("{SESSIONS_FOLDER}/{}", session_title(session_id))
}

fn current_session_permalink() -> String {
    format!("{SESSIONS_FOLDER}/{CURRENT_SESSION_TITLE}")
}

/// Renders the stored note body: a short human-readable header over the
/// canonical JSON payload, so a `grep` across the notes directory surfaces
/// session status without a JSON parser.
fn render_body(state: &SessionState, canonical: &str) -> String {
    format!(
        "# Session {}\nstatus: {}\nversion: {}\n\n{canonical}\n",
        state.session_id, state.status, state.version
    )
}

fn parse_body(body: &str) -> Result<SessionState> {
    let json_line = body
        .split("\n\n")
        .nth(1)
        .ok_or_else(|| BrainError::Protocol {
            message: "session note body missing canonical JSON payload".to_string(),
            context: ErrorContext::new(),
        })?
        .trim();
    serde_json::from_str(json_line).map_err(|e| BrainError::Protocol {
        message: format!("failed to parse session state: {e}"),
        context: ErrorContext::new(),
    })
}

/// The sole writer of `SessionState`; every read routes through here so
/// signatures are always verified before the state reaches a caller.
pub struct SessionStore {
    notes: Arc<dyn NoteStore>,
    clock: Arc<dyn Clock>,
    secret: Vec<u8>,
    project: Option<String>,
}

impl SessionStore {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        clock: Arc<dyn Clock>,
        secret: impl Into<Vec<u8>>,
        project: Option<String>,
    ) -> Self {
        Self { notes, clock, secret: secret.into(), project }
    }

    /// Reads and signature-verifies a session. `SignatureInvalid` on mismatch.
    pub async fn read(&self, session_id: &str) -> Result<SessionState> {
        let note = self
            .notes
            .read_note(&session_permalink(session_id), self.project.as_deref())
            .await?;
        let state = parse_body(&note.body)?;
        if !verify(&self.secret, &state)? {
            warn!(session_id, "signature verification failed for session");
            return Err(BrainError::SignatureInvalid { session_id: session_id.to_string() });
        }
        Ok(state)
    }

    /// The session_id named by the current-session pointer, if any.
    pub async fn current_session_id(&self) -> Result<Option<String>> {
        match self.notes.read_note(&current_session_permalink(), self.project.as_deref()).await {
            Ok(note) if !note.body.trim().is_empty() => Ok(Some(note.body.trim().to_string())),
            Ok(_) => Ok(None),
            Err(BrainError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_current_session_id(&self, session_id: Option<&str>) -> Result<()> {
        self.notes
            .write_note(SESSIONS_FOLDER, CURRENT_SESSION_TITLE, session_id.unwrap_or(""), self.project.as_deref())
            .await?;
        Ok(())
    }

    async fn write_signed(&self, state: &mut SessionState) -> Result<()> {
        state.signature = String::new();
        state.signature = sign(&self.secret, state)?;
        let canonical = canonical_json(state)?;
        let body = render_body(state, &canonical);
        self.notes
            .write_note(SESSIONS_FOLDER, &session_title(&state.session_id), &body, self.project.as_deref())
            .await?;
        Ok(())
    }

    async fn all_session_ids(&self) -> Result<Vec<String>> {
        let entries = self.notes.list_directory(self.project.as_deref(), 8, None).await?;
        Ok(entries
            .into_iter()
            .filter_map(|e| {
                e.permalink
                    .strip_prefix(&format!("{SESSIONS_FOLDER}/session-"))
                    .map(|id| id.to_string())
            })
            .collect())
    }

    /// Pauses every other IN_PROGRESS session. Best-effort: the first one
    /// that can't be paused aborts the caller's create/resume operation.
    async fn auto_pause_conflicts(&self, except: &str) -> Result<()> {
        for id in self.all_session_ids().await? {
            if id == except {
                continue;
            }
            let state = match self.read(&id).await {
                Ok(s) => s,
                Err(_) => continue,
            };
            if state.status != brain_core::session::SessionStatus::InProgress {
                continue;
            }
            self.update(&id, |s| s.status = brain_core::session::SessionStatus::Paused, DEFAULT_MAX_RETRIES)
                .await
                .map_err(|_| BrainError::AutoPauseFailed { conflicting_session_id: id.clone() })?;
        }
        Ok(())
    }

    /// Creates a new IN_PROGRESS session, auto-pausing any conflicting one.
    pub async fn create(&self, topic: Option<String>) -> Result<SessionState> {
        let session_id = uuid::Uuid::new_v4().to_string();
        validate_transition(&session_id, None, Transition::Create)?;
        self.auto_pause_conflicts(&session_id).await?;

        let now = self.clock.now_utc();
        let mut state = SessionState::new(session_id.clone(), topic, now);
        self.write_signed(&mut state).await?;
        self.set_current_session_id(Some(&session_id)).await?;
        info!(session_id, "session created");
        Ok(state)
    }

    /// Resumes a PAUSED session, auto-pausing any other IN_PROGRESS one.
    pub async fn resume(&self, session_id: &str) -> Result<SessionState> {
        let current = self.read(session_id).await?;
        validate_transition(session_id, Some(current.status), Transition::Resume)?;
        self.auto_pause_conflicts(session_id).await?;

        let state = self
            .update(session_id, |s| s.status = brain_core::session::SessionStatus::InProgress, DEFAULT_MAX_RETRIES)
            .await?;
        self.set_current_session_id(Some(session_id)).await?;
        info!(session_id, "session resumed");
        Ok(state)
    }

    /// Pauses an IN_PROGRESS session.
    pub async fn pause(&self, session_id: &str) -> Result<SessionState> {
        let current = self.read(session_id).await?;
        validate_transition(session_id, Some(current.status), Transition::Pause)?;
        self.update(session_id, |s| s.status = brain_core::session::SessionStatus::Paused, DEFAULT_MAX_RETRIES).await
    }

    /// Completes an IN_PROGRESS session; clears the current-session pointer
    /// if it named this session.
    pub async fn complete(&self, session_id: &str) -> Result<SessionState> {
        let current = self.read(session_id).await?;
        validate_transition(session_id, Some(current.status), Transition::Complete)?;
        let state = self
            .update(session_id, |s| s.status = brain_core::session::SessionStatus::Complete, DEFAULT_MAX_RETRIES)
            .await?;
        if self.current_session_id().await?.as_deref() == Some(session_id) {
            self.set_current_session_id(None).await?;
        }
        info!(session_id, "session completed");
        Ok(state)
    }

    /// Applies `updater` under optimistic locking: read, mutate a copy,
    /// write, then read back to detect a lost race. On a lost race, retry
    /// from a fresh read (rebasing on whatever won) up to `max_retries`
    /// times before raising `VersionConflict`.
    pub async fn update(
        &self,
        session_id: &str,
        updater: impl Fn(&mut SessionState),
        max_retries: u32,
    ) -> Result<SessionState> {
        let mut attempt = 0u32;
        loop {
            let current = self.read(session_id).await?;
            let expected_version = current.version;
            let mut next = current.clone();
            let prev_mode = next.current_mode;
            let prev_feature = next.active_feature.clone();
            updater(&mut next);
            next.updated_at = self.clock.now_utc();
            next.version = expected_version + 1;
            if next.current_mode != prev_mode {
                next.mode_history.push(brain_core::session::ModeHistoryEntry {
                    mode: next.current_mode,
                    timestamp: next.updated_at,
                });
            }
            if next.active_feature != prev_feature {
                next.active_task = None;
            }

            self.write_signed(&mut next).await?;
            let observed = self.read(session_id).await?;

            if observed.signature == next.signature {
                return Ok(next);
            }

            attempt += 1;
            if attempt > max_retries {
                return Err(BrainError::VersionConflict {
                    session_id: session_id.to_string(),
                    expected: expected_version + 1,
                    actual: observed.version,
                    retries: attempt - 1,
                });
            }
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(8)).min(BACKOFF_CAP_MS);
    let jitter_frac = rand::thread_rng().gen_range(-0.2..=0.2);
    let jittered = (exp as f64) * (1.0 + jitter_frac);
    Duration::from_millis(jittered.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::clock::SystemClock;
    use brain_core::session::SessionStatus;
    use brain_notes::InMemoryNoteStore;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(InMemoryNoteStore::new()), Arc::new(SystemClock), b"secret".to_vec(), None)
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let store = store();
        let created = store.create(Some("topic".to_string())).await.unwrap();
        let read = store.read(&created.session_id).await.unwrap();
        assert_eq!(read.version, 1);
        assert_eq!(read.status, SessionStatus::InProgress);
        assert_eq!(store.current_session_id().await.unwrap().as_deref(), Some(created.session_id.as_str()));
    }

    #[tokio::test]
    async fn resume_auto_pauses_conflicting_session() {
        let store = store();
        let a = store.create(None).await.unwrap();
        let b = store.create(None).await.unwrap();

        let a_after_b_create = store.read(&a.session_id).await.unwrap();
        assert_eq!(a_after_b_create.status, SessionStatus::Paused);

        store.pause(&b.session_id).await.unwrap();
        let resumed_a = store.resume(&a.session_id).await.unwrap();
        assert_eq!(resumed_a.status, SessionStatus::InProgress);

        let b_after = store.read(&b.session_id).await.unwrap();
        assert_eq!(b_after.status, SessionStatus::Paused);
    }

    #[tokio::test]
    async fn update_increments_version_by_exactly_one() {
        let store = store();
        let created = store.create(None).await.unwrap();
        let updated = store.update(&created.session_id, |s| s.active_task = Some("t1".to_string()), 3).await.unwrap();
        assert_eq!(updated.version, created.version + 1);
    }

    #[tokio::test]
    async fn changing_active_feature_clears_active_task() {
        let store = store();
        let created = store.create(None).await.unwrap();
        store.update(&created.session_id, |s| s.active_task = Some("t1".to_string()), 3).await.unwrap();
        let updated = store
            .update(&created.session_id, |s| s.active_feature = Some("f1".to_string()), 3)
            .await
            .unwrap();
        assert_eq!(updated.active_task, None);
        assert_eq!(updated.active_feature, Some("f1".to_string()));
    }

    #[tokio::test]
    async fn complete_is_terminal_and_clears_pointer() {
        let store = store();
        let created = store.create(None).await.unwrap();
        store.complete(&created.session_id).await.unwrap();
        assert_eq!(store.current_session_id().await.unwrap(), None);
        assert!(store.pause(&created.session_id).await.is_err());
    }

    #[tokio::test]
    async fn tampered_signature_is_detected_on_read() {
        let store = store();
        let created = store.create(None).await.unwrap();
        let permalink = session_permalink(&created.session_id);
        let note = store.notes.read_note(&permalink, None).await.unwrap();
        let tampered = note.body.replacen("\"version\":1", "\"version\":2", 1);
        store.notes.write_note(SESSIONS_FOLDER, &session_title(&created.session_id), &tampered, None).await.unwrap();

        let result = store.read(&created.session_id).await;
        assert!(matches!(result, Err(BrainError::SignatureInvalid { .. })));
    }
}
