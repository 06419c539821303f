//! In-memory registry of running exam attempts. All mutations of a live
//! attempt go through here; the store only ever sees whole-record snapshots.

pub(crate) mod error;
pub(crate) mod runtime;


use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::db::types::{AttemptStatus, ExamMode, SectionId};
use crate::exam::attempt::{ExamAttempt, SectionResult};
use crate::exam::catalog;
use crate::exam::scoring::{compare_answers, grade_band};
use crate::exam::timer::{self, Tick};
use crate::repositories::{AttemptStore, AttemptSummary};
use crate::services::{Collaborators, HintRequest};

pub(crate) use error::SessionError;

/// One attempt held in memory while the user works on it.
pub(crate) struct LiveSession {
    pub(crate) attempt: ExamAttempt,
    /// Sections with a submission currently awaiting the scorer.
    submitting: HashSet<SectionId>,
    /// Practice-mode explanations, keyed by question id.
    hints: HashMap<String, String>,
    /// Unsaved changes exist; picked up by the autosave loop.
    dirty: bool,
}

impl LiveSession {
    fn new(attempt: ExamAttempt) -> Self {
        Self { attempt, submitting: HashSet::new(), hints: HashMap::new(), dirty: false }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSnapshot {
    pub(crate) attempt: ExamAttempt,
    pub(crate) hints: HashMap<String, String>,
}

fn snapshot(session: &LiveSession) -> SessionSnapshot {
    SessionSnapshot { attempt: session.attempt.clone(), hints: session.hints.clone() }
}

#[derive(Clone)]
pub(crate) struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    store: Arc<dyn AttemptStore>,
    collaborators: Collaborators,
    difficulty: String,
    live: Mutex<HashMap<String, Arc<Mutex<LiveSession>>>>,
}

impl SessionController {
    pub(crate) fn new(
        store: Arc<dyn AttemptStore>,
        collaborators: Collaborators,
        settings: &Settings,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                store,
                collaborators,
                difficulty: settings.exam().difficulty.clone(),
                live: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// One running attempt per user. A second create while another attempt
    /// is live is a conflict; the first has to be finished or abandoned.
    pub(crate) async fn create_attempt(
        &self,
        user_id: &str,
        mode: ExamMode,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut live = self.inner.live.lock().await;
        for session in live.values() {
            let guard = session.lock().await;
            if guard.attempt.user_id == user_id && guard.attempt.is_in_progress() {
                return Err(SessionError::AttemptConflict);
            }
        }

        let attempt =
            ExamAttempt::new(Uuid::new_v4().to_string(), user_id.to_string(), mode);
        // Creation must be durable before the client ever sees the id.
        self.inner.store.save(&attempt).await?;

        let session = Arc::new(Mutex::new(LiveSession::new(attempt)));
        let state = snapshot(&*session.lock().await);
        live.insert(state.attempt.id.clone(), session);
        drop(live);

        metrics::counter!("exam_attempts_started_total").increment(1);
        tracing::info!(attempt_id = %state.attempt.id, user_id, "Exam attempt started");
        Ok(state)
    }

    /// Brings a persisted attempt back into the live registry after a reload.
    /// A section whose budget ran out while the attempt was offline is
    /// auto-submitted right away.
    pub(crate) async fn restore_attempt(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        if let Some(session) = self.find_live(user_id, attempt_id).await? {
            return Ok(snapshot(&*session.lock().await));
        }

        let attempt = self
            .inner
            .store
            .load(user_id, attempt_id)
            .await?
            .ok_or(SessionError::AttemptNotFound)?;

        if !attempt.is_in_progress() {
            return Ok(SessionSnapshot { attempt, hints: HashMap::new() });
        }

        let expired_section = attempt
            .current_section
            .filter(|section| {
                !attempt.section_submitted(*section)
                    && timer::remaining_seconds(&attempt, *section) == 0
            });

        let session = Arc::new(Mutex::new(LiveSession::new(attempt)));
        self.inner.live.lock().await.insert(attempt_id.to_string(), session.clone());

        if let Some(section) = expired_section {
            if let Err(err) = self.submit_on_session(&session, section).await {
                tracing::warn!(
                    attempt_id,
                    section = section.as_str(),
                    error = %err,
                    "Auto-submit of expired section on restore failed"
                );
            }
        }

        tracing::info!(attempt_id, user_id, "Exam attempt restored");
        let state = snapshot(&*session.lock().await);
        Ok(state)
    }

    pub(crate) async fn get_state(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        if let Some(session) = self.find_live(user_id, attempt_id).await? {
            return Ok(snapshot(&*session.lock().await));
        }

        let attempt = self
            .inner
            .store
            .load(user_id, attempt_id)
            .await?
            .ok_or(SessionError::AttemptNotFound)?;
        Ok(SessionSnapshot { attempt, hints: HashMap::new() })
    }

    pub(crate) async fn list_history(
        &self,
        user_id: &str,
    ) -> Result<Vec<AttemptSummary>, SessionError> {
        Ok(self.inner.store.list_for_user(user_id).await?)
    }

    /// Makes a section the active one, generating its content on first visit.
    /// Content is cached on the attempt, so revisiting never regenerates.
    pub(crate) async fn select_section(
        &self,
        user_id: &str,
        attempt_id: &str,
        section: SectionId,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.require_live(user_id, attempt_id).await?;

        {
            let mut guard = session.lock().await;
            if !guard.attempt.is_in_progress() {
                return Err(SessionError::InvalidState("attempt is not in progress"));
            }
            if guard.attempt.section_submitted(section) {
                // Submitted sections stay open for review but never become
                // the active timed section again.
                return Ok(snapshot(&guard));
            }
            if guard.attempt.section_content.contains_key(&section) {
                guard.attempt.current_section = Some(section);
                guard.attempt.current_part = 0;
                guard.dirty = true;
                return Ok(snapshot(&guard));
            }
        }

        let content = self
            .inner
            .collaborators
            .content
            .generate(section, &self.inner.difficulty)
            .await
            .map_err(|err| SessionError::GenerationFailed(err.to_string()))?;

        let mut guard = session.lock().await;
        if !guard.attempt.is_in_progress() {
            return Err(SessionError::StaleOperation);
        }
        // A concurrent select may have won the race; the first content wins.
        guard.attempt.section_content.entry(section).or_insert(content);
        guard.attempt.current_section = Some(section);
        guard.attempt.current_part = 0;
        guard.dirty = true;

        self.save_session(attempt_id, &mut guard).await;
        Ok(snapshot(&guard))
    }

    pub(crate) async fn select_part(
        &self,
        user_id: &str,
        attempt_id: &str,
        section: SectionId,
        part: u32,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.require_live(user_id, attempt_id).await?;
        let mut guard = session.lock().await;

        if !guard.attempt.is_in_progress() {
            return Err(SessionError::InvalidState("attempt is not in progress"));
        }
        if guard.attempt.current_section != Some(section) {
            return Err(SessionError::InvalidState("section is not active"));
        }
        if part as usize >= catalog::spec(section).parts.len() {
            return Err(SessionError::InvalidState("unknown part for this section"));
        }

        guard.attempt.current_part = part;
        guard.dirty = true;
        Ok(snapshot(&guard))
    }

    /// Upserts a multiple-choice answer. In practice mode a wrong answer
    /// kicks off a background hint request; the result lands in the session
    /// whenever it arrives and never blocks the caller.
    pub(crate) async fn record_answer(
        &self,
        user_id: &str,
        attempt_id: &str,
        section: SectionId,
        question_id: &str,
        value: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        if !section.is_objective() {
            return Err(SessionError::InvalidState("section has no multiple-choice questions"));
        }

        let session = self.require_live(user_id, attempt_id).await?;
        let mut guard = session.lock().await;

        if !guard.attempt.is_in_progress() {
            return Err(SessionError::InvalidState("attempt is not in progress"));
        }
        if guard.attempt.section_submitted(section) {
            return Err(SessionError::SectionAlreadySubmitted);
        }

        guard.attempt.record_answer(section, question_id.to_string(), value.to_string());
        guard.dirty = true;

        if guard.attempt.mode == ExamMode::Practice {
            if let Some(question) = guard
                .attempt
                .section_content
                .get(&section)
                .and_then(|content| content.find_question(question_id))
            {
                if question.correct_answer != value {
                    let request = HintRequest {
                        prompt: question.prompt.clone(),
                        user_answer: value.to_string(),
                        correct_answer: question.correct_answer.clone(),
                        context: guard
                            .attempt
                            .section_content
                            .get(&section)
                            .and_then(|content| {
                                content.parts.iter().find_map(|part| {
                                    part.questions
                                        .iter()
                                        .any(|q| q.id == question_id)
                                        .then(|| part.passage.clone())
                                        .flatten()
                                })
                            }),
                    };
                    self.spawn_hint(session.clone(), question_id.to_string(), request);
                }
            }
        }

        Ok(snapshot(&guard))
    }

    pub(crate) async fn record_free_text(
        &self,
        user_id: &str,
        attempt_id: &str,
        section: SectionId,
        part: u32,
        text: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        if section.is_objective() {
            return Err(SessionError::InvalidState("section takes no free-text answers"));
        }
        if part as usize >= catalog::spec(section).parts.len() {
            return Err(SessionError::InvalidState("unknown part for this section"));
        }

        let session = self.require_live(user_id, attempt_id).await?;
        let mut guard = session.lock().await;

        if !guard.attempt.is_in_progress() {
            return Err(SessionError::InvalidState("attempt is not in progress"));
        }
        if guard.attempt.section_submitted(section) {
            return Err(SessionError::SectionAlreadySubmitted);
        }

        guard.attempt.record_free_text(section, part, text.to_string());
        guard.dirty = true;
        Ok(snapshot(&guard))
    }

    /// Scores a section, exactly once. Re-submitting returns the stored
    /// result; a concurrent submission of the same section is rejected.
    pub(crate) async fn submit_section(
        &self,
        user_id: &str,
        attempt_id: &str,
        section: SectionId,
    ) -> Result<SectionResult, SessionError> {
        let session = self.require_live(user_id, attempt_id).await?;
        self.submit_on_session(&session, section).await
    }

    pub(crate) async fn complete_attempt(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.require_live(user_id, attempt_id).await?;
        let mut guard = session.lock().await;

        if !guard.attempt.is_in_progress() {
            return Err(SessionError::InvalidState("attempt is not in progress"));
        }
        let missing = guard.attempt.missing_sections();
        if !missing.is_empty() {
            return Err(SessionError::IncompleteSections(missing));
        }

        guard.attempt.status = AttemptStatus::Completed;
        guard.attempt.completed_at = Some(crate::core::time::primitive_now_utc());
        guard.attempt.current_section = None;
        guard.attempt.is_paused = false;
        guard.attempt.total_score = Some(guard.attempt.total_earned());
        guard.dirty = true;

        self.save_session(attempt_id, &mut guard).await;
        let state = snapshot(&guard);
        let evict = !guard.dirty;
        drop(guard);

        // Keep a failed-save session live so the autosave loop retries it.
        if evict {
            self.inner.live.lock().await.remove(attempt_id);
        }

        metrics::counter!("exam_attempts_finished_total", "status" => "completed").increment(1);
        tracing::info!(
            attempt_id,
            user_id,
            total_score = state.attempt.total_score,
            "Exam attempt completed"
        );
        Ok(state)
    }

    pub(crate) async fn abandon_attempt(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.require_live(user_id, attempt_id).await?;
        let mut guard = session.lock().await;

        if !guard.attempt.is_in_progress() {
            return Err(SessionError::InvalidState("attempt is not in progress"));
        }

        guard.attempt.status = AttemptStatus::Abandoned;
        guard.attempt.completed_at = Some(crate::core::time::primitive_now_utc());
        guard.attempt.current_section = None;
        guard.attempt.is_paused = false;
        guard.dirty = true;

        self.save_session(attempt_id, &mut guard).await;
        let state = snapshot(&guard);
        let evict = !guard.dirty;
        drop(guard);

        if evict {
            self.inner.live.lock().await.remove(attempt_id);
        }

        metrics::counter!("exam_attempts_finished_total", "status" => "abandoned").increment(1);
        tracing::info!(attempt_id, user_id, "Exam attempt abandoned");
        Ok(state)
    }

    /// Freezes the countdown and snapshots the attempt right away, so a
    /// pause survives a crash even between autosaves.
    pub(crate) async fn pause(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.require_live(user_id, attempt_id).await?;
        let mut guard = session.lock().await;

        if !guard.attempt.is_in_progress() {
            return Err(SessionError::InvalidState("attempt is not in progress"));
        }
        if !guard.attempt.is_paused {
            guard.attempt.is_paused = true;
            guard.dirty = true;
            self.save_session(attempt_id, &mut guard).await;
        }

        Ok(snapshot(&guard))
    }

    pub(crate) async fn resume(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let session = self.require_live(user_id, attempt_id).await?;
        let mut guard = session.lock().await;

        if !guard.attempt.is_in_progress() {
            return Err(SessionError::InvalidState("attempt is not in progress"));
        }
        if guard.attempt.is_paused {
            guard.attempt.is_paused = false;
            guard.dirty = true;
        }

        Ok(snapshot(&guard))
    }

    /// One wall-clock second for every live attempt. Sections whose budget
    /// ran out are auto-submitted before this returns.
    pub(crate) async fn tick_all(&self) {
        let sessions: Vec<(String, Arc<Mutex<LiveSession>>)> = self
            .inner
            .live
            .lock()
            .await
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect();

        for (attempt_id, session) in sessions {
            let expired = {
                let mut guard = session.lock().await;
                match timer::apply_tick(&mut guard.attempt) {
                    Tick::Skipped => None,
                    Tick::Advanced { .. } => {
                        guard.dirty = true;
                        None
                    }
                    Tick::Expired { section } => {
                        guard.dirty = true;
                        let already_handled = guard.attempt.section_submitted(section)
                            || guard.submitting.contains(&section);
                        (!already_handled).then_some(section)
                    }
                }
            };

            if let Some(section) = expired {
                tracing::info!(
                    attempt_id = %attempt_id,
                    section = section.as_str(),
                    "Section time expired, auto-submitting"
                );
                if let Err(err) = self.submit_on_session(&session, section).await {
                    tracing::warn!(
                        attempt_id = %attempt_id,
                        section = section.as_str(),
                        error = %err,
                        "Auto-submit of expired section failed"
                    );
                }
            }
        }
    }

    /// Persists every live attempt with unsaved changes. Failures are logged
    /// and retried on the next pass.
    pub(crate) async fn autosave_all(&self) {
        let sessions: Vec<(String, Arc<Mutex<LiveSession>>)> = self
            .inner
            .live
            .lock()
            .await
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect();

        for (attempt_id, session) in sessions {
            let attempt = {
                let mut guard = session.lock().await;
                if !guard.dirty {
                    continue;
                }
                guard.dirty = false;
                guard.attempt.clone()
            };

            if let Err(err) = self.inner.store.save(&attempt).await {
                tracing::warn!(attempt_id = %attempt_id, error = %err, "Autosave failed");
                session.lock().await.dirty = true;
            }
        }
    }

    async fn submit_on_session(
        &self,
        session: &Arc<Mutex<LiveSession>>,
        section: SectionId,
    ) -> Result<SectionResult, SessionError> {
        let (content, answers, free_text) = {
            let mut guard = session.lock().await;
            if let Some(result) = guard.attempt.results.get(&section) {
                return Ok(result.clone());
            }
            if !guard.attempt.is_in_progress() {
                return Err(SessionError::InvalidState("attempt is not in progress"));
            }
            if guard.submitting.contains(&section) {
                return Err(SessionError::SubmissionInFlight);
            }
            let content = guard
                .attempt
                .section_content
                .get(&section)
                .cloned()
                .ok_or(SessionError::InvalidState("section has no generated content"))?;

            guard.submitting.insert(section);
            let answers = guard.attempt.answers.get(&section).cloned().unwrap_or_default();
            let free_text = guard.attempt.free_text_for(section);
            (content, answers, free_text)
        };

        // Scoring runs without the session lock; ticks and answer edits for
        // other sections keep flowing meanwhile.
        let scored = if section.is_objective() {
            let comparison = compare_answers(&content, &answers);
            self.inner
                .collaborators
                .scorer
                .scale(section, comparison.total_questions, comparison.correct_count)
                .await
                .map(|scaled| SectionResult {
                    earned_points: scaled.earned_points,
                    max_points: scaled.max_points,
                    grade: scaled.grade,
                    per_question: comparison.per_question,
                    feedback: None,
                })
        } else {
            let task = content.task_description();
            self.inner
                .collaborators
                .evaluator
                .evaluate(section, &task, &free_text)
                .await
                .map(|verdict| SectionResult {
                    earned_points: verdict.earned_points,
                    max_points: verdict.max_points,
                    grade: grade_band(verdict.earned_points, verdict.max_points).to_string(),
                    per_question: HashMap::new(),
                    feedback: Some(verdict.feedback),
                })
        };

        let mut guard = session.lock().await;
        guard.submitting.remove(&section);

        let result = match scored {
            Ok(result) => result,
            Err(err) => return Err(SessionError::ScoringFailed(err.to_string())),
        };

        // The attempt may have been completed or abandoned while the scorer
        // was running; a late result must not mutate a finished attempt.
        if !guard.attempt.is_in_progress() {
            return Err(SessionError::StaleOperation);
        }

        guard.attempt.results.insert(section, result.clone());
        if guard.attempt.current_section == Some(section) {
            guard.attempt.current_section = None;
            guard.attempt.current_part = 0;
        }
        guard.dirty = true;

        let attempt_id = guard.attempt.id.clone();
        self.save_session(&attempt_id, &mut guard).await;

        metrics::counter!("exam_sections_submitted_total", "section" => section.as_str())
            .increment(1);
        tracing::info!(
            attempt_id = %attempt_id,
            section = section.as_str(),
            earned_points = result.earned_points,
            "Section submitted"
        );
        Ok(result)
    }

    /// Milestone save. Failure keeps the session dirty for the autosave loop
    /// instead of failing the user's operation.
    async fn save_session(&self, attempt_id: &str, guard: &mut LiveSession) {
        match self.inner.store.save(&guard.attempt).await {
            Ok(()) => guard.dirty = false,
            Err(err) => {
                tracing::warn!(attempt_id, error = %err, "Milestone save failed");
                guard.dirty = true;
            }
        }
    }

    fn spawn_hint(
        &self,
        session: Arc<Mutex<LiveSession>>,
        question_id: String,
        request: HintRequest,
    ) {
        let provider = self.inner.collaborators.hints.clone();
        tokio::spawn(async move {
            match provider.explain(request).await {
                Ok(hint) => {
                    session.lock().await.hints.insert(question_id, hint);
                }
                Err(err) => {
                    tracing::warn!(question_id, error = %err, "Hint request failed");
                }
            }
        });
    }

    async fn find_live(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Option<Arc<Mutex<LiveSession>>>, SessionError> {
        let session = self.inner.live.lock().await.get(attempt_id).cloned();
        let Some(session) = session else {
            return Ok(None);
        };
        if session.lock().await.attempt.user_id != user_id {
            return Err(SessionError::AttemptNotFound);
        }
        Ok(Some(session))
    }

    async fn require_live(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Arc<Mutex<LiveSession>>, SessionError> {
        self.find_live(user_id, attempt_id).await?.ok_or(SessionError::AttemptNotFound)
    }

    #[cfg(test)]
    pub(crate) async fn live_handle(&self, attempt_id: &str) -> Option<Arc<Mutex<LiveSession>>> {
        self.inner.live.lock().await.get(attempt_id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn is_live(&self, attempt_id: &str) -> bool {
        self.inner.live.lock().await.contains_key(attempt_id)
    }
}
