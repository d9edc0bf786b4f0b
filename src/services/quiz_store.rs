use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::database::local_state::LocalStateFile;
use crate::error::Result;
use crate::models::question::Question;
use crate::models::quiz_session::QuizSession;

/// Process-local quiz progress. Loaded once on construction and written back
/// after every mutation. Each mutation holds the session lock for its whole
/// duration, so readers never see answers and score out of step. The file
/// write happens after the session lock is released.
#[derive(Clone)]
pub struct QuizStore {
    session: Arc<Mutex<QuizSession>>,
    persistence: LocalStateFile,
    /// Bumped under the session lock on every mutation.
    revision: Arc<AtomicU64>,
    /// Last revision written to disk. Held while writing so saves are ordered.
    written: Arc<Mutex<u64>>,
}

impl QuizStore {
    pub fn load(persistence: LocalStateFile) -> Self {
        let session = match persistence.load::<QuizSession>() {
            Ok(Some(session)) => restore(session, &persistence),
            Ok(None) => QuizSession::default(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %persistence.path().display(),
                    "discarding unreadable quiz session"
                );
                QuizSession::default()
            }
        };

        Self {
            session: Arc::new(Mutex::new(session)),
            persistence,
            revision: Arc::new(AtomicU64::new(0)),
            written: Arc::new(Mutex::new(0)),
        }
    }

    pub fn snapshot(&self) -> QuizSession {
        self.lock().clone()
    }

    pub fn set_quiz(&self, questions: Vec<Question>) -> QuizSession {
        let (revision, session) = {
            let mut guard = self.lock();
            *guard = QuizSession::start(questions);
            tracing::info!(questions = guard.len(), "quiz started");
            self.commit(&guard)
        };
        self.persist(revision, &session);
        session
    }

    pub fn set_answer(&self, index: usize, answer: String) -> Result<QuizSession> {
        let (revision, session) = {
            let mut guard = self.lock();
            guard.record_answer(index, answer)?;
            tracing::debug!(index, score = guard.score, "answer recorded");
            self.commit(&guard)
        };
        self.persist(revision, &session);
        Ok(session)
    }

    pub fn next_question(&self) -> QuizSession {
        self.navigate(QuizSession::advance)
    }

    pub fn prev_question(&self) -> QuizSession {
        self.navigate(QuizSession::retreat)
    }

    pub fn reset_quiz(&self) -> QuizSession {
        let (revision, session) = {
            let mut guard = self.lock();
            *guard = QuizSession::default();
            tracing::info!("quiz reset");
            self.commit(&guard)
        };
        self.persist(revision, &session);
        session
    }

    fn navigate(&self, step: fn(&mut QuizSession) -> bool) -> QuizSession {
        let (moved, revision, session) = {
            let mut guard = self.lock();
            let moved = step(&mut *guard);
            let (revision, session) = self.commit(&guard);
            (moved, revision, session)
        };
        if moved {
            self.persist(revision, &session);
        }
        session
    }

    fn lock(&self) -> MutexGuard<'_, QuizSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the session lock held.
    fn commit(&self, session: &QuizSession) -> (u64, QuizSession) {
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        (revision, session.clone())
    }

    /// A save that lost the race to a newer revision is skipped.
    fn persist(&self, revision: u64, session: &QuizSession) {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written >= revision {
            return;
        }
        match self.persistence.save(session) {
            Ok(()) => *written = revision,
            Err(e) => tracing::error!(
                error = %e,
                path = %self.persistence.path().display(),
                "failed to persist quiz session"
            ),
        }
    }
}

/// Recomputes the score and rejects a session whose position or answers do
/// not fit its quiz.
fn restore(mut session: QuizSession, persistence: &LocalStateFile) -> QuizSession {
    if !session.is_consistent() {
        tracing::warn!(
            path = %persistence.path().display(),
            index = session.current_index,
            questions = session.len(),
            "discarding inconsistent quiz session"
        );
        return QuizSession::default();
    }
    session.score = session.compute_score();
    tracing::info!(
        path = %persistence.path().display(),
        questions = session.len(),
        score = session.score,
        "restored quiz session"
    );
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local_state::QUIZ_STATE_KEY;
    use crate::error::Error;
    use crate::models::question::QuestionType;

    fn question(correct: &str) -> Question {
        Question {
            question_type: QuestionType::Tf,
            question: "?".into(),
            options: None,
            correct_answer: correct.into(),
            explanation: String::new(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> QuizStore {
        QuizStore::load(LocalStateFile::new(dir.path(), QUIZ_STATE_KEY))
    }

    #[test]
    fn starts_empty_without_saved_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.snapshot(), QuizSession::default());
    }

    #[test]
    fn restores_session_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_quiz(vec![question("Paris"), question("true"), question("x")]);
        store.set_answer(0, "Paris".into()).unwrap();
        store.set_answer(1, "false".into()).unwrap();
        store.next_question();
        let before = store.snapshot();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.snapshot(), before);
        assert_eq!(reloaded.snapshot().score, 1);
        assert_eq!(reloaded.snapshot().current_index, 1);
    }

    #[test]
    fn set_quiz_discards_previous_progress() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_quiz(vec![question("a"), question("b")]);
        store.set_answer(1, "b".into()).unwrap();
        store.next_question();

        let session = store.set_quiz(vec![question("c")]);
        assert_eq!(session.current_index, 0);
        assert!(session.answers.is_empty());
        assert_eq!(session.score, 0);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn reset_clears_everything_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_quiz(vec![question("a")]);
        store.set_answer(0, "a".into()).unwrap();

        assert_eq!(store.reset_quiz(), QuizSession::default());
        assert_eq!(store_in(&dir).snapshot(), QuizSession::default());
    }

    #[test]
    fn next_at_last_question_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_quiz(vec![question("a"), question("b")]);
        store.next_question();
        store.set_answer(1, "b".into()).unwrap();

        let before = store.snapshot();
        assert_eq!(store.next_question(), before);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn answer_without_quiz_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(matches!(store.set_answer(0, "a".into()), Err(Error::NoActiveQuiz)));
        assert!(!LocalStateFile::new(dir.path(), QUIZ_STATE_KEY).path().exists());
    }

    #[test]
    fn corrupt_state_falls_back_to_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = LocalStateFile::new(dir.path(), QUIZ_STATE_KEY);
        std::fs::write(file.path(), b"[1,2,3]").unwrap();

        let store = QuizStore::load(file);
        assert_eq!(store.snapshot(), QuizSession::default());
    }

    fn write_state(dir: &tempfile::TempDir, state: serde_json::Value) -> LocalStateFile {
        let file = LocalStateFile::new(dir.path(), QUIZ_STATE_KEY);
        let envelope = serde_json::json!({ "state": state, "version": 0 });
        std::fs::write(file.path(), envelope.to_string()).unwrap();
        file
    }

    #[test]
    fn out_of_range_position_falls_back_to_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_state(
            &dir,
            serde_json::json!({
                "currentQuiz": [{ "type": "tf", "question": "?", "correctAnswer": "true" }],
                "currentIndex": 7,
                "score": 5,
                "answers": { "0": "false" }
            }),
        );

        let store = QuizStore::load(file);
        assert_eq!(store.snapshot(), QuizSession::default());
        assert_eq!(store.next_question().current_index, 0);
    }

    #[test]
    fn restored_score_is_recomputed_from_answers() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_state(
            &dir,
            serde_json::json!({
                "currentQuiz": [
                    { "type": "tf", "question": "?", "correctAnswer": "true" },
                    { "type": "tf", "question": "?", "correctAnswer": "false" }
                ],
                "currentIndex": 1,
                "score": 5,
                "answers": { "0": "true", "1": "true" }
            }),
        );

        let session = QuizStore::load(file).snapshot();
        assert_eq!(session.score, 1);
        assert_eq!(session.current_index, 1);
        assert_eq!(session.answers.len(), 2);
    }

    #[test]
    fn concurrent_mutations_leave_latest_state_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_quiz((0..8).map(|i| question(&format!("a{}", i))).collect());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.set_answer(i, format!("a{}", i)).unwrap();
                    store.next_question();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = store.snapshot();
        assert_eq!(last.score, 8);
        assert_eq!(store_in(&dir).snapshot(), last);
    }

    #[test]
    fn clones_share_one_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let other = store.clone();
        store.set_quiz(vec![question("a")]);
        other.set_answer(0, "a".into()).unwrap();
        assert_eq!(store.snapshot().score, 1);
    }
}
