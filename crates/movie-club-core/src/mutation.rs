use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    SignIn,
    RateMovie,
    DeleteRating,
    AddComment,
    DeleteComment,
    AddMovie,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::SignIn => "sign-in",
            MutationKind::RateMovie => "rate-movie",
            MutationKind::DeleteRating => "delete-rating",
            MutationKind::AddComment => "add-comment",
            MutationKind::DeleteComment => "delete-comment",
            MutationKind::AddMovie => "add-movie",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "kebab-case")]
pub enum MutationState {
    #[default]
    Idle,
    InFlight,
    Success,
    Failure(String),
}

impl MutationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, MutationState::InFlight)
    }
}

/// Last observed state per mutation kind. Concurrent mutations of the same
/// kind share one slot: whichever finishes last wins.
#[derive(Debug, Default)]
pub struct MutationTracker {
    states: Mutex<HashMap<MutationKind, MutationState>>,
}

impl MutationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, kind: MutationKind) -> MutationState {
        self.states
            .lock()
            .map(|states| states.get(&kind).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn set(&self, kind: MutationKind, state: MutationState) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(kind, state);
        }
    }

    pub fn begin(&self, kind: MutationKind) {
        self.set(kind, MutationState::InFlight);
    }

    pub fn succeed(&self, kind: MutationKind) {
        self.set(kind, MutationState::Success);
    }

    pub fn fail(&self, kind: MutationKind, error: impl fmt::Display) {
        self.set(kind, MutationState::Failure(error.to_string()));
    }

    /// Mark `kind` in flight until the guard is resolved or dropped
    pub fn start(&self, kind: MutationKind) -> MutationGuard<'_> {
        self.begin(kind);
        MutationGuard { tracker: self, kind, finished: false }
    }
}

/// A dropped guard (cancelled future) records a failure so the state never sticks at `InFlight`
pub struct MutationGuard<'a> {
    tracker: &'a MutationTracker,
    kind: MutationKind,
    finished: bool,
}

impl MutationGuard<'_> {
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn succeed(mut self) {
        self.tracker.succeed(self.kind);
        self.finished = true;
    }

    pub fn fail(mut self, error: impl fmt::Display) {
        self.tracker.fail(self.kind, error);
        self.finished = true;
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.fail(self.kind, "cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let tracker = MutationTracker::new();
        assert_eq!(tracker.state(MutationKind::RateMovie), MutationState::Idle);

        tracker.begin(MutationKind::RateMovie);
        assert!(tracker.state(MutationKind::RateMovie).is_in_flight());
        assert_eq!(tracker.state(MutationKind::AddComment), MutationState::Idle);

        tracker.succeed(MutationKind::RateMovie);
        assert_eq!(tracker.state(MutationKind::RateMovie), MutationState::Success);

        tracker.begin(MutationKind::AddMovie);
        tracker.fail(MutationKind::AddMovie, "upload failed");
        assert_eq!(
            tracker.state(MutationKind::AddMovie),
            MutationState::Failure("upload failed".to_string())
        );
    }

    #[test]
    fn test_guard_resolves_state() {
        let tracker = MutationTracker::new();
        let guard = tracker.start(MutationKind::AddComment);
        assert!(tracker.state(MutationKind::AddComment).is_in_flight());
        guard.succeed();
        assert_eq!(tracker.state(MutationKind::AddComment), MutationState::Success);

        let guard = tracker.start(MutationKind::DeleteRating);
        drop(guard);
        assert_eq!(
            tracker.state(MutationKind::DeleteRating),
            MutationState::Failure("cancelled".to_string())
        );
    }

    #[test]
    fn test_state_serializes() {
        let json = serde_json::to_value(MutationState::Failure("boom".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "failure", "error": "boom" }));
        assert_eq!(MutationKind::DeleteComment.to_string(), "delete-comment");
    }
}
