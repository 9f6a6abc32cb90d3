//! Observable store state and the lock-protected cell behind it.

// self
use crate::{_prelude::*, credential::Credential, error::IssueError};

/// Lifecycle status of a [`CredentialStore`](crate::store::CredentialStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
	/// No credential fetched yet.
	Uninitialized,
	/// Credential present; it may or may not be expiring.
	Ready,
	/// Stale credential present; the last refresh attempt failed.
	ReadyWithError,
	/// No credential was ever obtained.
	Failed,
}
impl StoreStatus {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreStatus::Uninitialized => "uninitialized",
			StoreStatus::Ready => "ready",
			StoreStatus::ReadyWithError => "ready_with_error",
			StoreStatus::Failed => "failed",
		}
	}

	/// Returns `true` when a credential is available, stale or not, unless the store has been
	/// closed.
	pub const fn has_credential(self) -> bool {
		matches!(self, StoreStatus::Ready | StoreStatus::ReadyWithError)
	}
}
impl Display for StoreStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Consistent view of the store, captured under a single lock acquisition.
///
/// After teardown `status` keeps its last value, `credential` is `None` and `closed` is set.
#[derive(Clone)]
pub struct StoreSnapshot<C> {
	/// Lifecycle status.
	pub status: StoreStatus,
	/// Current credential, if any.
	pub credential: Option<Arc<Credential<C>>>,
	/// Error from the most recent failed issuer call, cleared by the next success.
	pub error: Option<IssueError>,
	/// `true` until the first initialization attempt completes.
	pub loading: bool,
	/// `true` once the store has been torn down.
	pub closed: bool,
}
impl<C> Debug for StoreSnapshot<C>
where
	C: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StoreSnapshot")
			.field("status", &self.status)
			.field("credential", &self.credential)
			.field("error", &self.error)
			.field("loading", &self.loading)
			.field("closed", &self.closed)
			.finish()
	}
}

pub(crate) struct State<C> {
	pub(crate) status: StoreStatus,
	pub(crate) credential: Option<Arc<Credential<C>>>,
	pub(crate) last_error: Option<IssueError>,
	/// Completed issuer attempts; lets waiters detect that a refresh finished while they
	/// were queued.
	pub(crate) attempts: u64,
	pub(crate) closed: bool,
}
impl<C> State<C> {
	pub(crate) fn snapshot(&self) -> StoreSnapshot<C> {
		StoreSnapshot {
			status: self.status,
			credential: if self.closed { None } else { self.credential.clone() },
			error: self.last_error.clone(),
			loading: self.status == StoreStatus::Uninitialized && !self.closed,
			closed: self.closed,
		}
	}

	pub(crate) fn commit(&mut self, credential: Arc<Credential<C>>) {
		self.credential = Some(credential);
		self.status = StoreStatus::Ready;
		self.last_error = None;
		self.attempts += 1;
	}

	pub(crate) fn record_failure(&mut self, err: IssueError) {
		self.status = if self.credential.is_some() {
			StoreStatus::ReadyWithError
		} else {
			StoreStatus::Failed
		};
		self.last_error = Some(err);
		self.attempts += 1;
	}

	pub(crate) fn close(&mut self) {
		self.closed = true;
		self.credential = None;
	}
}
impl<C> Default for State<C> {
	fn default() -> Self {
		Self {
			status: StoreStatus::Uninitialized,
			credential: None,
			last_error: None,
			attempts: 0,
			closed: false,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credential(token: &str) -> Arc<Credential> {
		Arc::new(Credential::builder(()).token(token).build().expect("Credential fixture should build."))
	}

	#[test]
	fn failure_without_credential_is_terminal_failure() {
		let mut state = State::<()>::default();

		state.record_failure(IssueError::msg("down"));

		assert_eq!(state.status, StoreStatus::Failed);
		assert_eq!(state.attempts, 1);
		assert!(!state.snapshot().loading);
	}

	#[test]
	fn failure_after_commit_keeps_credential() {
		let mut state = State::default();

		state.commit(credential("t1"));
		state.record_failure(IssueError::msg("down"));

		let snapshot = state.snapshot();

		assert_eq!(snapshot.status, StoreStatus::ReadyWithError);
		assert_eq!(snapshot.credential.map(|c| c.token.expose().to_owned()), Some("t1".into()));
		assert_eq!(snapshot.error.map(|e| e.message().to_owned()), Some("down".into()));

		state.commit(credential("t2"));

		assert_eq!(state.status, StoreStatus::Ready);
		assert!(state.last_error.is_none());
		assert_eq!(state.attempts, 3);
	}

	#[test]
	fn close_drops_credential() {
		let mut state = State::default();

		state.commit(credential("t1"));
		state.close();

		let snapshot = state.snapshot();

		assert!(snapshot.credential.is_none());
		assert!(snapshot.closed);
		assert_eq!(snapshot.status, StoreStatus::Ready);
	}

	#[test]
	fn status_labels_are_stable() {
		assert_eq!(StoreStatus::ReadyWithError.to_string(), "ready_with_error");
		assert!(StoreStatus::ReadyWithError.has_credential());
		assert!(!StoreStatus::Failed.has_credential());
		assert_eq!(
			serde_json::to_string(&StoreStatus::Uninitialized).expect("Status should serialize."),
			"\"uninitialized\""
		);
	}
}
