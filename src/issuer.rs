//! Issuer contract: the embedder-supplied function that mints credentials.

// self
use crate::{_prelude::*, credential::Credential, error::IssueError};

/// Boxed future returned by [`Issuer::issue`].
pub type IssueFuture<'a, C> =
	Pin<Box<dyn Future<Output = Result<Credential<C>, IssueError>> + 'a + Send>>;

/// Source of fresh credentials.
///
/// The store calls the issuer once for initialization and once per refresh; it never retries
/// on its own. The issuer may reach out to the network and may fail.
pub trait Issuer
where
	Self: 'static + Send + Sync,
{
	/// Configuration carried by every credential this issuer produces.
	type Config: 'static + Send + Sync;

	/// Produces a new credential.
	fn issue(&self) -> IssueFuture<'_, Self::Config>;
}

/// Adapts an async closure into an [`Issuer`].
///
/// ```
/// use token_keeper::{credential::Credential, error::IssueError, issuer::issuer_fn};
///
/// let issuer =
/// 	issuer_fn(|| async { Credential::builder(()).token("t1").build().map_err(IssueError::from) });
/// # let _ = issuer;
/// ```
#[derive(Clone)]
pub struct FnIssuer<F>(F);
impl<F> Debug for FnIssuer<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnIssuer(..)")
	}
}
impl<F, Fut, C> Issuer for FnIssuer<F>
where
	F: 'static + Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = Result<Credential<C>, IssueError>>,
	C: 'static + Send + Sync,
{
	type Config = C;

	fn issue(&self) -> IssueFuture<'_, C> {
		Box::pin((self.0)())
	}
}

/// Wraps `f` so it can be handed to a store.
pub fn issuer_fn<F, Fut, C>(f: F) -> FnIssuer<F>
where
	F: 'static + Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = Result<Credential<C>, IssueError>>,
	C: 'static + Send + Sync,
{
	FnIssuer(f)
}

impl<I> Issuer for Arc<I>
where
	I: ?Sized + Issuer,
{
	type Config = I::Config;

	fn issue(&self) -> IssueFuture<'_, Self::Config> {
		(**self).issue()
	}
}
