//! Cancellation of in-flight requests.
//!
//! A UI that navigates away from a loading screen aborts the request
//! through the returned `AbortHandle`; the wrapped future then resolves to
//! `ApiError::Cancelled` at its next poll.

use std::future::Future;

use futures::future::{AbortRegistration, Abortable, Aborted};
pub use futures::future::AbortHandle;
use futures::FutureExt;

use super::{ApiError, ApiResult};

pub fn cancellable<F, T>(request: F) -> (impl Future<Output = ApiResult<T>>, AbortHandle)
where
    F: Future<Output = ApiResult<T>>,
{
    let (handle, registration) = AbortHandle::new_pair();
    (with_registration(request, registration), handle)
}

fn with_registration<F, T>(
    request: F,
    registration: AbortRegistration,
) -> impl Future<Output = ApiResult<T>>
where
    F: Future<Output = ApiResult<T>>,
{
    Abortable::new(request, registration).map(|result| match result {
        Ok(inner) => inner,
        Err(Aborted) => Err(ApiError::Cancelled),
    })
}
