//! A "scope guard" that will reset a session's timeout when it is goes out of scope.

use crate::backend::Backend;
use std::{io, marker::PhantomData, time::Duration};

/// Anything that owns a backend, as required by the [`TimeoutGuard`].
pub trait Port<B>: private::Sealed {
    /// Get the underlying backend.
    #[doc(hidden)]
    fn backend_mut(&mut self) -> &mut B;
    /// Poison the port so the next command reports `e`.
    #[doc(hidden)]
    fn poison(&mut self, e: io::Error);
}

mod private {
    /// Marks a trait a sealed.
    pub trait Sealed {}
    impl<B> Sealed for crate::Session<B> {}
    impl<B> Sealed for crate::Controller<B> {}
}

/// A "scope guard" that will update the timeout and then reset it when
/// it goes out of scope.
///
/// To create a guard, use the [`Session::timeout_guard`](crate::Session::timeout_guard)
/// or [`Controller::timeout_guard`](crate::Controller::timeout_guard) method.
///
/// While the guard is in scope, the session can only be accessed through the guard.
/// However, because the guard implements [`Deref`](std::ops::Deref) and
/// [`DerefMut`](std::ops::DerefMut) callers can treat the guard as the session.
///
/// If the original timeout cannot be restored, the session is poisoned and the
/// next command returns the error instead of being sent.
#[derive(Debug)]
pub struct TimeoutGuard<'a, B: Backend, P: Port<B>> {
    /// The underlying session.
    port: &'a mut P,
    /// The original timeout that will be restored when the guard is dropped.
    original_timeout: Option<Duration>,
    backend_marker: PhantomData<B>,
}

impl<'a, B: Backend, P: Port<B>> TimeoutGuard<'a, B, P> {
    /// Update the timeout and return a [`TimeoutGuard`] wrapping the session.
    pub(crate) fn new(port: &'a mut P, timeout: Option<Duration>) -> Result<Self, io::Error> {
        let backend = port.backend_mut();
        let original_timeout = backend.read_timeout()?;
        backend.set_read_timeout(timeout)?;
        Ok(TimeoutGuard {
            port,
            original_timeout,
            backend_marker: PhantomData,
        })
    }
}

impl<'a, B: Backend, P: Port<B>> std::ops::Deref for TimeoutGuard<'a, B, P> {
    type Target = P;
    /// Get a shared reference to the underlying session.
    fn deref(&self) -> &Self::Target {
        self.port
    }
}

impl<'a, B: Backend, P: Port<B>> std::ops::DerefMut for TimeoutGuard<'a, B, P> {
    /// Get an exclusive reference to the underlying session.
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.port
    }
}

impl<'a, B: Backend, P: Port<B>> std::ops::Drop for TimeoutGuard<'a, B, P> {
    fn drop(&mut self) {
        if let Err(err) = self
            .port
            .backend_mut()
            .set_read_timeout(self.original_timeout)
        {
            log::warn!("failed to restore the read timeout: {err}");
            self.port.poison(io::Error::new(
                io::ErrorKind::Other,
                if let Some(timeout) = self.original_timeout {
                    format!(
                        "failed to reset timeout to {} seconds: {}",
                        timeout.as_secs_f64(),
                        err
                    )
                } else {
                    format!("failed to reset to an infinite timeout: {}", err)
                },
            ));
        }
    }
}
