//! Release contracts and the per-container disposal chain.
//!
//! A container tracks every instance it materialized under a caching
//! scope. Disposal walks that chain last-created-first, runs the release
//! contract of the entries that carry one, drops each instance in turn,
//! and never stops at the first fault.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::error::{BoxError, DisposalFailureError, DisposalFault, HearthError, Result};
use crate::key::ServiceKey;
use crate::registry::{DisposeFn, Instance};

/// Release contract for services that own resources.
///
/// Attach it to a registration with
/// [`ServiceDescriptor::disposable`](crate::descriptor::ServiceDescriptor::disposable);
/// the owning container calls [`dispose`](Dispose::dispose) exactly once
/// when it is torn down.
///
/// # Examples
/// ```
/// use hearth_container::dispose::Dispose;
/// use hearth_container::error::BoxError;
///
/// struct Pool;
///
/// impl Dispose for Pool {
///     fn dispose(&self) -> Result<(), BoxError> {
///         // close connections
///         Ok(())
///     }
/// }
/// ```
pub trait Dispose: Send + Sync {
    /// Releases the resources held by this service.
    fn dispose(&self) -> std::result::Result<(), BoxError>;
}

/// Builds the type-erased release logic for service type `T`.
pub(crate) fn disposer_for<T: ?Sized + Dispose + 'static>() -> DisposeFn {
    Arc::new(|instance: &Instance| match instance.downcast::<T>() {
        Some(service) => service.dispose(),
        None => Ok(()),
    })
}

/// An instance the container is responsible for releasing.
pub(crate) struct Tracked {
    pub key: ServiceKey,
    pub instance: Instance,
    pub disposer: Option<DisposeFn>,
}

impl Tracked {
    fn release(&self) -> std::result::Result<(), String> {
        let Some(disposer) = &self.disposer else {
            return Ok(());
        };
        match catch_unwind(AssertUnwindSafe(|| disposer(&self.instance))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(payload) => Err(format!("release logic panicked: {}", panic_message(&*payload))),
        }
    }
}

#[derive(Default)]
struct ChainState {
    entries: Vec<Tracked>,
    closed: bool,
}

/// Creation-ordered set of instances one container must release.
#[derive(Default)]
pub(crate) struct DisposalChain {
    state: Mutex<ChainState>,
}

impl DisposalChain {
    /// Appends an instance, or hands it back if the chain was already swept.
    pub fn track(&self, tracked: Tracked) -> std::result::Result<(), Tracked> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(tracked);
        }
        trace!(key = %tracked.key, position = state.entries.len(), "Tracking instance for disposal");
        state.entries.push(tracked);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Number of tracked entries that carry release logic.
    pub fn disposable_len(&self) -> usize {
        self.state.lock().entries.iter().filter(|t| t.disposer.is_some()).count()
    }

    /// Closes the chain and takes everything tracked so far.
    pub fn close(&self) -> Vec<Tracked> {
        let mut state = self.state.lock();
        state.closed = true;
        std::mem::take(&mut state.entries)
    }

    /// Releases `entries` newest first, collecting every fault.
    ///
    /// Each instance handle is dropped right after its release, so
    /// instances nobody else holds are freed in the same order.
    ///
    /// # Errors
    /// Returns [`HearthError::DisposalFailure`] after the whole sweep if any
    /// release failed or panicked.
    pub fn sweep(container: &str, entries: Vec<Tracked>) -> Result<()> {
        let mut faults = Vec::new();

        for tracked in entries.into_iter().rev() {
            match tracked.release() {
                Ok(()) => trace!(key = %tracked.key, "Released instance"),
                Err(message) => {
                    warn!(container, key = %tracked.key, %message, "Release failed, continuing sweep");
                    faults.push(DisposalFault { key: tracked.key.clone(), message });
                }
            }
        }

        if faults.is_empty() {
            Ok(())
        } else {
            Err(HearthError::DisposalFailure(DisposalFailureError {
                container: container.to_string(),
                faults,
            }))
        }
    }
}

/// Releases an instance that could not be tracked, logging any fault.
pub(crate) fn release_untracked(tracked: Tracked) {
    if let Err(message) = tracked.release() {
        warn!(key = %tracked.key, %message, "Release of untracked instance failed");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
