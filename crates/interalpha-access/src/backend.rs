//! Bundles the collaborators a key component needs.

use crate::audit::AuditSink;
use crate::clock::Clock;
use crate::notification::NotificationDispatcher;
use crate::store::{ClientDirectory, KeyStore};

/// The external world as seen by the key lifecycle.
///
/// Components are generic over one `B: Backend` and share it through an
/// `Arc`, so background work (notification delivery, cleanup) can hold it
/// past the call that started it.
pub trait Backend: Send + Sync + 'static {
    type Store: KeyStore;
    type Directory: ClientDirectory;
    type Notifier: NotificationDispatcher;
    type Audit: AuditSink;
    type Clock: Clock;

    fn store(&self) -> &Self::Store;
    fn directory(&self) -> &Self::Directory;
    fn notifier(&self) -> &Self::Notifier;
    fn audit(&self) -> &Self::Audit;
    fn clock(&self) -> &Self::Clock;
}

/// Plain struct implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct Collaborators<S, D, N, A, C> {
    pub store: S,
    pub directory: D,
    pub notifier: N,
    pub audit: A,
    pub clock: C,
}

impl<S, D, N, A, C> Backend for Collaborators<S, D, N, A, C>
where
    S: KeyStore,
    D: ClientDirectory,
    N: NotificationDispatcher,
    A: AuditSink,
    C: Clock,
{
    type Store = S;
    type Directory = D;
    type Notifier = N;
    type Audit = A;
    type Clock = C;

    fn store(&self) -> &S {
        &self.store
    }

    fn directory(&self) -> &D {
        &self.directory
    }

    fn notifier(&self) -> &N {
        &self.notifier
    }

    fn audit(&self) -> &A {
        &self.audit
    }

    fn clock(&self) -> &C {
        &self.clock
    }
}
