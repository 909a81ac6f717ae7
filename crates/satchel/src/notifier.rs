// Copyright (c) The Satchel Project Authors.
// Licensed under the MIT License.

//! Activation-listener dispatch.
//!
//! Two paths lead here. On a non-persistent store, the factories subscribe
//! to store lifecycle events and dispatch to attribute values as entries
//! passivate and activate. On a persistent store, every handle carries a
//! [`SessionActivationNotifier`] over an immutable composite session view,
//! because activation from durable storage is observable on every load.
//!
//! In both paths the callbacks are delivered through an
//! [`ActivationNotifier`] scope obtained from the factory's injected
//! [`NotifierFactory`], one scope per dispatch, closed on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{ActivationAware, ImmutableSessionView, SessionId, SessionValue};

/// A short-lived dispatch scope for activation callbacks.
///
/// A scope is opened per dispatch and released when dropped, giving
/// integrations a place to install per-dispatch context (a class loader
/// switch, a request context) around the callbacks. The stock
/// [`DirectNotifier`] simply forwards to the value.
pub trait ActivationNotifier: Send + Sync {
    /// Delivers the pre-passivation callback to one value.
    fn pre_passivate(&self, value: &dyn ActivationAware);

    /// Delivers the post-activation callback to one value.
    fn post_activate(&self, value: &dyn ActivationAware);
}

/// Produces a notifier scope for a session.
///
/// Supplied to the factories at construction; there is no process-wide
/// notifier registry.
pub type NotifierFactory = Arc<dyn Fn(&SessionId) -> Box<dyn ActivationNotifier> + Send + Sync>;

/// The stock notifier: invokes the callbacks directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectNotifier;

impl ActivationNotifier for DirectNotifier {
    fn pre_passivate(&self, value: &dyn ActivationAware) {
        value.on_pre_passivate();
    }

    fn post_activate(&self, value: &dyn ActivationAware) {
        value.on_post_activate();
    }
}

/// A [`NotifierFactory`] producing [`DirectNotifier`] scopes.
#[must_use]
pub fn direct_notifiers() -> NotifierFactory {
    Arc::new(|_| Box::new(DirectNotifier))
}

/// Fires activation callbacks for a session loaded from persistent storage.
///
/// Bound to an immutable composite view of the session at load time. The
/// activation state flag guarantees each transition fires exactly once:
/// `post_activate` is a no-op while the session counts as active, and
/// `pre_passivate` is a no-op unless it does.
pub struct SessionActivationNotifier<V> {
    view: ImmutableSessionView<V>,
    notifiers: NotifierFactory,
    active: AtomicBool,
}

impl<V> SessionActivationNotifier<V> {
    pub(crate) fn new(view: ImmutableSessionView<V>, notifiers: NotifierFactory) -> Self {
        Self {
            view,
            notifiers,
            active: AtomicBool::new(false),
        }
    }
}

impl<V: SessionValue> SessionActivationNotifier<V> {
    /// Notifies every activation-aware value that the session was activated.
    pub fn post_activate(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            let notifier = (self.notifiers)(self.view.id());
            for value in self.view.attributes().values() {
                if let Some(aware) = value.activation_aware() {
                    notifier.post_activate(aware);
                }
            }
        }
    }

    /// Notifies every activation-aware value that the session is about to be
    /// passivated.
    pub fn pre_passivate(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            let notifier = (self.notifiers)(self.view.id());
            for value in self.view.attributes().values() {
                if let Some(aware) = value.activation_aware() {
                    notifier.pre_passivate(aware);
                }
            }
        }
    }
}

impl<V> std::fmt::Debug for SessionActivationNotifier<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionActivationNotifier")
            .field("session", &self.view.id().as_str())
            .field("active", &self.active.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use crate::{ImmutableSessionAttributes, SessionMetadata};

    use super::*;

    #[derive(Default)]
    struct Probe {
        passivated: Arc<AtomicUsize>,
        activated: Arc<AtomicUsize>,
    }

    impl ActivationAware for Probe {
        fn on_pre_passivate(&self) {
            self.passivated.fetch_add(1, Ordering::SeqCst);
        }

        fn on_post_activate(&self) {
            self.activated.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl SessionValue for Probe {
        fn activation_aware(&self) -> Option<&dyn ActivationAware> {
            Some(self)
        }
    }

    fn notifier_for(probe: Probe) -> SessionActivationNotifier<Probe> {
        let mut attributes = HashMap::new();
        attributes.insert("probe".to_string(), probe);
        let view = ImmutableSessionView::new(
            SessionId::new("s1"),
            SessionMetadata::existing(),
            ImmutableSessionAttributes::new(attributes),
        );
        SessionActivationNotifier::new(view, direct_notifiers())
    }

    #[test]
    fn transitions_fire_exactly_once() {
        let activated = Arc::new(AtomicUsize::new(0));
        let passivated = Arc::new(AtomicUsize::new(0));
        let notifier = notifier_for(Probe {
            activated: Arc::clone(&activated),
            passivated: Arc::clone(&passivated),
        });

        notifier.post_activate();
        notifier.post_activate();
        assert_eq!(activated.load(Ordering::SeqCst), 1);

        notifier.pre_passivate();
        notifier.pre_passivate();
        assert_eq!(passivated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn passivation_without_activation_is_silent() {
        let passivated = Arc::new(AtomicUsize::new(0));
        let notifier = notifier_for(Probe {
            activated: Arc::new(AtomicUsize::new(0)),
            passivated: Arc::clone(&passivated),
        });

        notifier.pre_passivate();
        assert_eq!(passivated.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn values_without_the_capability_are_skipped() {
        let mut attributes = HashMap::new();
        attributes.insert("plain".to_string(), "data".to_string());
        let view = ImmutableSessionView::new(
            SessionId::new("s1"),
            SessionMetadata::existing(),
            ImmutableSessionAttributes::new(attributes),
        );
        let notifier = SessionActivationNotifier::new(view, direct_notifiers());

        // Nothing to observe; just must not panic or misfire.
        notifier.post_activate();
        notifier.pre_passivate();
    }
}
