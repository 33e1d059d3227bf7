//! Event-hook lists: `on_alignment_complete`, `on_negotiation_complete`,
//! `on_session_ready`, `on_evolution_triggered`. Registered callbacks are
//! copied out from behind the lock before dispatch so a callback may
//! safely register or deregister more hooks; exceptions are swallowed —
//! a misbehaving hook must never affect session state.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::session::CollaborationSession;
use concord_alignment::FullAlignmentCheck;
use concord_emergence::ProtocolVariant;
use concord_negotiation::NegotiationSession;

pub type AlignmentHook = Arc<dyn Fn(&CollaborationSession, &FullAlignmentCheck) + Send + Sync>;
pub type NegotiationHook = Arc<dyn Fn(&CollaborationSession, &NegotiationSession) + Send + Sync>;
pub type SessionReadyHook = Arc<dyn Fn(&CollaborationSession) + Send + Sync>;
pub type EvolutionHook = Arc<dyn Fn(&CollaborationSession, &ProtocolVariant) + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    alignment_complete: Mutex<Vec<AlignmentHook>>,
    negotiation_complete: Mutex<Vec<NegotiationHook>>,
    session_ready: Mutex<Vec<SessionReadyHook>>,
    evolution_triggered: Mutex<Vec<EvolutionHook>>,
}

macro_rules! dispatcher {
    ($name:ident, $field:ident, $hook:ty, $($arg:ident : $ty:ty),+) => {
        pub fn $name(&self, $($arg: $ty),+) {
            let hooks: Vec<$hook> = self.$field.lock().clone();
            for hook in hooks {
                if catch_unwind(AssertUnwindSafe(|| hook($($arg),+))).is_err() {
                    warn!(concat!(stringify!($name), " hook panicked; suppressed"));
                }
            }
        }
    };
}

impl Hooks {
    pub fn on_alignment_complete(&self, hook: AlignmentHook) {
        self.alignment_complete.lock().push(hook);
    }

    pub fn on_negotiation_complete(&self, hook: NegotiationHook) {
        self.negotiation_complete.lock().push(hook);
    }

    pub fn on_session_ready(&self, hook: SessionReadyHook) {
        self.session_ready.lock().push(hook);
    }

    pub fn on_evolution_triggered(&self, hook: EvolutionHook) {
        self.evolution_triggered.lock().push(hook);
    }

    dispatcher!(fire_alignment_complete, alignment_complete, AlignmentHook, session: &CollaborationSession, result: &FullAlignmentCheck);
    dispatcher!(fire_negotiation_complete, negotiation_complete, NegotiationHook, session: &CollaborationSession, result: &NegotiationSession);
    dispatcher!(fire_session_ready, session_ready, SessionReadyHook, session: &CollaborationSession);
    dispatcher!(fire_evolution_triggered, evolution_triggered, EvolutionHook, session: &CollaborationSession, variant: &ProtocolVariant);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn panicking_hook_does_not_stop_other_hooks() {
        let hooks = Hooks::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        hooks.on_session_ready(Arc::new(|_s| panic!("boom")));
        hooks.on_session_ready(Arc::new(move |_s| {
            calls2.fetch_add(1, Ordering::SeqCst);
        }));
        let session = CollaborationSession::new("s", "a", "b");
        hooks.fire_session_ready(&session);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
