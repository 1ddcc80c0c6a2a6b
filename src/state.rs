use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::SigningConfig;
use crate::controller::{Effect, Event, Session};
use crate::features::document_store::{DocumentStore, HttpTransport};

static GENERATIONS: AtomicU64 = AtomicU64::new(1);

/// Process-wide, so a rebuilt `AppState` never reuses an earlier stamp.
fn next_generation() -> u64 {
    GENERATIONS.fetch_add(1, Ordering::Relaxed)
}

pub struct AppState {
    pub config: SigningConfig,
    pub session: Session,
    pub store: Arc<DocumentStore>,
    /// Stamped on worker jobs; results from another generation are dropped.
    pub generation: u64,
}

impl AppState {
    pub fn new(config: SigningConfig) -> Self {
        let store = DocumentStore::new(
            config.documents_dir.clone(),
            Box::new(HttpTransport::new(config.network_timeout())),
        );
        Self::with_store(config, store)
    }

    pub fn with_store(config: SigningConfig, store: DocumentStore) -> Self {
        let session = Session::new(config.source_url.clone(), config.active_policy());
        Self {
            config,
            session,
            store: Arc::new(store),
            generation: next_generation(),
        }
    }

    /// Feeds one event through the controller and hands back the effects to run.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        let placeholder = Session::new(String::new(), self.session.policy);
        let session = std::mem::replace(&mut self.session, placeholder);
        let transition = session.step(event);
        self.session = transition.session;
        transition.effects
    }

    pub fn reset_runtime(&mut self) {
        self.session = Session::new(self.config.source_url.clone(), self.config.active_policy());
        self.generation = next_generation();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SigningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_and_reset_gets_a_fresh_generation() {
        let mut a = AppState::default();
        let b = AppState::default();
        assert_ne!(a.generation, b.generation);
        let before = a.generation;
        a.reset_runtime();
        assert!(a.generation > before);
        assert_ne!(a.generation, b.generation);
    }
}
