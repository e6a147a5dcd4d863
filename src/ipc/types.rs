use serde::Deserialize;

use crate::cache::ViewStateCache;
use crate::client::AcademicClient;
use crate::model::UserProfile;
use crate::reconcile::ReconcileConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Installed by `session.set`. Token acquisition and renewal happen in the
/// host; the engine only carries the credential on outgoing requests.
pub struct Session {
    pub client: Box<dyn AcademicClient>,
    pub profile: UserProfile,
}

pub struct AppState {
    pub session: Option<Session>,
    pub cache: ViewStateCache,
    pub reconcile: ReconcileConfig,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            session: None,
            cache: ViewStateCache::new(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
