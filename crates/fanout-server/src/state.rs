use fanout_hub::Hub;

use crate::config::Config;

/// Shared state handed to every axum handler. Cheap to clone: `Hub` is
/// already a cloneable handle over channels, and `Config` is a handful of
/// scalars read once at startup.
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub config: Config,
}
