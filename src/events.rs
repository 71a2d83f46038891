use crate::state::Route;
use crate::store::Revision;

pub const EVENT_STORE_UPDATED: &str = "store_updated";

/// Sent after a screen persisted the store, so the other route can refresh.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreUpdatedPayload {
    pub route: Route,
    pub revision: Revision,
}
