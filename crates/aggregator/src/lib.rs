mod api;
mod config;
mod fetcher;
mod store;
mod utils;

pub use api::server::start_server;
pub use config::load_hosts;
pub use fetcher::{FetchError, NodeFetcher};
pub use store::ClusterStore;
pub use utils::loop_heartbeats::{FetcherHeartbeats, HealthStatus};
