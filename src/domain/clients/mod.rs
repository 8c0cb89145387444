#[cfg(feature = "http-backend")]
pub mod http_client;

pub mod simulated;

#[cfg(feature = "http-backend")]
pub use http_client::HttpJobClient;

pub use simulated::{SimulatedBackend, SimulatedRun, SimulatedSolver};
