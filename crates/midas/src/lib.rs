//! Application crate: pipelines (C4-C9), job manager (C10), merge engine
//! (C11), and the HTTP router (C12) that adapts them to the outside world.

pub mod clients;
pub mod envelope;
pub mod handlers;
pub mod jobs;
pub mod kernel;
pub mod merge;
pub mod middleware;
pub mod pipelines;
pub mod routes;
pub mod state;

pub use kernel::MidasKernel;
pub use state::AppState;
