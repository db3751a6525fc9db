//! HTTP surface: health, single and batch download submission, job status.

mod routes;
mod state;

pub use routes::{make_app, run_server};
pub use state::AppState;
