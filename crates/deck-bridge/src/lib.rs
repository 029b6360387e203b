pub mod error;
pub mod model;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{BridgeError, ErrorBody};
pub use routes::router;
pub use server::{run_bridge, ServeError, DEFAULT_BIND};
pub use state::BridgeState;
