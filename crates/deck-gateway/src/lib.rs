pub mod client;
pub mod rpc;
pub mod server;
pub mod tools;

pub use client::{discover_port, BridgeClient, CallError, PORT_POLL_CEILING, PORT_POLL_INTERVAL};
pub use server::GatewayServer;
pub use tools::ToolKind;
