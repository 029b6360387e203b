use axum::serve;
use tokio::net::TcpListener;

use deck_store::persistence::write_atomic;
use deck_store::{StoreError, WorkspacePaths};

use crate::routes::router;
use crate::state::BridgeState;

/// Binding port 0 lets the OS pick a free loopback port; the chosen port
/// is then published through the port file for the gateway to find.
pub const DEFAULT_BIND: &str = "127.0.0.1:0";

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Publish the bound port where the gateway polls for it. Written only
/// after the listener is live, so a reader never races a dead port.
pub fn write_port_file(paths: &WorkspacePaths, port: u16) -> Result<(), StoreError> {
    let path = paths.port_file();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }
    write_atomic(&path, port.to_string().as_bytes())
}

pub async fn run_bridge(bind: &str, state: BridgeState) -> Result<(), ServeError> {
    let listener = TcpListener::bind(bind).await.map_err(|source| ServeError::Bind {
        addr: bind.to_string(),
        source,
    })?;
    let addr = listener.local_addr().map_err(ServeError::Serve)?;
    write_port_file(state.store().paths(), addr.port())?;
    tracing::info!(%addr, "bridge listening");

    serve(listener, router(state.clone()))
        .await
        .map_err(ServeError::Serve)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn port_file_holds_the_port_as_decimal_text() {
        let tmp = TempDir::new().unwrap();
        let paths = WorkspacePaths::new(tmp.path());
        write_port_file(&paths, 49152).unwrap();
        let raw = std::fs::read_to_string(paths.port_file()).unwrap();
        assert_eq!(raw, "49152");
    }

    #[test]
    fn port_file_rewrite_replaces_the_old_port() {
        let tmp = TempDir::new().unwrap();
        let paths = WorkspacePaths::new(tmp.path());
        write_port_file(&paths, 49152).unwrap();
        write_port_file(&paths, 50000).unwrap();
        let raw = std::fs::read_to_string(paths.port_file()).unwrap();
        assert_eq!(raw, "50000");
    }
}
