//! Host reachability probe.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Whether a TCP connection to `address:port` can be opened within `timeout`.
pub async fn host_reachable(address: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((address, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(address = %address, port, error = %e, "Host probe failed");
            false
        }
        Err(_) => {
            debug!(
                address = %address,
                port,
                timeout_ms = timeout.as_millis() as u64,
                "Host probe timed out"
            );
            false
        }
    }
}
