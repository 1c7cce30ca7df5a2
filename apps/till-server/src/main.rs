//! # Till Server Entry Point
//!
//! The actual setup is in lib.rs so the router can be tested without a
//! socket.

#[tokio::main]
async fn main() {
    if let Err(err) = till_server::run().await {
        tracing::error!(error = %err, "Till server failed");
        eprintln!("till-server: {err}");
        std::process::exit(1);
    }
}
