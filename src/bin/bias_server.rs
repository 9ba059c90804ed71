//! Bias Analysis Server
//!
//! Run with: cargo run --bin bias_server
//! Routes are listed in `tradebias::server`.

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tradebias::config::Config;
use tradebias::logging::{self, log, obj, v_num, v_str, Domain, Level};
use tradebias::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let listener = TcpListener::bind(&cfg.server_addr).await?;

    log(
        Level::Info,
        Domain::Server,
        "listening",
        obj(&[
            ("addr", v_str(&cfg.server_addr)),
            ("max_body_bytes", v_num(cfg.max_body_bytes as f64)),
            ("request_timeout_ms", v_num(cfg.request_timeout_ms as f64)),
        ]),
    );

    tokio::spawn(async {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        loop {
            ticker.tick().await;
            logging::tick_aggregator();
        }
    });

    axum::serve(listener, server::router(cfg)).await?;
    Ok(())
}
