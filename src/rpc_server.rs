//! SmartMark RPC server: JSON-RPC over stdin/stdout for a UI shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"ready",...} once, then {"event":"render","screen":{...}}
//!           after every state change.
//!
//! The access token is kept in `session.json` in the data directory, so a
//! restart resumes the signed-in session.

use std::io::Write;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use smartmark::app::App;
use smartmark::backend::Backend;
use smartmark::client::{render, TokenFile};
use smartmark::config::AppConfig;
use smartmark::rpc_handler::handle_method;

fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG takes precedence over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // stdout carries the protocol; logs go to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn emit(value: &Value) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{}", value);
    let _ = out.flush();
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("smartmark: {}", e);
            std::process::exit(2);
        }
    };
    init_tracing(&config.logging.level, config.logging.json_format);

    let backend = match Backend::open(&config) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!(error = %e, path = %config.database_path().display(), "failed to open database");
            std::process::exit(1);
        }
    };

    let app = App::mount_persistent(backend, TokenFile::in_dir(&config.data_dir)).await;
    info!(data_dir = %config.data_dir.display(), "smartmark ready");
    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let mut states = app.store().subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            let screen = render(&states.borrow_and_update());
            emit(&json!({"event": "render", "screen": screen}));
            if states.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);
    }

    renderer.abort();
    app.teardown();
    info!("smartmark stopped");
}
