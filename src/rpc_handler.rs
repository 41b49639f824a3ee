//! RPC method handler for the SmartMark JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` turns one request into calls on a mounted [`App`].

use serde_json::{json, Value};

use crate::app::App;
use crate::client::CommandOutcome;
use crate::types::session::OAuthCallback;

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn outcome(o: CommandOutcome) -> Result<Value, String> {
    Ok(json!({ "outcome": o }))
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// Command failures are not errors: they come back as an `outcome` field.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── View ───
        "view.render" => serde_json::to_value(app.render()).map_err(|e| e.to_string()),
        "input.title" => {
            let title = str_param(params, "value")?;
            app.commands().set_title(title);
            Ok(json!({"ok": true}))
        }
        "input.url" => {
            let url = str_param(params, "value")?;
            app.commands().set_url(url);
            Ok(json!({"ok": true}))
        }

        // ─── Bookmarks ───
        "bookmark.add" => {
            let title = str_param(params, "title")?;
            let url = str_param(params, "url")?;
            outcome(app.commands().add(title, url).await)
        }
        "bookmark.submit" => outcome(app.commands().submit().await),
        "bookmark.delete" => {
            let id = str_param(params, "id")?;
            outcome(app.commands().delete(id).await)
        }
        "bookmark.list" => {
            let state = app.state();
            let items: Vec<Value> = state
                .bookmarks
                .iter()
                .map(|b| json!({"id": b.id, "title": b.title, "url": b.url, "created_at": b.created_at}))
                .collect();
            Ok(json!({"items": items}))
        }

        // ─── Auth ───
        "auth.sign_in" => {
            let provider = params
                .get("provider")
                .and_then(|v| v.as_str())
                .unwrap_or(crate::config::DEFAULT_PROVIDER);
            match app.commands().sign_in(provider).await {
                Some(redirect) => serde_json::to_value(redirect).map_err(|e| e.to_string()),
                None => outcome(CommandOutcome::Failed),
            }
        }
        "auth.callback" => {
            let callback: OAuthCallback =
                serde_json::from_value(params.clone()).map_err(|e| format!("invalid callback: {}", e))?;
            outcome(app.commands().complete_sign_in(callback).await)
        }
        "auth.refresh" => outcome(app.commands().refresh_token().await),
        "auth.sign_out" => outcome(app.commands().sign_out().await),
        "session.get" => Ok(json!({ "session": app.state().session })),

        _ => Err(format!("unknown method: {}", method)),
    }
}
