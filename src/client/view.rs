//! View: a pure function of the client state.

use std::fmt::Write as _;

use serde::Serialize;

use super::state::AppState;

pub const APP_HEADING: &str = "SMART BOOKMARK APP";
pub const SIGN_IN_LABEL: &str = "Sign in with Google";
pub const SIGN_OUT_LABEL: &str = "Logout";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    SignIn {
        heading: String,
        action: String,
    },
    Dashboard {
        greeting: String,
        sign_out: String,
        title_input: String,
        url_input: String,
        items: Vec<ListItem>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// The dashboard is shown if and only if there is a session.
pub fn render(state: &AppState) -> Screen {
    match &state.session {
        None => Screen::SignIn {
            heading: APP_HEADING.to_string(),
            action: SIGN_IN_LABEL.to_string(),
        },
        Some(session) => Screen::Dashboard {
            greeting: format!("Welcome, {}", session.email),
            sign_out: SIGN_OUT_LABEL.to_string(),
            title_input: state.title_input.clone(),
            url_input: state.url_input.clone(),
            items: state
                .bookmarks
                .iter()
                .map(|b| ListItem {
                    id: b.id.clone(),
                    title: b.title.clone(),
                    url: b.url.clone(),
                })
                .collect(),
        },
    }
}

impl Screen {
    pub fn is_dashboard(&self) -> bool {
        matches!(self, Screen::Dashboard { .. })
    }

    /// Plain-text rendering for terminals and logs.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        match self {
            Screen::SignIn { heading, action } => {
                let _ = writeln!(out, "{}", heading);
                let _ = writeln!(out, "[{}]", action);
            }
            Screen::Dashboard {
                greeting,
                sign_out,
                title_input,
                url_input,
                items,
            } => {
                let _ = writeln!(out, "{}  [{}]", greeting, sign_out);
                let _ = writeln!(out, "Title: {}", title_input);
                let _ = writeln!(out, "URL:   {}", url_input);
                let _ = writeln!(out, "[Add]");
                for item in items {
                    let _ = writeln!(out, "- {} <{}>  [Delete]", item.title, item.url);
                }
            }
        }
        out
    }
}
