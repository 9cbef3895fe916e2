//! HTML dashboard: one table row per responder message, newest first.
//! Rendered from `templates/dashboard.html`; askama escapes every field.

use crate::store::EnrichedMessage;
use askama::Template;

const REFRESH_SECONDS: u32 = 15;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    /// Newest first.
    messages: Vec<EnrichedMessage>,
    refresh_seconds: u32,
}

impl DashboardTemplate {
    /// Takes messages in store (arrival) order.
    pub fn new(mut messages: Vec<EnrichedMessage>) -> Self {
        messages.reverse();
        Self {
            messages,
            refresh_seconds: REFRESH_SECONDS,
        }
    }
}

/// Render the full dashboard page.
pub fn render_dashboard(messages: Vec<EnrichedMessage>) -> Result<String, askama::Error> {
    DashboardTemplate::new(messages).render()
}
