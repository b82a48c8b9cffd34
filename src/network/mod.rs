//! HTTP networking module
//!
//! Request/response types and the client used by the search backends.

mod client;
mod user_agent;

pub use client::{extract_text, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use user_agent::{accept_html, accept_json, accept_language, generate_user_agent};
