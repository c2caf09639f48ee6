//! HTTP transport to the automation webhook.

pub mod http;

pub use http::{shared_client, WebhookClient};
