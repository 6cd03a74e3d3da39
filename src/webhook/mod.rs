//! Webhook server: acknowledges deliveries at once and processes them on a
//! bounded worker pool.

pub mod dispatch;
pub mod routes;

pub use dispatch::{DispatchError, Dispatcher, WebhookJob, WorkerPool};
pub use routes::{LIVENESS_BODY, webhook_routes};
