/// Qloo API gateway
///
/// Layered as transport (one wire exchange) → retrying client (bounded
/// retry/backoff, single error taxonomy) → typed client (endpoint
/// operations and contract validation). Everything above this module talks
/// to `QlooClient` only.
pub mod client;
pub mod retry;
pub mod transport;

pub use client::QlooClient;
pub use retry::{RetryingClient, BACKOFF_BASE, MAX_RETRIES, REQUEST_TIMEOUT};
pub use transport::{HttpTransport, Method, Transport, TransportError, TransportResponse};
