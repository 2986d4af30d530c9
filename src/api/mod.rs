pub mod client;
pub mod models;
pub mod transport;

pub use client::Session;
pub use transport::{ApiRequest, ApiResponse, FormPart, HttpTransport, RequestBody, Transport};
