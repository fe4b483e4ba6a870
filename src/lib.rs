//! HTTP Stub
//!
//! A stand-in HTTP transport for unit tests. Code under test sends requests
//! through an [`HttpClient`]; in tests the client is bound to an
//! [`HttpStub`], which checks each request against one configured
//! expectation and answers without touching the network.
//!
//! # Features
//!
//! - **Request Expectations**: Match by method and absolute URI
//! - **Content Validation**: Decode the request body into a typed value and check it
//! - **Content Negotiation**: Serialize payloads as JSON or XML based on `Accept`
//! - **Status Codes**: Answer with a bare status code and optional reason phrase
//! - **Fault Simulation**: Fail the request with a configured error
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use http_stub::{HttpClient, HttpStub};
//!
//! # async fn run() -> Result<(), http_stub::StubError> {
//! let stub = HttpStub::new();
//! stub.setup_get("http://localhost/stringUri")
//!     .returns_status(StatusCode::NOT_FOUND);
//!
//! let client = HttpClient::new(stub.clone()).with_base_address("http://localhost/")?;
//! let response = client.get("stringUri").await?;
//! assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! # Ok(())
//! # }
//! ```
//!
//! An expectation can also be loaded from YAML:
//!
//! ```yaml
//! expectation:
//!   method: GET
//!   uri: http://localhost/sampleDto
//!   outcome:
//!     type: json
//!     content:
//!       id: 123
//!       name: sample
//! ```

pub mod config;
pub mod error;
pub mod expectation;
pub mod negotiate;
pub mod stub;
pub mod transport;

pub use config::{StubConfig, StubSettings};
pub use error::{Fault, SimulatedFault, StubError};
pub use expectation::{Expectation, ResponseSetup};
pub use stub::{HttpStub, OriginRequest, ReasonPhrase};
pub use transport::{HttpClient, Request, Response, Transport};
