//! The expectation store.
//!
//! Holds the single configured expectation (method, URI, optional content
//! validator) and the outcome slots. Configuration never fails; everything
//! is checked when a request is intercepted.

use crate::error::{Fault, StubError};
use crate::negotiate::{self, Format};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// Decodes a request body into the type chosen at setup and runs the
/// caller's predicate on it.
pub(crate) type ContentValidator =
    Arc<dyn Fn(&HeaderMap, &Bytes) -> Result<bool, StubError> + Send + Sync>;

/// A payload captured with its concrete type, ready to be encoded in
/// whichever format negotiation picks.
pub(crate) trait Payload: Send + Sync {
    fn encode(&self, format: Format, pretty_json: bool) -> Result<String, StubError>;
}

impl<T> Payload for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn encode(&self, format: Format, pretty_json: bool) -> Result<String, StubError> {
        negotiate::encode(self, format, pretty_json)
    }
}

/// The request a stub expects.
#[derive(Clone)]
pub struct Expectation {
    pub method: Method,
    pub uri: String,
    pub(crate) content_validator: Option<ContentValidator>,
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("validates_content", &self.content_validator.is_some())
            .finish()
    }
}

/// Outcome slots. Each is set independently; the interceptor resolves them
/// in the order fault, status, payload.
#[derive(Clone, Default)]
pub(crate) struct Outcome {
    pub status: Option<(StatusCode, Option<String>)>,
    pub payload: Option<Arc<dyn Payload>>,
    pub fault: Option<Fault>,
}

#[derive(Default)]
pub(crate) struct StoreState {
    pub expectation: Option<Expectation>,
    pub outcome: Outcome,
}

/// Shared handle to the store state.
#[derive(Clone, Default)]
pub(crate) struct ExpectationStore {
    state: Arc<RwLock<StoreState>>,
}

impl ExpectationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out the current configuration so interception runs without
    /// holding the lock.
    pub fn snapshot(&self) -> (Option<Expectation>, Outcome) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (state.expectation.clone(), state.outcome.clone())
    }

    fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn set_expectation(&self, expectation: Expectation) {
        self.write(|state| state.expectation = Some(expectation));
    }

    pub fn reset(&self) {
        self.write(|state| *state = StoreState::default());
    }

    pub fn expectation(&self) -> Option<Expectation> {
        self.snapshot().0
    }
}

/// Handle returned by the `setup_*` calls; chooses what the intercepted
/// request produces.
///
/// Every call overwrites its own slot only. When several are set, a fault
/// wins over a status code, and a status code wins over a payload.
#[derive(Clone)]
pub struct ResponseSetup {
    store: ExpectationStore,
}

impl ResponseSetup {
    pub(crate) fn new(store: ExpectationStore) -> Self {
        Self { store }
    }

    /// Respond with `payload`, serialized according to the request's `Accept` header.
    pub fn returns<T>(&self, payload: T) -> &Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        let payload: Arc<dyn Payload> = Arc::new(payload);
        self.store.write(|state| state.outcome.payload = Some(payload));
        self
    }

    /// Respond with a bare status code and no body.
    pub fn returns_status(&self, status: StatusCode) -> &Self {
        self.store
            .write(|state| state.outcome.status = Some((status, None)));
        self
    }

    /// Respond with a bare status code and reason phrase.
    pub fn returns_status_with_reason(
        &self,
        status: StatusCode,
        reason: impl Into<String>,
    ) -> &Self {
        let reason = reason.into();
        self.store
            .write(|state| state.outcome.status = Some((status, Some(reason))));
        self
    }

    /// Fail the request with `fault`.
    pub fn throws<E>(&self, fault: E) -> &Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.throws_shared(Arc::new(fault))
    }

    /// Fail the request with an already shared fault, keeping its identity.
    pub fn throws_shared(&self, fault: Fault) -> &Self {
        self.store.write(|state| state.outcome.fault = Some(fault));
        self
    }
}

/// Build the typed validator closure for `T`.
pub(crate) fn content_validator<T, F>(is_content_valid: F) -> ContentValidator
where
    T: DeserializeOwned + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(move |headers: &HeaderMap, body: &Bytes| -> Result<bool, StubError> {
        let content: T = negotiate::decode(body, negotiate::request_format(headers))?;
        Ok(is_content_valid(&content))
    })
}

/// Normalize an absolute URI for comparison. Unparseable input is kept as is.
pub fn normalize_uri(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) => url.to_string(),
        Err(_) => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct SampleDto {
        id: u32,
    }

    #[test]
    fn test_normalize_uri() {
        assert_eq!(normalize_uri("HTTP://LocalHost:80"), "http://localhost/");
        assert_eq!(
            normalize_uri("http://localhost/stringUri"),
            "http://localhost/stringUri"
        );
        assert_eq!(normalize_uri("/relative"), "/relative");
    }

    #[test]
    fn test_outcome_slots_are_independent() {
        let store = ExpectationStore::new();
        let setup = ResponseSetup::new(store.clone());

        setup.returns("content").returns_status(StatusCode::NOT_FOUND);

        let (_, outcome) = store.snapshot();
        assert!(outcome.payload.is_some());
        assert_eq!(outcome.status, Some((StatusCode::NOT_FOUND, None)));
        assert!(outcome.fault.is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = ExpectationStore::new();
        store.set_expectation(Expectation {
            method: Method::GET,
            uri: "http://localhost/".to_string(),
            content_validator: None,
        });
        ResponseSetup::new(store.clone()).returns_status(StatusCode::OK);

        store.reset();

        let (expectation, outcome) = store.snapshot();
        assert!(expectation.is_none());
        assert!(outcome.status.is_none());
        assert!(outcome.payload.is_none());
        assert!(outcome.fault.is_none());
    }

    #[test]
    fn test_content_validator_decodes_and_checks() {
        let validator = content_validator::<SampleDto, _>(|dto| dto.id == 1);
        let headers = HeaderMap::new();

        assert!(validator(&headers, &Bytes::from_static(br#"{"id":1}"#)).unwrap());
        assert!(!validator(&headers, &Bytes::from_static(br#"{"id":2}"#)).unwrap());
        assert!(matches!(
            validator(&headers, &Bytes::from_static(b"garbage")),
            Err(StubError::ContentDecode { .. })
        ));
    }

    #[test]
    fn test_content_validator_reads_xml_bodies() {
        let validator = content_validator::<SampleDto, _>(|dto| dto.id == 7);
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/xml"),
        );

        let body = Bytes::from_static(b"<SampleDto><id>7</id></SampleDto>");
        assert!(validator(&headers, &body).unwrap());
    }

    #[test]
    fn test_expectation_debug_hides_closure() {
        let expectation = Expectation {
            method: Method::POST,
            uri: "http://localhost/sampleDtoUri".to_string(),
            content_validator: Some(content_validator::<SampleDto, _>(|_| true)),
        };
        let debug = format!("{:?}", expectation);
        assert!(debug.contains("validates_content: true"));
    }
}
