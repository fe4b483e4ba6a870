//! The stub transport.

use crate::config::{status_code, OutcomeDefinition, StubConfig, StubSettings};
use crate::error::{SimulatedFault, StubError};
use crate::expectation::{
    content_validator, normalize_uri, Expectation, ExpectationStore, Outcome, ResponseSetup,
};
use crate::negotiate;
use crate::transport::{Request, Response, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// The request a response was produced for, attached to every response as
/// an extension.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl OriginRequest {
    fn of(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }
}

/// Reason phrase configured with
/// [`ResponseSetup::returns_status_with_reason`], attached as a response
/// extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonPhrase(pub String);

/// HTTP stub
///
/// Stands in for a network transport: it checks each request against the
/// one configured expectation and answers with the configured outcome.
/// Clones share the same expectation, so a test can keep one handle for
/// setup and hand another to the client under test.
#[derive(Clone, Default)]
pub struct HttpStub {
    store: ExpectationStore,
    settings: StubSettings,
}

impl HttpStub {
    /// Create an unconfigured stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unconfigured stub with the given settings.
    pub fn with_settings(settings: StubSettings) -> Self {
        Self {
            store: ExpectationStore::new(),
            settings,
        }
    }

    /// Create a stub and install the expectation described by `config`.
    pub fn from_config(config: &StubConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let stub = Self::with_settings(config.settings.clone());

        if let Some(definition) = &config.expectation {
            let setup = stub.setup(definition.method()?, definition.uri.as_str());
            match &definition.outcome {
                OutcomeDefinition::Status { code, reason } => {
                    let status = status_code(*code)?;
                    match reason {
                        Some(reason) => setup.returns_status_with_reason(status, reason.as_str()),
                        None => setup.returns_status(status),
                    };
                }
                OutcomeDefinition::Json { content } => {
                    setup.returns(content.clone());
                }
                OutcomeDefinition::Fault { message } => {
                    setup.throws(SimulatedFault(message.clone()));
                }
            }
        }

        info!(
            configured = config.expectation.is_some(),
            "HTTP stub created from configuration"
        );
        Ok(stub)
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Self::from_config(&StubConfig::from_yaml(yaml)?)
    }

    pub fn settings(&self) -> &StubSettings {
        &self.settings
    }

    /// Expect `method` on `uri`, with no content validation.
    pub fn setup(&self, method: Method, uri: impl Into<String>) -> ResponseSetup {
        self.install(Expectation {
            method,
            uri: uri.into(),
            content_validator: None,
        })
    }

    /// Expect a GET on `uri`.
    pub fn setup_get(&self, uri: impl Into<String>) -> ResponseSetup {
        self.setup(Method::GET, uri)
    }

    /// Expect `method` on `uri` with a body that decodes into `T` and
    /// satisfies `is_content_valid`.
    pub fn setup_with_content<T, F>(
        &self,
        method: Method,
        uri: impl Into<String>,
        is_content_valid: F,
    ) -> ResponseSetup
    where
        T: DeserializeOwned + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.install(Expectation {
            method,
            uri: uri.into(),
            content_validator: Some(content_validator(is_content_valid)),
        })
    }

    /// Expect a POST on `uri` whose body satisfies `is_content_valid`.
    pub fn setup_post<T, F>(&self, uri: impl Into<String>, is_content_valid: F) -> ResponseSetup
    where
        T: DeserializeOwned + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.setup_with_content(Method::POST, uri, is_content_valid)
    }

    /// Expect a PUT on `uri` whose body satisfies `is_content_valid`.
    pub fn setup_put<T, F>(&self, uri: impl Into<String>, is_content_valid: F) -> ResponseSetup
    where
        T: DeserializeOwned + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.setup_with_content(Method::PUT, uri, is_content_valid)
    }

    fn install(&self, expectation: Expectation) -> ResponseSetup {
        debug!(
            method = %expectation.method,
            uri = %expectation.uri,
            validates_content = expectation.content_validator.is_some(),
            "Expectation configured"
        );
        self.store.set_expectation(expectation);
        ResponseSetup::new(self.store.clone())
    }

    /// Forget the expectation and every configured outcome.
    pub fn reset(&self) {
        self.store.reset();
    }

    /// The expectation currently configured, if any.
    pub fn expectation(&self) -> Option<Expectation> {
        self.store.expectation()
    }

    /// Validate `request` and produce the configured outcome.
    pub async fn intercept(&self, request: Request) -> Result<Response, StubError> {
        let (expectation, outcome) = self.store.snapshot();

        if let Err(err) = self.validate(expectation.as_ref(), &request) {
            if self.settings.log_unmatched {
                warn!(
                    method = %request.method(),
                    uri = %request.uri(),
                    error = %err,
                    "Request rejected by stub"
                );
            }
            return Err(err);
        }

        if self.settings.log_matches {
            info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request matched stub"
            );
        }

        self.synthesize(&outcome, &request)
    }

    /// Content first, then configuration, URI, and method.
    fn validate(
        &self,
        expectation: Option<&Expectation>,
        request: &Request,
    ) -> Result<(), StubError> {
        if let Some(validator) = expectation.and_then(|e| e.content_validator.as_ref()) {
            if !validator(request.headers(), request.body())? {
                return Err(StubError::ContentValidationFailed);
            }
        }

        let expectation = expectation.ok_or(StubError::NotConfigured)?;

        let expected = normalize_uri(&expectation.uri);
        let actual = normalize_uri(&request.uri().to_string());
        if expected != actual {
            return Err(StubError::UriMismatch { expected, actual });
        }

        if *request.method() != expectation.method {
            return Err(StubError::MethodMismatch {
                expected: expectation.method.clone(),
                actual: request.method().clone(),
            });
        }

        Ok(())
    }

    /// Fault, then status code, then payload.
    fn synthesize(&self, outcome: &Outcome, request: &Request) -> Result<Response, StubError> {
        if let Some(fault) = &outcome.fault {
            debug!(fault = %fault, "Raising configured fault");
            return Err(StubError::ConfiguredFault(fault.clone()));
        }

        if let Some((status, reason)) = &outcome.status {
            debug!(status = status.as_u16(), "Responding with status code");
            let mut response = self.response(*status, Bytes::new(), request);
            if let Some(reason) = reason {
                response
                    .extensions_mut()
                    .insert(ReasonPhrase(reason.clone()));
            }
            return Ok(response);
        }

        if let Some(payload) = &outcome.payload {
            let format = negotiate::negotiate(request.headers())?;
            let body = payload.encode(format, self.settings.pretty_json)?;
            debug!(
                media_type = format.media_type(),
                bytes = body.len(),
                "Responding with payload"
            );

            let mut response = self.response(StatusCode::OK, Bytes::from(body), request);
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static(format.media_type()),
            );
            return Ok(response);
        }

        Err(StubError::NotConfigured)
    }

    fn response(&self, status: StatusCode, body: Bytes, request: &Request) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.extensions_mut().insert(OriginRequest::of(request));
        response
    }
}

#[async_trait]
impl Transport for HttpStub {
    async fn send(&self, request: Request) -> Result<Response, StubError> {
        self.intercept(request).await
    }
}
