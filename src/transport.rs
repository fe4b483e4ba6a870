//! The transport seam and a minimal client bound to it.
//!
//! Code under test talks to [`HttpClient`]; in production the client sits on
//! a real transport, in tests on an [`HttpStub`](crate::HttpStub).

use crate::error::StubError;
use crate::negotiate::JSON_MEDIA_TYPE;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{AbortRegistration, Abortable};
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{Method, Uri};
use serde::Serialize;
use tracing::debug;
use url::Url;

pub type Request = http::Request<Bytes>;
pub type Response = http::Response<Bytes>;

/// Something that turns a request into a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, StubError>;
}

/// HTTP client over any [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpClient<T> {
    transport: T,
    base_address: Option<Url>,
}

impl<T: Transport> HttpClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_address: None,
        }
    }

    /// Resolve relative request URIs against `base_address`.
    pub fn with_base_address(mut self, base_address: &str) -> Result<Self, StubError> {
        let url = Url::parse(base_address).map_err(|e| StubError::InvalidUri {
            uri: base_address.to_string(),
            reason: e.to_string(),
        })?;
        self.base_address = Some(url);
        Ok(self)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn base_address(&self) -> Option<&Url> {
        self.base_address.as_ref()
    }

    /// Turn `uri` into an absolute request URI.
    pub fn resolve(&self, uri: &str) -> Result<Uri, StubError> {
        let invalid = |reason: String| StubError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };

        let url = match &self.base_address {
            Some(base) => base.join(uri),
            None => Url::parse(uri),
        }
        .map_err(|e| invalid(e.to_string()))?;

        url.as_str()
            .parse::<Uri>()
            .map_err(|e| invalid(e.to_string()))
    }

    /// Build a request for `uri` with an empty body.
    pub fn request(&self, method: Method, uri: &str) -> Result<Request, StubError> {
        let mut request = Request::new(Bytes::new());
        *request.method_mut() = method;
        *request.uri_mut() = self.resolve(uri)?;
        Ok(request)
    }

    pub async fn get(&self, uri: &str) -> Result<Response, StubError> {
        let request = self.request(Method::GET, uri)?;
        self.send(request).await
    }

    /// GET with an explicit `Accept` header.
    pub async fn get_with_accept(&self, uri: &str, accept: &str) -> Result<Response, StubError> {
        let mut request = self.request(Method::GET, uri)?;
        let value = HeaderValue::from_str(accept).map_err(|e| StubError::InvalidHeader {
            name: "accept",
            reason: e.to_string(),
        })?;
        request.headers_mut().insert(ACCEPT, value);
        self.send(request).await
    }

    /// POST `body` serialized as JSON.
    pub async fn post_json<B>(&self, uri: &str, body: &B) -> Result<Response, StubError>
    where
        B: Serialize + ?Sized,
    {
        let encoded = serde_json::to_vec(body).map_err(|e| StubError::Serialization {
            format: "JSON",
            reason: e.to_string(),
        })?;

        let mut request = self.request(Method::POST, uri)?;
        *request.body_mut() = Bytes::from(encoded);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
        self.send(request).await
    }

    pub async fn send(&self, request: Request) -> Result<Response, StubError> {
        debug!(method = %request.method(), uri = %request.uri(), "Sending request");
        self.transport.send(request).await
    }

    /// Send `request`, giving up with [`StubError::Cancelled`] once the
    /// matching `AbortHandle` fires.
    pub async fn send_cancellable(
        &self,
        request: Request,
        registration: AbortRegistration,
    ) -> Result<Response, StubError> {
        match Abortable::new(self.send(request), registration).await {
            Ok(result) => result,
            Err(_aborted) => {
                debug!("Request cancelled");
                Err(StubError::Cancelled)
            }
        }
    }
}
