//! A small API client of the kind the stub is meant to test.

use http::StatusCode;
use http_stub::{HttpClient, StubError, Transport};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;

pub const BASE_ADDRESS: &str = "http://localhost/";
pub const STRING_URI: &str = "stringUri";
pub const SAMPLE_DTO_URI: &str = "sampleDto";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleDto {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Error, Debug, Clone)]
pub enum SampleError {
    #[error("{0}")]
    Status(StatusCode),
    #[error(transparent)]
    Transport(#[from] StubError),
    #[error("cannot decode response: {0}")]
    Decode(String),
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Client wrapper with blocking-style and callback-style calls.
pub struct SampleClient<T> {
    http: Arc<HttpClient<T>>,
    last_error: Arc<Mutex<Option<SampleError>>>,
}

impl<T: Transport + 'static> SampleClient<T> {
    pub fn new(transport: T) -> Self {
        let http = HttpClient::new(transport)
            .with_base_address(BASE_ADDRESS)
            .expect("static base address");
        Self {
            http: Arc::new(http),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The last error recorded by a callback-style call.
    pub fn last_error(&self) -> Option<SampleError> {
        self.last_error.lock().unwrap().clone()
    }

    pub async fn get_string(&self) -> Result<String, SampleError> {
        fetch_json(&self.http, STRING_URI).await
    }

    pub fn get_string_async<F>(&self, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.spawn_get(STRING_URI, on_complete)
    }

    pub fn get_sample_dto_async<F>(&self, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(SampleDto) + Send + 'static,
    {
        self.spawn_get(SAMPLE_DTO_URI, on_complete)
    }

    pub fn post_sample_dto_async<F>(&self, dto: SampleDto, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let http = self.http.clone();
        let last_error = self.last_error.clone();
        tokio::spawn(async move {
            let result = match http.post_json(SAMPLE_DTO_URI, &dto).await {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => Err(SampleError::Status(response.status())),
                Err(err) => Err(err.into()),
            };
            match result {
                Ok(()) => on_complete(),
                Err(err) => *last_error.lock().unwrap() = Some(err),
            }
        })
    }

    fn spawn_get<R, F>(&self, uri: &'static str, on_complete: F) -> JoinHandle<()>
    where
        R: for<'de> Deserialize<'de> + Send + 'static,
        F: FnOnce(R) + Send + 'static,
    {
        let http = self.http.clone();
        let last_error = self.last_error.clone();
        tokio::spawn(async move {
            match fetch_json(&http, uri).await {
                Ok(value) => on_complete(value),
                Err(err) => *last_error.lock().unwrap() = Some(err),
            }
        })
    }
}

async fn fetch_json<T, R>(http: &HttpClient<T>, uri: &str) -> Result<R, SampleError>
where
    T: Transport,
    R: for<'de> Deserialize<'de>,
{
    let response = http.get(uri).await?;
    if !response.status().is_success() {
        return Err(SampleError::Status(response.status()));
    }
    serde_json::from_slice(response.body()).map_err(|e| SampleError::Decode(e.to_string()))
}
