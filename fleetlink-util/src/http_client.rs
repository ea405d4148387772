// Copyright 2025 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::fmt::Debug;
use core::time::Duration;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use fleetlink_error::{Code, Error, ResultExt, make_err};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use parking_lot::Mutex;
use rustls::{ClientConfig, RootCertStore};
use tracing::{Level, event};

/// Upper bound for establishing a TCP connection. Requests are not bounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Status and fully collected body of an HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a single request and waits for the complete response. Every call
/// is attempted exactly once; callers decide what a status means.
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<HttpResponse, Error>;
}

pub fn build_request(
    method: Method,
    uri: &str,
    headers: HeaderMap,
    body: Option<Bytes>,
) -> Result<Request<Full<Bytes>>, Error> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(request_headers) = builder.headers_mut() {
        request_headers.extend(headers);
    }
    builder
        .body(Full::new(body.unwrap_or_default()))
        .err_tip(|| format!("While building request for {uri}"))
}

/// Transport backed by a hyper client. Both `http` and `https` URLs are
/// accepted; certificates are verified against the webpki root set.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Debug for HyperTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn new() -> Result<Self, Error> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| make_err!(Code::Internal, "Invalid TLS protocol versions: {e}"))?
                .with_root_certificates(root_store)
                .with_no_client_auth();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(Some(CONNECT_TIMEOUT));

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
        })
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<HttpResponse, Error> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        event!(Level::DEBUG, %method, %uri, "Sending HTTP request");

        let response = self.client.request(request).await.map_err(|e| {
            make_err!(
                Code::Unavailable,
                "There was a problem with network connection to {uri}: {e:?}"
            )
        })?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| make_err!(Code::Unavailable, "Failed to read body from {uri}: {e}"))?
            .to_bytes();

        event!(Level::DEBUG, %method, %uri, %status, "Received HTTP response");
        Ok(HttpResponse { status, body })
    }
}

/// A request seen by [`ReplayTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Serves canned responses in order and records every request it receives.
/// Running out of responses is reported as an `Unavailable` error.
#[derive(Debug, Default)]
pub struct ReplayTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_response(self, status: StatusCode, body: impl Into<Bytes>) -> Self {
        self.push_response(status, body);
        self
    }

    pub fn push_response(&self, status: StatusCode, body: impl Into<Bytes>) {
        self.responses.lock().push_back(HttpResponse {
            status,
            body: body.into(),
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl HttpTransport for ReplayTransport {
    async fn send(&self, request: Request<Full<Bytes>>) -> Result<HttpResponse, Error> {
        let (parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| make_err!(Code::Internal, "Could not read request body: {e:?}"))?
            .to_bytes();
        let uri = parts.uri.to_string();
        self.requests.lock().push(RecordedRequest {
            method: parts.method,
            uri: uri.clone(),
            headers: parts.headers,
            body,
        });
        self.responses
            .lock()
            .pop_front()
            .err_tip_with_code(|_| (Code::Unavailable, format!("No response queued for {uri}")))
    }
}
