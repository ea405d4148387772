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

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use fleetlink_error::{Code, Error, ResultExt, make_err};
use fleetlink_util::http_client::{HttpResponse, HttpTransport, HyperTransport, build_request};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{Level, event};

use crate::jenkins::operations::JenkinsOperations;
use crate::jenkins::types::{
    ComputerExecutors, ComputerSet, CreateNodeRequest, CrumbResponse, NODE_TYPE, NodeInfo,
    NodeSummary, RunningBuild, WhoAmI,
};

/// Characters left as-is in path segments and query values.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const RUNNING_BUILDS_TREE: &str = "computer[displayName,executors[currentExecutable[number,url]],oneOffExecutors[currentExecutable[number,url]]]";

/// Error bodies are HTML pages; only the start is worth keeping.
const MAX_ERROR_BODY_CHARS: usize = 512;

fn encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

fn node_path(name: &str) -> String {
    format!("/computer/{}", encode(name))
}

type CrumbHeader = Option<(HeaderName, HeaderValue)>;

/// Client for the Jenkins remote API using basic auth with a user and an
/// API token.
pub struct JenkinsClient<T: HttpTransport = HyperTransport> {
    transport: T,
    base_url: String,
    authorization: HeaderValue,
    crumb: OnceCell<CrumbHeader>,
}

impl<T: HttpTransport> Debug for JenkinsClient<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JenkinsClient")
            .field("transport", &self.transport)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl JenkinsClient<HyperTransport> {
    pub fn new(base_url: &str, user: &str, api_token: &str) -> Result<Self, Error> {
        Self::new_with_transport(HyperTransport::new()?, base_url, user, api_token)
    }
}

impl<T: HttpTransport> JenkinsClient<T> {
    pub fn new_with_transport(
        transport: T,
        base_url: &str,
        user: &str,
        api_token: &str,
    ) -> Result<Self, Error> {
        let credentials = BASE64_STANDARD.encode(format!("{user}:{api_token}"));
        let mut authorization = HeaderValue::from_str(&format!("Basic {credentials}"))
            .err_tip(|| "Jenkins credentials contain invalid characters")?;
        authorization.set_sensitive(true);
        Ok(Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
            crumb: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        mut headers: HeaderMap,
    ) -> Result<HttpResponse, Error> {
        headers.insert(AUTHORIZATION, self.authorization.clone());
        let url = format!("{}{path}", self.base_url);
        let request = build_request(method, &url, headers, None)?;
        self.transport.send(request).await
    }

    async fn get(&self, path: &str) -> Result<HttpResponse, Error> {
        self.send(Method::GET, path, HeaderMap::new()).await
    }

    async fn post(&self, path: &str) -> Result<HttpResponse, Error> {
        let mut headers = HeaderMap::new();
        if let Some((name, value)) = self.crumb().await? {
            headers.insert(name.clone(), value.clone());
        }
        self.send(Method::POST, path, headers).await
    }

    /// Fetched once per client. A missing crumb issuer means CSRF
    /// protection is disabled.
    async fn crumb(&self) -> Result<&CrumbHeader, Error> {
        self.crumb
            .get_or_try_init(|| async {
                let response = self.get("/crumbIssuer/api/json").await?;
                if response.status == StatusCode::NOT_FOUND {
                    event!(Level::DEBUG, "Jenkins has no crumb issuer");
                    return Ok(None);
                }
                let crumb: CrumbResponse = parse_json(check_status(response, "crumb request")?)?;
                let name = HeaderName::from_bytes(crumb.crumb_request_field.as_bytes())
                    .map_err(|e| make_err!(Code::Internal, "Invalid crumb header name: {e}"))?;
                let value = HeaderValue::from_str(&crumb.crumb)?;
                Ok::<_, Error>(Some((name, value)))
            })
            .await
    }

    async fn node_info(&self, name: &str) -> Result<Option<NodeInfo>, Error> {
        let response = self
            .get(&format!("{}/api/json?depth=0", node_path(name)))
            .await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let context = format!("node info for {name}");
        parse_json(check_status(response, &context)?).map(Some)
    }

    async fn set_offline(&self, name: &str, offline: bool, message: &str) -> Result<(), Error> {
        let info = self
            .node_info(name)
            .await?
            .err_tip_with_code(|_| (Code::NotFound, format!("Node {name} does not exist")))?;
        if info.temporarily_offline == offline {
            event!(Level::DEBUG, node_name = name, offline, "Node already in requested state");
            return Ok(());
        }
        let response = self
            .post(&format!(
                "{}/toggleOffline?offlineMessage={}",
                node_path(name),
                encode(message)
            ))
            .await?;
        check_post_status(response, &format!("toggle offline of {name}"))?;
        Ok(())
    }
}

fn check_status(response: HttpResponse, context: &str) -> Result<HttpResponse, Error> {
    if response.status.is_success() {
        return Ok(response);
    }
    let body: String = response.body_text().chars().take(MAX_ERROR_BODY_CHARS).collect();
    Err(make_err!(
        response.status.into(),
        "Jenkins {context} failed with {}: {body}",
        response.status
    ))
}

/// Form POSTs answer with a redirect back to the page on success. The
/// transport does not follow it, so a 3xx counts as accepted.
fn check_post_status(response: HttpResponse, context: &str) -> Result<HttpResponse, Error> {
    if response.status.is_redirection() {
        return Ok(response);
    }
    check_status(response, context)
}

fn parse_json<D: DeserializeOwned>(response: HttpResponse) -> Result<D, Error> {
    serde_json::from_slice(&response.body)
        .map_err(|e| make_err!(Code::Internal, "Unexpected Jenkins response: {e}"))
}

#[async_trait]
impl<T: HttpTransport> JenkinsOperations for JenkinsClient<T> {
    async fn whoami(&self) -> Result<String, Error> {
        let response = self.get("/me/api/json").await?;
        let whoami: WhoAmI = parse_json(check_status(response, "authentication")?)?;
        Ok(whoami.id)
    }

    async fn node_exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.node_info(name).await?.is_some())
    }

    async fn create_node(&self, request: &CreateNodeRequest) -> Result<(), Error> {
        if self.node_exists(&request.name).await? {
            return Err(make_err!(
                Code::AlreadyExists,
                "Node {} already exists",
                request.name
            ));
        }
        let path = format!(
            "/computer/doCreateItem?name={}&type={}&json={}",
            encode(&request.name),
            encode(NODE_TYPE),
            encode(&request.form_json().to_string())
        );
        let response = self.post(&path).await?;
        check_post_status(response, &format!("create of {}", request.name))?;
        if !self.node_exists(&request.name).await? {
            return Err(make_err!(
                Code::Internal,
                "Create of node {} was accepted but the node does not exist",
                request.name
            ));
        }
        event!(Level::INFO, node_name = %request.name, "Created Jenkins node");
        Ok(())
    }

    async fn enable_node(&self, name: &str) -> Result<(), Error> {
        self.set_offline(name, false, "").await
    }

    async fn disable_node(&self, name: &str, message: &str) -> Result<(), Error> {
        self.set_offline(name, true, message).await
    }

    async fn delete_node(&self, name: &str) -> Result<(), Error> {
        let response = self.post(&format!("{}/doDelete", node_path(name))).await?;
        check_post_status(response, &format!("delete of {name}"))?;
        if self.node_exists(name).await? {
            return Err(make_err!(
                Code::Internal,
                "Delete of node {name} was accepted but the node still exists"
            ));
        }
        Ok(())
    }

    async fn get_nodes(&self) -> Result<Vec<NodeSummary>, Error> {
        let response = self.get("/computer/api/json").await?;
        let computers: ComputerSet<NodeSummary> = parse_json(check_status(response, "node list")?)?;
        Ok(computers.computer)
    }

    async fn get_node_config(&self, name: &str) -> Result<String, Error> {
        let response = self.get(&format!("{}/config.xml", node_path(name))).await?;
        Ok(check_status(response, &format!("config of {name}"))?.body_text())
    }

    async fn get_running_builds(&self) -> Result<Vec<RunningBuild>, Error> {
        let response = self
            .get(&format!("/computer/api/json?tree={}", encode(RUNNING_BUILDS_TREE)))
            .await?;
        let computers: ComputerSet<ComputerExecutors> =
            parse_json(check_status(response, "running builds")?)?;
        Ok(computers
            .computer
            .into_iter()
            .flat_map(ComputerExecutors::into_running_builds)
            .collect())
    }
}
