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
use bytes::Bytes;
use fleetlink_config::services::ZabbixLoginField;
use fleetlink_error::{Code, Error, make_err};
use fleetlink_util::http_client::{HttpTransport, HyperTransport, build_request};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{Level, event};

use crate::zabbix::operations::ZabbixOperations;
use crate::zabbix::types::{HostStatus, HostUpdateResult, ZabbixHost};

const JSON_RPC_CONTENT_TYPE: &str = "application/json-rpc";
const REDACTED: &str = "********";

/// JSON-RPC 2.0 client for the Zabbix API.
pub struct ZabbixClient<T: HttpTransport = HyperTransport> {
    transport: T,
    api_url: String,
    login_field: ZabbixLoginField,
    auth: Mutex<Option<String>>,
}

impl<T: HttpTransport> Debug for ZabbixClient<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ZabbixClient")
            .field("transport", &self.transport)
            .field("api_url", &self.api_url)
            .field("authenticated", &self.auth.lock().is_some())
            .finish()
    }
}

impl ZabbixClient<HyperTransport> {
    pub fn new(api_url: &str) -> Result<Self, Error> {
        Ok(Self::new_with_transport(HyperTransport::new()?, api_url))
    }
}

impl<T: HttpTransport> ZabbixClient<T> {
    pub fn new_with_transport(transport: T, api_url: &str) -> Self {
        Self {
            transport,
            api_url: api_url.to_string(),
            login_field: ZabbixLoginField::default(),
            auth: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn with_login_field(mut self, login_field: ZabbixLoginField) -> Self {
        self.login_field = login_field;
        self
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends one JSON-RPC request and returns its `result` member.
    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, Error> {
        let mut payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 0,
        });
        if let Some(auth) = self.auth.lock().as_ref() {
            payload["auth"] = Value::String(auth.clone());
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_RPC_CONTENT_TYPE));
        let request = build_request(
            Method::POST,
            &self.api_url,
            headers,
            Some(Bytes::from(payload.to_string())),
        )?;
        event!(Level::DEBUG, method, "Calling Zabbix API");
        let response = self.transport.send(request).await?;
        if !response.status.is_success() {
            return Err(make_err!(
                Code::Unavailable,
                "Zabbix API at {} answered {} to {method}",
                self.api_url,
                response.status
            ));
        }

        let mut body: Value = serde_json::from_slice(&response.body).map_err(|e| {
            make_err!(
                Code::Internal,
                "Zabbix API returned a non-JSON response to {method}: {e}"
            )
        })?;
        if let Some(error) = body.get("error") {
            return Err(make_err!(
                Code::Internal,
                "API request failed! Payload: {}. API error message: {}. API error data: {}",
                redact(payload),
                error.get("message").unwrap_or(&Value::Null),
                error.get("data").unwrap_or(&Value::Null)
            ));
        }
        let result = body.get_mut("result").map(Value::take).ok_or_else(|| {
            make_err!(
                Code::Internal,
                "Zabbix API response to {method} has neither result nor error"
            )
        })?;
        serde_json::from_value(result).map_err(|e| {
            make_err!(
                Code::Internal,
                "Unexpected Zabbix API result for {method}: {e}"
            )
        })
    }
}

/// Blanks out credentials before a payload ends up in an error message.
fn redact(mut payload: Value) -> Value {
    for pointer in ["/params/password", "/auth"] {
        if let Some(secret) = payload.pointer_mut(pointer) {
            *secret = Value::String(REDACTED.to_string());
        }
    }
    payload
}

fn login_params(login_field: ZabbixLoginField, user: &str, password: &str) -> Value {
    let mut params = json!({ "password": password });
    params[login_field.as_str()] = Value::String(user.to_string());
    params
}

#[async_trait]
impl<T: HttpTransport> ZabbixOperations for ZabbixClient<T> {
    async fn login(&self, user: &str, password: &str) -> Result<(), Error> {
        let token: String = self
            .call("user.login", login_params(self.login_field, user, password))
            .await?;
        *self.auth.lock() = Some(token);
        event!(Level::INFO, user, "Logged in to Zabbix");
        Ok(())
    }

    async fn find_hosts_by_asset_tag(&self, asset_tag: &str) -> Result<Vec<ZabbixHost>, Error> {
        self.call(
            "host.get",
            json!({
                "output": "hostid",
                "searchInventory": { "asset_tag": asset_tag },
            }),
        )
        .await
    }

    async fn set_host_status(
        &self,
        host_id: &str,
        status: HostStatus,
    ) -> Result<Vec<String>, Error> {
        let result: HostUpdateResult = self
            .call(
                "host.update",
                json!({ "hostid": host_id, "status": status.as_param() }),
            )
            .await?;
        Ok(result.hostids)
    }
}
