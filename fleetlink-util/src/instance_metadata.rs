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

use fleetlink_error::{Code, Error, ResultExt, make_err};
use http::{HeaderMap, Method};
use tracing::{Level, event};

use crate::http_client::{HttpTransport, build_request};

/// Reads the instance id of the machine we run on from the metadata
/// endpoint. One plain GET, no retries.
pub async fn fetch_instance_id(
    transport: &dyn HttpTransport,
    instance_id_url: &str,
) -> Result<String, Error> {
    let request = build_request(Method::GET, instance_id_url, HeaderMap::new(), None)?;
    let response = transport
        .send(request)
        .await
        .err_tip(|| "While querying instance metadata")?;
    if !response.status.is_success() {
        return Err(make_err!(
            response.status.into(),
            "Instance metadata endpoint {instance_id_url} answered {}: {}",
            response.status,
            response.body_text()
        ));
    }
    let instance_id = response.body_text().trim().to_string();
    if instance_id.is_empty() {
        return Err(make_err!(
            Code::NotFound,
            "Instance metadata endpoint {instance_id_url} returned an empty instance id"
        ));
    }
    event!(Level::INFO, %instance_id, "Resolved own instance id");
    Ok(instance_id)
}
