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

use fleetlink_clients::jenkins::JenkinsOperations;
use fleetlink_error::{Code, Error, ResultExt, make_err};
use tracing::{Level, event};

use crate::node_lookup::find_node_by_instance_id;

/// Deletes the node of a terminated instance and returns its name.
pub async fn cleanup_agent(
    jenkins: &dyn JenkinsOperations,
    instance_id: &str,
    master_node_name: &str,
) -> Result<String, Error> {
    let node_name = find_node_by_instance_id(jenkins, instance_id, master_node_name)
        .await?
        .ok_or_else(|| {
            make_err!(
                Code::NotFound,
                "Can't find node with instance id {instance_id}"
            )
        })?;
    jenkins
        .delete_node(&node_name)
        .await
        .err_tip(|| format!("Could not delete node {node_name}"))?;
    event!(Level::INFO, %node_name, instance_id, "Deleted node of terminated instance");
    Ok(node_name)
}
