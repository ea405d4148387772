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
use fleetlink_clients::jenkins::types::NodeConfig;
use fleetlink_error::{Error, ResultExt};
use tracing::{Level, event};

/// Scans every node except `master_node_name` and returns the name of the
/// first one carrying `instance_id` as a label.
pub async fn find_node_by_instance_id(
    jenkins: &dyn JenkinsOperations,
    instance_id: &str,
    master_node_name: &str,
) -> Result<Option<String>, Error> {
    let nodes = jenkins
        .get_nodes()
        .await
        .err_tip(|| "While listing Jenkins nodes")?;
    for node in nodes.iter().filter(|n| n.name != master_node_name) {
        let xml = jenkins
            .get_node_config(&node.name)
            .await
            .err_tip(|| format!("While reading config of node {}", node.name))?;
        let config = NodeConfig::parse(&xml)
            .err_tip(|| format!("While parsing config of node {}", node.name))?;
        if config.has_label(instance_id) {
            event!(Level::INFO, node_name = %config.name, instance_id, "Found node for instance");
            return Ok(Some(config.name));
        }
    }
    event!(Level::WARN, instance_id, "No node carries the instance label");
    Ok(None)
}
