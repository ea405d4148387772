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

use fleetlink_clients::autoscaling::{AutoscalingOperations, LifecycleActionResult};
use fleetlink_clients::jenkins::JenkinsOperations;
use fleetlink_clients::jenkins::types::RunningBuild;
use fleetlink_error::{Code, Error, ResultExt, make_err};
use tracing::{Level, event};

use crate::events::ScaleDownEvent;
use crate::node_lookup::find_node_by_instance_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationDecision {
    /// The node was idle and the lifecycle action was completed.
    Released { node_name: String },
    /// Builds are still running; the hook timeout will end the instance.
    Deferred {
        node_name: String,
        running_builds: Vec<RunningBuild>,
    },
}

pub fn builds_on_node(builds: &[RunningBuild], node_name: &str) -> Vec<RunningBuild> {
    builds
        .iter()
        .filter(|b| b.node == node_name)
        .cloned()
        .collect()
}

pub fn offline_message(instance_id: &str) -> String {
    format!("Instance {instance_id} is being terminated by its Auto Scaling group")
}

/// Takes the instance's node out of rotation and releases the instance
/// right away when nothing runs on it.
pub async fn guard_termination(
    jenkins: &dyn JenkinsOperations,
    autoscaling: &dyn AutoscalingOperations,
    scale_down: &ScaleDownEvent,
    master_node_name: &str,
) -> Result<TerminationDecision, Error> {
    let instance_id = scale_down.instance_id.as_str();
    let node_name = find_node_by_instance_id(jenkins, instance_id, master_node_name)
        .await?
        .ok_or_else(|| {
            make_err!(
                Code::NotFound,
                "No Jenkins node is labeled with instance id {instance_id}"
            )
        })?;

    jenkins
        .disable_node(&node_name, &offline_message(instance_id))
        .await
        .err_tip(|| format!("Could not disable node {node_name}"))?;
    event!(Level::INFO, %node_name, instance_id, "Node disabled");

    let running_builds = builds_on_node(&jenkins.get_running_builds().await?, &node_name);
    if !running_builds.is_empty() {
        event!(
            Level::INFO,
            %node_name,
            running_builds = running_builds.len(),
            "Node is busy, leaving termination to the lifecycle hook timeout"
        );
        return Ok(TerminationDecision::Deferred {
            node_name,
            running_builds,
        });
    }

    autoscaling
        .complete_lifecycle_action(&scale_down.completion(), LifecycleActionResult::Continue)
        .await
        .err_tip(|| format!("While releasing instance {instance_id}"))?;
    Ok(TerminationDecision::Released { node_name })
}
