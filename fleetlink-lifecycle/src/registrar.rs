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

use core::net::{IpAddr, SocketAddr};
use core::time::Duration;
use std::path::{Path, PathBuf};

use fleetlink_clients::jenkins::JenkinsOperations;
use fleetlink_clients::jenkins::types::{CreateNodeRequest, SshLauncher};
use fleetlink_config::agent::{AgentSpec, InstanceMetadataSpec};
use fleetlink_error::{Code, Error, ResultExt, make_err};
use fleetlink_util::http_client::HttpTransport;
use fleetlink_util::instance_metadata::fetch_instance_id;
use fleetlink_util::net::{local_host_name, local_ip_towards, strip_domain_labels};
use fleetlink_util::status_marker::StatusMarker;
use tracing::{Level, event};

/// Marker content when the node was registered by someone else.
pub const MANUAL_REGISTRATION_NOTE: &str = "Node was added manually.";

/// Who this machine is, as far as Jenkins is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub node_name: String,
    pub instance_id: String,
    /// Address the master uses to reach this machine over SSH.
    pub ip_address: IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    AlreadyRegistered,
    Deleted,
    NotRegistered,
}

pub async fn discover_identity(
    transport: &dyn HttpTransport,
    metadata: &InstanceMetadataSpec,
    agent: &AgentSpec,
    jenkins_addr: SocketAddr,
) -> Result<AgentIdentity, Error> {
    let host_name = local_host_name()?;
    discover_identity_for_host(transport, metadata, agent, &host_name, jenkins_addr).await
}

/// Same as [`discover_identity`] with the fully qualified host name given.
pub async fn discover_identity_for_host(
    transport: &dyn HttpTransport,
    metadata: &InstanceMetadataSpec,
    agent: &AgentSpec,
    host_name: &str,
    jenkins_addr: SocketAddr,
) -> Result<AgentIdentity, Error> {
    let node_name = strip_domain_labels(host_name, agent.strip_domain_labels)?;
    let ip_address = local_ip_towards(jenkins_addr)
        .await
        .err_tip(|| "While looking up the outbound address")?;
    let instance_id = fetch_instance_id(transport, &metadata.instance_id_url).await?;
    event!(Level::INFO, %node_name, %instance_id, %ip_address, "Discovered agent identity");
    Ok(AgentIdentity {
        node_name,
        instance_id,
        ip_address,
    })
}

/// The marker lives in the agent's remote filesystem root.
pub fn status_marker_path(agent: &AgentSpec) -> PathBuf {
    Path::new(&agent.remote_fs).join(&agent.status_file_name)
}

pub fn create_node_request(
    identity: &AgentIdentity,
    agent: &AgentSpec,
    num_executors: u32,
) -> CreateNodeRequest {
    CreateNodeRequest {
        name: identity.node_name.clone(),
        description: agent.description.clone(),
        num_executors,
        remote_fs: agent.remote_fs.clone(),
        labels: vec![agent.role_label.clone(), identity.instance_id.clone()],
        launcher: SshLauncher {
            host: identity.ip_address.to_string(),
            port: agent.ssh_port,
            credentials_id: agent.credentials_id.clone(),
        },
    }
}

fn registration_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

/// Registers this machine unless a node of its name exists, then brings
/// the node online.
pub async fn register_agent(
    jenkins: &dyn JenkinsOperations,
    marker: &dyn StatusMarker,
    identity: &AgentIdentity,
    agent: &AgentSpec,
    num_executors: u32,
) -> Result<RegistrationOutcome, Error> {
    let node_name = identity.node_name.as_str();
    let outcome = if jenkins.node_exists(node_name).await? {
        let written = marker.set_once(MANUAL_REGISTRATION_NOTE).await?;
        event!(Level::INFO, node_name, marker_written = written, "Node was added manually");
        RegistrationOutcome::AlreadyRegistered
    } else {
        jenkins
            .create_node(&create_node_request(identity, agent, num_executors))
            .await
            .err_tip(|| format!("Could not create node {node_name}"))?;
        marker.set_once(&registration_timestamp()).await?;
        event!(Level::INFO, node_name, instance_id = %identity.instance_id, "Registered node");
        RegistrationOutcome::Created
    };
    start_node(jenkins, node_name, agent.start_delay).await?;
    Ok(outcome)
}

/// Waits `delay` for Jenkins to finish setting the node up, then enables it.
pub async fn start_node(
    jenkins: &dyn JenkinsOperations,
    node_name: &str,
    delay: Duration,
) -> Result<(), Error> {
    tokio::time::sleep(delay).await;
    if !jenkins.node_exists(node_name).await? {
        return Err(make_err!(
            Code::NotFound,
            "Node {node_name} does not exist after registration"
        ));
    }
    jenkins
        .enable_node(node_name)
        .await
        .err_tip(|| format!("Could not enable node {node_name}"))?;
    event!(Level::INFO, node_name, "Node enabled");
    Ok(())
}

/// Removes the node. A node that is not registered is not an error.
pub async fn deregister_agent(
    jenkins: &dyn JenkinsOperations,
    node_name: &str,
) -> Result<RegistrationOutcome, Error> {
    if !jenkins.node_exists(node_name).await? {
        event!(Level::INFO, node_name, "Node is not registered, nothing to delete");
        return Ok(RegistrationOutcome::NotRegistered);
    }
    match jenkins.delete_node(node_name).await {
        Ok(()) => {
            event!(Level::INFO, node_name, "Node deleted");
            Ok(RegistrationOutcome::Deleted)
        }
        Err(err) if err.code == Code::NotFound => {
            event!(Level::INFO, node_name, "Node vanished before it could be deleted");
            Ok(RegistrationOutcome::NotRegistered)
        }
        Err(err) => Err(err).err_tip(|| format!("Could not delete node {node_name}")),
    }
}
