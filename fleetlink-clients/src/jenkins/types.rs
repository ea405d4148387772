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

use fleetlink_error::{Error, make_input_err};
use serde::Deserialize;
use serde_json::{Value, json};

/// Descriptor used when creating a permanent agent.
pub const NODE_TYPE: &str = "hudson.slaves.DumbSlave$DescriptorImpl";

/// Launcher class of the SSH Build Agents plugin.
pub const LAUNCHER_SSH: &str = "hudson.plugins.sshslaves.SSHLauncher";

const RETENTION_STRATEGY_ALWAYS: &str = "hudson.slaves.RetentionStrategy$Always";

/// Where and how the master connects to a new agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshLauncher {
    pub host: String,
    pub port: u16,
    pub credentials_id: String,
}

/// Everything needed to register a permanent agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNodeRequest {
    pub name: String,
    pub description: String,
    pub num_executors: u32,
    pub remote_fs: String,
    pub labels: Vec<String>,
    pub launcher: SshLauncher,
}

impl CreateNodeRequest {
    /// Labels as Jenkins stores them, separated by single spaces.
    pub fn label_string(&self) -> String {
        self.labels.join(" ")
    }

    /// The `json` form parameter of `/computer/doCreateItem`.
    pub fn form_json(&self) -> Value {
        json!({
            "name": self.name,
            "nodeDescription": self.description,
            "numExecutors": self.num_executors,
            "remoteFS": self.remote_fs,
            "labelString": self.label_string(),
            "mode": "NORMAL",
            "type": NODE_TYPE,
            "retentionStrategy": {
                "stapler-class": RETENTION_STRATEGY_ALWAYS,
            },
            "nodeProperties": {
                "stapler-class-bag": "true",
            },
            "launcher": {
                "stapler-class": LAUNCHER_SSH,
                "host": self.launcher.host,
                "port": self.launcher.port,
                "credentialsId": self.launcher.credentials_id,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeSummary {
    #[serde(rename = "displayName")]
    pub name: String,
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComputerSet<T> {
    #[serde(default = "Vec::new")]
    pub computer: Vec<T>,
}

/// `offline` is also true while an agent is merely disconnected, so the
/// enabled state is read from `temporarilyOffline` only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NodeInfo {
    #[serde(default)]
    pub temporarily_offline: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WhoAmI {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CrumbResponse {
    pub crumb: String,
    #[serde(rename = "crumbRequestField")]
    pub crumb_request_field: String,
}

/// A build currently occupying an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningBuild {
    pub node: String,
    pub number: u64,
    pub url: String,
    pub executor: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComputerExecutors {
    #[serde(rename = "displayName")]
    pub name: String,
    #[serde(default)]
    pub executors: Vec<Executor>,
    #[serde(default, rename = "oneOffExecutors")]
    pub one_off_executors: Vec<Executor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Executor {
    #[serde(default, rename = "currentExecutable")]
    pub current_executable: Option<Executable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Executable {
    pub number: u64,
    #[serde(default)]
    pub url: String,
}

impl ComputerExecutors {
    pub(crate) fn into_running_builds(self) -> impl Iterator<Item = RunningBuild> {
        let node = self.name;
        self.executors
            .into_iter()
            .enumerate()
            .chain(self.one_off_executors.into_iter().enumerate())
            .filter_map(move |(executor, slot)| {
                slot.current_executable.map(|build| RunningBuild {
                    node: node.clone(),
                    number: build.number,
                    url: build.url,
                    executor,
                })
            })
    }
}

/// The parts of a node's `config.xml` the label scan cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub name: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SlaveXml {
    name: String,
    #[serde(default)]
    label: Option<String>,
}

impl NodeConfig {
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let slave: SlaveXml = quick_xml::de::from_str(xml)
            .map_err(|e| make_input_err!("Could not parse node config.xml: {e}"))?;
        let labels = slave
            .label
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Ok(Self {
            name: slave.name,
            labels,
        })
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}
