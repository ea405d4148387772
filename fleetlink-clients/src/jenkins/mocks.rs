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

use async_trait::async_trait;
use fleetlink_error::{Code, Error, make_err};
use parking_lot::Mutex;
use quick_xml::escape::escape;

use crate::jenkins::operations::JenkinsOperations;
use crate::jenkins::types::{CreateNodeRequest, NodeSummary, RunningBuild};

/// A call received by [`MockJenkinsOperations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JenkinsCall {
    Whoami,
    NodeExists { name: String },
    CreateNode(CreateNodeRequest),
    EnableNode { name: String },
    DisableNode { name: String, message: String },
    DeleteNode { name: String },
    GetNodes,
    GetNodeConfig { name: String },
    GetRunningBuilds,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    None,
    /// Every call fails as if the credentials were rejected.
    Unauthorized,
    /// Every call fails as if the master were unreachable.
    Unavailable,
    /// `create_node` is rejected by the master.
    RejectCreate,
    /// `create_node` succeeds but the node never shows up.
    DropCreatedNodes,
}

#[derive(Debug, Clone)]
struct MockNode {
    name: String,
    description: String,
    labels: Vec<String>,
    offline: bool,
}

/// In-memory registry standing in for a Jenkins master. Nodes keep their
/// insertion order.
#[derive(Debug)]
pub struct MockJenkinsOperations {
    user: String,
    nodes: Mutex<Vec<MockNode>>,
    running_builds: Mutex<Vec<RunningBuild>>,
    failure_mode: Mutex<FailureMode>,
    calls: Mutex<Vec<JenkinsCall>>,
}

impl Default for MockJenkinsOperations {
    fn default() -> Self {
        Self::new()
    }
}

impl MockJenkinsOperations {
    pub fn new() -> Self {
        Self {
            user: "asg-bot".to_string(),
            nodes: Mutex::new(Vec::new()),
            running_builds: Mutex::new(Vec::new()),
            failure_mode: Mutex::new(FailureMode::None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Registers an online node with the given labels.
    pub fn add_node(&self, name: &str, labels: &[&str]) {
        self.nodes.lock().push(MockNode {
            name: name.to_string(),
            description: String::new(),
            labels: labels.iter().map(ToString::to_string).collect(),
            offline: false,
        });
    }

    /// Puts a build on the first free executor of `node`.
    pub fn add_running_build(&self, node: &str, number: u64) {
        let mut builds = self.running_builds.lock();
        let executor = builds.iter().filter(|b| b.node == node).count();
        builds.push(RunningBuild {
            node: node.to_string(),
            number,
            url: format!("http://jenkins.example.com/job/build/{number}/"),
            executor,
        });
    }

    pub fn set_failure_mode(&self, mode: FailureMode) {
        *self.failure_mode.lock() = mode;
    }

    pub fn calls(&self) -> Vec<JenkinsCall> {
        self.calls.lock().clone()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.lock().iter().any(|n| n.name == name)
    }

    pub fn node_labels(&self, name: &str) -> Option<Vec<String>> {
        self.with_node(name, |n| n.labels.clone())
    }

    pub fn node_description(&self, name: &str) -> Option<String> {
        self.with_node(name, |n| n.description.clone())
    }

    pub fn is_offline(&self, name: &str) -> Option<bool> {
        self.with_node(name, |n| n.offline)
    }

    fn with_node<R>(&self, name: &str, f: impl FnOnce(&MockNode) -> R) -> Option<R> {
        self.nodes.lock().iter().find(|n| n.name == name).map(f)
    }

    fn record(&self, call: JenkinsCall) -> Result<(), Error> {
        self.calls.lock().push(call);
        match *self.failure_mode.lock() {
            FailureMode::Unauthorized => Err(make_err!(
                Code::Unauthenticated,
                "Simulated authentication failure"
            )),
            FailureMode::Unavailable => Err(make_err!(Code::Unavailable, "Simulated network error")),
            FailureMode::None | FailureMode::RejectCreate | FailureMode::DropCreatedNodes => Ok(()),
        }
    }

    fn set_offline(&self, name: &str, offline: bool) -> Result<(), Error> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| make_err!(Code::NotFound, "Node {name} does not exist"))?;
        node.offline = offline;
        Ok(())
    }
}

#[async_trait]
impl JenkinsOperations for MockJenkinsOperations {
    async fn whoami(&self) -> Result<String, Error> {
        self.record(JenkinsCall::Whoami)?;
        Ok(self.user.clone())
    }

    async fn node_exists(&self, name: &str) -> Result<bool, Error> {
        self.record(JenkinsCall::NodeExists {
            name: name.to_string(),
        })?;
        Ok(self.has_node(name))
    }

    async fn create_node(&self, request: &CreateNodeRequest) -> Result<(), Error> {
        self.record(JenkinsCall::CreateNode(request.clone()))?;
        if self.has_node(&request.name) {
            return Err(make_err!(
                Code::AlreadyExists,
                "Node {} already exists",
                request.name
            ));
        }
        match *self.failure_mode.lock() {
            FailureMode::RejectCreate => {
                return Err(make_err!(Code::InvalidArgument, "Simulated create rejection"));
            }
            FailureMode::DropCreatedNodes => return Ok(()),
            _ => {}
        }
        self.nodes.lock().push(MockNode {
            name: request.name.clone(),
            description: request.description.clone(),
            labels: request.labels.clone(),
            offline: false,
        });
        Ok(())
    }

    async fn enable_node(&self, name: &str) -> Result<(), Error> {
        self.record(JenkinsCall::EnableNode {
            name: name.to_string(),
        })?;
        self.set_offline(name, false)
    }

    async fn disable_node(&self, name: &str, message: &str) -> Result<(), Error> {
        self.record(JenkinsCall::DisableNode {
            name: name.to_string(),
            message: message.to_string(),
        })?;
        self.set_offline(name, true)
    }

    async fn delete_node(&self, name: &str) -> Result<(), Error> {
        self.record(JenkinsCall::DeleteNode {
            name: name.to_string(),
        })?;
        let mut nodes = self.nodes.lock();
        let index = nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| make_err!(Code::NotFound, "Node {name} does not exist"))?;
        nodes.remove(index);
        Ok(())
    }

    async fn get_nodes(&self) -> Result<Vec<NodeSummary>, Error> {
        self.record(JenkinsCall::GetNodes)?;
        Ok(self
            .nodes
            .lock()
            .iter()
            .map(|n| NodeSummary {
                name: n.name.clone(),
                offline: n.offline,
            })
            .collect())
    }

    async fn get_node_config(&self, name: &str) -> Result<String, Error> {
        self.record(JenkinsCall::GetNodeConfig {
            name: name.to_string(),
        })?;
        self.with_node(name, |n| {
            format!(
                "<?xml version='1.1' encoding='UTF-8'?>\n<slave>\n  <name>{}</name>\n  <description>{}</description>\n  <remoteFS>/var/lib/jenkins</remoteFS>\n  <numExecutors>1</numExecutors>\n  <mode>NORMAL</mode>\n  <label>{}</label>\n  <nodeProperties/>\n</slave>",
                escape(n.name.as_str()),
                escape(n.description.as_str()),
                escape(n.labels.join(" ").as_str()),
            )
        })
        .ok_or_else(|| make_err!(Code::NotFound, "Node {name} does not exist"))
    }

    async fn get_running_builds(&self) -> Result<Vec<RunningBuild>, Error> {
        self.record(JenkinsCall::GetRunningBuilds)?;
        Ok(self.running_builds.lock().clone())
    }
}
