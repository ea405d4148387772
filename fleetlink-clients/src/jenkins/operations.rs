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
use fleetlink_error::Error;

use crate::jenkins::types::{CreateNodeRequest, NodeSummary, RunningBuild};

/// Node management calls of the Jenkins remote API.
#[async_trait]
pub trait JenkinsOperations: Send + Sync + Debug {
    /// Returns the id of the user the client is authenticated as.
    async fn whoami(&self) -> Result<String, Error>;

    async fn node_exists(&self, name: &str) -> Result<bool, Error>;

    /// Creates a permanent agent. Fails with `AlreadyExists` if a node of
    /// that name is already registered.
    async fn create_node(&self, request: &CreateNodeRequest) -> Result<(), Error>;

    /// Brings the node online. No-op if it already is.
    async fn enable_node(&self, name: &str) -> Result<(), Error>;

    /// Takes the node offline so it stops accepting new builds. Running
    /// builds are not interrupted. No-op if it already is offline.
    async fn disable_node(&self, name: &str, message: &str) -> Result<(), Error>;

    async fn delete_node(&self, name: &str) -> Result<(), Error>;

    async fn get_nodes(&self) -> Result<Vec<NodeSummary>, Error>;

    /// Raw `config.xml` of the node.
    async fn get_node_config(&self, name: &str) -> Result<String, Error>;

    /// Builds currently occupying an executor on any node.
    async fn get_running_builds(&self) -> Result<Vec<RunningBuild>, Error>;
}
