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

pub mod agent;
pub mod serde_utils;
pub mod services;

use serde::Deserialize;

use crate::agent::{AgentSpec, InstanceMetadataSpec};
use crate::services::{AutoscalingSpec, JenkinsSpec, ZabbixSpec};

/// Root of the optional JSON5 configuration file. Every section may be
/// omitted, in which case the built-in defaults apply. Values given on the
/// command line or through the environment take precedence.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    pub jenkins: JenkinsSpec,
    pub agent: AgentSpec,
    pub instance_metadata: InstanceMetadataSpec,
    pub autoscaling: AutoscalingSpec,
    pub zabbix: ZabbixSpec,
}
