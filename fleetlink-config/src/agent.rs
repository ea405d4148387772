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

use core::time::Duration;

use serde::Deserialize;

use crate::serde_utils::{
    convert_duration_with_shellexpand, convert_numeric_with_shellexpand,
    convert_string_with_shellexpand,
};

pub const DEFAULT_AGENT_SSH_PORT: u16 = 22;
pub const DEFAULT_AGENT_CREDENTIALS_ID: &str = "jenkins";
pub const DEFAULT_AGENT_REMOTE_FS: &str = "/var/lib/jenkins";
pub const DEFAULT_AGENT_ROLE_LABEL: &str = "linux_slave";
pub const DEFAULT_STATUS_FILE_NAME: &str = "registration_date.txt";
pub const DEFAULT_AGENT_DESCRIPTION: &str = "Node dynamically created by ASG";
pub const DEFAULT_STRIP_DOMAIN_LABELS: usize = 4;
pub const DEFAULT_NUM_EXECUTORS: u32 = 1;

/// Jenkins needs a moment after `doCreateItem` before the node can be
/// toggled online.
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(30);

/// Link-local EC2 metadata path returning the instance id as plain text.
pub const DEFAULT_INSTANCE_ID_URL: &str = "http://169.254.169.254/latest/meta-data/instance-id";

/// Template for the node an agent registers for itself.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSpec {
    /// Port the master uses to reach the agent over SSH.
    ///
    /// Default: 22
    #[serde(deserialize_with = "convert_numeric_with_shellexpand")]
    pub ssh_port: u16,

    /// Id of the Jenkins credential used by the SSH launcher.
    ///
    /// Default: "jenkins"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub credentials_id: String,

    /// Remote filesystem root of the node. The registration marker file is
    /// written here as well.
    ///
    /// Default: "/var/lib/jenkins"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub remote_fs: String,

    /// Label attached next to the instance id label.
    ///
    /// Default: "linux_slave"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub role_label: String,

    /// File name of the registration marker inside `remote_fs`.
    ///
    /// Default: "registration_date.txt"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub status_file_name: String,

    /// Default: "Node dynamically created by ASG"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub description: String,

    /// Number of trailing labels removed from the host's fully qualified
    /// name to form the node name, eg: with 4,
    /// `web-worker-01.build.us-west-2.corp.example` becomes `web-worker-01`.
    ///
    /// Default: 4
    #[serde(deserialize_with = "convert_numeric_with_shellexpand")]
    pub strip_domain_labels: usize,

    /// Executors used when none is given on the command line.
    ///
    /// Default: 1
    #[serde(deserialize_with = "convert_numeric_with_shellexpand")]
    pub num_executors: u32,

    /// How long to wait after creating the node before enabling it.
    ///
    /// Default: 30s
    #[serde(deserialize_with = "convert_duration_with_shellexpand")]
    pub start_delay: Duration,
}

impl Default for AgentSpec {
    fn default() -> Self {
        Self {
            ssh_port: DEFAULT_AGENT_SSH_PORT,
            credentials_id: DEFAULT_AGENT_CREDENTIALS_ID.to_string(),
            remote_fs: DEFAULT_AGENT_REMOTE_FS.to_string(),
            role_label: DEFAULT_AGENT_ROLE_LABEL.to_string(),
            status_file_name: DEFAULT_STATUS_FILE_NAME.to_string(),
            description: DEFAULT_AGENT_DESCRIPTION.to_string(),
            strip_domain_labels: DEFAULT_STRIP_DOMAIN_LABELS,
            num_executors: DEFAULT_NUM_EXECUTORS,
            start_delay: DEFAULT_START_DELAY,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceMetadataSpec {
    /// URL answering with the instance id of the current machine.
    ///
    /// Default: "http://169.254.169.254/latest/meta-data/instance-id"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub instance_id_url: String,
}

impl Default for InstanceMetadataSpec {
    fn default() -> Self {
        Self {
            instance_id_url: DEFAULT_INSTANCE_ID_URL.to_string(),
        }
    }
}
