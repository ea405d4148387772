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

use serde::Deserialize;

/// Monitoring status of a host as stored by Zabbix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HostStatus {
    Monitored = 0,
    Unmonitored = 1,
}

impl HostStatus {
    pub const fn as_param(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZabbixHost {
    #[serde(rename = "hostid")]
    pub host_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HostUpdateResult {
    pub hostids: Vec<String>,
}
