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

use crate::zabbix::operations::ZabbixOperations;
use crate::zabbix::types::{HostStatus, ZabbixHost};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZabbixCall {
    Login { user: String },
    FindHostsByAssetTag { asset_tag: String },
    SetHostStatus { host_id: String, status: HostStatus },
}

#[derive(Debug, Clone)]
struct MockHost {
    host_id: String,
    asset_tag: String,
    status: HostStatus,
}

/// In-memory host inventory standing in for a Zabbix server.
#[derive(Debug, Default)]
pub struct MockZabbixOperations {
    hosts: Mutex<Vec<MockHost>>,
    reject_login: Mutex<bool>,
    updated_ids_override: Mutex<Option<Vec<String>>>,
    calls: Mutex<Vec<ZabbixCall>>,
}

impl MockZabbixOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a monitored host.
    pub fn add_host(&self, host_id: &str, asset_tag: &str) {
        self.hosts.lock().push(MockHost {
            host_id: host_id.to_string(),
            asset_tag: asset_tag.to_string(),
            status: HostStatus::Monitored,
        });
    }

    pub fn set_reject_login(&self, reject: bool) {
        *self.reject_login.lock() = reject;
    }

    /// Makes `host.update` report these ids instead of the requested one.
    pub fn set_updated_ids_override(&self, host_ids: &[&str]) {
        *self.updated_ids_override.lock() = Some(host_ids.iter().map(ToString::to_string).collect());
    }

    pub fn host_status(&self, host_id: &str) -> Option<HostStatus> {
        self.hosts
            .lock()
            .iter()
            .find(|h| h.host_id == host_id)
            .map(|h| h.status)
    }

    pub fn calls(&self) -> Vec<ZabbixCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ZabbixOperations for MockZabbixOperations {
    async fn login(&self, user: &str, _password: &str) -> Result<(), Error> {
        self.calls.lock().push(ZabbixCall::Login {
            user: user.to_string(),
        });
        if *self.reject_login.lock() {
            return Err(make_err!(
                Code::Internal,
                "API request failed! API error message: Login name or password is incorrect."
            ));
        }
        Ok(())
    }

    async fn find_hosts_by_asset_tag(&self, asset_tag: &str) -> Result<Vec<ZabbixHost>, Error> {
        self.calls.lock().push(ZabbixCall::FindHostsByAssetTag {
            asset_tag: asset_tag.to_string(),
        });
        Ok(self
            .hosts
            .lock()
            .iter()
            .filter(|h| h.asset_tag == asset_tag)
            .map(|h| ZabbixHost {
                host_id: h.host_id.clone(),
            })
            .collect())
    }

    async fn set_host_status(
        &self,
        host_id: &str,
        status: HostStatus,
    ) -> Result<Vec<String>, Error> {
        self.calls.lock().push(ZabbixCall::SetHostStatus {
            host_id: host_id.to_string(),
            status,
        });
        if let Some(host) = self.hosts.lock().iter_mut().find(|h| h.host_id == host_id) {
            host.status = status;
        }
        Ok(self
            .updated_ids_override
            .lock()
            .clone()
            .unwrap_or_else(|| vec![host_id.to_string()]))
    }
}
