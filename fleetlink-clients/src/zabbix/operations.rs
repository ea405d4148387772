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

use crate::zabbix::types::{HostStatus, ZabbixHost};

#[async_trait]
pub trait ZabbixOperations: Send + Sync + Debug {
    /// `user.login`; the session token is kept for later calls.
    async fn login(&self, user: &str, password: &str) -> Result<(), Error>;

    /// `host.get` searching the inventory `asset_tag` field.
    async fn find_hosts_by_asset_tag(&self, asset_tag: &str) -> Result<Vec<ZabbixHost>, Error>;

    /// `host.update` of the status flag. Returns the host ids the server
    /// reports as updated.
    async fn set_host_status(&self, host_id: &str, status: HostStatus)
    -> Result<Vec<String>, Error>;
}
