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

use fleetlink_clients::zabbix::ZabbixOperations;
use fleetlink_clients::zabbix::types::HostStatus;
use fleetlink_error::{Code, Error, ResultExt, make_err};
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitoringOutcome {
    /// No host carries the instance id as asset tag.
    NoMatchingHost,
    Disabled { host_id: String },
}

/// Flips the monitoring host whose asset tag is `instance_id` to
/// unmonitored. The host record itself is kept.
pub async fn disable_monitoring_host(
    zabbix: &dyn ZabbixOperations,
    instance_id: &str,
) -> Result<MonitoringOutcome, Error> {
    let hosts = zabbix
        .find_hosts_by_asset_tag(instance_id)
        .await
        .err_tip(|| format!("While searching hosts with asset tag {instance_id}"))?;
    let Some((host, others)) = hosts.split_first() else {
        event!(Level::INFO, instance_id, "No monitoring host with this asset tag, nothing to do");
        return Ok(MonitoringOutcome::NoMatchingHost);
    };
    if !others.is_empty() {
        let ignored: Vec<&str> = others.iter().map(|h| h.host_id.as_str()).collect();
        event!(
            Level::WARN,
            instance_id,
            host_id = %host.host_id,
            ?ignored,
            "Several hosts share the asset tag, only the first one is disabled"
        );
    }

    let requested = vec![host.host_id.clone()];
    let disabled = zabbix
        .set_host_status(&host.host_id, HostStatus::Unmonitored)
        .await
        .err_tip(|| format!("While disabling host {}", host.host_id))?;
    if !disabled.contains(&host.host_id) {
        return Err(make_err!(
            Code::DataLoss,
            "Disabled hosts do not match requested ones. Requested ids: {requested:?}, Disabled ids: {disabled:?}"
        ));
    }
    event!(Level::INFO, instance_id, host_id = %host.host_id, "Monitoring host disabled");
    Ok(MonitoringOutcome::Disabled {
        host_id: host.host_id.clone(),
    })
}
