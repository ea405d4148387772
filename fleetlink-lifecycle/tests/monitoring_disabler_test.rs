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

use fleetlink_clients::zabbix::mocks::{MockZabbixOperations, ZabbixCall};
use fleetlink_clients::zabbix::types::HostStatus;
use fleetlink_error::{Code, Error};
use fleetlink_lifecycle::monitoring_disabler::{MonitoringOutcome, disable_monitoring_host};
use fleetlink_macro::fleetlink_test;
use pretty_assertions::assert_eq;

fn update_calls(zabbix: &MockZabbixOperations) -> Vec<ZabbixCall> {
    zabbix
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ZabbixCall::SetHostStatus { .. }))
        .collect()
}

#[fleetlink_test]
async fn no_matching_host_is_a_noop() -> Result<(), Error> {
    let zabbix = MockZabbixOperations::new();
    zabbix.add_host("10084", "i-0def456");

    assert_eq!(
        disable_monitoring_host(&zabbix, "i-0abc123").await?,
        MonitoringOutcome::NoMatchingHost
    );
    assert!(update_calls(&zabbix).is_empty());
    Ok(())
}

#[fleetlink_test]
async fn matching_host_is_disabled_once() -> Result<(), Error> {
    let zabbix = MockZabbixOperations::new();
    zabbix.add_host("10084", "i-0abc123");
    zabbix.add_host("10085", "i-0def456");

    assert_eq!(
        disable_monitoring_host(&zabbix, "i-0abc123").await?,
        MonitoringOutcome::Disabled {
            host_id: "10084".to_string()
        }
    );
    assert_eq!(
        update_calls(&zabbix),
        vec![ZabbixCall::SetHostStatus {
            host_id: "10084".to_string(),
            status: HostStatus::Unmonitored,
        }]
    );
    assert_eq!(zabbix.host_status("10084"), Some(HostStatus::Unmonitored));
    assert_eq!(zabbix.host_status("10085"), Some(HostStatus::Monitored));
    Ok(())
}

#[fleetlink_test]
async fn first_of_duplicate_hosts_wins() -> Result<(), Error> {
    let zabbix = MockZabbixOperations::new();
    zabbix.add_host("10084", "i-0abc123");
    zabbix.add_host("10090", "i-0abc123");

    assert_eq!(
        disable_monitoring_host(&zabbix, "i-0abc123").await?,
        MonitoringOutcome::Disabled {
            host_id: "10084".to_string()
        }
    );
    assert_eq!(update_calls(&zabbix).len(), 1);
    assert_eq!(zabbix.host_status("10090"), Some(HostStatus::Monitored));
    Ok(())
}

#[fleetlink_test]
async fn mismatching_update_result_is_data_loss() -> Result<(), Error> {
    let zabbix = MockZabbixOperations::new();
    zabbix.add_host("10084", "i-0abc123");
    zabbix.set_updated_ids_override(&["10085"]);

    let err = disable_monitoring_host(&zabbix, "i-0abc123")
        .await
        .unwrap_err();

    assert_eq!(err.code, Code::DataLoss);
    let message = err.message_string();
    assert!(
        message.contains(r#"Requested ids: ["10084"]"#),
        "Got: {message}"
    );
    assert!(message.contains(r#"Disabled ids: ["10085"]"#), "Got: {message}");
    Ok(())
}
