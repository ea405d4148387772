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

use fleetlink_clients::jenkins::mocks::{JenkinsCall, MockJenkinsOperations};
use fleetlink_error::Error;
use fleetlink_lifecycle::node_lookup::find_node_by_instance_id;
use fleetlink_macro::fleetlink_test;
use pretty_assertions::assert_eq;

const MASTER: &str = "master";

fn fleet(order: &[usize]) -> MockJenkinsOperations {
    let nodes = [
        ("web-worker-01", "i-0abc123"),
        ("web-worker-02", "i-0def456"),
        ("web-worker-03", "i-0fed789"),
    ];
    let jenkins = MockJenkinsOperations::new();
    jenkins.add_node(MASTER, &[]);
    for &index in order {
        let (name, instance_id) = nodes[index];
        jenkins.add_node(name, &["linux_slave", instance_id]);
    }
    jenkins
}

#[fleetlink_test]
async fn lookup_finds_owner_regardless_of_order() -> Result<(), Error> {
    for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
        let jenkins = fleet(&order);
        for (instance_id, expected) in [
            ("i-0abc123", "web-worker-01"),
            ("i-0def456", "web-worker-02"),
            ("i-0fed789", "web-worker-03"),
        ] {
            assert_eq!(
                find_node_by_instance_id(&jenkins, instance_id, MASTER).await?,
                Some(expected.to_string()),
                "Order {order:?}, instance {instance_id}"
            );
        }
    }
    Ok(())
}

#[fleetlink_test]
async fn lookup_of_unknown_instance_finds_nothing() -> Result<(), Error> {
    let jenkins = fleet(&[0, 1, 2]);
    assert_eq!(
        find_node_by_instance_id(&jenkins, "i-0999999", MASTER).await?,
        None
    );
    Ok(())
}

#[fleetlink_test]
async fn lookup_requires_exact_label() -> Result<(), Error> {
    let jenkins = MockJenkinsOperations::new();
    jenkins.add_node("web-worker-01", &["linux_slave", "i-0abc1234"]);
    assert_eq!(
        find_node_by_instance_id(&jenkins, "i-0abc123", MASTER).await?,
        None
    );
    Ok(())
}

#[fleetlink_test]
async fn lookup_skips_master_and_stops_at_first_match() -> Result<(), Error> {
    let jenkins = fleet(&[0, 1, 2]);

    find_node_by_instance_id(&jenkins, "i-0abc123", MASTER).await?;

    assert_eq!(
        jenkins.calls(),
        vec![
            JenkinsCall::GetNodes,
            JenkinsCall::GetNodeConfig {
                name: "web-worker-01".to_string()
            },
        ]
    );
    Ok(())
}

#[fleetlink_test]
async fn lookup_honors_configured_master_name() -> Result<(), Error> {
    let jenkins = MockJenkinsOperations::new();
    jenkins.add_node("Built-In Node", &["i-0abc123"]);
    jenkins.add_node("web-worker-01", &["linux_slave", "i-0abc123"]);
    assert_eq!(
        find_node_by_instance_id(&jenkins, "i-0abc123", "Built-In Node").await?,
        Some("web-worker-01".to_string())
    );
    Ok(())
}
