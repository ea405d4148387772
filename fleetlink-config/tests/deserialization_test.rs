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

use fleetlink_config::FleetConfig;
use fleetlink_config::agent::{AgentSpec, DEFAULT_INSTANCE_ID_URL};
use fleetlink_config::services::{JenkinsSpec, ZabbixLoginField, ZabbixSpec};
use pretty_assertions::assert_eq;

#[test]
fn empty_config_uses_defaults() {
    let config: FleetConfig = serde_json5::from_str("{}").unwrap();
    assert_eq!(config, FleetConfig::default());
    assert_eq!(config.jenkins.port, 8080);
    assert_eq!(config.jenkins.master_node_name, "master");
    assert_eq!(config.agent.role_label, "linux_slave");
    assert_eq!(config.agent.remote_fs, "/var/lib/jenkins");
    assert_eq!(config.agent.status_file_name, "registration_date.txt");
    assert_eq!(config.agent.strip_domain_labels, 4);
    assert_eq!(config.agent.num_executors, 1);
    assert_eq!(config.agent.start_delay, Duration::from_secs(30));
    assert_eq!(config.autoscaling.region, "us-west-2");
    assert_eq!(
        config.instance_metadata.instance_id_url,
        DEFAULT_INSTANCE_ID_URL
    );
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config: FleetConfig = serde_json5::from_str(
        r#"{
            // Comments are fine, this is JSON5.
            agent: {
                role_label: "linux_builder",
                start_delay: "1m 5s",
                strip_domain_labels: 2,
            },
        }"#,
    )
    .unwrap();
    assert_eq!(
        config.agent,
        AgentSpec {
            role_label: "linux_builder".to_string(),
            start_delay: Duration::from_secs(65),
            strip_domain_labels: 2,
            ..AgentSpec::default()
        }
    );
    assert_eq!(config.jenkins, JenkinsSpec::default());
}

#[test]
fn numeric_start_delay_is_seconds() {
    let config: FleetConfig =
        serde_json5::from_str(r#"{ agent: { start_delay: 3 } }"#).unwrap();
    assert_eq!(config.agent.start_delay, Duration::from_secs(3));
}

#[test]
fn shell_expands_secrets_and_numbers() {
    // SAFETY: The variables are unique to this test.
    unsafe {
        std::env::set_var("FLEETLINK_TEST_JENKINS_TOKEN", "s3cret");
        std::env::set_var("FLEETLINK_TEST_JENKINS_PORT", "8443");
    }
    let config: FleetConfig = serde_json5::from_str(
        r#"{
            jenkins: {
                server: "jenkins.example.com",
                user: "asg-bot",
                api_token: "$FLEETLINK_TEST_JENKINS_TOKEN",
                port: "${FLEETLINK_TEST_JENKINS_PORT}",
            },
        }"#,
    )
    .unwrap();
    assert_eq!(config.jenkins.api_token, "s3cret");
    assert_eq!(config.jenkins.port, 8443);
    assert_eq!(config.jenkins.master_node_name, "master");
}

#[test]
fn unknown_fields_are_rejected() {
    let result = serde_json5::from_str::<FleetConfig>(r#"{ jenkins: { hostname: "x" } }"#);
    assert!(result.is_err(), "Expected error, got: {result:?}");
}

#[test]
fn zabbix_api_url() {
    let spec = ZabbixSpec {
        server: "zabbix.example.com".to_string(),
        ..ZabbixSpec::default()
    };
    assert_eq!(spec.api_url(), "https://zabbix.example.com/api_jsonrpc.php");

    let spec = ZabbixSpec {
        server: "127.0.0.1:8080".to_string(),
        api_path: "zabbix/api_jsonrpc.php".to_string(),
        insecure_allow_http: true,
        ..ZabbixSpec::default()
    };
    assert_eq!(spec.api_url(), "http://127.0.0.1:8080/zabbix/api_jsonrpc.php");
}

#[test]
fn zabbix_login_field_defaults_to_user() {
    let config: FleetConfig = serde_json5::from_str("{}").unwrap();
    assert_eq!(config.zabbix.login_field, ZabbixLoginField::User);

    let config: FleetConfig =
        serde_json5::from_str(r#"{ zabbix: { login_field: "username" } }"#).unwrap();
    assert_eq!(config.zabbix.login_field, ZabbixLoginField::Username);
    assert_eq!(config.zabbix.login_field.as_str(), "username");
}
