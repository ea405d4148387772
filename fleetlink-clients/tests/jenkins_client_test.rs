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

use fleetlink_clients::jenkins::types::{
    CreateNodeRequest, LAUNCHER_SSH, NodeConfig, NodeSummary, RunningBuild, SshLauncher,
};
use fleetlink_clients::jenkins::{JenkinsClient, JenkinsOperations};
use fleetlink_error::{Code, Error};
use fleetlink_macro::fleetlink_test;
use fleetlink_util::http_client::{RecordedRequest, ReplayTransport};
use http::{Method, StatusCode};
use percent_encoding::percent_decode_str;
use pretty_assertions::assert_eq;
use serde_json::Value;

const BASE_URL: &str = "http://10.0.0.5:8080";
const BASIC_AUTH: &str = "Basic YXNnLWJvdDpzM2NyZXQ=";
const CRUMB_BODY: &str = r#"{"_class":"hudson.security.csrf.DefaultCrumbIssuer","crumb":"f00dcafe","crumbRequestField":"Jenkins-Crumb"}"#;

fn make_client(transport: ReplayTransport) -> Result<JenkinsClient<ReplayTransport>, Error> {
    JenkinsClient::new_with_transport(transport, BASE_URL, "asg-bot", "s3cret")
}

fn create_request() -> CreateNodeRequest {
    CreateNodeRequest {
        name: "web-worker-01".to_string(),
        description: "Node dynamically created by ASG".to_string(),
        num_executors: 1,
        remote_fs: "/var/lib/jenkins".to_string(),
        labels: vec!["linux_slave".to_string(), "i-0abc123".to_string()],
        launcher: SshLauncher {
            host: "10.0.3.17".to_string(),
            port: 22,
            credentials_id: "jenkins".to_string(),
        },
    }
}

fn requests(client: &JenkinsClient<ReplayTransport>) -> Vec<RecordedRequest> {
    client.transport().requests()
}

#[fleetlink_test]
async fn whoami_sends_basic_auth() -> Result<(), Error> {
    let client = make_client(ReplayTransport::new().with_response(
        StatusCode::OK,
        r#"{"_class":"hudson.model.User","id":"asg-bot","fullName":"ASG bot"}"#,
    ))?;

    assert_eq!(client.whoami().await?, "asg-bot");

    let requests = requests(&client);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].uri, "http://10.0.0.5:8080/me/api/json");
    assert_eq!(requests[0].header("authorization"), Some(BASIC_AUTH));
    Ok(())
}

#[fleetlink_test]
async fn whoami_rejected_credentials_are_unauthenticated() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new().with_response(StatusCode::UNAUTHORIZED, "<html>Invalid password</html>"),
    )?;
    let err = client.whoami().await.unwrap_err();
    assert_eq!(err.code, Code::Unauthenticated);
    Ok(())
}

#[fleetlink_test]
async fn node_exists_maps_status_codes() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            .with_response(StatusCode::OK, r#"{"displayName":"my node","offline":false}"#)
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::FORBIDDEN, ""),
    )?;

    assert!(client.node_exists("my node").await?);
    assert!(!client.node_exists("web-worker-02").await?);
    assert_eq!(
        client.node_exists("web-worker-03").await.unwrap_err().code,
        Code::PermissionDenied
    );

    let requests = requests(&client);
    assert_eq!(
        requests[0].uri,
        "http://10.0.0.5:8080/computer/my%20node/api/json?depth=0"
    );
    assert_eq!(
        requests[1].uri,
        "http://10.0.0.5:8080/computer/web-worker-02/api/json?depth=0"
    );
    Ok(())
}

#[fleetlink_test]
async fn create_node_posts_ssh_agent_with_crumb() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::OK, CRUMB_BODY)
            .with_response(StatusCode::OK, "")
            .with_response(StatusCode::OK, r#"{"offline":true}"#),
    )?;

    client.create_node(&create_request()).await?;

    let requests = requests(&client);
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].uri, "http://10.0.0.5:8080/crumbIssuer/api/json");

    let create = &requests[2];
    assert_eq!(create.method, Method::POST);
    assert_eq!(create.header("jenkins-crumb"), Some("f00dcafe"));
    assert_eq!(create.header("authorization"), Some(BASIC_AUTH));
    let (prefix, json_param) = create
        .uri
        .split_once("&json=")
        .expect("create request carries a json parameter");
    assert_eq!(
        prefix,
        "http://10.0.0.5:8080/computer/doCreateItem?name=web-worker-01&type=hudson.slaves.DumbSlave%24DescriptorImpl"
    );
    let form: Value = serde_json::from_str(&percent_decode_str(json_param).decode_utf8_lossy())?;
    assert_eq!(form["name"], "web-worker-01");
    assert_eq!(form["nodeDescription"], "Node dynamically created by ASG");
    assert_eq!(form["numExecutors"], 1);
    assert_eq!(form["remoteFS"], "/var/lib/jenkins");
    assert_eq!(form["labelString"], "linux_slave i-0abc123");
    assert_eq!(form["mode"], "NORMAL");
    assert_eq!(form["launcher"]["stapler-class"], LAUNCHER_SSH);
    assert_eq!(form["launcher"]["host"], "10.0.3.17");
    assert_eq!(form["launcher"]["port"], 22);
    assert_eq!(form["launcher"]["credentialsId"], "jenkins");

    assert_eq!(requests[3].method, Method::GET);
    Ok(())
}

#[fleetlink_test]
async fn create_node_refuses_existing_node() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new().with_response(StatusCode::OK, r#"{"offline":false}"#),
    )?;

    let err = client.create_node(&create_request()).await.unwrap_err();
    assert_eq!(err.code, Code::AlreadyExists);
    assert_eq!(requests(&client).len(), 1, "No create request may be sent");
    Ok(())
}

#[fleetlink_test]
async fn create_node_fails_when_node_does_not_appear() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::OK, "")
            .with_response(StatusCode::NOT_FOUND, ""),
    )?;

    let err = client.create_node(&create_request()).await.unwrap_err();
    assert_eq!(err.code, Code::Internal);

    let create = &requests(&client)[2];
    assert_eq!(create.method, Method::POST);
    assert_eq!(create.header("jenkins-crumb"), None);
    Ok(())
}

#[fleetlink_test]
async fn enable_node_toggles_offline_node() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            .with_response(StatusCode::OK, r#"{"offline":true,"temporarilyOffline":true}"#)
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::OK, ""),
    )?;

    client.enable_node("web-worker-01").await?;

    let requests = requests(&client);
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].method, Method::POST);
    assert_eq!(
        requests[2].uri,
        "http://10.0.0.5:8080/computer/web-worker-01/toggleOffline?offlineMessage="
    );
    Ok(())
}

#[fleetlink_test]
async fn enable_node_leaves_online_node_alone() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new().with_response(StatusCode::OK, r#"{"offline":false}"#),
    )?;

    client.enable_node("web-worker-01").await?;
    assert_eq!(requests(&client).len(), 1);
    Ok(())
}

#[fleetlink_test]
async fn enable_node_leaves_disconnected_agent_alone() -> Result<(), Error> {
    let client = make_client(ReplayTransport::new().with_response(
        StatusCode::OK,
        r#"{"offline":true,"temporarilyOffline":false}"#,
    ))?;

    client.enable_node("web-worker-01").await?;

    assert!(
        requests(&client).iter().all(|r| r.method == Method::GET),
        "No toggle expected for an agent that is only disconnected"
    );
    Ok(())
}

#[fleetlink_test]
async fn disable_node_marks_disconnected_agent() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            .with_response(
                StatusCode::OK,
                r#"{"offline":true,"temporarilyOffline":false}"#,
            )
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::FOUND, ""),
    )?;

    client
        .disable_node("web-worker-01", "Instance i-0abc123 is terminating")
        .await?;

    let requests = requests(&client);
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].method, Method::POST);
    assert!(requests[2].uri.contains("/computer/web-worker-01/toggleOffline?"));
    Ok(())
}

#[fleetlink_test]
async fn disable_node_skips_node_already_disabled() -> Result<(), Error> {
    let client = make_client(ReplayTransport::new().with_response(
        StatusCode::OK,
        r#"{"offline":true,"temporarilyOffline":true}"#,
    ))?;

    client.disable_node("web-worker-01", "terminating").await?;
    assert_eq!(requests(&client).len(), 1);
    Ok(())
}

#[fleetlink_test]
async fn form_posts_accept_redirects() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            // create: exists check, crumb, doCreateItem, exists check
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::FOUND, "")
            .with_response(StatusCode::OK, r#"{"offline":true,"temporarilyOffline":true}"#)
            // enable: node info, toggleOffline
            .with_response(StatusCode::OK, r#"{"offline":true,"temporarilyOffline":true}"#)
            .with_response(StatusCode::FOUND, "")
            // delete: doDelete, exists check
            .with_response(StatusCode::FOUND, "")
            .with_response(StatusCode::NOT_FOUND, ""),
    )?;

    client.create_node(&create_request()).await?;
    client.enable_node("web-worker-01").await?;
    client.delete_node("web-worker-01").await?;

    assert_eq!(client.transport().remaining_responses(), 0);
    let posts: Vec<String> = requests(&client)
        .into_iter()
        .filter(|r| r.method == Method::POST)
        .map(|r| r.uri)
        .collect();
    assert_eq!(posts.len(), 3);
    assert!(posts[0].contains("/computer/doCreateItem?"));
    assert!(posts[1].contains("/computer/web-worker-01/toggleOffline?"));
    assert!(posts[2].ends_with("/computer/web-worker-01/doDelete"));
    Ok(())
}

#[fleetlink_test]
async fn redirect_is_not_accepted_for_reads() -> Result<(), Error> {
    let client = make_client(ReplayTransport::new().with_response(StatusCode::FOUND, ""))?;
    let err = client.whoami().await.unwrap_err();
    assert_eq!(err.code, Code::Unknown);
    Ok(())
}

#[fleetlink_test]
async fn enable_missing_node_is_not_found() -> Result<(), Error> {
    let client = make_client(ReplayTransport::new().with_response(StatusCode::NOT_FOUND, ""))?;
    let err = client.enable_node("web-worker-01").await.unwrap_err();
    assert_eq!(err.code, Code::NotFound);
    Ok(())
}

#[fleetlink_test]
async fn crumb_is_fetched_once_per_client() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            .with_response(StatusCode::OK, r#"{"offline":false}"#)
            .with_response(StatusCode::OK, CRUMB_BODY)
            .with_response(StatusCode::OK, "")
            .with_response(StatusCode::OK, "")
            .with_response(StatusCode::NOT_FOUND, ""),
    )?;

    client
        .disable_node("web-worker-01", "Instance i-0abc123 is terminating")
        .await?;
    client.delete_node("web-worker-01").await?;

    let requests = requests(&client);
    assert_eq!(requests.len(), 5);
    assert_eq!(
        requests[2].uri,
        "http://10.0.0.5:8080/computer/web-worker-01/toggleOffline?offlineMessage=Instance%20i-0abc123%20is%20terminating"
    );
    assert_eq!(requests[3].uri, "http://10.0.0.5:8080/computer/web-worker-01/doDelete");
    let crumb_requests = requests
        .iter()
        .filter(|r| r.uri.ends_with("/crumbIssuer/api/json"))
        .count();
    assert_eq!(crumb_requests, 1);
    for post in requests.iter().filter(|r| r.method == Method::POST) {
        assert_eq!(post.header("jenkins-crumb"), Some("f00dcafe"));
    }
    Ok(())
}

#[fleetlink_test]
async fn delete_node_fails_when_node_survives() -> Result<(), Error> {
    let client = make_client(
        ReplayTransport::new()
            .with_response(StatusCode::NOT_FOUND, "")
            .with_response(StatusCode::OK, "")
            .with_response(StatusCode::OK, r#"{"offline":false}"#),
    )?;
    let err = client.delete_node("web-worker-01").await.unwrap_err();
    assert_eq!(err.code, Code::Internal);
    Ok(())
}

#[fleetlink_test]
async fn get_nodes_reads_display_names() -> Result<(), Error> {
    let client = make_client(ReplayTransport::new().with_response(
        StatusCode::OK,
        r#"{"_class":"hudson.model.ComputerSet","busyExecutors":0,"computer":[
            {"_class":"hudson.model.Hudson$MasterComputer","displayName":"master","offline":false},
            {"_class":"hudson.slaves.SlaveComputer","displayName":"web-worker-01","offline":true}
        ]}"#,
    ))?;

    assert_eq!(
        client.get_nodes().await?,
        vec![
            NodeSummary {
                name: "master".to_string(),
                offline: false,
            },
            NodeSummary {
                name: "web-worker-01".to_string(),
                offline: true,
            },
        ]
    );
    assert_eq!(requests(&client)[0].uri, "http://10.0.0.5:8080/computer/api/json");
    Ok(())
}

#[fleetlink_test]
async fn get_running_builds_reads_busy_executors() -> Result<(), Error> {
    let client = make_client(ReplayTransport::new().with_response(
        StatusCode::OK,
        r#"{"computer":[
            {"displayName":"master","executors":[{"currentExecutable":null}],"oneOffExecutors":[
                {"currentExecutable":{"number":7,"url":"http://jenkins/job/flow/7/"}}
            ]},
            {"displayName":"web-worker-01","executors":[
                {"currentExecutable":null},
                {"currentExecutable":{"number":42,"url":"http://jenkins/job/build/42/"}}
            ],"oneOffExecutors":[]},
            {"displayName":"web-worker-02","executors":[{}]}
        ]}"#,
    ))?;

    assert_eq!(
        client.get_running_builds().await?,
        vec![
            RunningBuild {
                node: "master".to_string(),
                number: 7,
                url: "http://jenkins/job/flow/7/".to_string(),
                executor: 0,
            },
            RunningBuild {
                node: "web-worker-01".to_string(),
                number: 42,
                url: "http://jenkins/job/build/42/".to_string(),
                executor: 1,
            },
        ]
    );
    assert!(
        requests(&client)[0]
            .uri
            .starts_with("http://10.0.0.5:8080/computer/api/json?tree=computer%5BdisplayName%2Cexecutors%5B"),
    );
    Ok(())
}

#[fleetlink_test]
async fn get_node_config_returns_raw_xml() -> Result<(), Error> {
    let xml = "<?xml version='1.1' encoding='UTF-8'?><slave><name>web-worker-01</name></slave>";
    let client = make_client(ReplayTransport::new().with_response(StatusCode::OK, xml))?;

    assert_eq!(client.get_node_config("web-worker-01").await?, xml);
    assert_eq!(
        requests(&client)[0].uri,
        "http://10.0.0.5:8080/computer/web-worker-01/config.xml"
    );
    Ok(())
}

#[test]
fn node_config_parses_labels() -> Result<(), Error> {
    let config = NodeConfig::parse(
        r#"<?xml version='1.1' encoding='UTF-8'?>
<slave>
  <name>web-worker-01</name>
  <description>Node dynamically created by ASG</description>
  <remoteFS>/var/lib/jenkins</remoteFS>
  <numExecutors>1</numExecutors>
  <mode>NORMAL</mode>
  <retentionStrategy class="hudson.slaves.RetentionStrategy$Always"/>
  <launcher class="hudson.plugins.sshslaves.SSHLauncher" plugin="ssh-slaves@2.877">
    <host>10.0.3.17</host>
    <port>22</port>
    <credentialsId>jenkins</credentialsId>
  </launcher>
  <label>linux_slave   i-0abc123</label>
  <nodeProperties/>
</slave>"#,
    )?;

    assert_eq!(
        config,
        NodeConfig {
            name: "web-worker-01".to_string(),
            labels: vec!["linux_slave".to_string(), "i-0abc123".to_string()],
        }
    );
    assert!(config.has_label("i-0abc123"));
    assert!(!config.has_label("i-0abc12"));
    Ok(())
}

#[test]
fn node_config_without_label_has_no_labels() -> Result<(), Error> {
    let config = NodeConfig::parse("<slave><name>web-worker-01</name></slave>")?;
    assert!(config.labels.is_empty());
    Ok(())
}

#[test]
fn node_config_rejects_garbage() {
    let err = NodeConfig::parse("<html><body>Oops</body></html>").unwrap_err();
    assert_eq!(err.code, Code::InvalidArgument);
}
