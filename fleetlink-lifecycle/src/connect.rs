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

use core::net::{IpAddr, SocketAddr};

use fleetlink_clients::autoscaling::AwsAutoscalingClient;
use fleetlink_clients::jenkins::{JenkinsClient, JenkinsOperations};
use fleetlink_clients::zabbix::{ZabbixClient, ZabbixOperations};
use fleetlink_config::services::{AutoscalingSpec, JenkinsSpec, ZabbixSpec};
use fleetlink_error::{Error, ResultExt, error_if};
use fleetlink_util::net::resolve_ipv4;
use tracing::{Level, event};

/// An authenticated Jenkins client and the address it talks to.
#[derive(Debug)]
pub struct JenkinsConnection {
    pub client: JenkinsClient,
    pub address: SocketAddr,
}

fn require(value: &str, what: &str) -> Result<(), Error> {
    error_if!(value.trim().is_empty(), "{what} is required");
    Ok(())
}

pub fn validate_jenkins_spec(spec: &JenkinsSpec) -> Result<(), Error> {
    require(&spec.server, "Jenkins server name")?;
    require(&spec.user, "Jenkins API user")?;
    require(&spec.api_token, "Jenkins API token")
}

pub fn validate_zabbix_spec(spec: &ZabbixSpec) -> Result<(), Error> {
    require(&spec.server, "Zabbix server name")?;
    require(&spec.user, "Zabbix API user")?;
    require(&spec.password, "Zabbix API password")
}

/// The API is addressed by IP; the server name is resolved up front.
pub async fn jenkins_address(spec: &JenkinsSpec) -> Result<SocketAddr, Error> {
    let ip = resolve_ipv4(&spec.server)
        .await
        .err_tip(|| format!("While resolving Jenkins server {}", spec.server))?;
    Ok(SocketAddr::new(IpAddr::V4(ip), spec.port))
}

pub fn jenkins_base_url(address: SocketAddr) -> String {
    format!("http://{address}")
}

pub async fn authenticate(jenkins: &dyn JenkinsOperations) -> Result<String, Error> {
    let user = jenkins
        .whoami()
        .await
        .err_tip(|| "Could not authenticate against Jenkins")?;
    event!(Level::INFO, %user, "Authenticated against Jenkins");
    Ok(user)
}

pub async fn connect_jenkins(spec: &JenkinsSpec) -> Result<JenkinsConnection, Error> {
    validate_jenkins_spec(spec)?;
    let address = jenkins_address(spec).await?;
    let client = JenkinsClient::new(&jenkins_base_url(address), &spec.user, &spec.api_token)?;
    authenticate(&client).await?;
    Ok(JenkinsConnection { client, address })
}

pub async fn login_zabbix(zabbix: &dyn ZabbixOperations, spec: &ZabbixSpec) -> Result<(), Error> {
    zabbix
        .login(&spec.user, &spec.password)
        .await
        .err_tip(|| format!("Could not log in to Zabbix at {}", spec.server))
}

pub async fn connect_zabbix(spec: &ZabbixSpec) -> Result<ZabbixClient, Error> {
    validate_zabbix_spec(spec)?;
    let client = ZabbixClient::new(&spec.api_url())?.with_login_field(spec.login_field);
    login_zabbix(&client, spec).await?;
    Ok(client)
}

pub async fn connect_autoscaling(spec: &AutoscalingSpec) -> AwsAutoscalingClient {
    AwsAutoscalingClient::new(spec).await
}
