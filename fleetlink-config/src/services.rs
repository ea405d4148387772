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

use crate::serde_utils::{
    convert_numeric_with_shellexpand, convert_optional_string_with_shellexpand,
    convert_string_with_shellexpand,
};

/// Port the Jenkins master listens on for its remote API.
pub const DEFAULT_JENKINS_PORT: u16 = 8080;

/// Name of the built-in node. It never carries instance labels and is
/// skipped when scanning nodes.
pub const DEFAULT_MASTER_NODE_NAME: &str = "master";

/// Region used for the Auto Scaling API when nothing else is configured.
pub const DEFAULT_AUTOSCALING_REGION: &str = "us-west-2";

/// Path of the JSON-RPC endpoint on a Zabbix frontend.
pub const DEFAULT_ZABBIX_API_PATH: &str = "/api_jsonrpc.php";

/// Connection details for the Jenkins master.
///
/// **Example JSON Config:**
/// ```json
/// "jenkins": {
///   "server": "jenkins.build.example.com",
///   "port": 8080,
///   "user": "asg-bot",
///   "api_token": "${JENKINS_API_TOKEN}",
/// }
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct JenkinsSpec {
    /// Host name of the Jenkins master. It is resolved to an IPv4 address
    /// before the API client is created.
    ///
    /// Default: "" (must be provided by flag or environment)
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub server: String,

    /// Port of the Jenkins remote API.
    ///
    /// Default: 8080
    #[serde(deserialize_with = "convert_numeric_with_shellexpand")]
    pub port: u16,

    /// User the API calls are made as.
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub user: String,

    /// API token (or password) of `user`.
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub api_token: String,

    /// Node name skipped when scanning for instance labels.
    ///
    /// Default: "master"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub master_node_name: String,
}

impl Default for JenkinsSpec {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: DEFAULT_JENKINS_PORT,
            user: String::new(),
            api_token: String::new(),
            master_node_name: DEFAULT_MASTER_NODE_NAME.to_string(),
        }
    }
}

/// Settings for the AWS Auto Scaling API client. Credentials always come
/// from the default AWS provider chain.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AutoscalingSpec {
    /// Region of the Auto Scaling group.
    ///
    /// Default: "us-west-2"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub region: String,

    /// Overrides the API endpoint, mostly useful for local emulators. When
    /// unset the `AWS_ENDPOINT_URL` environment variable is honored.
    ///
    /// Default: None
    #[serde(deserialize_with = "convert_optional_string_with_shellexpand")]
    pub endpoint_url: Option<String>,
}

impl Default for AutoscalingSpec {
    fn default() -> Self {
        Self {
            region: DEFAULT_AUTOSCALING_REGION.to_string(),
            endpoint_url: None,
        }
    }
}

/// Name of the account parameter of `user.login`. Zabbix 5.4 introduced
/// `username` and 6.4 no longer accepts `user`.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZabbixLoginField {
    #[default]
    User,
    Username,
}

impl ZabbixLoginField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Username => "username",
        }
    }
}

/// Connection details for the Zabbix JSON-RPC API.
///
/// **Example JSON Config:**
/// ```json
/// "zabbix": {
///   "server": "zabbix.example.com",
///   "user": "Admin",
///   "password": "$ZBX_PASSWORD",
/// }
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ZabbixSpec {
    /// Host name of the Zabbix frontend.
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub server: String,

    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub user: String,

    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub password: String,

    /// Path of the JSON-RPC endpoint on `server`.
    ///
    /// Default: "/api_jsonrpc.php"
    #[serde(deserialize_with = "convert_string_with_shellexpand")]
    pub api_path: String,

    /// Talk plain HTTP instead of HTTPS. Only meant for test setups.
    ///
    /// Default: false
    pub insecure_allow_http: bool,

    /// Set to `"username"` for Zabbix 5.4 and newer, which is required
    /// from 6.4 on.
    ///
    /// Default: "user"
    pub login_field: ZabbixLoginField,
}

impl Default for ZabbixSpec {
    fn default() -> Self {
        Self {
            server: String::new(),
            user: String::new(),
            password: String::new(),
            api_path: DEFAULT_ZABBIX_API_PATH.to_string(),
            insecure_allow_http: false,
            login_field: ZabbixLoginField::User,
        }
    }
}

impl ZabbixSpec {
    /// Full URL of the JSON-RPC endpoint.
    pub fn api_url(&self) -> String {
        let scheme = if self.insecure_allow_http {
            "http"
        } else {
            "https"
        };
        let path = if self.api_path.starts_with('/') {
            self.api_path.clone()
        } else {
            format!("/{}", self.api_path)
        };
        format!("{scheme}://{}{path}", self.server)
    }
}
