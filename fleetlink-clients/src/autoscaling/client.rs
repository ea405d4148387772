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

use std::env;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_sdk_autoscaling::Client;
use aws_sdk_autoscaling::config::Region;
use aws_sdk_autoscaling::error::DisplayErrorContext;
use fleetlink_config::services::AutoscalingSpec;
use fleetlink_error::{Code, Error, make_err};
use tracing::{Level, event};

use crate::autoscaling::operations::{
    AutoscalingOperations, LifecycleActionCompletion, LifecycleActionResult,
};

/// Auto Scaling API client. Every call is attempted exactly once.
#[derive(Debug, Clone)]
pub struct AwsAutoscalingClient {
    client: Client,
}

impl AwsAutoscalingClient {
    /// Credentials come from the default AWS provider chain.
    pub async fn new(spec: &AutoscalingSpec) -> Self {
        let mut config_builder = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(spec.region.clone()))
            .retry_config(RetryConfig::disabled());
        let endpoint_url = spec
            .endpoint_url
            .clone()
            .or_else(|| env::var("AWS_ENDPOINT_URL").ok());
        if let Some(endpoint_url) = endpoint_url {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self::new_with_client(Client::new(&config_builder.load().await))
    }

    pub const fn new_with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AutoscalingOperations for AwsAutoscalingClient {
    async fn complete_lifecycle_action(
        &self,
        completion: &LifecycleActionCompletion,
        result: LifecycleActionResult,
    ) -> Result<(), Error> {
        self.client
            .complete_lifecycle_action()
            .auto_scaling_group_name(&completion.auto_scaling_group_name)
            .lifecycle_hook_name(&completion.lifecycle_hook_name)
            .lifecycle_action_token(&completion.lifecycle_action_token)
            .lifecycle_action_result(result.as_str())
            .instance_id(&completion.instance_id)
            .send()
            .await
            .map_err(|e| {
                let code = if e.as_service_error().is_some() {
                    Code::FailedPrecondition
                } else {
                    Code::Unavailable
                };
                make_err!(
                    code,
                    "Could not complete lifecycle action {} of {}: {}",
                    completion.lifecycle_hook_name,
                    completion.auto_scaling_group_name,
                    DisplayErrorContext(&e)
                )
            })?;
        event!(
            Level::INFO,
            instance_id = %completion.instance_id,
            lifecycle_hook_name = %completion.lifecycle_hook_name,
            %result,
            "Completed lifecycle action"
        );
        Ok(())
    }
}
