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

use fleetlink_clients::autoscaling::LifecycleActionCompletion;
use fleetlink_error::{Error, make_input_err};
use serde_json::Value;

/// Fields of `detail` that may hold the instance id, in lookup order. Auto
/// Scaling events use the first, EC2 state change events the second.
pub const INSTANCE_ID_FIELDS: [&str; 2] = ["EC2InstanceId", "instance-id"];

pub fn parse_event(raw: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|e| make_input_err!("Event payload is not valid JSON: {e}"))
}

fn detail_str<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload
        .get("detail")?
        .get(field)?
        .as_str()
        .filter(|value| !value.is_empty())
}

/// Instance id the event refers to. A payload without one is rejected
/// with the whole payload attached.
pub fn instance_id_from(payload: &Value) -> Result<String, Error> {
    INSTANCE_ID_FIELDS
        .iter()
        .find_map(|field| detail_str(payload, field))
        .map(str::to_string)
        .ok_or_else(|| make_input_err!("Cannot find instance ID in event payload: {payload}"))
}

/// A scale-down lifecycle hook notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleDownEvent {
    pub instance_id: String,
    pub lifecycle_hook_name: String,
    pub lifecycle_action_token: String,
    pub auto_scaling_group_name: String,
}

impl ScaleDownEvent {
    pub fn from_payload(payload: &Value) -> Result<Self, Error> {
        let required = |field: &str| {
            detail_str(payload, field)
                .map(str::to_string)
                .ok_or_else(|| make_input_err!("Cannot find {field} in event payload: {payload}"))
        };
        Ok(Self {
            instance_id: instance_id_from(payload)?,
            lifecycle_hook_name: required("LifecycleHookName")?,
            lifecycle_action_token: required("LifecycleActionToken")?,
            auto_scaling_group_name: required("AutoScalingGroupName")?,
        })
    }

    pub fn completion(&self) -> LifecycleActionCompletion {
        LifecycleActionCompletion {
            auto_scaling_group_name: self.auto_scaling_group_name.clone(),
            lifecycle_hook_name: self.lifecycle_hook_name.clone(),
            lifecycle_action_token: self.lifecycle_action_token.clone(),
            instance_id: self.instance_id.clone(),
        }
    }
}
