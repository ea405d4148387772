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

use async_trait::async_trait;
use fleetlink_error::{Code, Error, make_err};
use parking_lot::Mutex;

use crate::autoscaling::operations::{
    AutoscalingOperations, LifecycleActionCompletion, LifecycleActionResult,
};

/// Records completed lifecycle actions instead of calling AWS.
#[derive(Debug, Default)]
pub struct MockAutoscalingOperations {
    completions: Mutex<Vec<(LifecycleActionCompletion, LifecycleActionResult)>>,
    should_fail: Mutex<bool>,
}

impl MockAutoscalingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock() = should_fail;
    }

    pub fn completions(&self) -> Vec<(LifecycleActionCompletion, LifecycleActionResult)> {
        self.completions.lock().clone()
    }
}

#[async_trait]
impl AutoscalingOperations for MockAutoscalingOperations {
    async fn complete_lifecycle_action(
        &self,
        completion: &LifecycleActionCompletion,
        result: LifecycleActionResult,
    ) -> Result<(), Error> {
        if *self.should_fail.lock() {
            return Err(make_err!(
                Code::FailedPrecondition,
                "Simulated failure: no active lifecycle action for {}",
                completion.instance_id
            ));
        }
        self.completions.lock().push((completion.clone(), result));
        Ok(())
    }
}
