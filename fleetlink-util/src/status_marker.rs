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

use core::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fleetlink_error::{Error, ResultExt};
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{Level, event};

/// A durable set-once flag with a free text status attached.
#[async_trait]
pub trait StatusMarker: Send + Sync + Debug {
    async fn is_set(&self) -> Result<bool, Error>;

    /// Stores `status` unless the marker already exists. Returns whether
    /// this call created it.
    async fn set_once(&self, status: &str) -> Result<bool, Error>;
}

/// Marker backed by a file; its existence is the flag.
#[derive(Debug, Clone)]
pub struct FileStatusMarker {
    path: PathBuf,
}

impl FileStatusMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StatusMarker for FileStatusMarker {
    async fn is_set(&self) -> Result<bool, Error> {
        tokio::fs::try_exists(&self.path)
            .await
            .err_tip(|| format!("Could not check status file {}", self.path.display()))
    }

    async fn set_once(&self, status: &str) -> Result<bool, Error> {
        let open_result = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;
        let mut file = match open_result {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(e)
                    .err_tip(|| format!("Could not create status file {}", self.path.display()));
            }
        };
        fill_or_remove(&self.path, file, status).await?;
        Ok(true)
    }
}

/// Writes `status` into the freshly created marker at `path`. A partially
/// written marker would read as set forever, so it is removed on failure.
async fn fill_or_remove<W: AsyncWrite + Unpin>(
    path: &Path,
    mut file: W,
    status: &str,
) -> Result<(), Error> {
    let written = match file.write_all(status.as_bytes()).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    let Err(write_err) = written else {
        return Ok(());
    };
    drop(file);
    if let Err(remove_err) = tokio::fs::remove_file(path).await {
        event!(
            Level::WARN,
            path = %path.display(),
            ?remove_err,
            "Could not remove incomplete status file"
        );
    }
    Err(write_err).err_tip(|| format!("Could not write status file {}", path.display()))
}

/// In-memory marker, handy where no filesystem should be touched.
#[derive(Debug, Default)]
pub struct MemoryStatusMarker {
    status: Mutex<Option<String>>,
}

impl MemoryStatusMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A marker that is already set, as after an earlier boot.
    pub fn with_status(status: &str) -> Self {
        Self {
            status: Mutex::new(Some(status.to_string())),
        }
    }

    pub fn status(&self) -> Option<String> {
        self.status.lock().clone()
    }
}

#[async_trait]
impl StatusMarker for MemoryStatusMarker {
    async fn is_set(&self) -> Result<bool, Error> {
        Ok(self.status.lock().is_some())
    }

    async fn set_once(&self, status: &str) -> Result<bool, Error> {
        let mut guard = self.status.lock();
        if guard.is_some() {
            return Ok(false);
        }
        *guard = Some(status.to_string());
        Ok(true)
    }
}
