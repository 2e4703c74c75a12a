// Copyright 2021 The Jujutsu Authors
// Copyright 2026 The Chasm Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Filesystem helpers shared by the disk backend: directory creation,
//! temp-file-and-rename persistence, and the contention-retry loop.

use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use tempfile::NamedTempFile;
use tempfile::PersistError;
use tokio::io::AsyncRead;
use tokio::io::ReadBuf;

/// Creates a directory or does nothing if it already exists.
pub fn create_or_reuse_dir(dirname: &Path) -> io::Result<()> {
    match fs::create_dir_all(dirname) {
        Ok(()) => Ok(()),
        Err(_) if dirname.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Persists the temporary file after synchronizing its content, without
/// clobbering an existing file at `new_path`. Content-addressed writes land
/// here: the destination name is derived from the digest of what was
/// written, so if the destination already exists its content is guaranteed
/// identical and the newly written file can simply be dropped.
///
/// After system crash, the persisted file should have a valid content if it
/// exists; it's up to the caller to fsync the containing directory if the
/// directory entry itself must survive a crash.
pub fn persist_content_addressed_temp_file<P: AsRef<Path>>(
    temp_file: NamedTempFile,
    new_path: P,
) -> io::Result<File> {
    temp_file.as_file().sync_data()?;
    if cfg!(windows) {
        match temp_file.persist_noclobber(&new_path) {
            Ok(file) => Ok(file),
            Err(PersistError { error, file: _ }) => {
                if let Ok(existing_file) = File::open(new_path) {
                    Ok(existing_file)
                } else {
                    Err(error)
                }
            }
        }
    } else {
        // On Unix, rename() is atomic and succeeds even if the destination
        // exists, so there is no separate existence check to race against.
        temp_file
            .persist(new_path)
            .map_err(|PersistError { error, file: _ }| error)
    }
}

/// Retries `operation` up to `attempts` times (including the first try) with
/// a fixed `delay` between attempts, for transient I/O errors racing with
/// another writer on the same path. Returns the last error if every attempt
/// fails.
pub async fn retry_on_contention<T, F, Fut>(
    attempts: usize,
    delay: Duration,
    mut operation: F,
) -> io::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt + 1 < attempts {
                    tracing::warn!(attempt, %err, "retrying after transient I/O error");
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(err);
            }
        }
    }
    Err(last_err.expect("attempts is at least 1"))
}

/// `AsyncRead` implementation backed by a `Read`. It is not actually async;
/// the goal is simply to avoid reading the full contents of the `Read` into
/// memory before forwarding it to an async consumer.
pub struct BlockingAsyncReader<R> {
    reader: R,
}

impl<R: Read + Unpin> BlockingAsyncReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Unpin> AsyncRead for BlockingAsyncReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let num_bytes_read = self.reader.read(buf.initialize_unfilled())?;
        buf.advance(num_bytes_read);
        Poll::Ready(Ok(()))
    }
}
