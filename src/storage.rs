use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store `body` under `key` (a `/`-separated path relative to the assets root),
    /// replacing any existing object.
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()>;
}

/// Assets on the local filesystem, later served statically.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        let mut path = self.root.clone();
        for part in key.split('/') {
            anyhow::ensure!(
                !part.is_empty() && part != "." && part != "..",
                "invalid object key {key:?}"
            );
            path.push(part);
        }
        Ok(path)
    }
}

#[async_trait]
impl AssetStorage for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        let target = self.resolve(key)?;
        let dir = target
            .parent()
            .with_context(|| format!("no parent dir for {}", target.display()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create dir {}", dir.display()))?;

        // Same directory as the target so the rename stays on one filesystem.
        let tmp = dir.join(format!(".upload-{}.tmp", Uuid::new_v4()));
        if let Err(e) = write_then_rename(&tmp, &target, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        tracing::debug!(path = %target.display(), bytes = body.len(), "asset written");
        Ok(())
    }
}

async fn write_then_rename(tmp: &Path, target: &Path, body: &[u8]) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::create(tmp)
        .await
        .with_context(|| format!("create {}", tmp.display()))?;
    file.write_all(body)
        .await
        .with_context(|| format!("write {}", tmp.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("sync {}", tmp.display()))?;
    drop(file);
    tokio::fs::rename(tmp, target)
        .await
        .with_context(|| format!("rename into {}", target.display()))?;
    Ok(())
}
