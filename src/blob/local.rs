//! Local filesystem blob store.
//!
//! Objects live under `<base>/<bucket>/`. Keys are object names, not paths:
//! the hex encoding of a key is split into directory components of
//! [`SEGMENT_LENGTH`] characters, and the last segment names the file. Any
//! non-empty key maps to a path inside the bucket directory, whatever its
//! length or contents. Suitable for development, tests and single-node
//! deployments.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use super::error::BlobError;
use super::BlobStore;

/// Hex characters per path component. Well under the usual 255 byte file
/// name limit, leaving room for the suffixes.
pub const SEGMENT_LENGTH: usize = 200;

/// Suffix of object files. Directory segments never carry it, so a file can
/// not collide with the directory of a longer key.
const OBJECT_SUFFIX: &str = ".obj";

pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, BlobError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;

        info!("Initialized local blob store at {:?}", base_path);

        Ok(Self { base_path })
    }

    /// Resolve the file of an object inside its bucket directory.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, BlobError> {
        let mut bucket_components = Path::new(bucket).components();
        let single_normal = matches!(bucket_components.next(), Some(Component::Normal(_)))
            && bucket_components.next().is_none();
        if !single_normal {
            return Err(BlobError::InvalidKey(format!("{}/{}", bucket, key)));
        }
        if key.is_empty() {
            return Err(BlobError::InvalidKey(key.to_string()));
        }

        let encoded = hex::encode(key.as_bytes());
        let segments: Vec<&str> = encoded
            .as_bytes()
            .chunks(SEGMENT_LENGTH)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();

        let mut path = self.base_path.join(bucket);
        if let Some((last, dirs)) = segments.split_last() {
            for dir in dirs {
                path.push(dir);
            }
            path.push(format!("{}{}", last, OBJECT_SUFFIX));
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BlobError> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(data) => {
                debug!("Read object {}/{} ({} bytes)", bucket, key, data.len());
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), BlobError> {
        let path = self.object_path(bucket, key)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| BlobError::InvalidKey(key.to_string()))?
            .to_string_lossy()
            .into_owned();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never observe a partial object
        let partial = path.with_file_name(format!(".{}.partial", file_name));
        fs::write(&partial, &data).await?;
        fs::rename(&partial, &path).await?;

        debug!("Wrote object {}/{} ({} bytes)", bucket, key, data.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        store
            .put_object("events", "abc!!!00", Bytes::from_static(b"{\"a\":1}"))
            .await
            .unwrap();
        let data = store.get_object("events", "abc!!!00").await.unwrap();
        assert_eq!(&data[..], b"{\"a\":1}");
        assert!(dir
            .path()
            .join("events")
            .join(format!("{}.obj", hex::encode("abc!!!00")))
            .exists());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        store.put_object("b", "k", Bytes::from_static(b"one")).await.unwrap();
        store.put_object("b", "k", Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(&store.get_object("b", "k").await.unwrap()[..], b"two");
    }

    #[tokio::test]
    async fn test_keys_are_names_not_paths() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("store");
        let store = LocalBlobStore::new(&base).await.unwrap();

        let long = "k".repeat(700);
        let keys = ["../outside", "/etc/passwd", "a/../../b", "tail/with/slashes", "..", long.as_str()];
        for (i, key) in keys.iter().enumerate() {
            let data = Bytes::from(format!("object {}", i));
            store.put_object("b", key, data.clone()).await.unwrap();
            assert_eq!(store.get_object("b", key).await.unwrap(), data, "key {:?}", key);
        }

        // Nothing is written outside the bucket directory
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert_eq!(entries.next().unwrap().unwrap().file_name(), "store");
        assert!(entries.next().is_none());
        assert!(!dir.path().join("outside").exists());
    }

    #[tokio::test]
    async fn test_key_prefix_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        // The hex of `short` is exactly the first directory segment of `long`
        let short = "s".repeat(SEGMENT_LENGTH / 2);
        let long = "s".repeat(SEGMENT_LENGTH);
        store.put_object("b", &short, Bytes::from_static(b"short")).await.unwrap();
        store.put_object("b", &long, Bytes::from_static(b"long")).await.unwrap();

        assert_eq!(&store.get_object("b", &short).await.unwrap()[..], b"short");
        assert_eq!(&store.get_object("b", &long).await.unwrap()[..], b"long");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        let err = store.get_object("b", "missing").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rejects_invalid_bucket_and_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();

        let err = store.put_object("b", "", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, BlobError::InvalidKey(_)));
        for bucket in ["", "a/b", "..", "/abs"] {
            let err = store.get_object(bucket, "k").await.unwrap_err();
            assert!(matches!(err, BlobError::InvalidKey(_)), "bucket {:?}", bucket);
        }
    }
}
