use crate::site::rewrite::extension;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found")]
    NotFound,

    #[error("invalid asset path")]
    InvalidPath,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Read-only view of uploaded site files, laid out as
/// `{root}/{owner}/{project}/{path}`.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request path onto the filesystem without leaving the project
    /// directory. Only plain path segments are accepted.
    pub fn resolve(&self, owner: &str, project: &str, relative: &str) -> Result<PathBuf, AssetError> {
        let mut path = self.root.clone();
        path.push(single_segment(owner)?);
        path.push(single_segment(project)?);

        let mut pushed = 0;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    pushed += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(AssetError::InvalidPath);
                }
            }
        }
        if pushed == 0 {
            return Err(AssetError::InvalidPath);
        }
        Ok(path)
    }

    /// Open a regular file, returning it with its length.
    pub async fn open(
        &self,
        owner: &str,
        project: &str,
        relative: &str,
    ) -> Result<(tokio::fs::File, u64), AssetError> {
        let path = self.resolve(owner, project, relative)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(AssetError::NotFound),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(AssetError::NotFound);
        }
        let file = tokio::fs::File::open(&path).await?;
        Ok((file, metadata.len()))
    }

    pub async fn read(&self, owner: &str, project: &str, relative: &str) -> Result<Vec<u8>, AssetError> {
        use tokio::io::AsyncReadExt;

        let (mut file, len) = self.open(owner, project, relative).await?;
        let mut buf = Vec::with_capacity(len as usize);
        file.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

fn single_segment(name: &str) -> Result<&str, AssetError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(AssetError::InvalidPath),
    }
}

/// Content type from the file extension.
pub fn mime_type(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_site() -> (tempfile::TempDir, AssetStore) {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("alice").join("blog");
        std::fs::create_dir_all(site.join("css")).unwrap();
        std::fs::write(site.join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(site.join("css/site.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("alice").join("secret.txt"), "nope").unwrap();
        let store = AssetStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_reads_nested_file() {
        let (_dir, store) = store_with_site();
        let bytes = store.read("alice", "blog", "css/site.css").await.unwrap();
        assert_eq!(bytes, b"body{}");
    }

    #[tokio::test]
    async fn test_missing_and_directory_are_not_found() {
        let (_dir, store) = store_with_site();
        assert!(matches!(
            store.read("alice", "blog", "missing.html").await,
            Err(AssetError::NotFound)
        ));
        assert!(matches!(
            store.open("alice", "blog", "css").await,
            Err(AssetError::NotFound)
        ));
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, store) = store_with_site();
        for bad in ["../secret.txt", "css/../../secret.txt", "/etc/passwd", ""] {
            assert!(
                matches!(store.resolve("alice", "blog", bad), Err(AssetError::InvalidPath)),
                "{bad} should be rejected"
            );
        }
        assert!(matches!(
            store.resolve("..", "blog", "index.html"),
            Err(AssetError::InvalidPath)
        ));
        assert!(matches!(
            store.resolve("alice", "a/b", "index.html"),
            Err(AssetError::InvalidPath)
        ));
        assert!(store.resolve("alice", "blog", "./css/site.css").is_ok());
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(mime_type("a/b/LOGO.PNG"), "image/png");
        assert_eq!(mime_type("app.mjs"), "application/javascript; charset=utf-8");
        assert_eq!(mime_type("README"), "application/octet-stream");
    }
}
