//! File operations confined to the workspace root

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::path::{ Component, Path, PathBuf };
use tracing::debug;

use super::{ ToolExecutor, parse_arguments };
use crate::errors::Error;
use crate::types::{ CallToolResult, Content, ResourceContents, Tool };

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    /// Path relative to the workspace
    pub path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileParams {
    /// Path relative to the workspace
    pub path: String,
    /// Text to write; replaces any existing content
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListDirectoryParams {
    /// Directory relative to the workspace, defaults to the root
    pub path: Option<String>,
}

pub struct FileExecutor {
    root: PathBuf,
}

impl FileExecutor {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Join `path` onto the root, refusing anything that would leave it
    fn resolve(&self, path: &str) -> Result<PathBuf, Error> {
        let requested = Path::new(path);
        let relative = if requested.is_absolute() {
            requested
                .strip_prefix(&self.root)
                .map_err(|_| Error::Execution(format!("Path is outside the workspace: {}", path)))?
        } else {
            requested
        };

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(
                            Error::Execution(format!("Path is outside the workspace: {}", path))
                        );
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::Execution(format!("Path is outside the workspace: {}", path)));
                }
            }
        }
        Ok(resolved)
    }

    /// Resolve `path` and follow symlinks, refusing targets outside the root.
    ///
    /// Components that do not exist yet (a file about to be written) are
    /// checked through their nearest existing ancestor.
    async fn locate(&self, path: &str) -> Result<PathBuf, Error> {
        let resolved = self.resolve(path)?;
        let root = tokio::fs
            ::canonicalize(&self.root).await
            .map_err(|e| Error::Execution(format!("Workspace root is unavailable: {}", e)))?;

        let mut existing = resolved.as_path();
        let mut missing = Vec::new();
        let canonical = loop {
            match tokio::fs::canonicalize(existing).await {
                Ok(canonical) => break canonical,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    match (existing.file_name(), existing.parent()) {
                        (Some(name), Some(parent)) => {
                            missing.push(name.to_os_string());
                            existing = parent;
                        }
                        _ => {
                            return Err(Error::Execution(format!("Failed to resolve {}: {}", path, e)));
                        }
                    }
                }
                Err(e) => {
                    return Err(Error::Execution(format!("Failed to resolve {}: {}", path, e)));
                }
            }
        };

        if !canonical.starts_with(&root) {
            return Err(Error::Execution(format!("Path is outside the workspace: {}", path)));
        }
        Ok(missing.into_iter().rev().fold(canonical, |path, name| path.join(name)))
    }

    async fn read_file(&self, params: ReadFileParams) -> Result<CallToolResult, Error> {
        let path = self.locate(&params.path).await?;
        debug!("Reading {}", path.display());
        let bytes = tokio::fs
            ::read(&path).await
            .map_err(|e| Error::Execution(format!("Failed to read {}: {}", params.path, e)))?;

        match String::from_utf8(bytes) {
            Ok(text) => Ok(CallToolResult::text(text)),
            Err(e) => {
                let mime_type = mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .to_string();
                let uri = format!("file://{}", path.display());
                Ok(
                    CallToolResult::success(
                        vec![
                            Content::resource(
                                ResourceContents::blob(uri, Some(mime_type), e.as_bytes())
                            )
                        ]
                    )
                )
            }
        }
    }

    async fn write_file(&self, params: WriteFileParams) -> Result<CallToolResult, Error> {
        let path = self.locate(&params.path).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs
            ::write(&path, params.content.as_bytes()).await
            .map_err(|e| Error::Execution(format!("Failed to write {}: {}", params.path, e)))?;
        Ok(CallToolResult::text(format!("Wrote {} bytes to {}", params.content.len(), params.path)))
    }

    async fn list_directory(&self, params: ListDirectoryParams) -> Result<CallToolResult, Error> {
        let shown = params.path.unwrap_or_else(|| ".".to_string());
        let path = self.locate(&shown).await?;
        let mut entries = tokio::fs
            ::read_dir(&path).await
            .map_err(|e| Error::Execution(format!("Failed to list {}: {}", shown, e)))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        if names.is_empty() {
            return Ok(CallToolResult::text(format!("{} is empty", shown)));
        }
        Ok(CallToolResult::text(names.join("\n")))
    }
}

#[async_trait]
impl ToolExecutor for FileExecutor {
    fn family(&self) -> &str {
        "files"
    }

    fn operations(&self) -> Vec<Tool> {
        vec![
            Tool::for_params::<ReadFileParams>("read_file", "Read a file from the workspace"),
            Tool::for_params::<WriteFileParams>(
                "write_file",
                "Write text to a file in the workspace, creating parent directories"
            ),
            Tool::for_params::<ListDirectoryParams>(
                "list_directory",
                "List the entries of a workspace directory"
            )
        ]
    }

    async fn execute(&self, operation: &str, arguments: Value) -> Result<CallToolResult, Error> {
        match operation {
            "read_file" => self.read_file(parse_arguments(operation, arguments)?).await,
            "write_file" => self.write_file(parse_arguments(operation, arguments)?).await,
            "list_directory" => self.list_directory(parse_arguments(operation, arguments)?).await,
            other => Err(Error::Execution(format!("files executor has no operation '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn write_then_read_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileExecutor::new(dir.path().to_path_buf());

        let written = files
            .execute("write_file", json!({ "path": "notes/todo.txt", "content": "ship it" })).await
            .unwrap();
        assert_eq!(written.first_text(), Some("Wrote 7 bytes to notes/todo.txt"));

        let read = files.execute("read_file", json!({ "path": "notes/todo.txt" })).await.unwrap();
        assert_eq!(read.first_text(), Some("ship it"));

        let listed = files.execute("list_directory", json!({})).await.unwrap();
        assert_eq!(listed.first_text(), Some("notes/"));
    }

    #[tokio::test]
    async fn binary_files_are_base64_resources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pixel.png"), [0x89u8, 0x50, 0x4e, 0x47, 0xff]).unwrap();
        let files = FileExecutor::new(dir.path().to_path_buf());

        let result = files.execute("read_file", json!({ "path": "pixel.png" })).await.unwrap();
        match &result.content[0] {
            Content::Resource { resource } => {
                assert_eq!(resource.mime_type.as_deref(), Some("image/png"));
                assert_eq!(resource.blob.as_deref(), Some("iVBOR/8="));
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn paths_cannot_escape_the_workspace() {
        let files = FileExecutor::new(PathBuf::from("/srv/work"));
        assert_eq!(files.resolve("a/./b/../c.txt").unwrap(), PathBuf::from("/srv/work/a/c.txt"));
        assert_eq!(files.resolve("/srv/work/x").unwrap(), PathBuf::from("/srv/work/x"));
        assert!(files.resolve("../etc/passwd").is_err());
        assert!(files.resolve("a/../../etc").is_err());
        assert!(files.resolve("/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_cannot_escape_the_workspace() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "TOP SECRET").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::fs::create_dir(dir.path().join("inside")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("inside"), dir.path().join("alias")).unwrap();
        let files = FileExecutor::new(dir.path().to_path_buf());

        let err = files
            .execute("read_file", json!({ "path": "link/secret.txt" })).await
            .unwrap_err();
        assert!(err.to_string().contains("outside the workspace"));

        let err = files
            .execute("write_file", json!({ "path": "link/new/file.txt", "content": "x" })).await
            .unwrap_err();
        assert!(err.to_string().contains("outside the workspace"));
        assert!(!outside.path().join("new").exists());

        assert!(files.execute("list_directory", json!({ "path": "link" })).await.is_err());

        // links that stay inside the workspace still work
        files
            .execute("write_file", json!({ "path": "alias/ok.txt", "content": "fine" })).await
            .unwrap();
        let read = files.execute("read_file", json!({ "path": "inside/ok.txt" })).await.unwrap();
        assert_eq!(read.first_text(), Some("fine"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileExecutor::new(dir.path().to_path_buf());
        let err = files.execute("read_file", json!({ "path": "nope.txt" })).await.unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }
}
