//! Resource content providers
//!
//! A registered resource pairs its descriptor with a `ResourceProvider` that
//! produces the contents on `resources/read`. Contents are always returned as
//! `resource` blocks carrying the resource's URI.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::errors::Error;
use crate::types::{ Content, Resource, ResourceContents };

/// Produces the contents of an addressable resource
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn read(&self, resource: &Resource) -> Result<Vec<Content>, Error>;
}

/// Fixed text held in memory
pub struct StaticResource {
    text: String,
}

impl StaticResource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ResourceProvider for StaticResource {
    async fn read(&self, resource: &Resource) -> Result<Vec<Content>, Error> {
        Ok(
            vec![
                Content::resource(
                    ResourceContents::text(&resource.uri, resource.mime_type.clone(), &self.text)
                )
            ]
        )
    }
}

/// A file on disk, read on every request
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResourceProvider for FileResource {
    async fn read(&self, resource: &Resource) -> Result<Vec<Content>, Error> {
        debug!("Reading resource {} from {}", resource.uri, self.path.display());
        let bytes = tokio::fs
            ::read(&self.path).await
            .map_err(|e| Error::Execution(format!("{}: {}", self.path.display(), e)))?;

        let mime_type = resource.mime_type
            .clone()
            .or_else(|| mime_guess::from_path(&self.path).first().map(|m| m.to_string()));

        let contents = match String::from_utf8(bytes) {
            Ok(text) => ResourceContents::text(&resource.uri, mime_type, text),
            Err(e) => ResourceContents::blob(&resource.uri, mime_type, e.as_bytes()),
        };
        Ok(vec![Content::resource(contents)])
    }
}

/// Newline separated listing of a directory's entries
pub struct DirectoryResource {
    root: PathBuf,
}

impl DirectoryResource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ResourceProvider for DirectoryResource {
    async fn read(&self, resource: &Resource) -> Result<Vec<Content>, Error> {
        let mut entries = tokio::fs
            ::read_dir(&self.root).await
            .map_err(|e| Error::Execution(format!("{}: {}", self.root.display(), e)))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        Ok(
            vec![
                Content::resource(
                    ResourceContents::text(
                        &resource.uri,
                        Some("text/plain".to_string()),
                        names.join("\n")
                    )
                )
            ]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_text_is_wrapped_in_a_resource_block() {
        let resource = Resource::new("project://readme", "readme").with_mime_type("text/markdown");
        let blocks = StaticResource::new("# Hello").read(&resource).await.unwrap();

        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Content::Resource { resource: contents } => {
                assert_eq!(contents.uri, "project://readme");
                assert_eq!(contents.mime_type.as_deref(), Some("text/markdown"));
                assert_eq!(contents.text.as_deref(), Some("# Hello"));
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[tokio::test]
    async fn file_resource_guesses_media_type_and_encodes_binary() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("notes.txt");
        let bin_path = dir.path().join("logo.png");
        std::fs::write(&text_path, "remember").unwrap();
        std::fs::write(&bin_path, [0x89u8, 0x50, 0xff, 0xfe]).unwrap();

        let text = FileResource::new(&text_path)
            .read(&Resource::new("file://notes", "notes")).await
            .unwrap();
        assert_eq!(text[0].as_text(), Some("remember"));

        let binary = FileResource::new(&bin_path)
            .read(&Resource::new("file://logo", "logo")).await
            .unwrap();
        match &binary[0] {
            Content::Resource { resource } => {
                assert_eq!(resource.mime_type.as_deref(), Some("image/png"));
                assert!(resource.blob.is_some());
                assert!(resource.text.is_none());
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = FileResource::new("/definitely/not/here")
            .read(&Resource::new("file://gone", "gone")).await;
        assert!(matches!(result, Err(Error::Execution(_))));
    }

    #[tokio::test]
    async fn directory_listing_marks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();

        let blocks = DirectoryResource::new(dir.path())
            .read(&Resource::new("project://workspace", "workspace")).await
            .unwrap();
        assert_eq!(blocks[0].as_text(), Some("Cargo.toml\nsrc/"));
    }
}
