//! Materialization of shared content into the shared storage root.
//!
//! Text and web links are wrapped verbatim. File-backed content is copied
//! into the root under a `<uuid>.<ext>` name so concurrent shares of the same
//! source never collide, and the item records where the copy landed.

use std::{
    fs::File,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    sharebridge_common::{LocationStyle, SharedItem},
    tracing::{debug, instrument},
    url::Url,
    uuid::Uuid,
};

use crate::{
    error::{Error, Result},
    mime::{classify, extension_for_mime},
    scope::{ScopedAccess, SecurityScope, Unscoped},
};

/// Produces [`SharedItem`]s, copying file-backed content into `root`.
#[derive(Clone)]
pub struct Materializer {
    root: PathBuf,
    location_style: LocationStyle,
    scope: Arc<dyn SecurityScope>,
}

impl Materializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            location_style: LocationStyle::default(),
            scope: Arc::new(Unscoped),
        }
    }

    #[must_use]
    pub fn with_location_style(mut self, style: LocationStyle) -> Self {
        self.location_style = style;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Arc<dyn SecurityScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn materialize_text(&self, text: impl Into<String>) -> SharedItem {
        SharedItem::text(text)
    }

    /// `file://` links are materialized as files; anything else is kept
    /// verbatim as text.
    pub async fn materialize_link(&self, link: &str) -> Result<SharedItem> {
        match Url::parse(link) {
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| Error::invalid_source(format!("`{link}` is not a local path")))?;
                self.materialize_file(&path).await
            },
            _ => Ok(SharedItem::text(link)),
        }
    }

    /// Copy `source` into the storage root and describe the copy.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub async fn materialize_file(&self, source: &Path) -> Result<SharedItem> {
        self.ensure_root().await?;

        let _access = ScopedAccess::acquire(Arc::clone(&self.scope), source)?;

        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| Error::source_unreadable(source, e))?;
        if !metadata.is_file() {
            return Err(Error::source_unreadable(
                source,
                io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let original_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::invalid_source(format!("{} has no file name", source.display()))
            })?;
        let extension = source.extension().map(|e| e.to_string_lossy().into_owned());
        let destination = self.fresh_destination(extension.as_deref()).await?;

        let bytes = {
            let (from, to) = (source.to_path_buf(), destination.clone());
            tokio::task::spawn_blocking(move || coordinated_copy(&from, &to))
                .await
                .map_err(|e| Error::copy(&destination, io::Error::other(e)))??
        };

        let mime = classify(&destination.to_string_lossy());
        debug!(
            destination = %destination.display(),
            bytes,
            mime,
            "materialized file"
        );
        Ok(SharedItem::file(
            self.location_of(&destination)?,
            mime,
            original_name,
        ))
    }

    /// Write raw bytes offered without a file reference.
    ///
    /// The extension comes from `suggested_name`, else from `mime_type`.
    pub async fn materialize_data(
        &self,
        bytes: &[u8],
        suggested_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<SharedItem> {
        self.ensure_root().await?;

        let mime_type = mime_type.map(str::trim).filter(|m| !m.is_empty());
        let extension = suggested_name
            .and_then(|n| Path::new(n).extension())
            .map(|e| e.to_string_lossy().into_owned())
            .or_else(|| mime_type.and_then(extension_for_mime).map(str::to_owned));
        let destination = self.fresh_destination(extension.as_deref()).await?;

        tokio::fs::write(&destination, bytes)
            .await
            .map_err(|e| Error::copy(&destination, e))?;

        let mime = mime_type
            .map(str::to_owned)
            .unwrap_or_else(|| classify(&destination.to_string_lossy()).to_owned());
        let file_name = match suggested_name {
            Some(name) if !name.trim().is_empty() => name.to_owned(),
            _ => destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        debug!(destination = %destination.display(), bytes = bytes.len(), "materialized data");
        Ok(SharedItem::file(
            self.location_of(&destination)?,
            mime,
            file_name,
        ))
    }

    async fn ensure_root(&self) -> Result<()> {
        let unavailable = |source| Error::DestinationUnavailable {
            root: self.root.clone(),
            source,
        };
        let meta = tokio::fs::metadata(&self.root).await.map_err(unavailable)?;
        if !meta.is_dir() {
            return Err(unavailable(io::Error::new(
                ErrorKind::NotADirectory,
                "not a directory",
            )));
        }
        Ok(())
    }

    /// Pick a unique destination and clear anything already there.
    async fn fresh_destination(&self, extension: Option<&str>) -> Result<PathBuf> {
        let destination = self.root.join(unique_file_name(extension));
        match tokio::fs::remove_file(&destination).await {
            Ok(()) => debug!(destination = %destination.display(), "replaced existing file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => return Err(Error::copy(&destination, e)),
        }
        Ok(destination)
    }

    fn location_of(&self, destination: &Path) -> Result<String> {
        let absolute =
            std::path::absolute(destination).map_err(|e| Error::copy(destination, e))?;
        match self.location_style {
            LocationStyle::Path => Ok(absolute.to_string_lossy().into_owned()),
            LocationStyle::FileUrl => Url::from_file_path(&absolute)
                .map(String::from)
                .map_err(|()| {
                    Error::invalid_source(format!(
                        "{} cannot be expressed as a file URL",
                        absolute.display()
                    ))
                }),
        }
    }
}

/// `<uuid>.<ext>`, or just `<uuid>` when there is no usable extension.
fn unique_file_name(extension: Option<&str>) -> String {
    let id = Uuid::new_v4().to_string().to_uppercase();
    match extension.map(str::trim).filter(|e| !e.is_empty()) {
        Some(ext) => format!("{id}.{ext}"),
        None => id,
    }
}

/// Copy under a shared advisory lock so a concurrent writer that also
/// coordinates through the lock cannot hand us a half-written file.
fn coordinated_copy(source: &Path, destination: &Path) -> Result<u64> {
    let file = File::open(source).map_err(|e| Error::source_unreadable(source, e))?;
    let lock = fd_lock::RwLock::new(file);
    let guard = lock
        .read()
        .map_err(|e| Error::source_unreadable(source, e))?;
    let mut reader: &File = &guard;

    let mut out = File::create(destination).map_err(|e| Error::copy(destination, e))?;
    let bytes = io::copy(&mut reader, &mut out).map_err(|e| Error::copy(destination, e))?;
    out.sync_all().map_err(|e| Error::copy(destination, e))?;
    Ok(bytes)
}
