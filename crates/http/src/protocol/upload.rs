//! Uploaded files and the tree that carries them on an incoming request.
//!
//! Parsing `multipart/form-data` is left to the transport; this module only
//! fixes the contract a parsed file has to honor ([`UploadedFile`]) and the
//! shape of the collection ([`UploadedFiles`]), which mirrors the field
//! naming of the form, e.g. `docs[0]` or `profile[avatar]`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ensure;
use crate::protocol::{InvalidArgument, StreamError};
use crate::stream::Body;

/// Outcome of a single file upload as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    Ok,
    /// Larger than the server-wide limit.
    TooLarge,
    /// Larger than the limit declared by the form.
    FormTooLarge,
    Partial,
    NoFile,
    NoTempDir,
    CantWrite,
    /// Stopped by an extension or filter of the transport.
    Rejected,
}

impl UploadStatus {
    pub fn is_ok(self) -> bool {
        self == UploadStatus::Ok
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UploadStatus::Ok => "ok",
            UploadStatus::TooLarge => "file exceeds the server size limit",
            UploadStatus::FormTooLarge => "file exceeds the form size limit",
            UploadStatus::Partial => "file was only partially uploaded",
            UploadStatus::NoFile => "no file was uploaded",
            UploadStatus::NoTempDir => "missing temporary directory",
            UploadStatus::CantWrite => "failed to write file to disk",
            UploadStatus::Rejected => "upload stopped by an extension",
        };
        f.write_str(text)
    }
}

/// Capability contract of a file received through a form upload.
pub trait UploadedFile: fmt::Debug + Send + Sync {
    /// The uploaded content.
    ///
    /// # Errors
    ///
    /// Fails when the upload failed or the file was already moved.
    fn stream(&self) -> Result<Body, StreamError>;

    /// Moves the uploaded content to `target`. Can only succeed once.
    ///
    /// # Errors
    ///
    /// Fails when the upload failed, the file was already moved, or on any
    /// I/O error while moving.
    fn move_to(&self, target: &Path) -> Result<(), StreamError>;

    /// Size in bytes, when known.
    fn size(&self) -> Option<u64>;

    fn status(&self) -> UploadStatus;

    /// The file name sent by the client. Don't trust it.
    fn client_filename(&self) -> Option<&str>;

    /// The media type sent by the client. Don't trust it.
    fn client_media_type(&self) -> Option<&str>;
}

/// A possibly nested collection of uploaded files.
#[derive(Debug, Clone)]
pub enum UploadedFiles {
    File(Arc<dyn UploadedFile>),
    List(Vec<UploadedFiles>),
    Map(IndexMap<String, UploadedFiles>),
}

impl UploadedFiles {
    pub fn file<F: UploadedFile + 'static>(file: F) -> Self {
        UploadedFiles::File(Arc::new(file))
    }

    /// Entry of a map node, `None` for leaves and lists.
    pub fn get(&self, key: &str) -> Option<&UploadedFiles> {
        match self {
            UploadedFiles::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Element of a list node, `None` for leaves and maps.
    pub fn get_index(&self, index: usize) -> Option<&UploadedFiles> {
        match self {
            UploadedFiles::List(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&dyn UploadedFile> {
        match self {
            UploadedFiles::File(file) => Some(file.as_ref()),
            _ => None,
        }
    }

    /// Number of leaves in the tree.
    pub fn file_count(&self) -> usize {
        match self {
            UploadedFiles::File(_) => 1,
            UploadedFiles::List(items) => items.iter().map(UploadedFiles::file_count).sum(),
            UploadedFiles::Map(entries) => entries.values().map(UploadedFiles::file_count).sum(),
        }
    }

    /// Checks every leaf, stopping at the first inconsistent one.
    ///
    /// # Errors
    ///
    /// Fails when a leaf reports a successful upload without a size. The
    /// error carries the form-style path of the leaf.
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        self.validate_at(&mut String::new())
    }

    fn validate_at(&self, path: &mut String) -> Result<(), InvalidArgument> {
        match self {
            UploadedFiles::File(file) => {
                let location = if path.is_empty() { "<root>" } else { path.as_str() };
                ensure!(
                    !file.status().is_ok() || file.size().is_some(),
                    InvalidArgument::uploaded_file(location, "successful upload without a size")
                );
                Ok(())
            }
            UploadedFiles::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    let len = path.len();
                    push_segment(path, &index.to_string());
                    item.validate_at(path)?;
                    path.truncate(len);
                }
                Ok(())
            }
            UploadedFiles::Map(entries) => {
                for (key, item) in entries {
                    let len = path.len();
                    push_segment(path, key);
                    item.validate_at(path)?;
                    path.truncate(len);
                }
                Ok(())
            }
        }
    }
}

impl Default for UploadedFiles {
    fn default() -> Self {
        UploadedFiles::Map(IndexMap::new())
    }
}

fn push_segment(path: &mut String, segment: &str) {
    if path.is_empty() {
        path.push_str(segment);
    } else {
        path.push('[');
        path.push_str(segment);
        path.push(']');
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug)]
    pub(crate) struct FakeUpload {
        content: &'static str,
        status: UploadStatus,
        size: Option<u64>,
        moved: Mutex<bool>,
    }

    impl FakeUpload {
        pub(crate) fn ok(content: &'static str) -> Self {
            Self { content, status: UploadStatus::Ok, size: Some(content.len() as u64), moved: Mutex::new(false) }
        }

        pub(crate) fn failed(status: UploadStatus) -> Self {
            Self { content: "", status, size: None, moved: Mutex::new(false) }
        }

        pub(crate) fn without_size(content: &'static str) -> Self {
            Self { size: None, ..Self::ok(content) }
        }
    }

    impl UploadedFile for FakeUpload {
        fn stream(&self) -> Result<Body, StreamError> {
            if *self.moved.lock().unwrap() || !self.status.is_ok() {
                return Err(StreamError::Detached);
            }
            Ok(Body::from(self.content))
        }

        fn move_to(&self, target: &Path) -> Result<(), StreamError> {
            let mut moved = self.moved.lock().unwrap();
            if *moved || !self.status.is_ok() {
                return Err(StreamError::Detached);
            }
            std::fs::write(target, self.content)?;
            *moved = true;
            Ok(())
        }

        fn size(&self) -> Option<u64> {
            self.size
        }

        fn status(&self) -> UploadStatus {
            self.status
        }

        fn client_filename(&self) -> Option<&str> {
            Some("upload.txt")
        }

        fn client_media_type(&self) -> Option<&str> {
            Some("text/plain")
        }
    }

    fn nested() -> UploadedFiles {
        UploadedFiles::Map(IndexMap::from([
            ("avatar".to_string(), UploadedFiles::file(FakeUpload::ok("png"))),
            (
                "docs".to_string(),
                UploadedFiles::List(vec![
                    UploadedFiles::file(FakeUpload::ok("a")),
                    UploadedFiles::file(FakeUpload::failed(UploadStatus::NoFile)),
                ]),
            ),
        ]))
    }

    #[test]
    fn valid_tree() {
        let files = nested();
        assert_eq!(files.validate(), Ok(()));
        assert_eq!(files.file_count(), 3);
        assert_eq!(UploadedFiles::default().validate(), Ok(()));
        assert_eq!(UploadedFiles::default().file_count(), 0);
    }

    #[test]
    fn navigate_tree() {
        let files = nested();
        let avatar = files.get("avatar").and_then(UploadedFiles::as_file).unwrap();
        assert_eq!(avatar.size(), Some(3));
        assert_eq!(avatar.client_media_type(), Some("text/plain"));

        let second = files.get("docs").and_then(|docs| docs.get_index(1)).and_then(UploadedFiles::as_file).unwrap();
        assert_eq!(second.status(), UploadStatus::NoFile);

        assert!(files.get("missing").is_none());
        assert!(files.get_index(0).is_none());
    }

    #[test]
    fn first_bad_leaf_is_reported() {
        let files = UploadedFiles::Map(IndexMap::from([(
            "profile".to_string(),
            UploadedFiles::Map(IndexMap::from([(
                "docs".to_string(),
                UploadedFiles::List(vec![
                    UploadedFiles::file(FakeUpload::ok("a")),
                    UploadedFiles::file(FakeUpload::without_size("b")),
                    UploadedFiles::file(FakeUpload::without_size("c")),
                ]),
            )])),
        )]));

        let error = files.validate().unwrap_err();
        assert_eq!(error, InvalidArgument::uploaded_file("profile[docs][1]", "successful upload without a size"));
    }

    #[test]
    fn bad_root_leaf() {
        let files = UploadedFiles::file(FakeUpload::without_size("x"));
        assert!(matches!(files.validate(), Err(InvalidArgument::UploadedFile { path, .. }) if path == "<root>"));
    }

    #[test]
    fn move_only_once() {
        let upload = FakeUpload::ok("content");
        assert_eq!(upload.stream().unwrap().to_string(), "content");

        let target = std::env::temp_dir().join(format!("micro-message-upload-{}", std::process::id()));
        upload.move_to(&target).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "content");
        std::fs::remove_file(&target).unwrap();

        assert!(upload.move_to(&target).unwrap_err().is_detached());
        assert!(upload.stream().is_err());
    }
}
