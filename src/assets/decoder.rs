use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::ApngResult;
use crate::model::decoded::DecodedImage;

/// Reference to an image resource handed to the player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Resource {
    /// No source. Loading it unloads the player.
    #[default]
    Empty,
    /// Encoded file contents held in memory.
    Bytes(Arc<[u8]>),
    /// A file on disk.
    Path(PathBuf),
}

impl Resource {
    /// Wrap encoded bytes.
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Reference a file on disk.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// `true` when there is nothing to decode.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(b) => b.is_empty(),
            Self::Path(p) => p.as_os_str().is_empty(),
        }
    }

    /// A second way to resolve this reference, tried after a failed decode.
    ///
    /// - Inline bytes that spell a path (UTF-8, single line) are re-read as a locator.
    /// - Relative paths are resolved against `base_dir` when one is configured.
    pub fn alternate(&self, base_dir: Option<&Path>) -> Option<Self> {
        match self {
            Self::Empty => None,
            Self::Bytes(b) => {
                let text = std::str::from_utf8(b).ok()?.trim();
                if text.is_empty() || text.chars().any(char::is_control) {
                    return None;
                }
                Some(Self::Path(resolve(Path::new(text), base_dir)))
            }
            Self::Path(p) => {
                let base = base_dir?;
                if p.is_absolute() {
                    return None;
                }
                Some(Self::Path(base.join(p)))
            }
        }
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Empty => "<empty>".to_string(),
            Self::Bytes(b) => format!("<{} bytes>", b.len()),
            Self::Path(p) => p.display().to_string(),
        }
    }
}

impl From<&str> for Resource {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

impl From<PathBuf> for Resource {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<Vec<u8>> for Resource {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b.into())
    }
}

fn resolve(p: &Path, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) if p.is_relative() => base.join(p),
        _ => p.to_path_buf(),
    }
}

/// Upstream decoder: turns a resource into a validated [`DecodedImage`].
///
/// Implementations parse the container and chunk structure; frame pixels may stay lazy behind
/// each descriptor's [`crate::PixelSource`].
pub trait ImageDecoder: Send + Sync {
    /// Decode `resource`. Fails with [`crate::ApngError::Decode`] on unreadable input.
    fn decode(&self, resource: &Resource) -> ApngResult<DecodedImage>;
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decoder.rs"]
mod tests;
