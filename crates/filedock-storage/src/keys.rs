//! Shared scope and key layout for storage backends.

use filedock_core::FileCategory;

use crate::traits::{StorageError, StorageResult};

/// Prefix applied to a stored name to form its thumbnail's name.
pub const THUMBNAIL_PREFIX: &str = "thumb_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Original,
    Thumbnail,
}

impl BlobKind {
    pub fn segment(&self) -> &'static str {
        match self {
            BlobKind::Original => "original",
            BlobKind::Thumbnail => "thumbnails",
        }
    }
}

/// Storage partition a blob is written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub category: FileCategory,
    pub kind: BlobKind,
}

impl Scope {
    pub fn original(category: FileCategory) -> Self {
        Scope {
            category,
            kind: BlobKind::Original,
        }
    }

    pub fn thumbnails(category: FileCategory) -> Self {
        Scope {
            category,
            kind: BlobKind::Thumbnail,
        }
    }

    /// `{category}/{original|thumbnails}`
    pub fn prefix(&self) -> String {
        format!("{}/{}", self.category.dir_name(), self.kind.segment())
    }

    /// Every scope of the layout, originals first.
    pub fn all() -> impl Iterator<Item = Scope> {
        FileCategory::ALL
            .into_iter()
            .flat_map(|category| [Scope::original(category), Scope::thumbnails(category)])
    }
}

/// Build the backend-relative key for a stored name inside a scope.
pub fn object_key(scope: &Scope, stored_name: &str) -> StorageResult<String> {
    validate_stored_name(stored_name)?;
    Ok(format!("{}/{}", scope.prefix(), stored_name))
}

pub fn validate_stored_name(stored_name: &str) -> StorageResult<()> {
    if stored_name.is_empty()
        || stored_name.contains('/')
        || stored_name.contains('\\')
        || stored_name.contains("..")
    {
        return Err(StorageError::InvalidKey(
            "Stored name contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

pub fn thumbnail_name(stored_name: &str) -> String {
    format!("{}{}", THUMBNAIL_PREFIX, stored_name)
}

/// Derive a thumbnail's location from its original's location by swapping the
/// `original` scope segment for `thumbnails` and prefixing the file name.
///
/// Returns `None` when the location is not inside an `original` scope.
pub fn thumbnail_location_for(original_location: &str) -> Option<String> {
    let (dir, name) = original_location.rsplit_once('/')?;
    let parent = dir.strip_suffix(BlobKind::Original.segment())?;
    if !(parent.is_empty() || parent.ends_with('/')) || name.is_empty() {
        return None;
    }
    Some(format!(
        "{}{}/{}",
        parent,
        BlobKind::Thumbnail.segment(),
        thumbnail_name(name)
    ))
}
