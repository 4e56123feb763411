use crate::{
    errors::ImageError,
    image::{Repository, Tag},
};
use std::{fmt, str::FromStr};

/// Namespace for official images named with a single path segment
pub const LIBRARY_PREFIX: &str = "library";

/// Parsed `name[:tag]` image reference
///
/// The tag is everything after the first colon, and defaults to `latest`. A
/// single-segment name like `busybox` is an official image and is resolved
/// under the [LIBRARY_PREFIX] namespace, as the registry expects:
///
/// ```
/// # use burrow::ImageReference;
/// let image: ImageReference = "busybox".parse().unwrap();
/// assert_eq!(image.repository().as_str(), "library/busybox");
/// assert_eq!(image.tag().as_str(), "latest");
/// ```
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct ImageReference {
    repository: Repository,
    tag: Tag,
}

impl ImageReference {
    /// Parse a [prim@str] as an [ImageReference]
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        let (name, tag) = match s.split_once(':') {
            Some((name, tag)) => (name, Tag::parse(tag)?),
            None => (s, Tag::latest()),
        };
        Ok(ImageReference::from_parts(Repository::parse(name)?, tag))
    }

    /// Build a reference from already-validated parts
    ///
    /// The library prefix is applied here too, so `from_parts` and `parse`
    /// always agree.
    pub fn from_parts(repository: Repository, tag: Tag) -> Self {
        let repository = if repository.is_single_segment() {
            Repository::parse(LIBRARY_PREFIX)
                .expect("library prefix is a valid repository")
                .join(&repository)
        } else {
            repository
        };
        ImageReference { repository, tag }
    }

    /// Full repository path on the registry, like `library/busybox`
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }
}

impl FromStr for ImageReference {
    type Err = ImageError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageReference::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl fmt::Debug for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
