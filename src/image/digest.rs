use crate::errors::ImageError;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::{fmt, ops::Range, str::FromStr};

/// A digest naming one blob or manifest on a registry
///
/// Digests are an algorithm name and a hex string separated by one colon, like
/// `sha256:4c0d...`. We never verify content against them; parsing only makes
/// sure a registry-provided digest is safe to put into a URL path or a file
/// name.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Digest {
    serialized: String,
    algorithm_pos: Range<usize>,
    hex_pos: Range<usize>,
}

impl Digest {
    /// Returns a reference to the string representation of a [Digest]
    ///
    /// This string always has a single colon. After the colon is 32 or more
    /// lowercase hexadecimal digits. The algorithm before the colon is
    /// alphanumeric, with plus, dash, underscore, or dot characters allowed
    /// as separators.
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Parse a [prim@str] as a [Digest]
    ///
    /// ```
    /// # use burrow::image::Digest;
    /// let digest = Digest::parse("sha256:00112233445566778899aabbccddeeff").unwrap();
    /// assert_eq!(digest.algorithm_str(), "sha256");
    /// assert_eq!(digest.hex_str(), "00112233445566778899aabbccddeeff")
    /// ```
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        lazy_static! {
            static ref RE: Regex = Regex::new(concat!(
                "^",
                "(?P<alg>",
                /*  */ "[a-zA-Z][a-zA-Z0-9]*",
                /*  */ "(?:[-_+.][a-zA-Z][a-zA-Z0-9]*)*",
                ")",
                "[:]",
                "(?P<hex>[a-f0-9]{32,})",
                "$",
            ))
            .unwrap();
        }
        match RE.captures(s) {
            None => Err(ImageError::InvalidReferenceFormat(s.to_owned())),
            Some(captures) => Ok(Digest {
                serialized: s.to_owned(),
                algorithm_pos: captures.name("alg").unwrap().range(),
                hex_pos: captures.name("hex").unwrap().range(),
            }),
        }
    }

    /// The algorithm portion, typically `sha256`
    pub fn algorithm_str(&self) -> &str {
        &self.serialized[self.algorithm_pos.clone()]
    }

    /// The hexadecimal portion, at least 32 digits
    pub fn hex_str(&self) -> &str {
        &self.serialized[self.hex_pos.clone()]
    }
}

impl FromStr for Digest {
    type Err = ImageError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::parse(s)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
