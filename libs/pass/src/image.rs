//! Image keys and request path parsing.

use crate::{Enhancement, ImageKeyError, PassId};

/// The only file extension served.
pub const IMAGE_EXTENSION: &str = "webp";

/// Content type matching [`IMAGE_EXTENSION`].
pub const IMAGE_CONTENT_TYPE: &str = "image/webp";

/// One image of one pass: `{pass}/{pass}-{enhancement}.webp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageKey {
    pass: PassId,
    enhancement: Enhancement,
}

impl ImageKey {
    /// Creates a key for the given pass and enhancement.
    pub fn new(pass: PassId, enhancement: Enhancement) -> Self {
        Self { pass, enhancement }
    }

    /// Parses a request path of the form `{pass}/{pass}-{enhancement}.webp`.
    ///
    /// This checks the shape of the path only. Whether the pass exists is up
    /// to the caller.
    pub fn parse_path(path: &str) -> Result<Self, ImageKeyError> {
        let segments: Vec<&str> = path.split('/').collect();
        let [dir, file] = segments.as_slice() else {
            return Err(ImageKeyError::SegmentCount(segments.len()));
        };

        let pass = PassId::parse(dir)?;

        let rest = file
            .strip_prefix(dir)
            .and_then(|rest| rest.strip_prefix('-'))
            .ok_or_else(|| ImageKeyError::FilePrefix(dir.to_string()))?;

        let parts: Vec<&str> = rest.split('.').collect();
        let [enhancement, extension] = parts.as_slice() else {
            return Err(ImageKeyError::MalformedSuffix(rest.to_string()));
        };

        if *extension != IMAGE_EXTENSION {
            return Err(ImageKeyError::Extension(extension.to_string()));
        }

        let enhancement = enhancement.parse::<Enhancement>()?;

        Ok(Self { pass, enhancement })
    }

    pub fn pass(&self) -> &PassId {
        &self.pass
    }

    pub fn enhancement(&self) -> Enhancement {
        self.enhancement
    }

    /// Object-store key holding this image.
    pub fn object_key(&self) -> String {
        format!(
            "{pass}/{pass}-{}.{IMAGE_EXTENSION}",
            self.enhancement,
            pass = self.pass
        )
    }
}

impl std::fmt::Display for ImageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.object_key())
    }
}
