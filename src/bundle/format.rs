//! Archive formats selectable by URL extension.

use std::fmt;

use crate::error::BundleError;

/// Transport compression applied to the whole archive stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Gzip,
    Brotli,
}

/// A supported archive format: tar, optionally compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleFormat {
    /// `.tar`
    Tar,
    /// `.tar.gz`
    TarGzip,
    /// `.tar.br`
    TarBrotli,
}

impl BundleFormat {
    /// Every supported format.
    pub const ALL: [BundleFormat; 3] = [
        BundleFormat::Tar,
        BundleFormat::TarGzip,
        BundleFormat::TarBrotli,
    ];

    /// Resolve a URL extension (without the leading dot).
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::UnsupportedFormat`] for anything but
    /// `tar`, `tar.gz` or `tar.br`.
    pub fn from_extension(extension: &str) -> Result<Self, BundleError> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension() == extension)
            .ok_or_else(|| BundleError::UnsupportedFormat {
                extension: extension.to_string(),
            })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            BundleFormat::Tar => "tar",
            BundleFormat::TarGzip => "tar.gz",
            BundleFormat::TarBrotli => "tar.br",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            BundleFormat::Tar => "application/x-tar",
            BundleFormat::TarGzip => "application/x-tar+gzip",
            BundleFormat::TarBrotli => "application/x-tar+brotli",
        }
    }

    pub fn compression(&self) -> Compression {
        match self {
            BundleFormat::Tar => Compression::None,
            BundleFormat::TarGzip => Compression::Gzip,
            BundleFormat::TarBrotli => Compression::Brotli,
        }
    }
}

impl fmt::Display for BundleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
