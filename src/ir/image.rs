//! Image payloads and the loader that materializes them from disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::RecordError;

/// An image held in memory by a loaded record.
///
/// `bytes` are the contents the loader produced; pixel decoding is left to
/// whichever [`ImageLoader`] is plugged in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bytes,
        }
    }
}

// Payloads can be megabytes; keep Debug output to the dimensions.
impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Opens the image behind a filepath component.
pub trait ImageLoader {
    fn open_image(&self, path: &Path) -> Result<ImageData, RecordError>;
}

/// Reads the file and probes its dimensions from the header.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn open_image(&self, path: &Path) -> Result<ImageData, RecordError> {
        let bytes = fs::read(path)?;
        let size = imagesize::blob_size(&bytes).map_err(|source| RecordError::ImageFormat {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(ImageData::new(size.width as u32, size.height as u32, bytes))
    }
}
