//! Segmentation masks: a lightweight run-length form and a dense form.
//!
//! Records keep masks encoded. Loading a record decodes them into
//! [`MaskArray`]s through a [`MaskCodec`]; unloading drops the dense arrays.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// A run-length encoded binary mask.
///
/// `counts` are row-major run lengths, alternating background and foreground,
/// starting with a (possibly empty) background run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedMask {
    pub height: u32,
    pub width: u32,
    pub counts: Vec<u32>,
}

impl EncodedMask {
    /// Number of pixels covered by the runs.
    pub fn covered_pixels(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.counts.iter().skip(1).step_by(2).map(|&c| c as u64).sum()
    }
}

/// A dense binary mask, one byte (0 or 1) per pixel in row-major order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskArray {
    pub height: u32,
    pub width: u32,
    pub data: Vec<u8>,
}

impl MaskArray {
    /// Creates an all-background mask.
    pub fn zeros(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            data: vec![0; height as usize * width as usize],
        }
    }

    pub fn get(&self, row: u32, col: u32) -> u8 {
        self.data[row as usize * self.width as usize + col as usize]
    }

    pub fn set(&mut self, row: u32, col: u32, value: bool) {
        let idx = row as usize * self.width as usize + col as usize;
        self.data[idx] = u8::from(value);
    }
}

/// Converts masks between their encoded and dense forms.
pub trait MaskCodec {
    fn encode(&self, mask: &MaskArray) -> EncodedMask;

    fn decode(
        &self,
        encoded: &EncodedMask,
        height: u32,
        width: u32,
    ) -> Result<MaskArray, RecordError>;
}

/// Plain row-major run-length codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunLengthCodec;

impl MaskCodec for RunLengthCodec {
    fn encode(&self, mask: &MaskArray) -> EncodedMask {
        let mut counts = Vec::new();
        let mut current = 0u8;
        let mut run = 0u32;

        for &pixel in &mask.data {
            let pixel = u8::from(pixel != 0);
            if pixel != current {
                counts.push(run);
                current = pixel;
                run = 0;
            }
            run += 1;
        }
        counts.push(run);

        EncodedMask {
            height: mask.height,
            width: mask.width,
            counts,
        }
    }

    fn decode(
        &self,
        encoded: &EncodedMask,
        height: u32,
        width: u32,
    ) -> Result<MaskArray, RecordError> {
        let expected = height as u64 * width as u64;
        let found = encoded.covered_pixels();
        if found != expected {
            return Err(RecordError::MaskDecode { expected, found });
        }

        let mut data = Vec::with_capacity(expected as usize);
        for (i, &run) in encoded.counts.iter().enumerate() {
            let value = (i % 2) as u8;
            data.extend(std::iter::repeat(value).take(run as usize));
        }

        Ok(MaskArray {
            height,
            width,
            data,
        })
    }
}
