// src/store/plane.rs

//! A single AOV plane: named pixel storage for one output variable.
//!
//! Storage is chosen once, from the first bucket seen for the AOV, and the
//! variant never changes afterwards: a scalar plane (depth and friends),
//! an RGB plane, or an RGB plane with a separate alpha channel. Pixels are
//! row-major with a bottom-left origin; the writer performs the Y flip
//! from the wire's top-left convention before calling in here.

use crate::error::OutOfRange;
use crate::wire::AovName;

/// Pixel storage for one plane, tagged by samples-per-pixel.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaneData {
    /// One float per pixel (spp 1), e.g. Z.
    Scalar(Vec<f32>),
    /// Three floats per pixel (spp 3).
    Rgb(Vec<[f32; 3]>),
    /// Three color floats plus one alpha float per pixel (spp 4).
    Rgba {
        color: Vec<[f32; 3]>,
        alpha: Vec<f32>,
    },
}

impl PlaneData {
    fn zeroed(spp: i32, len: usize) -> PlaneData {
        match spp {
            1 => PlaneData::Scalar(vec![0.0; len]),
            4 => PlaneData::Rgba {
                color: vec![[0.0; 3]; len],
                alpha: vec![0.0; len],
            },
            _ => PlaneData::Rgb(vec![[0.0; 3]; len]),
        }
    }
}

/// A named AOV plane sized to its frame's resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    name: AovName,
    width: u32,
    height: u32,
    data: PlaneData,
}

impl Plane {
    /// Creates a zero-filled plane. `spp` values other than 1 and 4 store
    /// as RGB; the codec has already restricted the wire values to 1/3/4.
    pub fn new(name: AovName, spp: i32, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Plane {
            name,
            width,
            height,
            data: PlaneData::zeroed(spp, len),
        }
    }

    pub fn name(&self) -> &AovName {
        &self.name
    }

    /// Samples-per-pixel implied by the storage variant.
    pub fn spp(&self) -> i32 {
        match self.data {
            PlaneData::Scalar(_) => 1,
            PlaneData::Rgb(_) => 3,
            PlaneData::Rgba { .. } => 4,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Re-allocates the storage to the new resolution, zero-filled. The
    /// name and variant keep their identity; previous pixel content is
    /// not preserved.
    pub fn resize(&mut self, width: u32, height: u32) {
        let len = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.data = PlaneData::zeroed(self.spp(), len);
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y * self.width + x) as usize)
        } else {
            None
        }
    }

    /// Writes one channel sample at (x, y) in bottom-left coordinates.
    pub fn set(&mut self, x: u32, y: u32, channel: usize, value: f32) -> Result<(), OutOfRange> {
        let out_of_range = OutOfRange {
            x,
            y,
            channel,
            width: self.width,
            height: self.height,
        };
        let i = self.index(x, y).ok_or(out_of_range)?;
        match &mut self.data {
            PlaneData::Scalar(values) => values[i] = value,
            PlaneData::Rgb(colors) => {
                if channel >= 3 {
                    return Err(OutOfRange {
                        x,
                        y,
                        channel,
                        width: self.width,
                        height: self.height,
                    });
                }
                colors[i][channel] = value;
            }
            PlaneData::Rgba { color, alpha } => match channel {
                0..=2 => color[i][channel] = value,
                3 => alpha[i] = value,
                _ => {
                    return Err(OutOfRange {
                        x,
                        y,
                        channel,
                        width: self.width,
                        height: self.height,
                    })
                }
            },
        }
        Ok(())
    }

    /// Reads one channel sample at (x, y). Out-of-rectangle positions and
    /// channels the plane does not carry read as 0.0; scalar planes answer
    /// every channel with their single value, so a depth plane shows up on
    /// whichever channel the host scans.
    pub fn get(&self, x: u32, y: u32, channel: usize) -> f32 {
        let Some(i) = self.index(x, y) else {
            return 0.0;
        };
        match &self.data {
            PlaneData::Scalar(values) => values[i],
            PlaneData::Rgb(colors) => {
                if channel < 3 {
                    colors[i][channel]
                } else {
                    0.0
                }
            }
            PlaneData::Rgba { color, alpha } => match channel {
                0..=2 => color[i][channel],
                3 => alpha[i],
                _ => 0.0,
            },
        }
    }
}
