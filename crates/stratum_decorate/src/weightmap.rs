use std::path::Path;

use image::RgbaImage;
use serde::Deserialize;

use crate::error::WeightmapError;

/// Layer index meaning "no layer selected" in a splat classification.
pub const NO_LAYER: u8 = 255;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    #[serde(alias = "r")]
    Red,
    #[serde(alias = "g")]
    Green,
    #[serde(alias = "b")]
    Blue,
    #[serde(alias = "a")]
    Alpha,
}

impl Channel {
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
            Channel::Alpha => 3,
        }
    }
}

/// Channel of an RGBA weightmap that drives a layer. `None` keeps the layer always on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerChannel {
    #[serde(alias = "r")]
    Red,
    #[serde(alias = "g")]
    Green,
    #[serde(alias = "b")]
    Blue,
    #[serde(alias = "a")]
    Alpha,
    #[serde(alias = "n")]
    None,
}

impl LayerChannel {
    pub fn index(self) -> Option<usize> {
        match self {
            LayerChannel::Red => Some(0),
            LayerChannel::Green => Some(1),
            LayerChannel::Blue => Some(2),
            LayerChannel::Alpha => Some(3),
            LayerChannel::None => None,
        }
    }
}

fn load_rgba(path: &Path, len_x: usize, len_z: usize) -> Result<RgbaImage, WeightmapError> {
    let image = image::open(path)
        .map_err(|source| WeightmapError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    if (image.width() as usize) < len_x || (image.height() as usize) < len_z {
        return Err(WeightmapError::TooSmall {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            needed_x: len_x,
            needed_z: len_z,
        });
    }
    Ok(image)
}

fn local_index(len_x: usize, len_z: usize, lx: i32, lz: i32) -> usize {
    if lx < 0 || lz < 0 || lx as usize >= len_x || lz as usize >= len_z {
        panic!("weightmap lookup out of bounds at [{lx},{lz}] for a {len_x}x{len_z} map");
    }
    lz as usize * len_x + lx as usize
}

/// Scalar per-column strength in `0.0..=1.0`, addressed relative to the decorated area's corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Weightmap {
    len_x: usize,
    len_z: usize,
    values: Vec<f32>,
}

impl Weightmap {
    pub fn from_fn(len_x: usize, len_z: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(len_x * len_z);
        for lz in 0..len_z {
            for lx in 0..len_x {
                values.push(f(lx, lz).clamp(0.0, 1.0));
            }
        }
        Self {
            len_x,
            len_z,
            values,
        }
    }

    pub fn constant(len_x: usize, len_z: usize, value: f32) -> Self {
        Self::from_fn(len_x, len_z, |_, _| value)
    }

    /// Reads one channel of an image; the image may be larger than the area but not smaller.
    pub fn load(
        path: &Path,
        channel: Channel,
        len_x: usize,
        len_z: usize,
    ) -> Result<Self, WeightmapError> {
        let image = load_rgba(path, len_x, len_z)?;
        let c = channel.index();
        Ok(Self::from_fn(len_x, len_z, |lx, lz| {
            image.get_pixel(lx as u32, lz as u32).0[c] as f32 / 255.0
        }))
    }

    pub fn len_x(&self) -> usize {
        self.len_x
    }

    pub fn len_z(&self) -> usize {
        self.len_z
    }

    /// Panics outside the map; a mask that does not cover the area is a setup bug.
    pub fn get(&self, lx: i32, lz: i32) -> f32 {
        self.values[local_index(self.len_x, self.len_z, lx, lz)]
    }
}

/// Four independent strength channels per column.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaWeightmap {
    len_x: usize,
    len_z: usize,
    values: Vec<[f32; 4]>,
}

impl RgbaWeightmap {
    pub fn from_fn(len_x: usize, len_z: usize, mut f: impl FnMut(usize, usize) -> [f32; 4]) -> Self {
        let mut values = Vec::with_capacity(len_x * len_z);
        for lz in 0..len_z {
            for lx in 0..len_x {
                values.push(f(lx, lz).map(|v| v.clamp(0.0, 1.0)));
            }
        }
        Self {
            len_x,
            len_z,
            values,
        }
    }

    pub fn load(path: &Path, len_x: usize, len_z: usize) -> Result<Self, WeightmapError> {
        let image = load_rgba(path, len_x, len_z)?;
        Ok(Self::from_fn(len_x, len_z, |lx, lz| {
            image
                .get_pixel(lx as u32, lz as u32)
                .0
                .map(|v| v as f32 / 255.0)
        }))
    }

    pub fn get(&self, lx: i32, lz: i32, channel: usize) -> f32 {
        self.values[local_index(self.len_x, self.len_z, lx, lz)][channel]
    }
}

/// Per-column layer index produced by nearest-color matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplatMap {
    len_x: usize,
    len_z: usize,
    indices: Vec<u8>,
}

impl SplatMap {
    pub fn from_fn(len_x: usize, len_z: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut indices = Vec::with_capacity(len_x * len_z);
        for lz in 0..len_z {
            for lx in 0..len_x {
                indices.push(f(lx, lz));
            }
        }
        Self {
            len_x,
            len_z,
            indices,
        }
    }

    /// Assigns every pixel the index of the closest palette color.
    ///
    /// Pixels farther than `dither_limit` (euclidean RGB distance) from every palette color,
    /// and fully transparent pixels, get [`NO_LAYER`].
    pub fn classify(
        image: &RgbaImage,
        palette: &[[u8; 3]],
        dither_limit: u32,
        len_x: usize,
        len_z: usize,
    ) -> Self {
        assert!(
            palette.len() < NO_LAYER as usize,
            "a splatmap supports at most {} layers",
            NO_LAYER
        );
        let limit_sq = dither_limit.saturating_mul(dither_limit);
        Self::from_fn(len_x, len_z, |lx, lz| {
            let [r, g, b, a] = image.get_pixel(lx as u32, lz as u32).0;
            if a == 0 {
                return NO_LAYER;
            }
            palette
                .iter()
                .enumerate()
                .map(|(i, color)| {
                    let dr = r as i32 - color[0] as i32;
                    let dg = g as i32 - color[1] as i32;
                    let db = b as i32 - color[2] as i32;
                    (i, (dr * dr + dg * dg + db * db) as u32)
                })
                .min_by_key(|&(_, dist)| dist)
                .filter(|&(_, dist)| dist <= limit_sq)
                .map_or(NO_LAYER, |(i, _)| i as u8)
        })
    }

    pub fn load(
        path: &Path,
        palette: &[[u8; 3]],
        dither_limit: u32,
        len_x: usize,
        len_z: usize,
    ) -> Result<Self, WeightmapError> {
        let image = load_rgba(path, len_x, len_z)?;
        Ok(Self::classify(&image, palette, dither_limit, len_x, len_z))
    }

    pub fn get(&self, lx: i32, lz: i32) -> u8 {
        self.indices[local_index(self.len_x, self.len_z, lx, lz)]
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{Channel, RgbaWeightmap, SplatMap, Weightmap, NO_LAYER};

    #[test]
    fn masks_are_addressed_locally_and_clamped() {
        let map = Weightmap::from_fn(3, 2, |lx, lz| lx as f32 * 0.75 + lz as f32);
        assert_eq!(map.get(0, 0), 0.0);
        assert_eq!(map.get(1, 0), 0.75);
        assert_eq!(map.get(2, 0), 1.0);
        assert_eq!(map.get(0, 1), 1.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_bounds_mask_lookup_panics() {
        let map = Weightmap::constant(2, 2, 1.0);
        map.get(2, 0);
    }

    #[test]
    fn rgba_channels_are_independent() {
        let map = RgbaWeightmap::from_fn(1, 1, |_, _| [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(map.get(0, 0, Channel::Red.index()), 0.1);
        assert_eq!(map.get(0, 0, Channel::Alpha.index()), 0.4);
    }

    #[test]
    fn splat_classification_picks_nearest_color_within_limit() {
        let mut image = RgbaImage::new(4, 1);
        image.put_pixel(0, 0, Rgba([250, 5, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 240, 10, 255]));
        image.put_pixel(2, 0, Rgba([128, 128, 128, 255]));
        image.put_pixel(3, 0, Rgba([255, 0, 0, 0]));
        let palette = [[255, 0, 0], [0, 255, 0]];

        let strict = SplatMap::classify(&image, &palette, 32, 4, 1);
        assert_eq!(strict.get(0, 0), 0);
        assert_eq!(strict.get(1, 0), 1);
        assert_eq!(strict.get(2, 0), NO_LAYER);
        assert_eq!(strict.get(3, 0), NO_LAYER);

        let loose = SplatMap::classify(&image, &palette, 255, 4, 1);
        assert!(loose.get(2, 0) < 2);
    }

    #[test]
    fn loading_a_missing_image_is_a_resource_error() {
        let err = Weightmap::load(
            std::path::Path::new("definitely/not/here.png"),
            Channel::Red,
            4,
            4,
        )
        .err()
        .expect("must fail");
        assert!(err.to_string().contains("not/here.png"));
    }

    #[test]
    fn undersized_images_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("small.png");
        RgbaImage::new(2, 2).save(&path).expect("write png");

        let err = Weightmap::load(&path, Channel::Red, 4, 4)
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("needs 4x4"));
    }
}
