use stratum_shared::coords::Boundary;

use crate::config::BuildContext;
use crate::error::ConfigError;
use crate::weightmap::{LayerChannel, RgbaWeightmap};

/// Strength below which a layer is treated as switched off.
const LAYER_CUTOFF: f32 = 0.001;

/// Layers selected per column by the channels of an RGBA weightmap.
///
/// A layer bound to [`LayerChannel::None`] always runs with the plain mask strength.
pub struct ChannelLayers<L> {
    map: Option<RgbaWeightmap>,
    origin_x: i32,
    origin_z: i32,
    layers: Vec<(LayerChannel, L)>,
}

impl<L> ChannelLayers<L> {
    pub fn always_on(layer: L) -> Self {
        Self {
            map: None,
            origin_x: 0,
            origin_z: 0,
            layers: vec![(LayerChannel::None, layer)],
        }
    }

    pub fn new(map: RgbaWeightmap, bounds: Boundary, layers: Vec<(LayerChannel, L)>) -> Self {
        Self {
            map: Some(map),
            origin_x: bounds.x_min,
            origin_z: bounds.z_min,
            layers,
        }
    }

    /// Loads the weightmap named by `file` and binds the layers to it.
    ///
    /// Without a file only channel-less layers are allowed.
    pub fn load(
        kind: &str,
        file: Option<&str>,
        layers: Vec<(LayerChannel, L)>,
        ctx: &BuildContext,
    ) -> Result<Self, ConfigError> {
        let Some(file) = file else {
            if layers.iter().any(|(channel, _)| channel.index().is_some()) {
                return Err(ConfigError::MissingField {
                    kind: kind.to_string(),
                    field: "weightmap",
                });
            }
            return Ok(Self {
                map: None,
                origin_x: 0,
                origin_z: 0,
                layers,
            });
        };
        let map = RgbaWeightmap::load(&ctx.resolve(file), ctx.bounds.len_x(), ctx.bounds.len_z())?;
        Ok(Self::new(map, ctx.bounds, layers))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Calls `f` for every layer whose strength at the column exceeds the cutoff.
    pub fn for_each_active(&mut self, x: i32, z: i32, mask: f32, mut f: impl FnMut(&mut L, f32)) {
        for (channel, layer) in &mut self.layers {
            let strength = match (channel.index(), &self.map) {
                (Some(c), Some(map)) => mask * map.get(x - self.origin_x, z - self.origin_z, c),
                (Some(_), None) => 0.0,
                (None, _) => mask,
            };
            if strength > LAYER_CUTOFF {
                f(layer, strength);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use stratum_shared::coords::Boundary;

    use super::ChannelLayers;
    use crate::weightmap::{LayerChannel, RgbaWeightmap};

    #[test]
    fn channels_scale_the_mask_per_layer() {
        let map = RgbaWeightmap::from_fn(2, 1, |lx, _| {
            if lx == 0 {
                [1.0, 0.0, 0.5, 0.0]
            } else {
                [0.0, 1.0, 0.0, 0.0]
            }
        });
        let mut layers = ChannelLayers::new(
            map,
            Boundary::from_size(100, 0, 2, 1),
            vec![
                (LayerChannel::Red, "red"),
                (LayerChannel::Green, "green"),
                (LayerChannel::Blue, "blue"),
                (LayerChannel::None, "always"),
            ],
        );

        let mut seen = Vec::new();
        layers.for_each_active(100, 0, 0.5, |name, strength| seen.push((*name, strength)));
        assert_eq!(seen, vec![("red", 0.5), ("blue", 0.25), ("always", 0.5)]);

        seen.clear();
        layers.for_each_active(101, 0, 1.0, |name, strength| seen.push((*name, strength)));
        assert_eq!(seen, vec![("green", 1.0), ("always", 1.0)]);
    }
}
