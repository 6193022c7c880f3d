//! BlazeFace SSD anchor generation.
//!
//! Both variants use fixed-size anchors (width and height of 1.0), so only the
//! grid layout matters. Consecutive layers that share a stride are folded onto
//! one feature map; each layer contributes `anchors_per_layer` anchors per cell.
//! Anchors are emitted row-major over the grid (y, then x), with all anchors of
//! a cell adjacent.

use crate::anchors::{Anchor, AnchorTable};
use crate::config::{ModelVariant, NUM_ANCHORS};
use crate::util::{BlazePostError, BlazePostResult};

/// One feature map of the anchor grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnchorLayer {
    /// Cells per side of the square feature map.
    pub grid: usize,
    /// Anchors placed at the center of every cell.
    pub anchors_per_cell: usize,
}

/// SSD anchor options for a square input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SsdAnchorLayout {
    /// Model input resolution.
    pub input_size: usize,
    /// Stride of each detection layer, in network order.
    pub strides: Vec<usize>,
    /// Anchors added per cell by each layer.
    pub anchors_per_layer: usize,
}

impl SsdAnchorLayout {
    /// Layout used by the given BlazeFace variant.
    pub fn for_variant(variant: ModelVariant) -> Self {
        let strides = match variant {
            ModelVariant::Front => vec![8, 16, 16, 16],
            ModelVariant::Back => vec![16, 32, 32, 32],
        };
        Self {
            input_size: variant.input_size(),
            strides,
            anchors_per_layer: 2,
        }
    }

    /// Folds layers with equal consecutive strides into feature maps.
    pub fn layers(&self) -> BlazePostResult<Vec<AnchorLayer>> {
        if self.input_size == 0 || self.anchors_per_layer == 0 {
            return Err(BlazePostError::InvalidInput(
                "input_size and anchors_per_layer must be positive",
            ));
        }
        let mut layers: Vec<AnchorLayer> = Vec::new();
        let mut last_stride = None;
        for &stride in &self.strides {
            if stride == 0 {
                return Err(BlazePostError::InvalidInput("anchor strides must be positive"));
            }
            if last_stride == Some(stride) {
                if let Some(layer) = layers.last_mut() {
                    layer.anchors_per_cell += self.anchors_per_layer;
                }
                continue;
            }
            layers.push(AnchorLayer {
                grid: self.input_size.div_ceil(stride),
                anchors_per_cell: self.anchors_per_layer,
            });
            last_stride = Some(stride);
        }
        Ok(layers)
    }

    /// Total number of anchors the layout produces.
    pub fn num_anchors(&self) -> BlazePostResult<usize> {
        Ok(self
            .layers()?
            .iter()
            .map(|l| l.grid * l.grid * l.anchors_per_cell)
            .sum())
    }

    /// Generates every anchor in network order.
    pub fn generate(&self) -> BlazePostResult<Vec<Anchor>> {
        let layers = self.layers()?;
        let total = layers
            .iter()
            .map(|l| l.grid * l.grid * l.anchors_per_cell)
            .sum();
        let mut anchors = Vec::with_capacity(total);
        for layer in layers {
            let grid = layer.grid as f32;
            for y in 0..layer.grid {
                for x in 0..layer.grid {
                    let center_x = (x as f32 + 0.5) / grid;
                    let center_y = (y as f32 + 0.5) / grid;
                    for _ in 0..layer.anchors_per_cell {
                        anchors.push(Anchor::new(center_x, center_y, 1.0, 1.0));
                    }
                }
            }
        }
        Ok(anchors)
    }
}

/// Generates the 896-anchor table for a BlazeFace variant.
pub fn generate_anchors(variant: ModelVariant) -> BlazePostResult<AnchorTable> {
    let anchors = SsdAnchorLayout::for_variant(variant).generate()?;
    AnchorTable::new(anchors, NUM_ANCHORS)
}

#[cfg(test)]
mod tests {
    use super::{generate_anchors, AnchorLayer, SsdAnchorLayout};
    use crate::anchors::Anchor;
    use crate::config::ModelVariant;

    #[test]
    fn both_variants_fold_into_two_feature_maps() {
        for variant in [ModelVariant::Front, ModelVariant::Back] {
            let layout = SsdAnchorLayout::for_variant(variant);
            assert_eq!(
                layout.layers().unwrap(),
                vec![
                    AnchorLayer {
                        grid: 16,
                        anchors_per_cell: 2
                    },
                    AnchorLayer {
                        grid: 8,
                        anchors_per_cell: 6
                    },
                ]
            );
            assert_eq!(layout.num_anchors().unwrap(), 896);
        }
    }

    #[test]
    fn generated_table_matches_reference_positions() {
        let table = generate_anchors(ModelVariant::Front).unwrap();
        assert_eq!(table.len(), 896);
        assert_eq!(table.get(0), Some(&Anchor::new(0.03125, 0.03125, 1.0, 1.0)));
        assert_eq!(table.get(1), table.get(0));
        assert_eq!(table.get(2), Some(&Anchor::new(0.09375, 0.03125, 1.0, 1.0)));
        assert_eq!(table.get(511), Some(&Anchor::new(0.96875, 0.96875, 1.0, 1.0)));
        assert_eq!(table.get(512), Some(&Anchor::new(0.0625, 0.0625, 1.0, 1.0)));
        assert_eq!(table.get(895), Some(&Anchor::new(0.9375, 0.9375, 1.0, 1.0)));
    }

    #[test]
    fn zero_stride_is_rejected() {
        let layout = SsdAnchorLayout {
            input_size: 128,
            strides: vec![8, 0],
            anchors_per_layer: 2,
        };
        assert!(layout.layers().is_err());
    }
}
