use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Edge length of a region, the coarse partition used for region passes and storage.
pub const REGION_SIZE: i32 = 512;
/// Edge length of a chunk column.
pub const CHUNK_SIZE: i32 = 16;

pub type BlockCoord = IVec3;

pub const HORIZONTAL_NEIGHBORS: [IVec3; 4] = [
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 1),
];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

/// Inclusive axis-aligned rectangle of columns in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boundary {
    pub x_min: i32,
    pub z_min: i32,
    pub x_max: i32,
    pub z_max: i32,
}

impl Boundary {
    pub fn new(x_min: i32, z_min: i32, x_max: i32, z_max: i32) -> Self {
        assert!(
            x_min <= x_max && z_min <= z_max,
            "invalid boundary [{x_min},{z_min}]..[{x_max},{z_max}]"
        );
        Self {
            x_min,
            z_min,
            x_max,
            z_max,
        }
    }

    /// Boundary of `len_x` by `len_z` columns starting at the given corner.
    pub fn from_size(x_min: i32, z_min: i32, len_x: usize, len_z: usize) -> Self {
        assert!(len_x > 0 && len_z > 0, "boundary must cover at least one column");
        Self::new(
            x_min,
            z_min,
            x_min + len_x as i32 - 1,
            z_min + len_z as i32 - 1,
        )
    }

    pub fn len_x(&self) -> usize {
        (self.x_max - self.x_min + 1) as usize
    }

    pub fn len_z(&self) -> usize {
        (self.z_max - self.z_min + 1) as usize
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.z_min..=self.z_max).contains(&z)
    }

    /// Index of a column in x-major order, or `None` outside the boundary.
    pub fn column_index(&self, x: i32, z: i32) -> Option<usize> {
        if !self.contains(x, z) {
            return None;
        }
        let lx = (x - self.x_min) as usize;
        let lz = (z - self.z_min) as usize;
        Some(lx * self.len_z() + lz)
    }

    /// All regions overlapping this boundary, in x-major order.
    pub fn regions(&self) -> Vec<RegionPos> {
        let lower = world_to_region(self.x_min, self.z_min);
        let upper = world_to_region(self.x_max, self.z_max);
        let mut regions = Vec::new();
        for x in lower.x..=upper.x {
            for z in lower.z..=upper.z {
                regions.push(RegionPos { x, z });
            }
        }
        regions
    }

    pub fn intersect(&self, other: &Boundary) -> Option<Boundary> {
        let x_min = self.x_min.max(other.x_min);
        let z_min = self.z_min.max(other.z_min);
        let x_max = self.x_max.min(other.x_max);
        let z_max = self.z_max.min(other.z_max);
        if x_min > x_max || z_min > z_max {
            return None;
        }
        Some(Boundary {
            x_min,
            z_min,
            x_max,
            z_max,
        })
    }
}

impl RegionPos {
    pub fn bounds(&self) -> Boundary {
        Boundary {
            x_min: self.x * REGION_SIZE,
            z_min: self.z * REGION_SIZE,
            x_max: self.x * REGION_SIZE + REGION_SIZE - 1,
            z_max: self.z * REGION_SIZE + REGION_SIZE - 1,
        }
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

pub fn world_to_region(x: i32, z: i32) -> RegionPos {
    let (rx, _) = div_rem_floor(x, REGION_SIZE);
    let (rz, _) = div_rem_floor(z, REGION_SIZE);
    RegionPos { x: rx, z: rz }
}

#[cfg(test)]
mod tests {
    use super::{world_to_region, Boundary, RegionPos, REGION_SIZE};

    #[test]
    fn world_to_region_handles_negative_and_positive_coordinates() {
        assert_eq!(world_to_region(0, 0), RegionPos { x: 0, z: 0 });
        assert_eq!(world_to_region(-1, -1), RegionPos { x: -1, z: -1 });
        assert_eq!(world_to_region(511, 512), RegionPos { x: 0, z: 1 });
        assert_eq!(world_to_region(-513, 1024), RegionPos { x: -2, z: 2 });
    }

    #[test]
    fn boundary_indexes_columns_x_major() {
        let bounds = Boundary::from_size(10, -4, 3, 5);
        assert_eq!(bounds.len_x(), 3);
        assert_eq!(bounds.len_z(), 5);
        assert_eq!(bounds.column_index(10, -4), Some(0));
        assert_eq!(bounds.column_index(10, 0), Some(4));
        assert_eq!(bounds.column_index(11, -4), Some(5));
        assert_eq!(bounds.column_index(13, -4), None);
    }

    #[test]
    fn regions_cover_the_boundary() {
        let bounds = Boundary::new(-10, 0, REGION_SIZE + 3, 20);
        assert_eq!(
            bounds.regions(),
            vec![
                RegionPos { x: -1, z: 0 },
                RegionPos { x: 0, z: 0 },
                RegionPos { x: 1, z: 0 },
            ]
        );

        let clipped = RegionPos { x: 0, z: 0 }.bounds().intersect(&bounds);
        assert_eq!(clipped, Some(Boundary::new(0, 0, REGION_SIZE - 1, 20)));
    }

    #[test]
    #[should_panic]
    fn inverted_boundary_is_rejected() {
        let _ = Boundary::new(5, 0, 4, 0);
    }
}
