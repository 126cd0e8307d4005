use crate::coords::Boundary;

/// Per-column surface elevations over a boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heightmap {
    bounds: Boundary,
    values: Vec<i32>,
}

impl Heightmap {
    pub fn new_filled(bounds: Boundary, height: i32) -> Self {
        Self {
            bounds,
            values: vec![height; bounds.len_x() * bounds.len_z()],
        }
    }

    pub fn from_fn(bounds: Boundary, mut f: impl FnMut(i32, i32) -> i32) -> Self {
        let mut values = Vec::with_capacity(bounds.len_x() * bounds.len_z());
        for x in bounds.x_min..=bounds.x_max {
            for z in bounds.z_min..=bounds.z_max {
                values.push(f(x, z));
            }
        }
        Self { bounds, values }
    }

    pub fn bounds(&self) -> Boundary {
        self.bounds
    }

    /// Surface height of a column. Panics outside the bounds.
    pub fn get(&self, x: i32, z: i32) -> i32 {
        let index = self
            .bounds
            .column_index(x, z)
            .unwrap_or_else(|| panic!("heightmap lookup out of bounds at [{x},{z}]"));
        self.values[index]
    }

    pub fn set(&mut self, x: i32, z: i32, height: i32) {
        let index = self
            .bounds
            .column_index(x, z)
            .unwrap_or_else(|| panic!("heightmap write out of bounds at [{x},{z}]"));
        self.values[index] = height;
    }

    pub fn max(&self) -> i32 {
        self.values.iter().copied().max().unwrap_or(i32::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::Heightmap;
    use crate::coords::Boundary;

    #[test]
    fn from_fn_addresses_world_columns() {
        let bounds = Boundary::from_size(100, 200, 4, 3);
        let heightmap = Heightmap::from_fn(bounds, |x, z| x - 100 + (z - 200) * 10);
        assert_eq!(heightmap.get(100, 200), 0);
        assert_eq!(heightmap.get(103, 202), 23);
        assert_eq!(heightmap.max(), 23);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_bounds_lookup_panics() {
        let heightmap = Heightmap::new_filled(Boundary::from_size(0, 0, 2, 2), 64);
        heightmap.get(2, 0);
    }
}
