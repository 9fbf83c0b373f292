//! Writes sparse float voxels into the binary grid layout that [`Volume`](crate::Volume) reads.

use std::collections::BTreeMap;

use wisp_core::{Result, WispError};

use crate::layout::*;

/// Builds a float grid from individually set voxels.
///
/// Voxels that are never set read back as the background value.
#[derive(Debug, Clone)]
pub struct GridBuilder {
    name: String,
    background: f32,
    mat: [[f64; 3]; 3],
    translation: [f64; 3],
    voxels: BTreeMap<Coord, f32>,
}

const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

impl GridBuilder {
    pub fn new(background: f32) -> Self {
        Self {
            name: String::new(),
            background,
            mat: IDENTITY,
            translation: [0.0; 3],
            voxels: BTreeMap::new(),
        }
    }

    /// Grid name, truncated to 255 bytes in the header.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Uniform voxel size, keeping the current translation.
    pub fn with_voxel_size(mut self, voxel_size: f64) -> Self {
        self.mat = IDENTITY.map(|row| row.map(|v| v * voxel_size));
        self
    }

    /// Index-to-world affine map: `world = mat * index + translation`.
    pub fn with_transform(mut self, mat: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        self.mat = mat;
        self.translation = translation;
        self
    }

    pub fn with_translation(mut self, translation: [f64; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Set (or overwrite) the value of one voxel and mark it active.
    pub fn set_value(&mut self, ijk: Coord, value: f32) {
        self.voxels.insert(ijk, value);
    }

    pub fn active_voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Serialise the grid. Fails if the transform cannot be inverted.
    pub fn build(&self) -> Result<Vec<u8>> {
        let inv = invert(&self.mat).ok_or_else(|| {
            WispError::InvalidGrid("index-to-world matrix is singular".into())
        })?;

        // group voxels bottom-up by the node that contains them
        let mut leaves: BTreeMap<Coord, Vec<(Coord, f32)>> = BTreeMap::new();
        for (&ijk, &value) in &self.voxels {
            leaves.entry(node_origin(ijk, LEAF_LOG2_DIM)).or_default().push((ijk, value));
        }
        let mut lowers: BTreeMap<Coord, Vec<Coord>> = BTreeMap::new();
        for &origin in leaves.keys() {
            lowers.entry(node_origin(origin, LOWER_TOTAL)).or_default().push(origin);
        }
        let mut uppers: BTreeMap<Coord, Vec<Coord>> = BTreeMap::new();
        for &origin in lowers.keys() {
            uppers.entry(node_origin(origin, UPPER_TOTAL)).or_default().push(origin);
        }

        let tree = GRID_SIZE;
        let root = tree + TREE_SIZE;
        let upper_base = root + ROOT_SIZE + uppers.len() * ROOT_TILE_SIZE;
        let lower_base = upper_base + uppers.len() * UPPER_SIZE;
        let leaf_base = lower_base + lowers.len() * LOWER_SIZE;
        let total = leaf_base + leaves.len() * LEAF_SIZE;

        let upper_addr = addresses(uppers.keys(), upper_base, UPPER_SIZE);
        let lower_addr = addresses(lowers.keys(), lower_base, LOWER_SIZE);
        let leaf_addr = addresses(leaves.keys(), leaf_base, LEAF_SIZE);

        let mut buf = vec![0u8; total];

        // leaves
        let mut leaf_summary = BTreeMap::new();
        for (origin, voxels) in &leaves {
            let leaf = leaf_addr[origin];
            let mut summary = Summary::default();
            for n in 0..LEAF_TABLE_COUNT {
                write(&mut buf, leaf + LEAF_OFF_TABLE + 4 * n, self.background);
            }
            for &(ijk, value) in voxels {
                let n = leaf_coord_to_offset(ijk);
                mask_set_on(&mut buf, leaf + LEAF_OFF_VALUE_MASK, n);
                write(&mut buf, leaf + LEAF_OFF_TABLE + 4 * n, value);
                summary.add(ijk, value);
            }
            let dif = [0, 1, 2].map(|a| (summary.bbox_max[a] - summary.bbox_min[a]) as u32);
            write(&mut buf, leaf + NODE_OFF_BBOX_MIN, summary.bbox_min);
            write(&mut buf, leaf + LEAF_OFF_BBOX_DIF_AND_FLAGS, dif[0] | (dif[1] << 8) | (dif[2] << 16));
            summary.write_stats(&mut buf, leaf + LEAF_OFF_MIN);
            leaf_summary.insert(*origin, summary);
        }

        // lower internal nodes
        let mut lower_summary = BTreeMap::new();
        for (origin, children) in &lowers {
            let lower = lower_addr[origin];
            let mut summary = Summary::default();
            self.fill_tiles(&mut buf, lower + LOWER_OFF_TABLE, LOWER_TABLE_COUNT);
            for child in children {
                let n = lower_coord_to_offset(*child);
                mask_set_on(&mut buf, lower + LOWER_OFF_CHILD_MASK, n);
                let offset = leaf_addr[child] as i64 - lower as i64;
                write(&mut buf, lower + LOWER_OFF_TABLE + n * TABLE_STRIDE, offset);
                summary.merge(&leaf_summary[child]);
            }
            summary.write_bbox(&mut buf, lower);
            summary.write_stats(&mut buf, lower + LOWER_OFF_MIN);
            lower_summary.insert(*origin, summary);
        }

        // upper internal nodes and the root tiles that point at them
        let mut root_summary = Summary::default();
        for (i, (origin, children)) in uppers.iter().enumerate() {
            let upper = upper_addr[origin];
            let mut summary = Summary::default();
            self.fill_tiles(&mut buf, upper + UPPER_OFF_TABLE, UPPER_TABLE_COUNT);
            for child in children {
                let n = upper_coord_to_offset(*child);
                mask_set_on(&mut buf, upper + UPPER_OFF_CHILD_MASK, n);
                let offset = lower_addr[child] as i64 - upper as i64;
                write(&mut buf, upper + UPPER_OFF_TABLE + n * TABLE_STRIDE, offset);
                summary.merge(&lower_summary[child]);
            }
            summary.write_bbox(&mut buf, upper);
            summary.write_stats(&mut buf, upper + UPPER_OFF_MIN);
            root_summary.merge(&summary);

            let tile = root + ROOT_SIZE + i * ROOT_TILE_SIZE;
            write(&mut buf, tile + ROOT_TILE_OFF_KEY, coord_to_key(*origin));
            write(&mut buf, tile + ROOT_TILE_OFF_CHILD, upper as i64 - root as i64);
            write(&mut buf, tile + ROOT_TILE_OFF_STATE, 0u32);
            write(&mut buf, tile + ROOT_TILE_OFF_VALUE, self.background);
        }

        // root
        root_summary.write_bbox(&mut buf, root);
        write(&mut buf, root + ROOT_OFF_TABLE_SIZE, uppers.len() as u32);
        write(&mut buf, root + ROOT_OFF_BACKGROUND, self.background);
        root_summary.write_stats(&mut buf, root + ROOT_OFF_MIN);

        // tree
        let relative = |base: usize, count: usize| if count == 0 { 0u64 } else { (base - tree) as u64 };
        write(&mut buf, tree + TREE_OFF_NODE_OFFSET_LEAF, relative(leaf_base, leaves.len()));
        write(&mut buf, tree + TREE_OFF_NODE_OFFSET_LOWER, relative(lower_base, lowers.len()));
        write(&mut buf, tree + TREE_OFF_NODE_OFFSET_UPPER, relative(upper_base, uppers.len()));
        write(&mut buf, tree + TREE_OFF_NODE_OFFSET_ROOT, (root - tree) as u64);
        write(&mut buf, tree + TREE_OFF_NODE_COUNT_LEAF, leaves.len() as u32);
        write(&mut buf, tree + TREE_OFF_NODE_COUNT_LOWER, lowers.len() as u32);
        write(&mut buf, tree + TREE_OFF_NODE_COUNT_UPPER, uppers.len() as u32);
        write(&mut buf, tree + TREE_OFF_VOXEL_COUNT, self.voxels.len() as u64);

        self.write_grid_header(&mut buf, &inv, &root_summary, total);

        tracing::debug!(
            name = %self.name,
            voxels = self.voxels.len(),
            leaves = leaves.len(),
            bytes = total,
            "built float grid"
        );
        Ok(buf)
    }

    fn fill_tiles(&self, buf: &mut [u8], table: usize, count: usize) {
        for n in 0..count {
            write(buf, table + n * TABLE_STRIDE, self.background);
        }
    }

    fn write_grid_header(&self, buf: &mut [u8], inv: &[[f64; 3]; 3], summary: &Summary, total: usize) {
        write(buf, GRID_OFF_MAGIC, MAGIC);
        write(buf, GRID_OFF_CHECKSUM, 0u64);
        write(buf, GRID_OFF_VERSION, VERSION);
        write(buf, GRID_OFF_FLAGS, 0u32);
        write(buf, GRID_OFF_GRID_INDEX, 0u32);
        write(buf, GRID_OFF_GRID_COUNT, 1u32);
        write(buf, GRID_OFF_GRID_SIZE, total as u64);

        let name = self.name.as_bytes();
        let len = name.len().min(GRID_NAME_LEN - 1);
        buf[GRID_OFF_GRID_NAME..GRID_OFF_GRID_NAME + len].copy_from_slice(&name[..len]);

        let map = GRID_OFF_MAP;
        let flat = |m: &[[f64; 3]; 3]| -> [f64; 9] {
            [m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2]]
        };
        let (matd, invmatd) = (flat(&self.mat), flat(inv));
        write(buf, map + MAP_OFF_MATF, matd.map(|v| v as f32));
        write(buf, map + MAP_OFF_INVMATF, invmatd.map(|v| v as f32));
        write(buf, map + MAP_OFF_VECF, self.translation.map(|v| v as f32));
        write(buf, map + MAP_OFF_TAPERF, 1.0f32);
        write(buf, map + MAP_OFF_MATD, matd);
        write(buf, map + MAP_OFF_INVMATD, invmatd);
        write(buf, map + MAP_OFF_VECD, self.translation);
        write(buf, map + MAP_OFF_TAPERD, 1.0f64);

        let (world_min, world_max) = self.world_bbox(summary);
        write(buf, GRID_OFF_WORLD_BBOX, world_min);
        write(buf, GRID_OFF_WORLD_BBOX + 24, world_max);

        let origin = self.index_to_world([0.0; 3]);
        let one = self.index_to_world([1.0; 3]);
        write(buf, GRID_OFF_VOXEL_SIZE, [0, 1, 2].map(|a| one[a] - origin[a]));

        write(buf, GRID_OFF_GRID_CLASS, GRID_CLASS_UNKNOWN);
        write(buf, GRID_OFF_GRID_TYPE, GRID_TYPE_FLOAT);
        write(buf, GRID_OFF_BLIND_METADATA_OFFSET, 0i64);
        write(buf, GRID_OFF_BLIND_METADATA_COUNT, 0u32);
    }

    fn index_to_world(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.mat;
        [0, 1, 2].map(|r| m[r][0] * p[0] + m[r][1] * p[1] + m[r][2] * p[2] + self.translation[r])
    }

    /// World bounds of the active voxels' cells (`max` corner is exclusive in index space).
    fn world_bbox(&self, summary: &Summary) -> ([f64; 3], [f64; 3]) {
        if summary.count == 0 {
            return ([0.0; 3], [0.0; 3]);
        }
        let lo = summary.bbox_min.map(f64::from);
        let hi = summary.bbox_max.map(|c| f64::from(c) + 1.0);
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for corner in 0..8 {
            let p = [0, 1, 2].map(|a| if corner & (1 << a) == 0 { lo[a] } else { hi[a] });
            let w = self.index_to_world(p);
            for a in 0..3 {
                min[a] = min[a].min(w[a]);
                max[a] = max[a].max(w[a]);
            }
        }
        (min, max)
    }
}

fn addresses<'k>(keys: impl Iterator<Item = &'k Coord>, base: usize, size: usize) -> BTreeMap<Coord, usize> {
    keys.enumerate().map(|(i, &k)| (k, base + i * size)).collect()
}

/// Inverse of a 3x3 matrix, or `None` when it is singular.
fn invert(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let cofactor = |r: usize, c: usize| {
        let (r0, r1) = ((r + 1) % 3, (r + 2) % 3);
        let (c0, c1) = ((c + 1) % 3, (c + 2) % 3);
        m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
    };
    let det = m[0][0] * cofactor(0, 0) + m[0][1] * cofactor(0, 1) + m[0][2] * cofactor(0, 2);
    // singular relative to the matrix scale, so tiny uniform voxels still invert
    let scale = m.iter().flatten().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if !det.is_finite() || det.abs() <= f64::EPSILON * scale.powi(3) {
        return None;
    }
    // inverse is the transposed cofactor matrix over the determinant
    Some([0, 1, 2].map(|r| [0, 1, 2].map(|c| cofactor(c, r) / det)))
}

/// Active-voxel bounds and value statistics of a node.
#[derive(Debug, Clone)]
struct Summary {
    bbox_min: Coord,
    bbox_max: Coord,
    count: usize,
    min: f32,
    max: f32,
    sum: f64,
    sum_sq: f64,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            bbox_min: [i32::MAX; 3],
            bbox_max: [i32::MIN; 3],
            count: 0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }
}

impl Summary {
    fn add(&mut self, ijk: Coord, value: f32) {
        for a in 0..3 {
            self.bbox_min[a] = self.bbox_min[a].min(ijk[a]);
            self.bbox_max[a] = self.bbox_max[a].max(ijk[a]);
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += f64::from(value);
        self.sum_sq += f64::from(value) * f64::from(value);
    }

    fn merge(&mut self, other: &Summary) {
        for a in 0..3 {
            self.bbox_min[a] = self.bbox_min[a].min(other.bbox_min[a]);
            self.bbox_max[a] = self.bbox_max[a].max(other.bbox_max[a]);
        }
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }

    fn write_bbox(&self, buf: &mut [u8], node: usize) {
        write(buf, node + NODE_OFF_BBOX_MIN, self.bbox_min);
        write(buf, node + NODE_OFF_BBOX_MAX, self.bbox_max);
    }

    /// min, max, average and standard deviation as consecutive `f32`s.
    fn write_stats(&self, buf: &mut [u8], at: usize) {
        let (min, max, ave, stddev) = if self.count == 0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let n = self.count as f64;
            let ave = self.sum / n;
            let var = (self.sum_sq / n - ave * ave).max(0.0);
            (self.min, self.max, ave as f32, var.sqrt() as f32)
        };
        write(buf, at, min);
        write(buf, at + 4, max);
        write(buf, at + 8, ave);
        write(buf, at + 12, stddev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Volume;
    use wisp_core::Vec3;

    #[test]
    fn test_single_voxel_layout() {
        let mut grid = GridBuilder::new(0.0);
        grid.set_value([0, 0, 0], 5.0);
        let bytes = grid.build().unwrap();

        assert_eq!(
            bytes.len(),
            GRID_SIZE + TREE_SIZE + ROOT_SIZE + ROOT_TILE_SIZE + UPPER_SIZE + LOWER_SIZE + LEAF_SIZE
        );
        let volume = Volume::new(&bytes).unwrap();
        assert_eq!(volume.leaf_count(), 1);
        assert_eq!(volume.active_voxel_count(), 1);
        assert_eq!(volume.index_bbox(), ([0, 0, 0], [0, 0, 0]));
        assert_eq!(volume.get_value([0, 0, 0]), 5.0);
        assert_eq!(volume.get_value([1, 0, 0]), 0.0);

        let root = GRID_SIZE + TREE_SIZE;
        assert_eq!(read::<f32>(&bytes, root + ROOT_OFF_MAX), 5.0);
        assert_eq!(read::<f32>(&bytes, root + ROOT_OFF_AVE), 5.0);
    }

    #[test]
    fn test_overwrite_and_node_sharing() {
        let mut grid = GridBuilder::new(1.0);
        grid.set_value([1, 1, 1], 2.0);
        grid.set_value([1, 1, 1], 3.0);
        grid.set_value([2, 1, 1], 4.0);
        grid.set_value([20, 1, 1], 5.0);
        grid.set_value([-5000, 1, 1], 6.0);
        assert_eq!(grid.active_voxel_count(), 4);

        let bytes = grid.build().unwrap();
        let volume = Volume::new(&bytes).unwrap();
        assert_eq!(volume.leaf_count(), 3);
        assert_eq!(volume.get_value([1, 1, 1]), 3.0);
        assert_eq!(volume.get_value([2, 1, 1]), 4.0);
        assert_eq!(volume.get_value([20, 1, 1]), 5.0);
        assert_eq!(volume.get_value([-5000, 1, 1]), 6.0);
        assert_eq!(volume.get_value([3, 1, 1]), 1.0);
        assert_eq!(volume.index_bbox(), ([-5000, 1, 1], [20, 1, 1]));
    }

    #[test]
    fn test_header_fields() {
        let bytes = GridBuilder::new(0.0)
            .with_name("density")
            .with_voxel_size(0.5)
            .with_translation([1.0, 2.0, 3.0])
            .build()
            .unwrap();
        let volume = Volume::new(&bytes).unwrap();
        assert_eq!(volume.name(), "density");
        assert_eq!(volume.voxel_size(), [0.5, 0.5, 0.5]);
        assert_eq!(read::<u32>(&bytes, GRID_OFF_VERSION), VERSION);
        assert_eq!(read::<[f32; 3]>(&bytes, GRID_OFF_MAP + MAP_OFF_VECF), [1.0, 2.0, 3.0]);
        assert_eq!(read::<[f32; 9]>(&bytes, GRID_OFF_MAP + MAP_OFF_INVMATF)[4], 2.0);
    }

    #[test]
    fn test_long_names_are_truncated() {
        let bytes = GridBuilder::new(0.0).with_name("x".repeat(400)).build().unwrap();
        assert_eq!(Volume::new(&bytes).unwrap().name().len(), GRID_NAME_LEN - 1);
    }

    #[test]
    fn test_singular_transform_rejected() {
        let flat = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        assert!(matches!(
            GridBuilder::new(0.0).with_transform(flat, [0.0; 3]).build(),
            Err(WispError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_tiny_voxels_build() {
        let mut grid = GridBuilder::new(0.0).with_voxel_size(1e-6);
        grid.set_value([0, 0, 0], 1.0);
        let bytes = grid.build().unwrap();
        let volume = Volume::new(&bytes).unwrap();
        assert!(volume.voxel_size().iter().all(|&v| (v - 1e-6).abs() < 1e-18));
        let back = volume.world_to_index(volume.index_to_world(Vec3::new(3.0, -2.0, 1.0)));
        assert!((back - Vec3::new(3.0, -2.0, 1.0)).length() < 1e-3);
        assert_eq!(volume.get_value([0, 0, 0]), 1.0);
    }

    #[test]
    fn test_invert() {
        let m = [[2.0, 0.0, 1.0], [0.0, 4.0, 0.0], [0.0, 0.0, 0.5]];
        let inv = invert(&m).unwrap();
        for r in 0..3 {
            for c in 0..3 {
                let v: f64 = (0..3).map(|k| m[r][k] * inv[k][c]).sum();
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-12);
            }
        }
    }
}
