//! Byte layout of a NanoVDB float grid.
//!
//! A grid buffer holds, in order: the grid header, the tree header, the root
//! node with its tile table, then every upper (32³), lower (16³) and leaf (8³)
//! node. Node child references are signed byte offsets relative to the parent.
//! All multi-byte fields are little-endian and may be read unaligned.

use bytemuck::Pod;

/// Integer voxel coordinate in index space.
pub type Coord = [i32; 3];

/// `"NanoVDB0"` read as a little-endian `u64`.
pub const MAGIC: u64 = 0x304244566f6e614e;

pub const VERSION_MAJOR: u32 = 32;
pub const VERSION_MINOR: u32 = 3;
pub const VERSION_PATCH: u32 = 3;
pub const VERSION: u32 = (VERSION_MAJOR << 21) | (VERSION_MINOR << 10) | VERSION_PATCH;

pub const GRID_TYPE_FLOAT: u32 = 1;
pub const GRID_CLASS_UNKNOWN: u32 = 0;

pub const GRID_NAME_LEN: usize = 256;

// grid header
pub const GRID_OFF_MAGIC: usize = 0;
pub const GRID_OFF_CHECKSUM: usize = 8;
pub const GRID_OFF_VERSION: usize = 16;
pub const GRID_OFF_FLAGS: usize = 20;
pub const GRID_OFF_GRID_INDEX: usize = 24;
pub const GRID_OFF_GRID_COUNT: usize = 28;
pub const GRID_OFF_GRID_SIZE: usize = 32;
pub const GRID_OFF_GRID_NAME: usize = 40;
pub const GRID_OFF_MAP: usize = 296;
pub const GRID_OFF_WORLD_BBOX: usize = 560;
pub const GRID_OFF_VOXEL_SIZE: usize = 608;
pub const GRID_OFF_GRID_CLASS: usize = 632;
pub const GRID_OFF_GRID_TYPE: usize = 636;
pub const GRID_OFF_BLIND_METADATA_OFFSET: usize = 640;
pub const GRID_OFF_BLIND_METADATA_COUNT: usize = 648;
pub const GRID_SIZE: usize = 672;

// affine map, relative to GRID_OFF_MAP
pub const MAP_OFF_MATF: usize = 0;
pub const MAP_OFF_INVMATF: usize = 36;
pub const MAP_OFF_VECF: usize = 72;
pub const MAP_OFF_TAPERF: usize = 84;
pub const MAP_OFF_MATD: usize = 88;
pub const MAP_OFF_INVMATD: usize = 160;
pub const MAP_OFF_VECD: usize = 232;
pub const MAP_OFF_TAPERD: usize = 256;
pub const MAP_SIZE: usize = 264;

// tree header, follows the grid header
pub const TREE_OFF_NODE_OFFSET_LEAF: usize = 0;
pub const TREE_OFF_NODE_OFFSET_LOWER: usize = 8;
pub const TREE_OFF_NODE_OFFSET_UPPER: usize = 16;
pub const TREE_OFF_NODE_OFFSET_ROOT: usize = 24;
pub const TREE_OFF_NODE_COUNT_LEAF: usize = 32;
pub const TREE_OFF_NODE_COUNT_LOWER: usize = 36;
pub const TREE_OFF_NODE_COUNT_UPPER: usize = 40;
pub const TREE_OFF_TILE_COUNT_LEAF: usize = 44;
pub const TREE_OFF_TILE_COUNT_LOWER: usize = 48;
pub const TREE_OFF_TILE_COUNT_UPPER: usize = 52;
pub const TREE_OFF_VOXEL_COUNT: usize = 56;
pub const TREE_SIZE: usize = 64;

// root node (float)
pub const ROOT_OFF_BBOX_MIN: usize = 0;
pub const ROOT_OFF_BBOX_MAX: usize = 12;
pub const ROOT_OFF_TABLE_SIZE: usize = 24;
pub const ROOT_OFF_BACKGROUND: usize = 28;
pub const ROOT_OFF_MIN: usize = 32;
pub const ROOT_OFF_MAX: usize = 36;
pub const ROOT_OFF_AVE: usize = 40;
pub const ROOT_OFF_STDDEV: usize = 44;
pub const ROOT_SIZE: usize = 64;

pub const ROOT_TILE_OFF_KEY: usize = 0;
pub const ROOT_TILE_OFF_CHILD: usize = 8;
pub const ROOT_TILE_OFF_STATE: usize = 16;
pub const ROOT_TILE_OFF_VALUE: usize = 20;
pub const ROOT_TILE_SIZE: usize = 32;

// internal and leaf nodes share the bbox/flags prefix
pub const NODE_OFF_BBOX_MIN: usize = 0;
pub const NODE_OFF_BBOX_MAX: usize = 12;
pub const NODE_OFF_FLAGS: usize = 24;

pub const UPPER_LOG2_DIM: u32 = 5;
pub const UPPER_TOTAL: u32 = 12;
pub const UPPER_TABLE_COUNT: usize = 1 << (3 * UPPER_LOG2_DIM);
pub const UPPER_OFF_VALUE_MASK: usize = 32;
pub const UPPER_OFF_CHILD_MASK: usize = UPPER_OFF_VALUE_MASK + UPPER_TABLE_COUNT / 8;
pub const UPPER_OFF_MIN: usize = 8224;
pub const UPPER_OFF_MAX: usize = 8228;
pub const UPPER_OFF_AVE: usize = 8232;
pub const UPPER_OFF_STDDEV: usize = 8236;
pub const UPPER_OFF_TABLE: usize = 8256;
pub const UPPER_SIZE: usize = UPPER_OFF_TABLE + UPPER_TABLE_COUNT * TABLE_STRIDE;

pub const LOWER_LOG2_DIM: u32 = 4;
pub const LOWER_TOTAL: u32 = 7;
pub const LOWER_TABLE_COUNT: usize = 1 << (3 * LOWER_LOG2_DIM);
pub const LOWER_OFF_VALUE_MASK: usize = 32;
pub const LOWER_OFF_CHILD_MASK: usize = LOWER_OFF_VALUE_MASK + LOWER_TABLE_COUNT / 8;
pub const LOWER_OFF_MIN: usize = 1056;
pub const LOWER_OFF_MAX: usize = 1060;
pub const LOWER_OFF_AVE: usize = 1064;
pub const LOWER_OFF_STDDEV: usize = 1068;
pub const LOWER_OFF_TABLE: usize = 1088;
pub const LOWER_SIZE: usize = LOWER_OFF_TABLE + LOWER_TABLE_COUNT * TABLE_STRIDE;

pub const LEAF_LOG2_DIM: u32 = 3;
pub const LEAF_TABLE_COUNT: usize = 1 << (3 * LEAF_LOG2_DIM);
pub const LEAF_OFF_BBOX_DIF_AND_FLAGS: usize = 12;
pub const LEAF_OFF_VALUE_MASK: usize = 16;
pub const LEAF_OFF_MIN: usize = 80;
pub const LEAF_OFF_MAX: usize = 84;
pub const LEAF_OFF_AVE: usize = 88;
pub const LEAF_OFF_STDDEV: usize = 92;
pub const LEAF_OFF_TABLE: usize = 96;
pub const LEAF_SIZE: usize = LEAF_OFF_TABLE + LEAF_TABLE_COUNT * 4;

/// Internal node table entries hold either a tile value or a child offset.
pub const TABLE_STRIDE: usize = 8;

/// Read a plain-old-data value at `offset`. Panics if it runs past the buffer.
#[inline]
pub fn read<T: Pod>(buf: &[u8], offset: usize) -> T {
    bytemuck::pod_read_unaligned(&buf[offset..offset + std::mem::size_of::<T>()])
}

/// Write a plain-old-data value at `offset`. Panics if it runs past the buffer.
#[inline]
pub fn write<T: Pod>(buf: &mut [u8], offset: usize, value: T) {
    buf[offset..offset + std::mem::size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
}

#[inline]
pub fn read_coord(buf: &[u8], offset: usize) -> Coord {
    read::<[i32; 3]>(buf, offset)
}

/// Whether bit `n` of the mask at `offset` is set.
#[inline]
pub fn mask_is_on(buf: &[u8], offset: usize, n: usize) -> bool {
    let word: u32 = read(buf, offset + 4 * (n >> 5));
    word & (1u32 << (n & 31)) != 0
}

pub fn mask_set_on(buf: &mut [u8], offset: usize, n: usize) {
    let at = offset + 4 * (n >> 5);
    let word: u32 = read(buf, at);
    write(buf, at, word | (1u32 << (n & 31)));
}

/// Root table key of the upper node containing `ijk`.
#[inline]
pub fn coord_to_key(ijk: Coord) -> u64 {
    let [x, y, z] = ijk.map(|c| u64::from((c as u32) >> UPPER_TOTAL));
    z | (y << 21) | (x << 42)
}

#[inline]
pub fn upper_coord_to_offset(ijk: Coord) -> usize {
    let [x, y, z] = ijk.map(|c| (((c & ((1 << UPPER_TOTAL) - 1)) >> LOWER_TOTAL) as usize));
    (x << (2 * UPPER_LOG2_DIM)) | (y << UPPER_LOG2_DIM) | z
}

#[inline]
pub fn lower_coord_to_offset(ijk: Coord) -> usize {
    let [x, y, z] = ijk.map(|c| (((c & ((1 << LOWER_TOTAL) - 1)) >> LEAF_LOG2_DIM) as usize));
    (x << (2 * LOWER_LOG2_DIM)) | (y << LOWER_LOG2_DIM) | z
}

#[inline]
pub fn leaf_coord_to_offset(ijk: Coord) -> usize {
    let [x, y, z] = ijk.map(|c| (c & ((1 << LEAF_LOG2_DIM) - 1)) as usize);
    (x << (2 * LEAF_LOG2_DIM)) | (y << LEAF_LOG2_DIM) | z
}

/// Origin of the node of `total` log2 extent that contains `ijk`.
#[inline]
pub fn node_origin(ijk: Coord, total: u32) -> Coord {
    ijk.map(|c| c & !((1 << total) - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_sizes() {
        assert_eq!(UPPER_SIZE, 270_400);
        assert_eq!(LOWER_SIZE, 33_856);
        assert_eq!(LEAF_SIZE, 2_144);
        assert_eq!(UPPER_OFF_CHILD_MASK, 4_128);
        assert_eq!(LOWER_OFF_CHILD_MASK, 544);
        assert_eq!(GRID_OFF_MAP + MAP_SIZE, GRID_OFF_WORLD_BBOX);
    }

    #[test]
    fn test_magic_spells_nanovdb() {
        assert_eq!(&MAGIC.to_le_bytes(), b"NanoVDB0");
    }

    #[test]
    fn test_coord_offsets() {
        assert_eq!(leaf_coord_to_offset([1, 2, 3]), 64 + 16 + 3);
        assert_eq!(leaf_coord_to_offset([-1, -1, -1]), 511);
        assert_eq!(lower_coord_to_offset([8, 0, 16]), 256 + 2);
        assert_eq!(upper_coord_to_offset([128, 256, 0]), 1024 + 64);
        assert_eq!(node_origin([-1, 9, 130], 3), [-8, 8, 128]);
    }

    #[test]
    fn test_root_keys_separate_negative_coords() {
        assert_eq!(coord_to_key([0, 0, 0]), 0);
        assert_eq!(coord_to_key([0, 0, 4096]), 1);
        assert_ne!(coord_to_key([-1, 0, 0]), coord_to_key([0, 0, 0]));
        assert_eq!(coord_to_key([-1, 0, 0]), coord_to_key([-4096, 0, 0]));
    }

    #[test]
    fn test_masks() {
        let mut buf = vec![0u8; 64];
        mask_set_on(&mut buf, 0, 37);
        assert!(mask_is_on(&buf, 0, 37));
        assert!(!mask_is_on(&buf, 0, 36));
        assert_eq!(read::<u32>(&buf, 4), 1 << 5);
    }

    #[test]
    fn test_read_write_unaligned() {
        let mut buf = vec![0u8; 16];
        write(&mut buf, 3, -2.5f32);
        write(&mut buf, 7, 0x1122_3344_5566_7788u64);
        assert_eq!(read::<f32>(&buf, 3), -2.5);
        assert_eq!(read::<u64>(&buf, 7), 0x1122_3344_5566_7788);
    }
}
