//! Read-only view over a grid buffer.

use std::path::Path;

use wisp_core::{Result, Vec3, WispError};

use crate::accessor::ReadAccessor;
use crate::layout::*;

/// Non-owning handle over a float grid laid out in memory.
///
/// The handle never allocates, mutates or frees the buffer; everything it
/// returns is read through the buffer on demand.
#[derive(Debug, Clone, Copy)]
pub struct Volume<'a> {
    buf: &'a [u8],
    grid: usize,
    tree: usize,
    size_in_bytes: u64,
}

impl<'a> Volume<'a> {
    /// Validate `buf` as a float grid and wrap it.
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < GRID_SIZE + TREE_SIZE {
            return Err(WispError::InvalidGrid(format!(
                "buffer of {} bytes is smaller than a grid header",
                buf.len()
            )));
        }

        let magic: u64 = read(buf, GRID_OFF_MAGIC);
        if magic != MAGIC {
            return Err(WispError::InvalidGrid(format!(
                "NanoVDB signature doesn't match, found {:?}",
                String::from_utf8_lossy(&buf[..8])
            )));
        }

        let version: u32 = read(buf, GRID_OFF_VERSION);
        if version >> 21 != VERSION_MAJOR {
            return Err(WispError::InvalidGrid(format!(
                "unsupported major version {} (expected {VERSION_MAJOR})",
                version >> 21
            )));
        }

        let grid_type: u32 = read(buf, GRID_OFF_GRID_TYPE);
        if grid_type != GRID_TYPE_FLOAT {
            return Err(WispError::UnsupportedGridType(grid_type));
        }

        let size_in_bytes: u64 = read(buf, GRID_OFF_GRID_SIZE);
        if size_in_bytes > buf.len() as u64 || size_in_bytes < (GRID_SIZE + TREE_SIZE) as u64 {
            return Err(WispError::InvalidGrid(format!(
                "grid size {size_in_bytes} does not fit a buffer of {} bytes",
                buf.len()
            )));
        }

        let volume = Self {
            buf,
            grid: 0,
            tree: GRID_SIZE,
            size_in_bytes,
        };

        volume.check_tree()?;

        tracing::debug!(
            name = %volume.name(),
            bytes = size_in_bytes,
            leaves = volume.leaf_count(),
            "opened volume"
        );
        Ok(volume)
    }

    /// The 64-bit identifier kernels use to refer to this handle.
    ///
    /// It is the address of the handle, so it is only meaningful while the
    /// handle stays where it is.
    pub fn id(&self) -> u64 {
        self as *const Self as u64
    }

    /// Reinterpret an identifier produced by [`Volume::id`].
    ///
    /// # Safety
    ///
    /// `id` must come from `Volume::id` on a handle that is still alive and has
    /// not moved for the whole lifetime `'b`.
    pub unsafe fn from_id<'b>(id: u64) -> &'b Volume<'b> {
        &*(id as *const Volume<'b>)
    }

    pub fn data(&self) -> &'a [u8] {
        self.buf
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.size_in_bytes
    }

    pub fn name(&self) -> String {
        let raw = &self.buf[self.grid + GRID_OFF_GRID_NAME..][..GRID_NAME_LEN];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(GRID_NAME_LEN);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    pub fn voxel_size(&self) -> [f64; 3] {
        read(self.buf, self.grid + GRID_OFF_VOXEL_SIZE)
    }

    /// World-space bounding box as `(min, max)`.
    pub fn world_bbox(&self) -> ([f64; 3], [f64; 3]) {
        let at = self.grid + GRID_OFF_WORLD_BBOX;
        (read(self.buf, at), read(self.buf, at + 24))
    }

    /// Index-space bounding box of the active voxels as `(min, max)`, inclusive.
    pub fn index_bbox(&self) -> (Coord, Coord) {
        let root = self.root();
        (
            read_coord(self.buf, root + ROOT_OFF_BBOX_MIN),
            read_coord(self.buf, root + ROOT_OFF_BBOX_MAX),
        )
    }

    pub fn background(&self) -> f32 {
        read(self.buf, self.root() + ROOT_OFF_BACKGROUND)
    }

    pub fn active_voxel_count(&self) -> u64 {
        read(self.buf, self.tree + TREE_OFF_VOXEL_COUNT)
    }

    pub fn leaf_count(&self) -> u32 {
        read(self.buf, self.tree + TREE_OFF_NODE_COUNT_LEAF)
    }

    /// Map an index-space point to world space (single precision).
    pub fn index_to_world(&self, ijk: Vec3) -> Vec3 {
        let map = self.grid + GRID_OFF_MAP;
        let mat: [f32; 9] = read(self.buf, map + MAP_OFF_MATF);
        let vec: [f32; 3] = read(self.buf, map + MAP_OFF_VECF);
        mat_mul(&mat, ijk) + Vec3::from(vec)
    }

    /// Map a world-space point to index space (single precision).
    pub fn world_to_index(&self, xyz: Vec3) -> Vec3 {
        let map = self.grid + GRID_OFF_MAP;
        let inv: [f32; 9] = read(self.buf, map + MAP_OFF_INVMATF);
        let vec: [f32; 3] = read(self.buf, map + MAP_OFF_VECF);
        mat_mul(&inv, xyz - Vec3::from(vec))
    }

    /// Value stored for voxel `ijk`; the background outside the tree.
    pub fn get_value(&self, ijk: Coord) -> f32 {
        read(self.buf, self.value_address(ijk))
    }

    /// A cached accessor for runs of nearby lookups.
    pub fn accessor(&self) -> ReadAccessor<'a> {
        ReadAccessor::new(*self)
    }

    pub(crate) fn buf(&self) -> &'a [u8] {
        self.buf
    }

    pub(crate) fn root(&self) -> usize {
        let offset: u64 = read(self.buf, self.tree + TREE_OFF_NODE_OFFSET_ROOT);
        self.tree + offset as usize
    }

    /// Walk the node graph and make sure every node lies inside the grid, so
    /// later reads through this handle stay in bounds.
    fn check_tree(&self) -> Result<()> {
        let end = self.size_in_bytes;
        let root_offset: u64 = read(self.buf, self.tree + TREE_OFF_NODE_OFFSET_ROOT);
        let root = (self.tree as u64)
            .checked_add(root_offset)
            .ok_or_else(|| WispError::InvalidGrid(format!("root offset {root_offset} overflows")))?;
        let root = check_span("root node", root, ROOT_SIZE, end)?;

        let tiles = self.root_table_size() as usize;
        check_span(
            "root tile table",
            (root + ROOT_SIZE) as u64,
            tiles * ROOT_TILE_SIZE,
            end,
        )?;

        for i in 0..tiles {
            let tile = root + ROOT_SIZE + i * ROOT_TILE_SIZE;
            let Some(upper) =
                checked_child(self.buf, tile + ROOT_TILE_OFF_CHILD, root, UPPER_SIZE, end, "upper")?
            else {
                continue;
            };
            for n in set_bits(self.buf, upper + UPPER_OFF_CHILD_MASK, UPPER_TABLE_COUNT) {
                let entry = upper + UPPER_OFF_TABLE + n * TABLE_STRIDE;
                let Some(lower) = checked_child(self.buf, entry, upper, LOWER_SIZE, end, "lower")?
                else {
                    continue;
                };
                for m in set_bits(self.buf, lower + LOWER_OFF_CHILD_MASK, LOWER_TABLE_COUNT) {
                    let entry = lower + LOWER_OFF_TABLE + m * TABLE_STRIDE;
                    checked_child(self.buf, entry, lower, LEAF_SIZE, end, "leaf")?;
                }
            }
        }
        Ok(())
    }

    fn root_table_size(&self) -> u32 {
        read(self.buf, self.root() + ROOT_OFF_TABLE_SIZE)
    }

    /// Address of the root tile whose upper node would contain `ijk`.
    pub(crate) fn find_tile(&self, ijk: Coord) -> Option<usize> {
        let root = self.root();
        let key = coord_to_key(ijk);
        (0..self.root_table_size() as usize)
            .map(|i| root + ROOT_SIZE + i * ROOT_TILE_SIZE)
            .find(|&tile| read::<u64>(self.buf, tile + ROOT_TILE_OFF_KEY) == key)
    }

    /// Byte address of the `f32` holding the value for `ijk`.
    pub(crate) fn value_address(&self, ijk: Coord) -> usize {
        let Some(tile) = self.find_tile(ijk) else {
            return self.root() + ROOT_OFF_BACKGROUND;
        };
        match child_of(self.buf, tile, ROOT_TILE_OFF_CHILD, self.root()) {
            Some(upper) => upper_value_address(self.buf, upper, ijk).0,
            None => tile + ROOT_TILE_OFF_VALUE,
        }
    }
}

/// Resolve the signed child offset at `entry`, relative to `parent`. Zero means no child.
#[inline]
pub(crate) fn child_of(buf: &[u8], entry: usize, field: usize, parent: usize) -> Option<usize> {
    let offset: i64 = read(buf, entry + field);
    (offset != 0).then(|| (parent as i64 + offset) as usize)
}

/// `start` as an address if `len` bytes from it fit below `end`.
fn check_span(what: &str, start: u64, len: usize, end: u64) -> Result<usize> {
    match start.checked_add(len as u64) {
        Some(stop) if stop <= end => Ok(start as usize),
        _ => Err(WispError::InvalidGrid(format!(
            "{what} at {start} ({len} bytes) runs past the grid end {end}"
        ))),
    }
}

/// Like [`child_of`], but fails if the child node would leave the grid.
fn checked_child(
    buf: &[u8],
    entry: usize,
    parent: usize,
    len: usize,
    end: u64,
    what: &str,
) -> Result<Option<usize>> {
    let offset: i64 = read(buf, entry);
    if offset == 0 {
        return Ok(None);
    }
    let start = (parent as i64)
        .checked_add(offset)
        .filter(|&start| start >= 0)
        .ok_or_else(|| {
            WispError::InvalidGrid(format!("{what} node offset {offset} from {parent} is out of range"))
        })?;
    check_span(what, start as u64, len, end).map(Some)
}

fn set_bits(buf: &[u8], mask: usize, count: usize) -> impl Iterator<Item = usize> + '_ {
    (0..count).filter(move |&n| mask_is_on(buf, mask, n))
}

/// Value address for `ijk` below `upper`, plus the lower and leaf nodes visited.
pub(crate) fn upper_value_address(
    buf: &[u8],
    upper: usize,
    ijk: Coord,
) -> (usize, Option<usize>, Option<usize>) {
    let n = upper_coord_to_offset(ijk);
    let entry = upper + UPPER_OFF_TABLE + n * TABLE_STRIDE;
    if mask_is_on(buf, upper + UPPER_OFF_CHILD_MASK, n) {
        if let Some(lower) = child_of(buf, entry, 0, upper) {
            let (address, leaf) = lower_value_address(buf, lower, ijk);
            return (address, Some(lower), leaf);
        }
    }
    (entry, None, None)
}

/// Value address for `ijk` below `lower`, plus the leaf visited.
pub(crate) fn lower_value_address(buf: &[u8], lower: usize, ijk: Coord) -> (usize, Option<usize>) {
    let n = lower_coord_to_offset(ijk);
    let entry = lower + LOWER_OFF_TABLE + n * TABLE_STRIDE;
    if mask_is_on(buf, lower + LOWER_OFF_CHILD_MASK, n) {
        if let Some(leaf) = child_of(buf, entry, 0, lower) {
            return (leaf_value_address(leaf, ijk), Some(leaf));
        }
    }
    (entry, None)
}

#[inline]
pub(crate) fn leaf_value_address(leaf: usize, ijk: Coord) -> usize {
    leaf + LEAF_OFF_TABLE + 4 * leaf_coord_to_offset(ijk)
}

/// Row-major 3x3 matrix times vector.
#[inline]
fn mat_mul(m: &[f32; 9], v: Vec3) -> Vec3 {
    Vec3::new(
        m[0] * v.x + m[1] * v.y + m[2] * v.z,
        m[3] * v.x + m[4] * v.y + m[5] * v.z,
        m[6] * v.x + m[7] * v.y + m[8] * v.z,
    )
}

/// An owned grid buffer, typically loaded from disk.
#[derive(Debug, Clone)]
pub struct GridBuffer {
    bytes: Vec<u8>,
}

impl GridBuffer {
    /// Take ownership of raw grid bytes after validating them.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Volume::new(&bytes)?;
        Ok(Self { bytes })
    }

    pub fn volume(&self) -> Volume<'_> {
        Volume {
            buf: &self.bytes,
            grid: 0,
            tree: GRID_SIZE,
            size_in_bytes: read(&self.bytes, GRID_OFF_GRID_SIZE),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Load a raw (uncompressed) grid file and check it is a float grid.
pub fn read_grid_file(path: impl AsRef<Path>) -> Result<GridBuffer> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "loading grid");
    GridBuffer::from_bytes(bytes)
}
