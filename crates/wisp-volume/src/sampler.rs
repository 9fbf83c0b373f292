//! Kernel-callable sampling and transform operations.
//!
//! Gradients do not flow through volume sampling: every `adj_*` here accepts
//! the full adjoint signature and leaves all accumulators untouched.

use wisp_core::{Vec3, WispError};

use crate::grid::Volume;
use crate::layout::Coord;

/// How a fractional index-space position is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum SamplingMode {
    /// Value of the nearest voxel.
    #[default]
    Closest = 0,
    /// Trilinear blend of the 8 surrounding voxels.
    Linear = 1,
}

impl TryFrom<i32> for SamplingMode {
    type Error = WispError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Closest),
            1 => Ok(Self::Linear),
            other => Err(WispError::InvalidSamplingMode(other)),
        }
    }
}

const CORNERS: [Coord; 8] = [
    [0, 0, 0],
    [0, 0, 1],
    [0, 1, 0],
    [0, 1, 1],
    [1, 0, 0],
    [1, 0, 1],
    [1, 1, 0],
    [1, 1, 1],
];

/// Sample at fractional index-space coordinates `uvw`.
pub fn volume_sample_local(volume: &Volume<'_>, uvw: Vec3, mode: SamplingMode) -> f32 {
    match mode {
        SamplingMode::Closest => {
            // round half away from zero
            let ijk = [uvw.x.round() as i32, uvw.y.round() as i32, uvw.z.round() as i32];
            volume.get_value(ijk)
        }
        SamplingMode::Linear => {
            let base = uvw.floor();
            let frac = uvw - base;
            let ijk = [base.x as i32, base.y as i32, base.z as i32];

            let wx = [1.0 - frac.x, frac.x];
            let wy = [1.0 - frac.y, frac.y];
            let wz = [1.0 - frac.z, frac.z];

            let mut accessor = volume.accessor();
            let mut value = 0.0f32;
            for [ox, oy, oz] in CORNERS {
                let tap = [ijk[0] + ox, ijk[1] + oy, ijk[2] + oz];
                let weight = wx[ox as usize] * wy[oy as usize] * wz[oz as usize];
                value += weight * accessor.get_value(tap);
            }
            value
        }
    }
}

pub fn adj_volume_sample_local(
    _volume: &Volume<'_>,
    _uvw: Vec3,
    _mode: SamplingMode,
    _adj_uvw: &mut Vec3,
    _adj_ret: f32,
) {
}

/// Sample at world-space coordinates `xyz`.
pub fn volume_sample_world(volume: &Volume<'_>, xyz: Vec3, mode: SamplingMode) -> f32 {
    volume_sample_local(volume, volume.world_to_index(xyz), mode)
}

pub fn adj_volume_sample_world(
    _volume: &Volume<'_>,
    _xyz: Vec3,
    _mode: SamplingMode,
    _adj_xyz: &mut Vec3,
    _adj_ret: f32,
) {
}

/// Value of voxel `(i, j, k)`, without interpolation.
pub fn volume_lookup(volume: &Volume<'_>, i: i32, j: i32, k: i32) -> f32 {
    volume.get_value([i, j, k])
}

#[allow(clippy::too_many_arguments)]
pub fn adj_volume_lookup(
    _volume: &Volume<'_>,
    _i: i32,
    _j: i32,
    _k: i32,
    _adj_i: &mut i32,
    _adj_j: &mut i32,
    _adj_k: &mut i32,
    _adj_ret: f32,
) {
}

/// Index space to world space.
pub fn volume_transform(volume: &Volume<'_>, uvw: Vec3) -> Vec3 {
    volume.index_to_world(uvw)
}

pub fn adj_volume_transform(_volume: &Volume<'_>, _uvw: Vec3, _adj_uvw: &mut Vec3, _adj_ret: Vec3) {}

/// World space to index space.
pub fn volume_transform_inv(volume: &Volume<'_>, xyz: Vec3) -> Vec3 {
    volume.world_to_index(xyz)
}

pub fn adj_volume_transform_inv(
    _volume: &Volume<'_>,
    _xyz: Vec3,
    _adj_xyz: &mut Vec3,
    _adj_ret: Vec3,
) {
}
