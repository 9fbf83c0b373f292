//! # wisp-volume
//!
//! Sampling of sparse float voxel grids stored in the NanoVDB binary layout.
//!
//! - [`Volume`]: validated, read-only handle over a grid buffer; never allocates
//! - [`ReadAccessor`]: node-caching reader used for neighbouring lookups
//! - `volume_sample_local` / `volume_sample_world` / `volume_lookup` /
//!   `volume_transform` / `volume_transform_inv`, with (inert) adjoints
//! - [`GridBuilder`] and [`read_grid_file`] for producing grid buffers on the host
//!
//! Sampling only reads the buffer, so any number of threads may sample the same
//! volume at once.

pub mod accessor;
pub mod builder;
pub mod grid;
pub mod layout;
pub mod sampler;

pub use accessor::ReadAccessor;
pub use builder::GridBuilder;
pub use grid::{read_grid_file, GridBuffer, Volume};
pub use layout::Coord;
pub use sampler::*;
