//! Launch geometry for one-dimensional kernels.

use wisp_core::{Result, WispError};

/// How a launch of `dim` logical threads is split into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Total logical threads.
    pub dim: usize,
    /// Number of blocks.
    pub grid_dim: usize,
    /// Logical threads per block.
    pub block_dim: usize,
}

impl LaunchConfig {
    pub fn new(dim: usize, block_dim: usize) -> Result<Self> {
        if block_dim == 0 {
            return Err(WispError::InvalidLaunch("block_dim must be non-zero".into()));
        }
        Ok(grid_1d(dim, block_dim))
    }

    /// Linear thread index for a block/thread coordinate, or `None` past the
    /// end of the launch (the last block may be partial).
    #[inline]
    pub fn thread_index(&self, block_idx: usize, thread_idx: usize) -> Option<usize> {
        let tid = self.block_dim * block_idx + thread_idx;
        (tid < self.dim).then_some(tid)
    }

    /// Logical threads in `block_idx`.
    pub fn block_len(&self, block_idx: usize) -> usize {
        self.dim
            .saturating_sub(self.block_dim * block_idx)
            .min(self.block_dim)
    }
}

/// Compute grid dimensions for a 1D launch. `block_size` must be non-zero.
pub fn grid_1d(n: usize, block_size: usize) -> LaunchConfig {
    LaunchConfig {
        dim: n,
        grid_dim: n.div_ceil(block_size),
        block_dim: block_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_1d() {
        let cfg = grid_1d(1000, 256);
        assert_eq!(cfg.grid_dim, 4);
        assert_eq!(cfg.block_len(3), 1000 - 768);
        assert_eq!(cfg.block_len(4), 0);

        assert_eq!(grid_1d(256, 256).grid_dim, 1);
        assert_eq!(grid_1d(0, 256).grid_dim, 0);
    }

    #[test]
    fn test_thread_index() {
        let cfg = grid_1d(10, 4);
        assert_eq!(cfg.thread_index(0, 3), Some(3));
        assert_eq!(cfg.thread_index(2, 1), Some(9));
        assert_eq!(cfg.thread_index(2, 2), None);
    }

    #[test]
    fn test_zero_block_dim_rejected() {
        assert!(matches!(
            LaunchConfig::new(10, 0),
            Err(WispError::InvalidLaunch(_))
        ));
    }
}
