use crate::grid::{child_of, leaf_value_address, lower_value_address, upper_value_address, Volume};
use crate::layout::*;

/// Tree reader that remembers the last leaf, lower and upper node it visited.
///
/// Neighbouring lookups (such as the 8 taps of a trilinear sample) usually land
/// in the same leaf, so most reads skip the root table scan and the descent.
#[derive(Debug, Clone)]
pub struct ReadAccessor<'a> {
    volume: Volume<'a>,
    leaf: Option<(Coord, usize)>,
    lower: Option<(Coord, usize)>,
    upper: Option<(Coord, usize)>,
}

impl<'a> ReadAccessor<'a> {
    pub fn new(volume: Volume<'a>) -> Self {
        Self {
            volume,
            leaf: None,
            lower: None,
            upper: None,
        }
    }

    pub fn get_value(&mut self, ijk: Coord) -> f32 {
        let address = self.value_address(ijk);
        read(self.volume.buf(), address)
    }

    fn value_address(&mut self, ijk: Coord) -> usize {
        let buf = self.volume.buf();

        if let Some((origin, leaf)) = self.leaf {
            if node_origin(ijk, LEAF_LOG2_DIM) == origin {
                return leaf_value_address(leaf, ijk);
            }
        }

        if let Some((origin, lower)) = self.lower {
            if node_origin(ijk, LOWER_TOTAL) == origin {
                let (address, leaf) = lower_value_address(buf, lower, ijk);
                self.remember_leaf(ijk, leaf);
                return address;
            }
        }

        if let Some((origin, upper)) = self.upper {
            if node_origin(ijk, UPPER_TOTAL) == origin {
                return self.descend_upper(upper, ijk);
            }
        }

        let root = self.volume.root();
        let Some(tile) = self.volume.find_tile(ijk) else {
            return root + ROOT_OFF_BACKGROUND;
        };
        match child_of(buf, tile, ROOT_TILE_OFF_CHILD, root) {
            Some(upper) => {
                self.upper = Some((node_origin(ijk, UPPER_TOTAL), upper));
                self.descend_upper(upper, ijk)
            }
            None => tile + ROOT_TILE_OFF_VALUE,
        }
    }

    fn descend_upper(&mut self, upper: usize, ijk: Coord) -> usize {
        let (address, lower, leaf) = upper_value_address(self.volume.buf(), upper, ijk);
        if let Some(lower) = lower {
            self.lower = Some((node_origin(ijk, LOWER_TOTAL), lower));
        }
        self.remember_leaf(ijk, leaf);
        address
    }

    fn remember_leaf(&mut self, ijk: Coord, leaf: Option<usize>) {
        if let Some(leaf) = leaf {
            self.leaf = Some((node_origin(ijk, LEAF_LOG2_DIM), leaf));
        }
    }
}
