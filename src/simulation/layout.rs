//! Block decomposition of the domain.

use crate::boundary::BoundaryType;
use crate::error::{Result, SweError};
use crate::state::BlockGeometry;
use crate::types::{BlockIndex, Bounds2D, Edge, EdgeMap, Resolution2D};

/// One block of a layout: position, grid and edge boundary types.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockSpec {
    pub index: BlockIndex,
    pub geometry: BlockGeometry,
    pub boundaries: EdgeMap<BoundaryType>,
}

/// Rectangular arrangement of blocks, stored row by row from the bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockLayout {
    blocks_x: usize,
    blocks_y: usize,
    blocks: Vec<BlockSpec>,
}

impl BlockLayout {
    /// Split `extent` at `resolution` into `blocks_x × blocks_y` blocks.
    ///
    /// All blocks share the global cell spacing. When the cell count does
    /// not divide evenly the leading blocks get one extra column (row).
    /// Edges between blocks are CONNECT, the domain boundary takes `outer`.
    pub fn uniform(
        extent: Bounds2D,
        resolution: Resolution2D,
        blocks_x: usize,
        blocks_y: usize,
        outer: EdgeMap<BoundaryType>,
    ) -> Result<Self> {
        let (nx, ny) = resolution.as_tuple();
        if blocks_x == 0 || blocks_y == 0 {
            return Err(SweError::InvalidConfig("block layout needs at least one block".into()));
        }
        if blocks_x > nx || blocks_y > ny {
            return Err(SweError::InvalidConfig(format!(
                "{}x{} blocks do not fit a {} grid",
                blocks_x, blocks_y, resolution
            )));
        }
        let dx = extent.width() / nx as f64;
        let dy = extent.height() / ny as f64;
        let columns = split(nx, blocks_x);
        let rows = split(ny, blocks_y);

        let mut blocks = Vec::with_capacity(blocks_x * blocks_y);
        for (by, &(row_start, block_ny)) in rows.iter().enumerate() {
            for (bx, &(col_start, block_nx)) in columns.iter().enumerate() {
                let boundaries = EdgeMap::new(
                    if bx == 0 { outer.left } else { BoundaryType::Connect },
                    if bx + 1 == blocks_x { outer.right } else { BoundaryType::Connect },
                    if by == 0 { outer.bottom } else { BoundaryType::Connect },
                    if by + 1 == blocks_y { outer.top } else { BoundaryType::Connect },
                );
                blocks.push(BlockSpec {
                    index: BlockIndex::new(bx, by),
                    geometry: BlockGeometry::new(
                        block_nx,
                        block_ny,
                        dx,
                        dy,
                        extent.x_min + col_start as f64 * dx,
                        extent.y_min + row_start as f64 * dy,
                    ),
                    boundaries,
                });
            }
        }
        Self::from_blocks(blocks_x, blocks_y, blocks)
    }

    /// Single block covering the whole domain.
    pub fn single(extent: Bounds2D, resolution: Resolution2D, outer: EdgeMap<BoundaryType>) -> Result<Self> {
        Self::uniform(extent, resolution, 1, 1, outer)
    }

    /// Layout from explicit block specifications.
    ///
    /// Every position of the `blocks_x × blocks_y` arrangement must appear
    /// exactly once. A CONNECT edge needs a neighbour whose facing edge is
    /// CONNECT and of the same length. PASSIVE edges may sit anywhere.
    pub fn from_blocks(blocks_x: usize, blocks_y: usize, specs: Vec<BlockSpec>) -> Result<Self> {
        if specs.len() != blocks_x * blocks_y {
            return Err(SweError::InvalidConfig(format!(
                "{} block specifications for a {}x{} layout",
                specs.len(),
                blocks_x,
                blocks_y
            )));
        }
        let mut slots: Vec<Option<BlockSpec>> = vec![None; specs.len()];
        for spec in specs {
            let BlockIndex { x, y } = spec.index;
            if x >= blocks_x || y >= blocks_y {
                return Err(SweError::InvalidConfig(format!(
                    "block {} outside the {}x{} layout",
                    spec.index, blocks_x, blocks_y
                )));
            }
            if !spec.geometry.is_valid() {
                return Err(SweError::InvalidConfig(format!("block {} has an invalid geometry", spec.index)));
            }
            let slot = &mut slots[y * blocks_x + x];
            if slot.is_some() {
                return Err(SweError::InvalidConfig(format!("block {} specified twice", spec.index)));
            }
            *slot = Some(spec);
        }
        let blocks: Vec<BlockSpec> = slots.into_iter().flatten().collect();
        let layout = Self {
            blocks_x,
            blocks_y,
            blocks,
        };
        layout.check_connections()?;
        Ok(layout)
    }

    fn check_connections(&self) -> Result<()> {
        for spec in &self.blocks {
            for edge in Edge::ALL {
                if spec.boundaries[edge] != BoundaryType::Connect {
                    continue;
                }
                let neighbor = self
                    .neighbor(spec.index, edge)
                    .and_then(|index| self.get(index))
                    .ok_or_else(|| {
                        SweError::InvalidConfig(format!(
                            "{} edge of block {} is CONNECT but has no neighbour",
                            edge, spec.index
                        ))
                    })?;
                if neighbor.boundaries[edge.opposite()] != BoundaryType::Connect {
                    return Err(SweError::InvalidConfig(format!(
                        "block {} connects its {} edge to block {}, which does not connect back",
                        spec.index, edge, neighbor.index
                    )));
                }
                if edge_len(&spec.geometry, edge) != edge_len(&neighbor.geometry, edge.opposite()) {
                    return Err(SweError::InvalidConfig(format!(
                        "{} edge of block {} does not match the length of block {}",
                        edge, spec.index, neighbor.index
                    )));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn blocks_x(&self) -> usize {
        self.blocks_x
    }

    #[inline]
    pub fn blocks_y(&self) -> usize {
        self.blocks_y
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    /// Position of `index` in [`blocks`](Self::blocks).
    pub fn position(&self, index: BlockIndex) -> Option<usize> {
        (index.x < self.blocks_x && index.y < self.blocks_y).then(|| index.y * self.blocks_x + index.x)
    }

    pub fn get(&self, index: BlockIndex) -> Option<&BlockSpec> {
        self.position(index).map(|k| &self.blocks[k])
    }

    /// Block across `edge` of `index`, if the layout has one there.
    pub fn neighbor(&self, index: BlockIndex, edge: Edge) -> Option<BlockIndex> {
        let BlockIndex { x, y } = index;
        let (x, y) = match edge {
            Edge::Left => (x.checked_sub(1)?, y),
            Edge::Right => (x + 1, y),
            Edge::Bottom => (x, y.checked_sub(1)?),
            Edge::Top => (x, y + 1),
        };
        (x < self.blocks_x && y < self.blocks_y).then_some(BlockIndex::new(x, y))
    }

    /// Union of all block extents.
    pub fn extent(&self) -> Option<Bounds2D> {
        let bounds = self.blocks.iter().map(|spec| spec.geometry.bounds());
        let (x_min, x_max, y_min, y_max) = bounds.fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(x0, x1, y0, y1), b| (x0.min(b.x_min), x1.max(b.x_max), y0.min(b.y_min), y1.max(b.y_max)),
        );
        Bounds2D::try_new(x_min, x_max, y_min, y_max)
    }

    pub fn total_cells(&self) -> usize {
        self.blocks.iter().map(|spec| spec.geometry.nx * spec.geometry.ny).sum()
    }
}

/// `(start, len)` of `parts` nearly equal chunks of `n`.
fn split(n: usize, parts: usize) -> Vec<(usize, usize)> {
    let base = n / parts;
    let extra = n % parts;
    let mut start = 0;
    (0..parts)
        .map(|k| {
            let len = base + usize::from(k < extra);
            let chunk = (start, len);
            start += len;
            chunk
        })
        .collect()
}

fn edge_len(geometry: &BlockGeometry, edge: Edge) -> usize {
    if edge.is_vertical() { geometry.ny } else { geometry.nx }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walls() -> EdgeMap<BoundaryType> {
        EdgeMap::uniform(BoundaryType::Wall)
    }

    #[test]
    fn test_uniform_split_covers_domain() {
        let extent = Bounds2D::new(0.0, 100.0, -50.0, 50.0);
        let layout = BlockLayout::uniform(extent, Resolution2D::new(10, 7), 3, 2, walls()).unwrap();
        assert_eq!(layout.len(), 6);
        assert_eq!(layout.total_cells(), 70);
        let union = layout.extent().unwrap();
        assert_eq!((union.x_min, union.x_max, union.y_min), (0.0, 100.0, -50.0));
        assert!((union.y_max - 50.0).abs() < 1e-12);

        let nxs: Vec<usize> = (0..3)
            .map(|x| layout.get(BlockIndex::new(x, 0)).unwrap().geometry.nx)
            .collect();
        assert_eq!(nxs, vec![4, 3, 3]);
        let top = layout.get(BlockIndex::new(2, 1)).unwrap();
        assert_eq!(top.geometry.ny, 3);
        assert!((top.geometry.offset_x - 70.0).abs() < 1e-12);
        assert!((top.geometry.offset_y - (-50.0 + 4.0 * 100.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_inner_edges_connect() {
        let outer = EdgeMap::new(
            BoundaryType::Wall,
            BoundaryType::Outflow,
            BoundaryType::Wall,
            BoundaryType::Outflow,
        );
        let layout = BlockLayout::uniform(Bounds2D::new(0.0, 1.0, 0.0, 1.0), Resolution2D::square(8), 2, 2, outer).unwrap();
        let b00 = layout.get(BlockIndex::new(0, 0)).unwrap();
        assert_eq!(b00.boundaries.left, BoundaryType::Wall);
        assert_eq!(b00.boundaries.right, BoundaryType::Connect);
        assert_eq!(b00.boundaries.top, BoundaryType::Connect);
        let b11 = layout.get(BlockIndex::new(1, 1)).unwrap();
        assert_eq!(b11.boundaries.right, BoundaryType::Outflow);
        assert_eq!(b11.boundaries.top, BoundaryType::Outflow);
        assert_eq!(b11.boundaries.bottom, BoundaryType::Connect);

        assert_eq!(layout.neighbor(BlockIndex::new(0, 0), Edge::Left), None);
        assert_eq!(
            layout.neighbor(BlockIndex::new(0, 0), Edge::Top),
            Some(BlockIndex::new(0, 1))
        );
    }

    #[test]
    fn test_rejects_dangling_connect() {
        let spec = BlockSpec {
            index: BlockIndex::new(0, 0),
            geometry: BlockGeometry::new(4, 4, 1.0, 1.0, 0.0, 0.0),
            boundaries: EdgeMap::new(
                BoundaryType::Wall,
                BoundaryType::Connect,
                BoundaryType::Wall,
                BoundaryType::Wall,
            ),
        };
        let err = BlockLayout::from_blocks(1, 1, vec![spec]).unwrap_err();
        assert!(matches!(err, SweError::InvalidConfig(_)));
    }

    #[test]
    fn test_passive_edges_allowed() {
        let spec = BlockSpec {
            index: BlockIndex::new(0, 0),
            geometry: BlockGeometry::new(4, 4, 1.0, 1.0, 0.0, 0.0),
            boundaries: EdgeMap::new(
                BoundaryType::Passive,
                BoundaryType::Outflow,
                BoundaryType::Wall,
                BoundaryType::Wall,
            ),
        };
        assert!(BlockLayout::from_blocks(1, 1, vec![spec]).is_ok());
    }

    #[test]
    fn test_too_many_blocks() {
        let result = BlockLayout::uniform(Bounds2D::new(0.0, 1.0, 0.0, 1.0), Resolution2D::square(2), 3, 1, walls());
        assert!(result.is_err());
    }
}
