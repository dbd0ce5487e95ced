//! Tile coordinates and descendant enumeration.
//!
//! A tile at zoom `z` covers four tiles at zoom `z + 1`. The descendants of a
//! root tile at a deeper level `z` form a square block of
//! `span = 2^(z - root.zoom)` tiles on each side:
//!
//! ```text
//! zoom 10          zoom 11              zoom 12
//! ┌───────┐       ┌───┬───┐       ┌─┬─┬─┬─┐
//! │ 5,5   │  ──▶  │10 │10 │  ──▶  │ │ │ │ │   x ∈ [20, 24)
//! │       │       │,10│,11│       ├─┼─┼─┼─┤   y ∈ [20, 24)
//! └───────┘       ├───┼───┤       │ │ │ │ │
//!                 │11 │11 │       ...
//!                 └───┴───┘
//! ```
//!
//! [`Descendants`] walks those blocks level by level without recursion,
//! ordered by zoom, then x, then y. That order is the entry order of every
//! archive the server produces.

use std::fmt;

use crate::error::BundleError;

/// Deepest zoom level ever enumerated.
///
/// Keeps `2^zoom` and every descendant coordinate within `u32`. Requests may
/// name deeper tiles; those simply have no stored descendants.
pub const MAX_ZOOM: u8 = 30;

/// Whether `x` and `y` both lie in `[0, 2^zoom)`.
///
/// Works for any zoom: from zoom 64 on every `u64` is inside the grid.
pub fn in_grid(zoom: u64, x: u64, y: u64) -> bool {
    match u32::try_from(zoom).ok().and_then(|z| 1u64.checked_shl(z)) {
        Some(dim) => x < dim && y < dim,
        None => true,
    }
}

// =============================================================================
// TileCoord
// =============================================================================

/// A tile address in the XYZ scheme (y grows southward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Create a coordinate, checking that it lies inside the tile grid.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::InvalidCoordinate`] if `zoom > MAX_ZOOM` or if
    /// `x` or `y` is not below `2^zoom`.
    pub fn new(zoom: u32, x: u32, y: u32) -> Result<Self, BundleError> {
        let invalid = || BundleError::InvalidCoordinate {
            zoom: u64::from(zoom),
            x: u64::from(x),
            y: u64::from(y),
        };
        if zoom > u32::from(MAX_ZOOM) {
            return Err(invalid());
        }
        let dim = 1u32 << zoom;
        if x >= dim || y >= dim {
            return Err(invalid());
        }
        Ok(Self {
            zoom: zoom as u8,
            x,
            y,
        })
    }

    /// Number of tiles along one axis at this coordinate's zoom.
    pub fn grid_size(&self) -> u32 {
        1u32 << self.zoom
    }

    /// Whether `other` is this tile or lies inside it at a deeper zoom.
    pub fn contains(&self, other: &TileCoord) -> bool {
        if other.zoom < self.zoom {
            return false;
        }
        let shift = other.zoom - self.zoom;
        other.x >> shift == self.x && other.y >> shift == self.y
    }

    /// Row index in the TMS scheme used by MBTiles (y grows northward).
    pub fn tms_y(&self) -> u32 {
        self.grid_size() - 1 - self.y
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

// =============================================================================
// Descendants
// =============================================================================

/// Iterator over a tile and all of its descendants down to `max_zoom`.
///
/// Yields nothing when `max_zoom < root.zoom`. Deeper levels than
/// [`MAX_ZOOM`] are never visited.
#[derive(Debug, Clone)]
pub struct Descendants {
    root: TileCoord,
    max_zoom: u8,
    zoom: u8,
    x: u32,
    y: u32,
    x_end: u32,
    y_end: u32,
    y_start: u32,
    remaining: u64,
    done: bool,
}

impl Descendants {
    pub fn new(root: TileCoord, max_zoom: u8) -> Self {
        let max_zoom = max_zoom.min(MAX_ZOOM);
        let mut iter = Self {
            root,
            max_zoom,
            zoom: root.zoom,
            x: 0,
            y: 0,
            x_end: 0,
            y_end: 0,
            y_start: 0,
            remaining: Self::count_for(root.zoom, max_zoom),
            done: max_zoom < root.zoom,
        };
        if !iter.done {
            iter.enter_level(root.zoom);
        }
        iter
    }

    /// Total number of coordinates from `root_zoom` to `max_zoom` inclusive:
    /// `(4^(levels) - 1) / 3`, saturating at `u64::MAX`.
    pub fn count_for(root_zoom: u8, max_zoom: u8) -> u64 {
        if max_zoom < root_zoom {
            return 0;
        }
        let levels = u32::from(max_zoom - root_zoom) + 1;
        match 4u64.checked_pow(levels) {
            Some(pow) => (pow - 1) / 3,
            None => u64::MAX,
        }
    }

    fn enter_level(&mut self, zoom: u8) {
        let shift = zoom - self.root.zoom;
        self.zoom = zoom;
        self.x = self.root.x << shift;
        self.x_end = (self.root.x + 1) << shift;
        self.y_start = self.root.y << shift;
        self.y = self.y_start;
        self.y_end = (self.root.y + 1) << shift;
    }
}

impl Iterator for Descendants {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        if self.done {
            return None;
        }

        let coord = TileCoord {
            zoom: self.zoom,
            x: self.x,
            y: self.y,
        };

        self.y += 1;
        if self.y == self.y_end {
            self.y = self.y_start;
            self.x += 1;
            if self.x == self.x_end {
                if self.zoom == self.max_zoom {
                    self.done = true;
                } else {
                    self.enter_level(self.zoom + 1);
                }
            }
        }

        self.remaining = self.remaining.saturating_sub(1);
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) if self.remaining != u64::MAX => (n, Some(n)),
            _ => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for Descendants {}
