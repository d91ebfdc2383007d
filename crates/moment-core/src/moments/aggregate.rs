use serde::{Deserialize, Serialize};

use crate::frame::WorkingRegion;

use super::tiles::TilePartialSum;

/// Direction of the y axis in the frame source's coordinate convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum YAxis {
    /// Row 0 is the top of the image.
    #[default]
    Down,
    /// Row 0 is the bottom of the image; centroids are flipped on output.
    Up,
}

/// Raw image moments of a binary mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Moments {
    pub m00: u64,
    pub m10: u64,
    pub m01: u64,
}

impl Moments {
    /// Sum tile partials. Addition is associative and commutative, so the
    /// tile order does not matter.
    pub fn from_tiles(tiles: &[TilePartialSum]) -> Self {
        tiles.iter().fold(Self::default(), |acc, t| Self {
            m00: acc.m00 + t.pixel_count as u64,
            m10: acc.m10 + t.sum_x as u64,
            m01: acc.m01 + t.sum_y as u64,
        })
    }

    /// Centroid by truncating integer division, or `None` for an empty mask.
    pub fn centroid(&self) -> Option<Centroid> {
        if self.m00 == 0 {
            return None;
        }
        Some(Centroid {
            x: (self.m10 / self.m00) as i64,
            y: (self.m01 / self.m00) as i64,
        })
    }
}

/// Center of gravity of the foreground, in working-region pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: i64,
    pub y: i64,
}

impl Centroid {
    /// Position in the coordinates of the (oriented) frame the region was cut from.
    pub fn to_frame(&self, region: &WorkingRegion) -> Centroid {
        Centroid {
            x: self.x + region.x as i64,
            y: self.y + region.y as i64,
        }
    }

    /// Position as fractions of the region size, for scaling onto a preview.
    pub fn normalized(&self, region: &WorkingRegion) -> (f32, f32) {
        (
            self.x as f32 / region.width as f32,
            self.y as f32 / region.height as f32,
        )
    }
}

impl std::fmt::Display for Centroid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Combine tile partials into the centroid of the region.
///
/// Division truncates toward zero, so a 3x3 block at the origin yields
/// (1, 1) and a 2x2 block yields (0, 0). With a y-up source the result is
/// flipped to `region_height - y`.
pub fn aggregate(
    tiles: &[TilePartialSum],
    region_height: u32,
    y_axis: YAxis,
) -> Option<Centroid> {
    let centroid = Moments::from_tiles(tiles).centroid()?;
    Some(match y_axis {
        YAxis::Down => centroid,
        YAxis::Up => Centroid {
            x: centroid.x,
            y: region_height as i64 - centroid.y,
        },
    })
}
