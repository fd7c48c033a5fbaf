/// Tile kinds for the two map layers and their collision property.
/// Collision is a property of the tile kind (the `collides` flag of the
/// stage), queried via methods so the rule lives in one place.

/// Pixel edge of a square map tile.
pub const TILE_SIZE: f32 = 16.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Ground,     // Solid, collides
    Brick,      // Solid, collides
    Decoration, // Drawn on the platform layer, collides: false
    Backdrop,   // Parallax layer only, never collides
}

impl Tile {
    /// Does this tile block a physics body?
    pub fn collides(self) -> bool {
        matches!(self, Tile::Ground | Tile::Brick)
    }

    /// Is anything drawn for this tile?
    pub fn is_visible(self) -> bool {
        !matches!(self, Tile::Empty)
    }
}

/// A rectangular grid of tiles, row-major, `TILE_SIZE` pixels per cell.
#[derive(Clone, Debug, Default)]
pub struct TileLayer {
    pub width: usize,
    pub height: usize,
    cells: Vec<Tile>,
}

impl TileLayer {
    pub fn new(width: usize, height: usize) -> Self {
        TileLayer { width, height, cells: vec![Tile::Empty; width * height] }
    }

    /// Tile at (x, y). Out of bounds reads as Empty.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Tile::Empty;
        }
        self.cells[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, tile: Tile) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = tile;
        }
    }

    #[inline]
    pub fn collides_at(&self, x: i32, y: i32) -> bool {
        self.get(x, y).collides()
    }

    pub fn width_px(&self) -> f32 {
        self.width as f32 * TILE_SIZE
    }

    pub fn height_px(&self) -> f32 {
        self.height as f32 * TILE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_solids_collide() {
        assert!(Tile::Ground.collides());
        assert!(Tile::Brick.collides());
        assert!(!Tile::Decoration.collides());
        assert!(!Tile::Backdrop.collides());
        assert!(!Tile::Empty.collides());
    }

    #[test]
    fn out_of_bounds_is_empty() {
        let mut layer = TileLayer::new(3, 2);
        layer.set(2, 1, Tile::Ground);
        assert_eq!(layer.get(2, 1), Tile::Ground);
        assert_eq!(layer.get(-1, 0), Tile::Empty);
        assert_eq!(layer.get(3, 0), Tile::Empty);
        assert_eq!(layer.get(0, 2), Tile::Empty);
        assert!((layer.height_px() - 32.0).abs() < f32::EPSILON);
    }
}
