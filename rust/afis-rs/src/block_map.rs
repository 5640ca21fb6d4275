use crate::utils::div_round_up;

use template_manager::fingerprint_base::{Point, PointF};

/// Axis-aligned pixel rectangle, `[left, right) x [bottom, top)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rectangle { x, y, width, height }
    }

    /// Rectangle at the origin covering `size`
    pub fn of_size(size: Point) -> Self {
        Rectangle::new(0, 0, size.x, size.y)
    }

    pub fn between(begin: Point, end: Point) -> Self {
        Rectangle::new(begin.x, begin.y, end.x - begin.x, end.y - begin.y)
    }

    pub fn left(&self) -> i32 { self.x }
    pub fn bottom(&self) -> i32 { self.y }
    pub fn right(&self) -> i32 { self.x + self.width }
    pub fn top(&self) -> i32 { self.y + self.height }

    pub fn area(&self) -> i32 {
        self.width * self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.y >= self.bottom() && p.x < self.right() && p.y < self.top()
    }

    /// Position of `p` relative to the bottom-left corner, in fractions of the size
    pub fn fraction(&self, p: Point) -> PointF {
        PointF::new(
            (p.x - self.x) as f64 / self.width as f64,
            (p.y - self.y) as f64 / self.height as f64,
        )
    }

    pub fn shifted(&self, relative: Point) -> Self {
        Rectangle::new(self.x + relative.x, self.y + relative.y, self.width, self.height)
    }

    /// Intersection with `other`
    pub fn clipped(&self, other: &Rectangle) -> Self {
        let left = self.left().max(other.left());
        let bottom = self.bottom().max(other.bottom());
        let right = self.right().min(other.right());
        let top = self.top().min(other.top());
        Rectangle::between(Point::new(left, bottom), Point::new(right, top))
    }

    /// All points, row by row
    pub fn points(&self) -> impl Iterator<Item = Point> {
        let (left, right) = (self.left(), self.right());
        (self.bottom()..self.top()).flat_map(move |y| (left..right).map(move |x| Point::new(x, y)))
    }
}

/// Partition of an image into blocks of at most `max_block_size` pixels a side,
/// plus the grid of block corners used for bilinear interpolation.
///
/// Corner `i` on either axis sits at `i * pixels / blocks`, so block sizes
/// differ by at most one pixel.
#[derive(Debug, Clone)]
pub struct BlockMap {
    pub pixels: Point,
    pub blocks: Point,
    pub corners: Point,
    corner_x: Vec<i32>,
    corner_y: Vec<i32>,
}

impl BlockMap {
    pub fn new(pixels: Point, max_block_size: i32) -> Self {
        let blocks = Point::new(
            div_round_up(pixels.x, max_block_size),
            div_round_up(pixels.y, max_block_size),
        );
        let corners = Point::new(blocks.x + 1, blocks.y + 1);

        let corner_x = (0..corners.x).map(|x| x * pixels.x / blocks.x).collect();
        let corner_y = (0..corners.y).map(|y| y * pixels.y / blocks.y).collect();

        BlockMap { pixels, blocks, corners, corner_x, corner_y }
    }

    /// Pixel position of a corner
    pub fn corner(&self, corner: Point) -> Point {
        Point::new(self.corner_x[corner.x as usize], self.corner_y[corner.y as usize])
    }

    /// Pixel area covered by a block
    pub fn block_area(&self, block: Point) -> Rectangle {
        Rectangle::between(self.corner(block), self.corner(block + Point::new(1, 1)))
    }

    pub fn all_blocks(&self) -> Rectangle {
        Rectangle::of_size(self.blocks)
    }

    pub fn all_corners(&self) -> Rectangle {
        Rectangle::of_size(self.corners)
    }

    pub fn all_pixels(&self) -> Rectangle {
        Rectangle::of_size(self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_block_grid_covers_image() {
        let blocks = BlockMap::new(Point::new(100, 31), 15);
        assert_eq!(blocks.blocks, Point::new(7, 3));
        assert_eq!(blocks.corners, Point::new(8, 4));

        let total: i32 = blocks.all_blocks().points().map(|b| blocks.block_area(b).area()).sum();
        assert_eq!(total, 100 * 31);

        for block in blocks.all_blocks().points() {
            let area = blocks.block_area(block);
            assert!(area.width <= 15 && area.width >= 14);
            assert!(area.height <= 11 && area.height >= 10);
        }
    }

    #[test]
    fn t_corner_positions() {
        let blocks = BlockMap::new(Point::new(100, 31), 15);
        assert_eq!(blocks.corner(Point::new(0, 0)), Point::new(0, 0));
        assert_eq!(blocks.corner(Point::new(7, 3)), Point::new(100, 31));
        assert_eq!(blocks.corner(Point::new(1, 1)), Point::new(14, 10));
    }

    #[test]
    fn t_rectangle_clip_and_fraction() {
        let r = Rectangle::new(10, 10, 15, 15);
        let clipped = r.shifted(Point::new(-12, 3)).clipped(&Rectangle::of_size(Point::new(20, 20)));
        assert_eq!(clipped, Rectangle::new(0, 13, 13, 7));

        let f = r.fraction(Point::new(13, 22));
        assert!((f.x - 0.2).abs() < 1e-12);
        assert!((f.y - 0.8).abs() < 1e-12);
    }

    #[test]
    fn t_rectangle_points_order() {
        let points: Vec<Point> = Rectangle::new(1, 2, 2, 2).points().collect();
        assert_eq!(points, vec![Point::new(1, 2), Point::new(2, 2), Point::new(1, 3), Point::new(2, 3)]);
        assert!(Rectangle::new(0, 0, -3, 2).points().next().is_none());
    }
}
