use crate::error::Error;
use image::{math::Rect, GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_polygon_mut;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use imageproc::point::Point;
use log::debug;

/// Half size of the adaptive threshold window (an 11 x 11 block).
pub const BLOCK_RADIUS: u32 = 5;
/// A pixel is ink when it is this much darker than the mean of its block.
pub const THRESHOLD_OFFSET: u32 = 2;
/// Pixels darker than this are never blank, whatever their neighbourhood. Covers filled (blocked) cells.
pub const DARK_LEVEL: u8 = 128;

const INK: Luma<u8> = Luma([255]);

type IntegralImage = ImageBuffer<Luma<u64>, Vec<u64>>;

/// A blank area inside the grid, i.e. one playable cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRegion {
    /// Bounding rectangle of the blank area
    pub bounds: Rect,
    /// Centroid `(x, y)` of the blank area
    pub centroid: (f64, f64),
    /// Grid coordinate `(row, col)` derived from the centroid
    pub position: (usize, usize),
}

/// Represents the recognized layout of a crossword grid.
pub struct Layout {
    /// Ink mask of the image: 255 for ink or anything outside the grid, 0 for blank cell interior
    pub ink: GrayImage,
    /// Per `x` offset: 1 when the column crosses blank cell interior, 0 for a wall
    pub col_profile: Vec<u8>,
    /// Per `y` offset: 1 when the row crosses blank cell interior, 0 for a wall
    pub row_profile: Vec<u8>,
    /// Number of grid rows
    pub rows: usize,
    /// Number of grid columns
    pub cols: usize,
    /// All playable cells
    pub cells: Vec<CellRegion>,
}

impl Layout {
    /// Return a new Layout for `img` with the ink mask computed.
    ///
    /// Profiles and cells are empty until [segment](Layout::segment) is called.
    pub fn new(img: &GrayImage) -> Layout {
        let adaptive = adaptive_ink(img, BLOCK_RADIUS, THRESHOLD_OFFSET);
        let region = grid_region(&adaptive);
        let ink = GrayImage::from_fn(img.width(), img.height(), |x, y| {
            let inside = region.get_pixel(x, y)[0] > 0;
            let dark = img.get_pixel(x, y)[0] < DARK_LEVEL;
            if !inside || dark || adaptive.get_pixel(x, y)[0] > 0 {
                INK
            } else {
                Luma([0])
            }
        });
        Layout {
            ink,
            col_profile: Vec::new(),
            row_profile: Vec::new(),
            rows: 0,
            cols: 0,
            cells: Vec::new(),
        }
    }

    /// Segment the grid:
    /// - project the blank area on both axes and derive the grid size from the walls
    /// - locate every blank cell and map its centroid to a grid coordinate
    ///
    /// # Errors
    /// If a cell has no area, so that its centroid is undefined.
    pub fn segment(mut self) -> Result<Self, Error> {
        let blank = imageproc::map::map_pixels(&self.ink, |_x, _y, p| Luma([255 - p[0]]));
        let integral: IntegralImage = integral_image::<_, u64>(&blank);
        let (w, h) = blank.dimensions();

        self.col_profile = profile(&integral, w, h, false);
        self.row_profile = profile(&integral, w, h, true);
        pad_profile(&mut self.col_profile);
        pad_profile(&mut self.row_profile);
        self.cols = cell_count(&self.col_profile);
        self.rows = cell_count(&self.row_profile);
        debug!("grid is {} rows x {} cols", self.rows, self.cols);

        let contours = find_contours::<i32>(&blank);
        for contour in contours.iter().filter(|c| is_outermost(c)) {
            let centroid = centroid(&contour.points).ok_or(Error::DegenerateContour)?;
            let position = (
                walls_before(&self.row_profile, centroid.1),
                walls_before(&self.col_profile, centroid.0),
            );
            debug!("cell at {:?} centroid {:?}", position, centroid);
            self.cells.push(CellRegion {
                bounds: bounding_rect(&contour.points),
                centroid,
                position,
            });
        }
        Ok(self)
    }
}

/// Inverted adaptive threshold: 255 where a pixel is at most its block mean minus `offset`.
pub fn adaptive_ink(img: &GrayImage, radius: u32, offset: u32) -> GrayImage {
    let integral: IntegralImage = integral_image::<_, u64>(img);
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let (left, top) = (x.saturating_sub(radius), y.saturating_sub(radius));
        let (right, bottom) = ((x + radius).min(w - 1), (y + radius).min(h - 1));
        let n = ((right - left + 1) * (bottom - top + 1)) as u64;
        let sum = sum_image_pixels(&integral, left, top, right, bottom)[0];
        let p = img.get_pixel(x, y)[0] as u64;
        if (p + offset as u64) * n <= sum {
            INK
        } else {
            Luma([0])
        }
    })
}

/// Fill the largest outer contour of `mask`. Everything outside it is not part of the grid.
pub fn grid_region(mask: &GrayImage) -> GrayImage {
    let mut region = GrayImage::new(mask.width(), mask.height());
    let largest = find_contours::<i32>(mask)
        .into_iter()
        .filter(is_outermost)
        .map(|c| (polygon_area(&c.points), c))
        .filter(|(area, _)| *area > 0.0)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let (area, contour) = match largest {
        Some(largest) => largest,
        None => {
            debug!("no grid border found");
            return region;
        }
    };
    debug!("grid border encloses {} px", area);
    let mut points = contour.points;
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    draw_polygon_mut(&mut region, &points, INK);
    region
}

fn is_outermost(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Outer && contour.parent.is_none()
}

/// Per offset along one axis, 1 if any blank pixel is crossed and 0 otherwise.
fn profile(integral: &IntegralImage, w: u32, h: u32, horizontal: bool) -> Vec<u8> {
    let (dim, span) = if horizontal { (h, w) } else { (w, h) };
    if span == 0 {
        return vec![0; dim as usize];
    }
    (0..dim)
        .map(|i| {
            let (left, top, right, bottom) = if horizontal {
                (0, i, span - 1, i)
            } else {
                (i, 0, i, span - 1)
            };
            let sum = sum_image_pixels(integral, left, top, right, bottom)[0];
            (sum > 0) as u8
        })
        .collect()
}

/// Everything before the first and after the last blank offset counts as part of the outer border.
pub fn pad_profile(profile: &mut [u8]) {
    let first = profile.iter().position(|&v| v == 1);
    let last = profile.iter().rposition(|&v| v == 1);
    if let (Some(first), Some(last)) = (first, last) {
        profile[..first].iter_mut().for_each(|v| *v = 1);
        profile[last + 1..].iter_mut().for_each(|v| *v = 1);
    }
}

/// Every remaining wall sample separates two cells.
pub fn cell_count(profile: &[u8]) -> usize {
    let ones = profile.iter().filter(|&&v| v == 1).count();
    if ones == 0 {
        return 0;
    }
    profile.len() - ones + 1
}

/// Number of wall samples strictly before `offset`: the cell index at that offset.
pub fn walls_before(profile: &[u8], offset: f64) -> usize {
    profile
        .iter()
        .enumerate()
        .take_while(|&(i, _)| (i as f64) < offset)
        .filter(|&(_, &v)| v == 0)
        .count()
}

fn polygon_moments(points: &[Point<i32>]) -> (f64, f64, f64) {
    let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += (x0 + x1) * cross;
        m01 += (y0 + y1) * cross;
    }
    (m00 / 2.0, m10 / 6.0, m01 / 6.0)
}

fn polygon_area(points: &[Point<i32>]) -> f64 {
    polygon_moments(points).0.abs()
}

/// Centroid `(m10 / m00, m01 / m00)` of the polygon traced by a contour. None for a contour without area.
pub fn centroid(points: &[Point<i32>]) -> Option<(f64, f64)> {
    let (m00, m10, m01) = polygon_moments(points);
    if m00 == 0.0 {
        return None;
    }
    Some((m10 / m00, m01 / m00))
}

fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let x0 = points.iter().map(|p| p.x).min().unwrap_or(0);
    let x1 = points.iter().map(|p| p.x).max().unwrap_or(-1);
    let y0 = points.iter().map(|p| p.y).min().unwrap_or(0);
    let y1 = points.iter().map(|p| p.y).max().unwrap_or(-1);
    Rect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0 + 1) as u32,
        height: (y1 - y0 + 1) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect as ProcRect;

    /// A white image with a 3 x 3 grid of 1 px lines, cells 8 px wide, starting at (4, 4).
    fn grid_image() -> GrayImage {
        let mut img = GrayImage::from_pixel(40, 40, Luma([255]));
        for k in 0..4 {
            let offset = 4 + k * 9;
            draw_filled_rect_mut(&mut img, ProcRect::at(offset, 4).of_size(1, 28), Luma([0]));
            draw_filled_rect_mut(&mut img, ProcRect::at(4, offset).of_size(28, 1), Luma([0]));
        }
        img
    }

    #[test]
    fn test_pad_profile() {
        let mut profile = vec![0, 0, 1, 1, 0, 1, 0, 0];
        pad_profile(&mut profile);
        assert_eq!(profile, vec![1, 1, 1, 1, 0, 1, 1, 1]);
        assert_eq!(cell_count(&profile), 2);

        let mut empty = vec![0, 0, 0];
        pad_profile(&mut empty);
        assert_eq!(empty, vec![0, 0, 0]);
        assert_eq!(cell_count(&empty), 0);
    }

    #[test]
    fn test_walls_before() {
        let profile = [1, 1, 0, 1, 1, 0, 1, 1];
        assert_eq!(walls_before(&profile, 0.5), 0);
        assert_eq!(walls_before(&profile, 3.5), 1);
        assert_eq!(walls_before(&profile, 6.5), 2);
    }

    #[test]
    fn test_centroid() {
        let square = [
            Point::new(2, 2),
            Point::new(2, 6),
            Point::new(6, 6),
            Point::new(6, 2),
        ];
        assert_eq!(centroid(&square), Some((4.0, 4.0)));
        let line = [Point::new(0, 0), Point::new(0, 5)];
        assert_eq!(centroid(&line), None);
    }

    #[test]
    fn test_segment_grid() {
        let img = grid_image();
        let layout = Layout::new(&img).segment().unwrap();
        assert_eq!((layout.rows, layout.cols), (3, 3));
        assert_eq!(layout.cells.len(), 9);
        let mut positions: Vec<_> = layout.cells.iter().map(|c| c.position).collect();
        positions.sort();
        let expected: Vec<_> = (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        assert_eq!(positions, expected);
        let first = layout.cells.iter().find(|c| c.position == (0, 0)).unwrap();
        assert_eq!(first.bounds, Rect { x: 5, y: 5, width: 8, height: 8 });
        assert_eq!(first.centroid, (8.5, 8.5));
    }

    #[test]
    fn test_blocked_cell() {
        let mut img = grid_image();
        draw_filled_rect_mut(&mut img, ProcRect::at(14, 14).of_size(8, 8), Luma([76]));
        let layout = Layout::new(&img).segment().unwrap();
        assert_eq!((layout.rows, layout.cols), (3, 3));
        assert_eq!(layout.cells.len(), 8);
        assert!(layout.cells.iter().all(|c| c.position != (1, 1)));
    }

    #[test]
    fn test_adaptive_ink_boundary() {
        // the center pixel sits exactly `offset` below the mean of its window
        let img = GrayImage::from_raw(3, 1, vec![103, 100, 103]).unwrap();
        let ink = adaptive_ink(&img, 1, 2);
        assert_eq!(ink.into_raw(), vec![0, 255, 0]);
    }

    #[test]
    fn test_degenerate_cell() {
        let mut img = grid_image();
        draw_filled_rect_mut(&mut img, ProcRect::at(14, 14).of_size(8, 8), Luma([76]));
        img.put_pixel(17, 17, Luma([255]));
        assert!(matches!(
            Layout::new(&img).segment(),
            Err(Error::DegenerateContour)
        ));
    }

    #[test]
    fn test_no_grid() {
        let img = GrayImage::from_pixel(20, 20, Luma([255]));
        let layout = Layout::new(&img).segment().unwrap();
        assert_eq!((layout.rows, layout.cols), (0, 0));
        assert!(layout.cells.is_empty());
    }
}
