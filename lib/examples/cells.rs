use anyhow::{Context, Result};
use image::io::Reader as ImageReader;
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use crossword_ocr::Layout;

fn run() -> Result<()> {
    let path = std::env::args().nth(1).expect("Usage: cells PUZZLE_IMAGE");
    eprintln!("read image from {}", path);
    let img = ImageReader::open(&path)
        .with_context(|| format!("Failed to open {}", path))?
        .decode()?;

    let gray = img.to_luma8();
    let layout = Layout::new(&gray).segment()?;
    eprintln!("grid: {} rows x {} cols, {} cells", layout.rows, layout.cols, layout.cells.len());

    // mark every cell with its bounds and centroid
    let red = image::Rgba([255, 0, 0, 255]);
    let blue = image::Rgba([0, 0, 255, 255]);
    let mut img = img;
    for cell in layout.cells.iter() {
        let b = cell.bounds;
        eprintln!("  Cell {:?}: {:?}", cell.position, b);
        draw_hollow_rect_mut(
            &mut img,
            Rect::at(b.x as i32, b.y as i32).of_size(b.width, b.height),
            blue,
        );
        let (cx, cy) = cell.centroid;
        draw_cross_mut(&mut img, red, cx.round() as i32, cy.round() as i32);
    }
    img.save("cells.png")?;
    layout.ink.save("ink.png")?;
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
    }
}
