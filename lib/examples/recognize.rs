use anyhow::{Context, Result};
use std::time::Instant;
use crossword_ocr::Recognizer;

fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("Usage: recognize PUZZLE_IMAGE");
    let t0 = Instant::now();
    let img = image::open(&path).with_context(|| format!("Failed to open {}", path))?;
    let gray = img.into_luma8();
    let recognizer = Recognizer::new();

    let res = recognizer.recognize_grid(&gray)?;
    println!("recognize grid took {:?}", t0.elapsed());
    println!("{}", res.grid);
    let mut numbers = res.numbers;
    numbers.sort();
    for (number, coord) in numbers.iter() {
        println!("{:3} at row {}, col {}", number, coord.row, coord.col);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
