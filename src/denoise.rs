use std::collections::HashMap;

use anyhow::{Context, Result};
use rand::Rng;

use crate::api::CanvasApi;
use crate::canvas::{CanvasSize, CanvasSnapshot, Rgb};

/// A rectangle of the canvas, in canvas coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub const DEFAULT_NEIGHBOUR_THRESHOLD: usize = 7;

/// Majority-vote smoothing over one region of the canvas.
///
/// For every pixel in `region`, the eight grid neighbours are read from the
/// local snapshot; if one colour appears on at least `threshold` of them and
/// the pixel itself differs, the pixel is overwritten both locally and
/// remotely. Pixels on the canvas edge have fewer than eight neighbours and
/// are skipped entirely. Returns the number of pixels repainted.
pub async fn denoise_region<A: CanvasApi>(
    api: &A,
    canvas: &mut CanvasSnapshot,
    region: Region,
    threshold: usize,
) -> Result<u64> {
    let mut repainted = 0;
    for y in region.y..region.y.saturating_add(region.height) {
        for x in region.x..region.x.saturating_add(region.width) {
            let Some(current) = canvas.pixel(x, y) else { continue };
            let Some(neighbours) = neighbour_pixels(canvas, x, y) else {
                continue;
            };
            let Some((winner, count)) = most_common(&neighbours) else {
                continue;
            };
            if count >= threshold && winner != current {
                log::info!("pixel at ({x}, {y}) is noise, will be made {winner}");
                canvas.set_pixel(x, y, winner);
                api.set_pixel(x, y, winner)
                    .await
                    .context("failed to write denoised pixel")?;
                repainted += 1;
            }
        }
    }
    Ok(repainted)
}

/// The eight neighbours of (x, y), or `None` when the pixel sits on the
/// canvas edge and has fewer.
fn neighbour_pixels(canvas: &CanvasSnapshot, x: u32, y: u32) -> Option<Vec<Rgb>> {
    if x == 0 || y == 0 {
        return None;
    }
    let mut neighbours = Vec::with_capacity(8);
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if nx == x && ny == y {
                continue;
            }
            neighbours.push(canvas.pixel(nx, ny)?);
        }
    }
    Some(neighbours)
}

fn most_common(neighbours: &[Rgb]) -> Option<(Rgb, usize)> {
    let mut counts: HashMap<Rgb, usize> = HashMap::new();
    for colour in neighbours {
        *counts.entry(*colour).or_insert(0) += 1;
    }
    counts.into_iter().max_by_key(|(_, count)| *count)
}

/// Paint one random colour at one random coordinate. Manual test traffic
/// only, never part of the reconciliation cycle.
pub async fn add_noise<A: CanvasApi>(api: &A, size: CanvasSize) -> Result<()> {
    let mut rng = rand::thread_rng();
    let x = rng.gen_range(0..size.width);
    let y = rng.gen_range(0..size.height);
    let colour = Rgb::new(rng.gen(), rng.gen(), rng.gen());
    api.set_pixel(x, y, colour)
        .await
        .context("failed to write noise pixel")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasSize;

    #[test]
    fn edge_pixels_have_no_neighbour_set() {
        let canvas = CanvasSnapshot::blank(CanvasSize { width: 3, height: 3 }, Rgb::WHITE);
        assert!(neighbour_pixels(&canvas, 0, 0).is_none());
        assert!(neighbour_pixels(&canvas, 1, 0).is_none());
        assert!(neighbour_pixels(&canvas, 0, 1).is_none());
        assert!(neighbour_pixels(&canvas, 2, 1).is_none());
        assert_eq!(neighbour_pixels(&canvas, 1, 1).map(|n| n.len()), Some(8));
    }

    #[test]
    fn most_common_counts_the_majority() {
        let mut neighbours = vec![Rgb::WHITE; 7];
        neighbours.push(Rgb::BLACK);
        let (winner, count) = most_common(&neighbours).unwrap();
        assert_eq!(winner, Rgb::WHITE);
        assert_eq!(count, 7);
    }
}
