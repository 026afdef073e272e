use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::api::CanvasApi;
use crate::canvas::Rgb;
use crate::zone::Zone;

/// Tuning knobs for the repair loop.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerOptions {
    /// Once a row has needed a repair, re-read the live canvas every this
    /// many columns instead of trusting the snapshot.
    pub refresh_stride: u32,
    /// Live pixels of this colour are always left alone, whatever the
    /// template wants there.
    pub protected_colour: Option<Rgb>,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            refresh_stride: 2,
            protected_colour: None,
        }
    }
}

/// Drives the diff-and-repair loop: one snapshot per zone per pass, writes
/// for every mismatching opaque cell, forever.
pub struct Reconciler<A> {
    api: A,
    zones: Vec<Zone>,
    options: ReconcilerOptions,
}

impl<A: CanvasApi> Reconciler<A> {
    pub fn new(api: A, zones: Vec<Zone>, options: ReconcilerOptions) -> Self {
        Self { api, zones, options }
    }

    /// Repair all zones until cancelled. A failed pass is logged and the
    /// next pass starts over from the first zone; a single failure never
    /// terminates the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            if let Err(err) = self.run_pass(&cancel).await {
                log::error!("reconciliation pass failed: {err:?}");
            }
        }
        log::info!("reconciler shutting down");
    }

    /// One sweep over every zone, in priority order. Returns the number of
    /// writes issued. Cancellation is observed between zones, so the zone
    /// in progress always finishes.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> Result<u64> {
        let mut writes = 0;
        for zone in &self.zones {
            if cancel.is_cancelled() {
                break;
            }
            log::info!("{:=^100}", " working on next zone ");
            log::info!("zone name: {}", zone.name);
            log::info!("zone dimensions: {}x{}", zone.width, zone.height);
            log::info!("zone opaque pixels: {}", zone.area_opaque);
            writes += self.run_zone(zone).await?;
        }
        Ok(writes)
    }

    async fn run_zone(&self, zone: &Zone) -> Result<u64> {
        log::info!("fetching canvas snapshot");
        let mut canvas = self
            .api
            .get_pixels()
            .await
            .context("failed to fetch canvas snapshot")?;
        log::info!("got canvas snapshot");

        let mut writes = 0;
        for (row_index, row) in zone.rows().enumerate() {
            let mut row_needs_repair = false;

            for (col_index, cell) in row.iter().enumerate() {
                // Transparent cells express "don't care": no read, no write.
                let Some(desired) = cell else { continue };

                let x = zone.coords.0 + col_index as u32;
                let y = zone.coords.1 + row_index as u32;
                if !canvas.contains(x, y) {
                    log::error!("pixel at ({x}, {y}) is outside the canvas");
                    continue;
                }

                // Once a repair has happened in this row the snapshot is
                // suspect; spot-check alternating columns against the live
                // canvas so edits by other painters are seen without
                // re-fetching everything.
                if row_needs_repair && col_index as u32 % self.options.refresh_stride == 0 {
                    log::info!("getting status of pixel at ({x}, {y})");
                    let live = self
                        .api
                        .get_pixel(x, y)
                        .await
                        .context("failed to refresh pixel")?;
                    log::info!("got status of pixel at ({x}, {y}), {live}");
                    canvas.set_pixel(x, y, live);
                }

                let Some(current) = canvas.pixel(x, y) else { continue };

                if self.options.protected_colour == Some(current) {
                    log::info!("pixel at ({x}, {y}) holds the protected colour, leaving it");
                    continue;
                }
                if current == *desired {
                    log::debug!("pixel at ({x}, {y}) is {desired} as intended");
                } else {
                    row_needs_repair = true;
                    log::info!("pixel at ({x}, {y}) will be made {desired}");
                    self.api
                        .set_pixel(x, y, *desired)
                        .await
                        .with_context(|| format!("failed to write pixel at ({x}, {y})"))?;
                    writes += 1;
                }
            }
        }
        Ok(writes)
    }
}
