#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pixelkeeper::{ApiError, CanvasApi, CanvasSize, CanvasSnapshot, Rgb};

/// In-memory canvas backend that records every call, for driving the
/// reconciler and denoiser without a network. Clones share state, so tests
/// can keep a handle while the reconciler owns another.
#[derive(Clone)]
pub struct FakeCanvas {
    inner: Arc<Inner>,
}

struct Inner {
    live: Mutex<CanvasSnapshot>,
    /// When set, full-canvas reads return this instead of the live state,
    /// simulating a snapshot that has gone stale under concurrent painters.
    stale: Mutex<Option<CanvasSnapshot>>,
    reads: Mutex<Vec<(u32, u32)>>,
    writes: Mutex<Vec<(u32, u32, Rgb)>>,
}

impl FakeCanvas {
    pub fn filled(size: CanvasSize, fill: Rgb) -> Self {
        Self {
            inner: Arc::new(Inner {
                live: Mutex::new(CanvasSnapshot::blank(size, fill)),
                stale: Mutex::new(None),
                reads: Mutex::new(Vec::new()),
                writes: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Paint the live canvas directly, bypassing the write log.
    pub fn paint(&self, x: u32, y: u32, colour: Rgb) {
        self.inner.live.lock().unwrap().set_pixel(x, y, colour);
    }

    pub fn live_pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.inner.live.lock().unwrap().pixel(x, y)
    }

    pub fn live_snapshot(&self) -> CanvasSnapshot {
        self.inner.live.lock().unwrap().clone()
    }

    pub fn set_stale_snapshot(&self, snapshot: CanvasSnapshot) {
        *self.inner.stale.lock().unwrap() = Some(snapshot);
    }

    pub fn reads(&self) -> Vec<(u32, u32)> {
        self.inner.reads.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(u32, u32, Rgb)> {
        self.inner.writes.lock().unwrap().clone()
    }

    pub fn touched(&self, x: u32, y: u32) -> bool {
        self.reads().iter().any(|&(rx, ry)| (rx, ry) == (x, y))
            || self.writes().iter().any(|&(wx, wy, _)| (wx, wy) == (x, y))
    }
}

impl CanvasApi for FakeCanvas {
    async fn get_size(&self) -> Result<CanvasSize, ApiError> {
        Ok(self.inner.live.lock().unwrap().size())
    }

    async fn get_pixels(&self) -> Result<CanvasSnapshot, ApiError> {
        if let Some(stale) = self.inner.stale.lock().unwrap().clone() {
            return Ok(stale);
        }
        Ok(self.inner.live.lock().unwrap().clone())
    }

    async fn get_pixel(&self, x: u32, y: u32) -> Result<Rgb, ApiError> {
        self.inner.reads.lock().unwrap().push((x, y));
        Ok(self
            .inner
            .live
            .lock()
            .unwrap()
            .pixel(x, y)
            .unwrap_or(Rgb::WHITE))
    }

    async fn set_pixel(&self, x: u32, y: u32, colour: Rgb) -> Result<(), ApiError> {
        self.inner.writes.lock().unwrap().push((x, y, colour));
        self.inner.live.lock().unwrap().set_pixel(x, y, colour);
        Ok(())
    }
}
