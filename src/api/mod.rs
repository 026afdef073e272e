pub mod ratelimit;
pub mod rest;

pub use rest::RestCanvas;

use thiserror::Error;

use crate::canvas::{CanvasSize, CanvasSnapshot, Rgb, SnapshotLengthError};

/// The four operations every pixel-canvas backend exposes. The reconciler,
/// denoiser and mirror are generic over this, so a different pixel-game
/// service only needs a new implementation here.
#[allow(async_fn_in_trait)]
pub trait CanvasApi {
    /// Canvas dimensions. Resolved once at startup and stable afterwards;
    /// backends with no size endpoint report a configured default.
    async fn get_size(&self) -> Result<CanvasSize, ApiError>;

    /// The whole canvas as one snapshot.
    async fn get_pixels(&self) -> Result<CanvasSnapshot, ApiError>;

    /// One live pixel, used sparingly to refresh a stale snapshot.
    async fn get_pixel(&self, x: u32, y: u32) -> Result<Rgb, ApiError>;

    /// Submit one write. A backend rejection is logged, not an error; the
    /// pixel will still mismatch on the next pass and be re-attempted then.
    async fn set_pixel(&self, x: u32, y: u32, colour: Rgb) -> Result<(), ApiError>;
}

/// A backend call that could not produce a usable answer. Surfaces at the
/// pass boundary, where it is logged and the next pass starts over.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotLengthError),
    #[error("bearer token contains characters not allowed in a header")]
    InvalidToken,
}
