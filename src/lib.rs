//! Creates and defends pixel-art zones on a shared remote canvas.
//!
//! Templates are diffed against the live canvas state and mismatches are
//! repaired through a rate-limited HTTP API, over and over; other agents
//! paint over the same canvas concurrently, so every pass converges again
//! from whatever state it finds.

pub mod api;
pub mod canvas;
pub mod config;
pub mod denoise;
pub mod mirror;
pub mod reconciler;
pub mod registry;
pub mod zone;

pub use api::{ApiError, CanvasApi, RestCanvas};
pub use canvas::{CanvasSize, CanvasSnapshot, Rgb};
pub use config::{Config, ConfigError, MirrorConfig};
pub use reconciler::{Reconciler, ReconcilerOptions};
pub use registry::TemplateRegistry;
pub use zone::{load_zones, Zone, ZoneDefinition};
