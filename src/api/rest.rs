use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::ratelimit::{self, RateLimit};
use super::{ApiError, CanvasApi};
use crate::canvas::{CanvasSize, CanvasSnapshot, Rgb};
use crate::config::Config;

#[derive(Debug, Deserialize)]
struct PixelResponse {
    rgb: Rgb,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct SetPixelRequest {
    x: u32,
    y: u32,
    rgb: Rgb,
}

/// REST backend for canvas services exposing the
/// `get_size`/`get_pixels`/`get_pixel`/`set_pixel` endpoint family.
pub struct RestCanvas {
    http: Client,
    base_url: String,
    size: CanvasSize,
    blank_colour: Rgb,
    audit_log: Option<PathBuf>,
}

impl RestCanvas {
    /// Build the client and resolve the canvas size up front. A backend
    /// without a size endpoint falls back to the configured default.
    pub async fn connect(config: &Config) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        let http = Client::builder().default_headers(headers).build()?;

        let mut api = Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            size: config.assumed_size,
            blank_colour: config.blank_colour,
            audit_log: config.canvas_log.clone(),
        };
        match api.fetch_size().await {
            Ok(size) => api.size = size,
            Err(ApiError::Status { status, .. })
                if status == StatusCode::NOT_FOUND || status == StatusCode::GONE =>
            {
                log::warn!(
                    "size endpoint unavailable ({status}), assuming {}x{}",
                    api.size.width,
                    api.size.height
                );
            }
            Err(err) => return Err(err),
        }
        Ok(api)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn fetch_size(&self) -> Result<CanvasSize, ApiError> {
        let response = self.http.get(self.endpoint("get_size")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { endpoint: "get_size", status });
        }
        Ok(response.json().await?)
    }

    /// HEAD the endpoint first so a rate limit is noticed without spending
    /// a request from the quota.
    async fn probe(&self, url: &str) -> Result<(), ApiError> {
        let response = self.http.head(url).send().await?;
        if response.status().is_success() {
            ratelimit::obey(response.headers()).await;
        }
        Ok(())
    }

    fn log_unavailable(endpoint: &str, headers: &HeaderMap) {
        let limit = RateLimit::from_headers(headers);
        match limit.cooldown_secs.or(limit.reset_secs) {
            Some(secs) if secs.is_finite() && secs > 0.0 => {
                let back = Local::now() + chrono::Duration::milliseconds((secs * 1000.0) as i64);
                log::warn!(
                    "{endpoint} is temporarily unavailable, expected back at {}",
                    back.format("%a %b %e %H:%M:%S %Y")
                );
            }
            _ => log::warn!("{endpoint} is temporarily unavailable"),
        }
    }

    fn append_audit_log(&self, bytes: &[u8]) {
        let Some(path) = &self.audit_log else { return };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| {
                writeln!(file, "{}", Local::now().format("%a %b %e %H:%M:%S %Y"))?;
                file.write_all(bytes)?;
                writeln!(file)
            });
        if let Err(err) = result {
            log::warn!("failed to append snapshot to {}: {err}", path.display());
        }
    }
}

impl CanvasApi for RestCanvas {
    async fn get_size(&self) -> Result<CanvasSize, ApiError> {
        Ok(self.size)
    }

    async fn get_pixels(&self) -> Result<CanvasSnapshot, ApiError> {
        let url = self.endpoint("get_pixels");
        self.probe(&url).await?;
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status == StatusCode::GONE {
            Self::log_unavailable("get_pixels", response.headers());
            return Ok(CanvasSnapshot::blank(self.size, self.blank_colour));
        }
        if !status.is_success() {
            return Err(ApiError::Status { endpoint: "get_pixels", status });
        }
        ratelimit::obey(response.headers()).await;
        let bytes = response.bytes().await?;
        self.append_audit_log(&bytes);
        Ok(CanvasSnapshot::from_bytes(self.size, bytes.to_vec())?)
    }

    async fn get_pixel(&self, x: u32, y: u32) -> Result<Rgb, ApiError> {
        let url = self.endpoint("get_pixel");
        self.probe(&url).await?;
        let response = self
            .http
            .get(&url)
            .query(&[("x", x), ("y", y)])
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::GONE {
            Self::log_unavailable("get_pixel", response.headers());
            return Ok(self.blank_colour);
        }
        if !status.is_success() {
            return Err(ApiError::Status { endpoint: "get_pixel", status });
        }
        ratelimit::obey(response.headers()).await;
        let pixel: PixelResponse = response.json().await?;
        Ok(pixel.rgb)
    }

    async fn set_pixel(&self, x: u32, y: u32, colour: Rgb) -> Result<(), ApiError> {
        let url = self.endpoint("set_pixel");
        self.probe(&url).await?;
        let payload = SetPixelRequest { x, y, rgb: colour };
        let response = self.http.post(&url).json(&payload).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        if status.is_success() {
            match response.json::<MessageResponse>().await {
                Ok(body) => log::info!("{}", body.message),
                Err(err) => log::warn!("set_pixel response carried no message: {err}"),
            }
        } else {
            // Rejections are not retried here; the pixel still mismatches on
            // the next pass and is re-attempted then.
            log::error!("write to ({x}, {y}) rejected: {status}");
        }
        ratelimit::obey(&headers).await;
        Ok(())
    }
}
