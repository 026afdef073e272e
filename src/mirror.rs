use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use image::imageops::{self, FilterType};
use reqwest::multipart;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::CanvasApi;
use crate::canvas::CanvasSnapshot;
use crate::config::MirrorConfig;

const EMBED_TITLE: &str = "Canvas State";
const EMBED_FOOTER: &str = "Last updated";
const WEBHOOK_USERNAME: &str = "pixelkeeper-mirror";

fn embed(now: DateTime<Utc>) -> serde_json::Value {
    json!({
        "title": EMBED_TITLE,
        "footer": { "text": EMBED_FOOTER },
        "timestamp": now.to_rfc3339(),
    })
}

/// Post the webhook message the mirror will keep editing; returns its id.
pub async fn create_mirror(http: &reqwest::Client, webhook_url: &str) -> Result<u64> {
    log::info!("creating mirror webhook message");
    let payload = json!({
        "embeds": [embed(Utc::now())],
        "username": WEBHOOK_USERNAME,
    });
    let response = http
        .post(format!("{webhook_url}?wait=true"))
        .json(&payload)
        .send()
        .await
        .context("webhook message creation failed")?
        .error_for_status()
        .context("webhook rejected the mirror message")?;

    #[derive(Deserialize)]
    struct Message {
        id: String,
    }
    let message: Message = response.json().await?;
    message
        .id
        .parse()
        .context("webhook message id was not numeric")
}

/// Scale the snapshot up and encode it as a PNG.
fn encode_png(canvas: &CanvasSnapshot, scale: u32) -> Result<Vec<u8>> {
    let mut image = canvas.to_image();
    if scale > 1 {
        image = imageops::resize(
            &image,
            image.width() * scale,
            image.height() * scale,
            FilterType::Nearest,
        );
    }
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("failed to encode mirror png")?;
    Ok(buf)
}

async fn update_mirror(
    http: &reqwest::Client,
    webhook_url: &str,
    message_id: u64,
    png: Vec<u8>,
    now: DateTime<Utc>,
) -> Result<()> {
    let file_name = format!("canvas_mirror_{}.png", now.timestamp());
    let mut embed = embed(now);
    embed["image"] = json!({ "url": format!("attachment://{file_name}") });
    let payload = json!({
        "embeds": [embed],
        "attachments": [{
            "id": 0,
            "description": EMBED_TITLE,
            "filename": file_name,
        }],
    });

    let form = multipart::Form::new()
        .text("payload_json", payload.to_string())
        .part(
            "files[0]",
            multipart::Part::bytes(png)
                .file_name(file_name)
                .mime_str("image/png")?,
        );

    http.patch(format!("{webhook_url}/messages/{message_id}"))
        .multipart(form)
        .send()
        .await
        .context("webhook edit failed")?
        .error_for_status()
        .context("webhook rejected the mirror update")?;
    Ok(())
}

async fn update_once<A: CanvasApi>(
    api: &A,
    http: &reqwest::Client,
    config: &MirrorConfig,
    message_id: u64,
) -> Result<()> {
    log::info!("fetching canvas for mirror");
    let canvas = api.get_pixels().await?;
    let png = encode_png(&canvas, config.scale)?;
    log::info!("updating mirror");
    update_mirror(http, &config.webhook_url, message_id, png, Utc::now()).await
}

/// Keep a Discord webhook message updated with a scaled snapshot of the
/// canvas. Not part of the reconciliation cycle; per-tick failures are
/// logged and the loop continues.
pub async fn run<A: CanvasApi>(
    api: &A,
    config: &MirrorConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let http = reqwest::Client::new();
    let message_id = match config.message_id {
        Some(id) => id,
        None => {
            let id = create_mirror(&http, &config.webhook_url).await?;
            log::info!("created mirror message {id}, set mirror.message_id to reuse it");
            id
        }
    };

    let mut ticker = interval(Duration::from_secs(config.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = update_once(api, &http, config, message_id).await {
                    log::error!("mirror update failed: {err:?}");
                }
            }
            _ = cancel.cancelled() => {
                log::info!("mirror shutting down");
                return Ok(());
            }
        }
    }
}
