mod common;

use common::FakeCanvas;
use pixelkeeper::denoise::{add_noise, denoise_region, Region, DEFAULT_NEIGHBOUR_THRESHOLD};
use pixelkeeper::{CanvasApi, CanvasSize, Rgb};

const RED: Rgb = Rgb::new(255, 0, 0);
const SIZE: CanvasSize = CanvasSize { width: 5, height: 5 };

fn full_region(size: CanvasSize) -> Region {
    Region {
        x: 0,
        y: 0,
        width: size.width,
        height: size.height,
    }
}

#[tokio::test]
async fn a_lone_speck_is_repainted_to_the_majority_colour() {
    let fake = FakeCanvas::filled(SIZE, Rgb::WHITE);
    fake.paint(2, 2, RED);
    let mut canvas = fake.live_snapshot();

    let repainted = denoise_region(
        &fake,
        &mut canvas,
        full_region(SIZE),
        DEFAULT_NEIGHBOUR_THRESHOLD,
    )
    .await
    .unwrap();

    assert_eq!(repainted, 1);
    assert_eq!(fake.writes(), vec![(2, 2, Rgb::WHITE)]);
    assert_eq!(canvas.pixel(2, 2), Some(Rgb::WHITE));
    assert_eq!(fake.live_pixel(2, 2), Some(Rgb::WHITE));
}

#[tokio::test]
async fn edge_pixels_are_skipped_entirely() {
    let size = CanvasSize { width: 3, height: 3 };
    let fake = FakeCanvas::filled(size, Rgb::WHITE);
    fake.paint(0, 0, RED);
    let mut canvas = fake.live_snapshot();

    let repainted = denoise_region(
        &fake,
        &mut canvas,
        full_region(size),
        DEFAULT_NEIGHBOUR_THRESHOLD,
    )
    .await
    .unwrap();

    // the corner speck has fewer than eight neighbours and is left alone
    assert_eq!(repainted, 0);
    assert!(fake.writes().is_empty());
    assert_eq!(fake.live_pixel(0, 0), Some(RED));
}

#[tokio::test]
async fn threshold_blocks_weak_majorities() {
    // a 2x2 block of noise: each member keeps three noisy neighbours, so
    // white only reaches five of eight
    let fake = FakeCanvas::filled(SIZE, Rgb::WHITE);
    for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
        fake.paint(x, y, RED);
    }
    let mut canvas = fake.live_snapshot();

    let at_seven = denoise_region(&fake, &mut canvas, full_region(SIZE), 7)
        .await
        .unwrap();
    assert_eq!(at_seven, 0);
    assert!(fake.writes().is_empty());

    // a threshold of five lets the block erode
    let mut canvas = fake.live_snapshot();
    let at_five = denoise_region(&fake, &mut canvas, full_region(SIZE), 5)
        .await
        .unwrap();
    assert!(at_five >= 1);
    assert_eq!(fake.live_pixel(2, 2), Some(Rgb::WHITE));
}

#[tokio::test]
async fn denoising_twice_changes_nothing_the_second_time() {
    let fake = FakeCanvas::filled(SIZE, Rgb::WHITE);
    fake.paint(2, 2, RED);
    fake.paint(1, 3, Rgb::BLACK);
    let mut canvas = fake.live_snapshot();

    denoise_region(
        &fake,
        &mut canvas,
        full_region(SIZE),
        DEFAULT_NEIGHBOUR_THRESHOLD,
    )
    .await
    .unwrap();
    let after_first = fake.live_snapshot();

    let mut canvas = fake.live_snapshot();
    let second = denoise_region(
        &fake,
        &mut canvas,
        full_region(SIZE),
        DEFAULT_NEIGHBOUR_THRESHOLD,
    )
    .await
    .unwrap();

    assert_eq!(second, 0);
    assert_eq!(fake.live_snapshot(), after_first);
}

#[tokio::test]
async fn add_noise_writes_one_pixel_inside_the_canvas() {
    let fake = FakeCanvas::filled(SIZE, Rgb::WHITE);
    let size = fake.get_size().await.unwrap();

    add_noise(&fake, size).await.unwrap();

    let writes = fake.writes();
    assert_eq!(writes.len(), 1);
    let (x, y, _) = writes[0];
    assert!(x < size.width && y < size.height);
}

#[tokio::test]
async fn only_the_supplied_region_is_touched() {
    let fake = FakeCanvas::filled(SIZE, Rgb::WHITE);
    fake.paint(1, 1, RED);
    fake.paint(3, 3, RED);
    let mut canvas = fake.live_snapshot();

    let region = Region { x: 1, y: 1, width: 1, height: 1 };
    let repainted = denoise_region(&fake, &mut canvas, region, DEFAULT_NEIGHBOUR_THRESHOLD)
        .await
        .unwrap();

    assert_eq!(repainted, 1);
    assert_eq!(fake.writes(), vec![(1, 1, Rgb::WHITE)]);
    assert_eq!(fake.live_pixel(3, 3), Some(RED));
}
