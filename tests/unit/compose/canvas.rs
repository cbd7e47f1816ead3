use std::sync::Arc;

use super::*;
use crate::foundation::core::Region;
use crate::model::frame::{FrameDescriptor, InlinePixels};
use crate::timing::delay::DelayFraction;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

struct F {
    region: (u32, u32, u32, u32),
    blend: BlendOp,
    dispose: DisposeOp,
    px: Vec<u8>,
}

fn solid(region: (u32, u32, u32, u32), blend: BlendOp, dispose: DisposeOp, rgba: [u8; 4]) -> F {
    F {
        region,
        blend,
        dispose,
        px: rgba.repeat((region.2 * region.3) as usize),
    }
}

fn image(w: u32, h: u32, frames: Vec<F>) -> Arc<DecodedImage> {
    let frames = frames
        .into_iter()
        .enumerate()
        .map(|(i, f)| {
            FrameDescriptor::new(
                i as u32,
                Region {
                    x: f.region.0,
                    y: f.region.1,
                    width: f.region.2,
                    height: f.region.3,
                },
                f.blend,
                f.dispose,
                DelayFraction::new(1, 10),
                Arc::new(InlinePixels::new(f.px)),
            )
            .unwrap()
        })
        .collect();
    Arc::new(DecodedImage::animated(Canvas::new(w, h).unwrap(), frames, 0).unwrap())
}

#[test]
fn red_canvas_with_translucent_blue_block_then_background_clear() {
    let img = image(
        10,
        10,
        vec![
            solid((0, 0, 10, 10), BlendOp::Source, DisposeOp::None, RED),
            solid((2, 2, 4, 4), BlendOp::Over, DisposeOp::Background, [0, 0, 255, 128]),
        ],
    );
    let mut c = Compositor::new(img);

    let f0 = c.composite_next().unwrap();
    assert_eq!(f0.index(), 0);
    assert!(f0.data().chunks_exact(4).all(|p| p == RED));

    let f1 = c.composite_next().unwrap();
    for y in 0..10 {
        for x in 0..10 {
            let inside = (2..6).contains(&x) && (2..6).contains(&y);
            let expected = if inside { [127, 0, 128, 255] } else { RED };
            assert_eq!(f1.pixel(x, y), expected, "pixel ({x},{y})");
        }
    }

    // Background disposal leaves a fully transparent canvas for the loop restart.
    assert!(c.canvas().unwrap().iter().all(|&b| b == 0));
    assert!(c.is_finished());
}

#[test]
fn opaque_over_block_replaces_red() {
    let img = image(
        10,
        10,
        vec![
            solid((0, 0, 10, 10), BlendOp::Source, DisposeOp::None, RED),
            solid((2, 2, 4, 4), BlendOp::Over, DisposeOp::Background, [0, 0, 255, 255]),
        ],
    );
    let frames = composite_all(img).unwrap();
    assert_eq!(frames[1].pixel(2, 2), [0, 0, 255, 255]);
    assert_eq!(frames[1].pixel(5, 5), [0, 0, 255, 255]);
    assert_eq!(frames[1].pixel(6, 6), RED);
    assert_eq!(frames[1].pixel(1, 2), RED);
}

#[test]
fn full_canvas_source_is_verbatim_regardless_of_prior_canvas() {
    let (w, h) = (4u32, 3u32);
    let opaque: Vec<u8> = (0..w * h)
        .flat_map(|i| [(i * 17) as u8, (i * 31) as u8, (i * 7) as u8, 255])
        .collect();
    let img = image(
        w,
        h,
        vec![
            solid((0, 0, w, h), BlendOp::Source, DisposeOp::None, GREEN),
            solid((1, 1, 2, 2), BlendOp::Over, DisposeOp::None, [9, 9, 9, 200]),
            F {
                region: (0, 0, w, h),
                blend: BlendOp::Source,
                dispose: DisposeOp::None,
                px: opaque.clone(),
            },
        ],
    );
    let frames = composite_all(img).unwrap();
    assert_eq!(frames[2].data(), opaque.as_slice());
}

#[test]
fn full_canvas_source_with_alpha_is_byte_for_byte() {
    let (w, h) = (2u32, 2u32);
    let px = vec![
        200, 100, 50, 10, //
        10, 20, 30, 0, //
        1, 2, 3, 255, //
        90, 90, 90, 64,
    ];
    let img = image(
        w,
        h,
        vec![
            solid((0, 0, w, h), BlendOp::Source, DisposeOp::None, RED),
            F {
                region: (0, 0, w, h),
                blend: BlendOp::Source,
                dispose: DisposeOp::None,
                px: px.clone(),
            },
        ],
    );
    let frames = composite_all(img).unwrap();
    assert_eq!(frames[1].data(), px.as_slice());
    assert_eq!(frames[1].to_rgba_image().unwrap().into_raw(), px);
}

#[test]
fn translucent_over_transparent_keeps_source_bytes() {
    let img = image(
        2,
        1,
        vec![
            solid((0, 0, 2, 1), BlendOp::Source, DisposeOp::None, [0, 0, 0, 0]),
            solid((1, 0, 1, 1), BlendOp::Over, DisposeOp::None, [200, 100, 50, 10]),
        ],
    );
    let frames = composite_all(img).unwrap();
    assert_eq!(frames[1].pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(frames[1].pixel(1, 0), [200, 100, 50, 10]);
}

#[test]
fn premultiplied_export_scales_color_by_alpha() {
    let img = image(
        1,
        1,
        vec![solid((0, 0, 1, 1), BlendOp::Source, DisposeOp::None, [200, 100, 50, 128])],
    );
    let frames = composite_all(img).unwrap();
    assert_eq!(frames[0].to_premultiplied_rgba(), vec![100, 50, 25, 128]);
    assert_eq!(frames[0].data(), [200u8, 100, 50, 128].as_slice());
}

#[test]
fn dispose_previous_restores_pre_blend_canvas() {
    let img = image(
        4,
        4,
        vec![
            solid((0, 0, 4, 4), BlendOp::Source, DisposeOp::None, RED),
            solid((1, 1, 2, 2), BlendOp::Over, DisposeOp::Previous, GREEN),
            solid((0, 0, 1, 1), BlendOp::Over, DisposeOp::None, [0, 0, 0, 0]),
        ],
    );
    let mut c = Compositor::new(img);
    let f0 = c.composite_next().unwrap();
    let before_blend = c.canvas().unwrap().to_vec();

    let f1 = c.composite_next().unwrap();
    assert_eq!(f1.pixel(1, 1), GREEN);
    assert_eq!(c.canvas().unwrap(), before_blend.as_slice());

    let f2 = c.composite_next().unwrap();
    assert_eq!(f2.data(), f0.data());
}

#[test]
fn dispose_previous_on_first_frame_reverts_to_transparent() {
    let img = image(
        2,
        2,
        vec![
            solid((0, 0, 2, 2), BlendOp::Source, DisposeOp::Previous, RED),
            solid((0, 0, 1, 1), BlendOp::Over, DisposeOp::None, GREEN),
        ],
    );
    let frames = composite_all(img).unwrap();
    assert_eq!(frames[0].pixel(1, 1), RED);
    assert_eq!(frames[1].pixel(0, 0), GREEN);
    assert_eq!(frames[1].pixel(1, 1), [0, 0, 0, 0]);
}

#[test]
fn dispose_none_keeps_contribution_for_next_frame() {
    let img = image(
        3,
        1,
        vec![
            solid((0, 0, 3, 1), BlendOp::Source, DisposeOp::None, [0, 0, 0, 0]),
            solid((0, 0, 1, 1), BlendOp::Source, DisposeOp::None, RED),
            solid((2, 0, 1, 1), BlendOp::Source, DisposeOp::None, GREEN),
        ],
    );
    let frames = composite_all(img).unwrap();
    assert_eq!(frames[2].pixel(0, 0), RED);
    assert_eq!(frames[2].pixel(1, 0), [0, 0, 0, 0]);
    assert_eq!(frames[2].pixel(2, 0), GREEN);
}

#[test]
fn compositing_past_the_end_or_after_release_fails() {
    let img = image(
        1,
        1,
        vec![solid((0, 0, 1, 1), BlendOp::Source, DisposeOp::None, RED)],
    );
    let mut c = Compositor::new(img.clone());
    c.composite_next().unwrap();
    assert!(matches!(
        c.composite_next(),
        Err(ApngError::MalformedSequence(_))
    ));

    let mut c = Compositor::new(img);
    c.release();
    assert!(c.canvas().is_none());
    assert!(matches!(c.composite_next(), Err(ApngError::InvalidState(_))));
}

#[test]
fn bad_pixel_payload_is_fatal() {
    let img = image(
        2,
        2,
        vec![F {
            region: (0, 0, 2, 2),
            blend: BlendOp::Source,
            dispose: DisposeOp::None,
            px: vec![0u8; 5],
        }],
    );
    let mut c = Compositor::new(img);
    assert!(matches!(
        c.composite_next(),
        Err(ApngError::MalformedFrame(_))
    ));
    assert_eq!(c.next_index(), 0);
}

#[test]
fn straight_rgba_export_round_trips_opaque_pixels() {
    let img = image(
        2,
        1,
        vec![solid((0, 0, 2, 1), BlendOp::Source, DisposeOp::None, RED)],
    );
    let frames = composite_all(img).unwrap();
    let rgba = frames[0].to_rgba_image().unwrap();
    assert_eq!(rgba.dimensions(), (2, 1));
    assert_eq!(rgba.get_pixel(1, 0).0, RED);
}
