use std::sync::Arc;

use super::*;

fn region(x: u32, y: u32, width: u32, height: u32) -> Region {
    Region {
        x,
        y,
        width,
        height,
    }
}

#[test]
fn empty_region_is_malformed() {
    let px = Arc::new(InlinePixels::new(Vec::new()));
    let err = FrameDescriptor::new(
        0,
        region(0, 0, 0, 4),
        BlendOp::Source,
        DisposeOp::None,
        DelayFraction::default(),
        px,
    )
    .unwrap_err();
    assert!(matches!(err, ApngError::MalformedFrame(_)));
}

#[test]
fn read_pixels_checks_payload_length() {
    let short = Arc::new(InlinePixels::new(vec![0u8; 7]));
    let f = FrameDescriptor::new(
        3,
        region(0, 0, 1, 2),
        BlendOp::Over,
        DisposeOp::Previous,
        DelayFraction::new(1, 10),
        short,
    )
    .unwrap();
    assert!(matches!(f.read_pixels(), Err(ApngError::MalformedFrame(_))));

    let ok = Arc::new(InlinePixels::solid(1, 2, [1, 2, 3, 4]));
    let f = FrameDescriptor::new(
        3,
        region(0, 0, 1, 2),
        BlendOp::Over,
        DisposeOp::Previous,
        DelayFraction::new(1, 10),
        ok,
    )
    .unwrap();
    assert_eq!(f.read_pixels().unwrap(), vec![1, 2, 3, 4, 1, 2, 3, 4]);
    // Idempotent re-read.
    assert_eq!(f.read_pixels().unwrap(), f.read_pixels().unwrap());
    assert_eq!(f.sequence_index(), 3);
    assert_eq!(f.blend_op(), BlendOp::Over);
    assert_eq!(f.dispose_op(), DisposeOp::Previous);
}
