use crate::foundation::core::{Canvas, Region};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over: `out = src + dst * (1 - src.a)` per channel.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Straight-alpha source-over.
///
/// The blend itself runs in premultiplied space through [`over`]; only the two operands and
/// the result are converted, so pixels the blend does not touch keep their exact bytes.
pub fn over_straight(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }
    if dst[3] == 0 {
        return src;
    }
    unpremultiply(over(premultiply(dst), premultiply(src)))
}

/// Convert straight-alpha RGBA8 to premultiplied in place.
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let out = premultiply([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

/// Convert premultiplied RGBA8 back to straight alpha in place.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let out = unpremultiply([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

fn premultiply(px: [u8; 4]) -> PremulRgba8 {
    let a = u16::from(px[3]);
    match a {
        255 => px,
        0 => [0, 0, 0, 0],
        _ => [
            mul_div255(u16::from(px[0]), a),
            mul_div255(u16::from(px[1]), a),
            mul_div255(u16::from(px[2]), a),
            px[3],
        ],
    }
}

fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 255 || a == 0 {
        return px;
    }
    let c = |v: u8| ((u32::from(v) * 255 + a / 2) / a).min(255) as u8;
    [c(px[0]), c(px[1]), c(px[2]), px[3]]
}

/// Copy a region buffer onto the canvas verbatim, replacing pixels including alpha.
pub(crate) fn replace_region(canvas: Canvas, dst: &mut [u8], region: Region, src: &[u8]) {
    if region == canvas.full_region() {
        dst.copy_from_slice(src);
        return;
    }
    let row_bytes = region.width as usize * 4;
    for (row, src_row) in src.chunks_exact(row_bytes).enumerate() {
        let start = row_offset(canvas, region, row);
        dst[start..start + row_bytes].copy_from_slice(src_row);
    }
}

/// Source-over a straight-alpha region buffer onto a straight-alpha canvas.
pub(crate) fn over_region(canvas: Canvas, dst: &mut [u8], region: Region, src: &[u8]) {
    let row_bytes = region.width as usize * 4;
    for (row, src_row) in src.chunks_exact(row_bytes).enumerate() {
        let start = row_offset(canvas, region, row);
        let dst_row = &mut dst[start..start + row_bytes];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            let out = over_straight([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }
}

fn row_offset(canvas: Canvas, region: Region, row: usize) -> usize {
    ((region.y as usize + row) * canvas.width as usize + region.x as usize) * 4
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/compose/blend.rs"]
mod tests;
