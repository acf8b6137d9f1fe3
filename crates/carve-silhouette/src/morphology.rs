//! Binary morphology with a 3×3 structuring element.

use image::{GrayImage, Luma};

const FG: u8 = 255;

fn apply<F>(mask: &GrayImage, keep: F) -> GrayImage
where
    F: Fn(u32) -> bool,
{
    let (w, h) = mask.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut fg_neighbors = 0u32;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx >= 0 && ny >= 0 && nx < w as i64 && ny < h as i64 {
                        if mask.get_pixel(nx as u32, ny as u32)[0] == FG {
                            fg_neighbors += 1;
                        }
                    }
                }
            }
            out.put_pixel(x, y, Luma([if keep(fg_neighbors) { FG } else { 0 }]));
        }
    }
    out
}

/// A pixel survives erosion only when its whole 3×3 neighborhood is
/// foreground (border pixels count missing neighbors as background).
pub fn erode(mask: &GrayImage) -> GrayImage {
    apply(mask, |fg| fg == 9)
}

/// A pixel survives dilation when any pixel in its 3×3 neighborhood is
/// foreground.
pub fn dilate(mask: &GrayImage) -> GrayImage {
    apply(mask, |fg| fg > 0)
}

/// Erosion then dilation: removes isolated speckle.
pub fn open(mask: &GrayImage) -> GrayImage {
    dilate(&erode(mask))
}

/// Dilation then erosion: fills small holes.
pub fn close(mask: &GrayImage) -> GrayImage {
    erode(&dilate(mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(fg: &[(u32, u32)], w: u32, h: u32) -> GrayImage {
        let mut m = GrayImage::new(w, h);
        for &(x, y) in fg {
            m.put_pixel(x, y, Luma([FG]));
        }
        m
    }

    fn block(x0: u32, y0: u32, size: u32) -> Vec<(u32, u32)> {
        let mut v = Vec::new();
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                v.push((x, y));
            }
        }
        v
    }

    #[test]
    fn open_removes_speckle_keeps_blocks() {
        let mut fg = block(3, 3, 5);
        fg.push((12, 2)); // isolated noise pixel
        let mask = mask_with(&fg, 16, 12);

        let opened = open(&mask);
        assert_eq!(opened.get_pixel(12, 2)[0], 0, "speckle survived");
        assert_eq!(opened.get_pixel(5, 5)[0], FG, "block center lost");
    }

    #[test]
    fn close_fills_single_hole() {
        let mut fg = block(2, 2, 5);
        fg.retain(|&(x, y)| !(x == 4 && y == 4));
        let mask = mask_with(&fg, 10, 10);

        let closed = close(&mask);
        assert_eq!(closed.get_pixel(4, 4)[0], FG, "hole not filled");
    }

    #[test]
    fn erode_shrinks_by_one() {
        let mask = mask_with(&block(2, 2, 4), 10, 10);
        let eroded = erode(&mask);
        assert_eq!(eroded.get_pixel(2, 2)[0], 0);
        assert_eq!(eroded.get_pixel(3, 3)[0], FG);
        assert_eq!(eroded.get_pixel(4, 4)[0], FG);
        assert_eq!(eroded.get_pixel(5, 5)[0], 0);
    }
}
