//! Connected-component labeling on binary masks.
//!
//! A flood fill over 4-connected foreground pixels, used to drop small
//! noise blobs that survive morphology.

use image::GrayImage;

const FG: u8 = 255;

/// One connected foreground region.
#[derive(Debug, Clone)]
pub struct Component {
    pub pixels: Vec<(u32, u32)>,
}

impl Component {
    pub fn area(&self) -> usize {
        self.pixels.len()
    }
}

/// Find all 4-connected foreground components.
pub fn label_components(mask: &GrayImage) -> Vec<Component> {
    let (w, h) = mask.dimensions();
    let mut visited = vec![false; (w * h) as usize];
    let mut components = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if visited[idx] || mask.get_pixel(x, y)[0] != FG {
                continue;
            }

            let mut pixels = Vec::new();
            let mut queue = vec![(x, y)];
            visited[idx] = true;

            while let Some((cx, cy)) = queue.pop() {
                pixels.push((cx, cy));

                for (dx, dy) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
                    let nx = cx as i64 + dx;
                    let ny = cy as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    let nidx = (ny * w + nx) as usize;
                    if !visited[nidx] && mask.get_pixel(nx, ny)[0] == FG {
                        visited[nidx] = true;
                        queue.push((nx, ny));
                    }
                }
            }

            components.push(Component { pixels });
        }
    }

    components
}

/// Zero out every foreground component smaller than `min_area` pixels.
pub fn remove_small_components(mask: &GrayImage, min_area: usize) -> GrayImage {
    let mut out = GrayImage::new(mask.width(), mask.height());
    for comp in label_components(mask) {
        if comp.area() >= min_area {
            for &(x, y) in &comp.pixels {
                out.put_pixel(x, y, image::Luma([FG]));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with(fg: &[(u32, u32)], w: u32, h: u32) -> GrayImage {
        let mut m = GrayImage::new(w, h);
        for &(x, y) in fg {
            m.put_pixel(x, y, Luma([FG]));
        }
        m
    }

    #[test]
    fn separates_diagonal_pixels() {
        // Diagonal neighbors are not 4-connected.
        let mask = mask_with(&[(1, 1), (2, 2)], 5, 5);
        let comps = label_components(&mask);
        assert_eq!(comps.len(), 2);
    }

    #[test]
    fn counts_two_blobs() {
        let mut fg = vec![(1, 1), (1, 2), (2, 1)];
        fg.extend([(6, 6), (6, 7)]);
        let mask = mask_with(&fg, 10, 10);

        let mut areas: Vec<usize> = label_components(&mask).iter().map(|c| c.area()).collect();
        areas.sort();
        assert_eq!(areas, vec![2, 3]);
    }

    #[test]
    fn small_components_removed() {
        let mut fg = vec![(0, 0)];
        for y in 3..7 {
            for x in 3..7 {
                fg.push((x, y));
            }
        }
        let mask = mask_with(&fg, 10, 10);

        let cleaned = remove_small_components(&mask, 4);
        assert_eq!(cleaned.get_pixel(0, 0)[0], 0);
        assert_eq!(cleaned.get_pixel(4, 4)[0], FG);
    }

    #[test]
    fn empty_mask_has_no_components() {
        let mask = GrayImage::new(8, 8);
        assert!(label_components(&mask).is_empty());
    }
}
