// Raster preprocessing for OCR on scanned bills: contrast/sharpness boost
// with median denoise, and table-region detection from horizontal rules.
use image::{DynamicImage, GrayImage, Luma};

use crate::config::{
    CONTRAST_BOOST, RULE_KERNEL_LEN, SHARPNESS_BOOST, TABLE_REGION_MIN_AREA, TABLE_REGION_PAD,
};

/// Grayscale, contrast x2, sharpness x2, then a 3x3 median denoise.
pub fn enhance_for_ocr(img: &DynamicImage) -> GrayImage {
    let gray = img.to_luma8();
    let contrasted = boost_contrast(&gray, CONTRAST_BOOST);
    let sharpened = boost_sharpness(&contrasted, SHARPNESS_BOOST);
    median_filter_3x3(&sharpened)
}

/// Scale each pixel away from the image mean by `factor`.
fn boost_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mean = img.pixels().map(|p| p.0[0] as f64).sum::<f64>() / (w as f64 * h as f64).max(1.0);
    let mean = mean as f32;

    let mut out = GrayImage::new(w, h);
    for (x, y, p) in img.enumerate_pixels() {
        let v = mean + (p.0[0] as f32 - mean) * factor;
        out.put_pixel(x, y, Luma([v.clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Unsharp-style blend: push each pixel away from its 3x3 smoothed value.
fn boost_sharpness(img: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx >= 0 && ny >= 0 && (nx as u32) < w && (ny as u32) < h {
                        sum += img.get_pixel(nx as u32, ny as u32).0[0] as u32;
                        count += 1;
                    }
                }
            }
            let smooth = sum as f32 / count as f32;
            let orig = img.get_pixel(x, y).0[0] as f32;
            let v = smooth + (orig - smooth) * factor;
            out.put_pixel(x, y, Luma([v.clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

fn median_filter_3x3(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut window = [0u8; 9];
    for y in 0..h {
        for x in 0..w {
            let mut n = 0;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let nx = (x as i32 + dx).clamp(0, w as i32 - 1) as u32;
                    let ny = (y as i32 + dy).clamp(0, h as i32 - 1) as u32;
                    window[n] = img.get_pixel(nx, ny).0[0];
                    n += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Otsu's threshold over the grayscale histogram.
fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut hist = [0u32; 256];
    for p in img.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return 128;
    }

    let sum_all: u64 = hist.iter().enumerate().map(|(i, &c)| i as u64 * c as u64).sum();
    let mut sum_bg = 0u64;
    let mut weight_bg = 0u64;
    let mut best_variance = 0.0f64;
    let mut best_t = 128u8;

    for t in 0..256usize {
        weight_bg += hist[t] as u64;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += t as u64 * hist[t] as u64;
        let mean_bg = sum_bg as f64 / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) as f64 / weight_fg as f64;
        let variance =
            weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg) * (mean_bg - mean_fg);
        if variance > best_variance {
            best_variance = variance;
            best_t = t as u8;
        }
    }
    best_t
}

/// Bounding box of a detected table region, in pixel coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Find table-like regions: binarize, keep only long horizontal ink runs
/// (the rule lines tables are drawn with), merge connected runs, drop the
/// merged regions below the area floor, and pad the survivors vertically so
/// a crop picks up the text adjacent to the rule. The floor applies to the
/// detected rule region itself, before padding, so hairline marks cannot
/// buy their way in through the pad.
pub fn detect_table_regions(gray: &GrayImage) -> Vec<Region> {
    let threshold = otsu_threshold(gray);
    let (w, h) = gray.dimensions();

    // 1D horizontal opening: ink runs shorter than the kernel vanish
    let mut rule_rows: Vec<(u32, u32, u32)> = Vec::new(); // (y, x_start, x_end)
    for y in 0..h {
        let mut run_start: Option<u32> = None;
        for x in 0..=w {
            let ink = x < w && gray.get_pixel(x, y).0[0] < threshold;
            match (ink, run_start) {
                (true, None) => run_start = Some(x),
                (false, Some(start)) => {
                    if x - start >= RULE_KERNEL_LEN {
                        rule_rows.push((y, start, x));
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
    }

    // Merge vertically adjacent, horizontally overlapping runs into regions
    let mut regions: Vec<(u32, u32, u32, u32)> = Vec::new(); // (x0, y0, x1, y1)
    for (y, x0, x1) in rule_rows {
        let mut merged = false;
        for r in &mut regions {
            let overlaps_x = x0 < r.2 && x1 > r.0;
            let adjacent_y = y <= r.3 + 2;
            if overlaps_x && adjacent_y && y >= r.1 {
                r.0 = r.0.min(x0);
                r.2 = r.2.max(x1);
                r.3 = r.3.max(y);
                merged = true;
                break;
            }
        }
        if !merged {
            regions.push((x0, y, x1, y));
        }
    }

    regions
        .into_iter()
        .filter(|&(x0, y0, x1, y1)| (x1 - x0) * (y1 - y0 + 1) > TABLE_REGION_MIN_AREA)
        .map(|(x0, y0, x1, y1)| {
            let pad_top = y0.saturating_sub(TABLE_REGION_PAD);
            let pad_bottom = (y1 + TABLE_REGION_PAD).min(h.saturating_sub(1));
            Region {
                x: x0,
                y: pad_top,
                width: x1 - x0,
                height: pad_bottom - pad_top + 1,
            }
        })
        .collect()
}

/// Crop a region out of the grayscale page.
pub fn crop_region(gray: &GrayImage, region: Region) -> GrayImage {
    image::imageops::crop_imm(gray, region.x, region.y, region.width, region.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_rule(w: u32, h: u32, rule_y: u32, rule_len: u32, thickness: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([255]));
        for dy in 0..thickness {
            for x in 10..10 + rule_len {
                img.put_pixel(x, rule_y + dy, Luma([0]));
            }
        }
        img
    }

    #[test]
    fn thick_rule_becomes_a_region() {
        let img = page_with_rule(400, 200, 100, 300, 4);
        let regions = detect_table_regions(&img);
        assert_eq!(regions.len(), 1);
        let r = regions[0];
        assert_eq!(r.x, 10);
        assert_eq!(r.width, 300);
        // Padded vertically around the rule
        assert!(r.y < 100 && r.y + r.height > 100);
    }

    #[test]
    fn short_marks_are_ignored() {
        let img = page_with_rule(300, 200, 100, 20, 4);
        assert!(detect_table_regions(&img).is_empty());
    }

    #[test]
    fn hairline_rule_is_below_the_area_floor() {
        // Long enough to survive the opening, but 120px x 1px is far under
        // the area floor; padding must not rescue it
        let img = page_with_rule(300, 200, 100, 120, 1);
        assert!(detect_table_regions(&img).is_empty());
    }

    #[test]
    fn contrast_boost_spreads_values() {
        let mut img = GrayImage::from_pixel(4, 1, Luma([100]));
        img.put_pixel(0, 0, Luma([200]));
        let out = boost_contrast(&img, 2.0);
        assert!(out.get_pixel(0, 0).0[0] > 200);
        assert!(out.get_pixel(1, 0).0[0] < 100);
    }

    #[test]
    fn median_removes_speckle() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([255]));
        img.put_pixel(2, 2, Luma([0]));
        let out = median_filter_3x3(&img);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
    }

    #[test]
    fn enhancement_pipeline_produces_same_dimensions() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 16, Luma([180])));
        let out = enhance_for_ocr(&img);
        assert_eq!(out.dimensions(), (32, 16));
    }
}
