//! Template matching over captured frames.
//!
//! Zero-mean normalized cross-correlation (the `CCOEFF_NORMED` score) evaluated
//! with integral images for the window statistics, followed by greedy
//! non-max suppression. Large frames are searched coarse-to-fine: the frame and
//! template are downsampled, candidate positions are collected with a slack on
//! the threshold, and only their neighbourhoods are scored at full resolution.

use std::collections::HashSet;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::{ColorMode, MatchBox};
use crate::geometry::{Geometry, Rect, Reference};

/// Boxes overlapping more than this are suppressed.
pub const NMS_OVERLAP: f32 = 0.5;

const RELAX_BELOW_SCALE: f64 = 0.75;
const RELAX_BY: f32 = 0.05;

/// Positions x template pixels above which the coarse pass kicks in.
const EXHAUSTIVE_BUDGET: u64 = 40_000_000;
const COARSE_MIN_SIDE: u32 = 12;
const COARSE_SLACK: f32 = 0.12;

/// Reference resolution encoded in a template path, `None` for templates that
/// are authored at the live resolution and must never be resized.
pub fn reference_for(path: &str) -> Option<Reference> {
    if path.contains("CustomFuse") {
        None
    } else if path.contains("CustomAdded1080p") {
        Some(Reference::P1080)
    } else {
        Some(Reference::P1440)
    }
}

/// Interpolation loses detail when shrinking hard; compensate on the threshold.
pub fn relaxed_threshold(threshold: f32, scale: f64) -> f32 {
    if scale < RELAX_BELOW_SCALE {
        threshold - RELAX_BY
    } else {
        threshold
    }
}

/// A template resized for the live monitor.
pub struct Prepared {
    pub image: RgbaImage,
    pub scale: f64,
}

impl Prepared {
    /// `threshold` adjusted for how hard the template was shrunk.
    pub fn threshold(&self, threshold: f32) -> f32 {
        relaxed_threshold(threshold, self.scale)
    }
}

pub fn prepare(template: &RgbaImage, path: &str, geometry: Geometry) -> Prepared {
    let scale = match reference_for(path) {
        Some(reference) => geometry.uniform_factor(reference),
        None => 1.0,
    };
    if (scale - 1.0).abs() < 1e-9 {
        return Prepared {
            image: template.clone(),
            scale,
        };
    }

    let width = ((template.width() as f64 * scale).round() as u32).max(1);
    let height = ((template.height() as f64 * scale).round() as u32).max(1);
    Prepared {
        image: imageops::resize(template, width, height, FilterType::Triangle),
        scale,
    }
}

/// Perceptual luminance with the usual BT.601 weights.
pub fn luma(pixel: &Rgba<u8>) -> f32 {
    let [r, g, b, _] = pixel.0;
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

struct Planes {
    width: usize,
    height: usize,
    channels: Vec<Vec<f32>>,
}

impl Planes {
    fn from_image(img: &RgbaImage, mode: ColorMode) -> Self {
        let channels = match mode {
            ColorMode::Gray => vec![img.pixels().map(luma).collect()],
            ColorMode::Color => (0..3)
                .map(|c| img.pixels().map(|p| p.0[c] as f32).collect())
                .collect(),
        };
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            channels,
        }
    }
}

/// Summed-area tables of a plane and of its squares.
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    squares: Vec<f64>,
}

impl Integral {
    fn new(plane: &[f32], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sum = vec![0.0; stride * (height + 1)];
        let mut squares = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..width {
                let v = plane[y * width + x] as f64;
                row_sum += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
                squares[(y + 1) * stride + x + 1] = squares[y * stride + x + 1] + row_sq;
            }
        }
        Self { stride, sum, squares }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let pick = |t: &[f64]| t[(y + h) * s + x + w] - t[y * s + x + w] - t[(y + h) * s + x] + t[y * s + x];
        (pick(&self.sum), pick(&self.squares))
    }
}

struct Correlator {
    haystack: Planes,
    integrals: Vec<Integral>,
    template: Vec<Vec<f32>>,
    template_norm: f64,
    tw: usize,
    th: usize,
}

impl Correlator {
    fn new(haystack: &RgbaImage, needle: &RgbaImage, mode: ColorMode) -> Self {
        let hay = Planes::from_image(haystack, mode);
        let tpl = Planes::from_image(needle, mode);
        let integrals = hay
            .channels
            .iter()
            .map(|plane| Integral::new(plane, hay.width, hay.height))
            .collect();

        let n = (tpl.width * tpl.height) as f64;
        let mut template_norm = 0.0;
        let template = tpl
            .channels
            .iter()
            .map(|plane| {
                let mean = plane.iter().map(|&v| v as f64).sum::<f64>() / n;
                plane
                    .iter()
                    .map(|&v| {
                        let d = v as f64 - mean;
                        template_norm += d * d;
                        d as f32
                    })
                    .collect()
            })
            .collect();

        Self {
            haystack: hay,
            integrals,
            template,
            template_norm,
            tw: tpl.width,
            th: tpl.height,
        }
    }

    fn positions(&self) -> (usize, usize) {
        (
            self.haystack.width - self.tw + 1,
            self.haystack.height - self.th + 1,
        )
    }

    fn score(&self, x: usize, y: usize) -> f32 {
        let n = (self.tw * self.th) as f64;
        let width = self.haystack.width;
        let mut numerator = 0.0f64;
        let mut variance = 0.0f64;

        for (c, plane) in self.haystack.channels.iter().enumerate() {
            let (sum, squares) = self.integrals[c].window(x, y, self.tw, self.th);
            variance += squares - sum * sum / n;

            let tpl = &self.template[c];
            for j in 0..self.th {
                let row = (y + j) * width + x;
                let trow = j * self.tw;
                for i in 0..self.tw {
                    numerator += tpl[trow + i] as f64 * plane[row + i] as f64;
                }
            }
        }

        let denominator = (self.template_norm * variance.max(0.0)).sqrt();
        if denominator <= 1e-6 {
            return 0.0;
        }
        (numerator / denominator) as f32
    }

    fn scan(&self, threshold: f32) -> Vec<(usize, usize, f32)> {
        let (px, py) = self.positions();
        let mut hits = Vec::new();
        for y in 0..py {
            for x in 0..px {
                let score = self.score(x, y);
                if score >= threshold {
                    hits.push((x, y, score));
                }
            }
        }
        hits
    }
}

fn coarse_factor(needle: &RgbaImage) -> u32 {
    (needle.width().min(needle.height()) / COARSE_MIN_SIDE).clamp(1, 4)
}

/// Every position scoring at least `threshold`, suppressed and in reading order.
pub fn match_template(
    haystack: &RgbaImage,
    needle: &RgbaImage,
    mode: ColorMode,
    threshold: f32,
) -> Vec<MatchBox> {
    let (hw, hh) = haystack.dimensions();
    let (tw, th) = needle.dimensions();
    if tw == 0 || th == 0 || tw > hw || th > hh {
        return Vec::new();
    }

    let positions = (hw - tw + 1) as u64 * (hh - th + 1) as u64;
    let factor = coarse_factor(needle);
    let hits = if factor == 1 || positions * (tw as u64 * th as u64) <= EXHAUSTIVE_BUDGET {
        Correlator::new(haystack, needle, mode).scan(threshold)
    } else {
        coarse_to_fine(haystack, needle, mode, threshold, factor)
    };

    let boxes = hits
        .into_iter()
        .map(|(x, y, score)| MatchBox {
            rect: Rect::from_size(x as i32, y as i32, tw, th),
            score,
        })
        .collect();

    let mut kept = non_max_suppression(boxes, NMS_OVERLAP);
    kept.sort_by_key(|b| (b.rect.top, b.rect.left));
    kept
}

fn coarse_to_fine(
    haystack: &RgbaImage,
    needle: &RgbaImage,
    mode: ColorMode,
    threshold: f32,
    factor: u32,
) -> Vec<(usize, usize, f32)> {
    let (hw, hh) = haystack.dimensions();
    let (tw, th) = needle.dimensions();
    let small_hay = imageops::resize(haystack, (hw / factor).max(1), (hh / factor).max(1), FilterType::Triangle);
    let small_tpl = imageops::resize(needle, (tw / factor).max(1), (th / factor).max(1), FilterType::Triangle);

    let coarse = Correlator::new(&small_hay, &small_tpl, mode).scan(threshold - COARSE_SLACK);
    let fine = Correlator::new(haystack, needle, mode);
    let (max_x, max_y) = fine.positions();
    let f = factor as usize;

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for (cx, cy, _) in coarse {
        let (x0, y0) = (cx * f, cy * f);
        for y in y0.saturating_sub(f)..(y0 + f + 1).min(max_y) {
            for x in x0.saturating_sub(f)..(x0 + f + 1).min(max_x) {
                if !seen.insert((x, y)) {
                    continue;
                }
                let score = fine.score(x, y);
                if score >= threshold {
                    hits.push((x, y, score));
                }
            }
        }
    }
    hits
}

/// Greedy NMS over area-sorted boxes (ties broken by score).
pub fn non_max_suppression(mut boxes: Vec<MatchBox>, overlap: f32) -> Vec<MatchBox> {
    boxes.sort_by(|a, b| {
        b.rect
            .area()
            .cmp(&a.rect.area())
            .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut kept: Vec<MatchBox> = Vec::new();
    for candidate in boxes {
        if kept.iter().all(|k| k.rect.iou(&candidate.rect) <= overlap) {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic textured frame so correlation has something to lock on to.
    fn noise_frame(width: u32, height: u32, seed: u32) -> RgbaImage {
        let mut state = seed.wrapping_mul(2_654_435_761).max(1);
        RgbaImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let v = state.to_le_bytes();
            Rgba([v[0], v[1], v[2], 255])
        })
    }

    fn crop(img: &RgbaImage, x: u32, y: u32, w: u32, h: u32) -> RgbaImage {
        imageops::crop_imm(img, x, y, w, h).to_image()
    }

    #[test]
    fn test_reference_from_path_convention() {
        assert_eq!(reference_for("pictures/CustomAdded1080p/mirror/x.png"), Some(Reference::P1080));
        assert_eq!(reference_for("pictures/mirror/general/danteh.png"), Some(Reference::P1440));
        assert_eq!(reference_for("pictures/CustomFuse/gift.png"), None);
    }

    #[test]
    fn test_threshold_relaxed_below_three_quarters() {
        assert!((relaxed_threshold(0.8, 0.5) - 0.75).abs() < 1e-6);
        assert!((relaxed_threshold(0.8, 0.74) - 0.75).abs() < 1e-6);
        assert_eq!(relaxed_threshold(0.8, 0.75), 0.8);
        assert_eq!(relaxed_threshold(0.8, 1.0), 0.8);
    }

    #[test]
    fn test_prepare_never_resizes_custom_fuse() {
        let tpl = noise_frame(20, 10, 3);
        let prepared = prepare(&tpl, "pictures/CustomFuse/a.png", Geometry::new(1280, 720));
        assert_eq!(prepared.image.dimensions(), (20, 10));
        assert_eq!(prepared.threshold(0.8), 0.8);

        let prepared = prepare(&tpl, "pictures/mirror/a.png", Geometry::new(1280, 720));
        assert_eq!(prepared.image.dimensions(), (10, 5));
        assert!((prepared.threshold(0.8) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_exact_match_found_in_color_and_gray() {
        let frame = noise_frame(80, 60, 7);
        let needle = crop(&frame, 30, 20, 12, 10);
        for mode in [ColorMode::Color, ColorMode::Gray] {
            let hits = match_template(&frame, &needle, mode, 0.95);
            assert_eq!(hits.len(), 1, "{:?}", mode);
            assert_eq!(hits[0].rect, Rect::from_size(30, 20, 12, 10));
            assert!(hits[0].score > 0.99);
        }
    }

    #[test]
    fn test_absent_template_yields_nothing() {
        let frame = noise_frame(60, 40, 11);
        let needle = noise_frame(10, 10, 99);
        assert!(match_template(&frame, &needle, ColorMode::Color, 0.8).is_empty());
    }

    #[test]
    fn test_repeated_glyphs_all_reported_in_reading_order() {
        let glyph = noise_frame(8, 8, 5);
        let mut frame = RgbaImage::from_pixel(100, 50, Rgba([20, 20, 20, 255]));
        for &(x, y) in &[(70u32, 30u32), (10, 5), (40, 5)] {
            imageops::replace(&mut frame, &glyph, x as i64, y as i64);
        }
        let hits = match_template(&frame, &glyph, ColorMode::Color, 0.9);
        let corners: Vec<_> = hits.iter().map(|h| (h.rect.left, h.rect.top)).collect();
        assert_eq!(corners, vec![(10, 5), (40, 5), (70, 30)]);
    }

    #[test]
    fn test_nms_leaves_pairwise_iou_at_most_half() {
        let boxes: Vec<MatchBox> = (0..12)
            .map(|i| MatchBox {
                rect: Rect::from_size(i * 2, (i % 3) * 3, 10, 10),
                score: 0.8 + (i as f32) * 0.01,
            })
            .collect();
        let kept = non_max_suppression(boxes, NMS_OVERLAP);
        assert!(!kept.is_empty());
        for a in &kept {
            for b in &kept {
                if a != b {
                    assert!(a.rect.iou(&b.rect) <= NMS_OVERLAP);
                }
            }
        }
    }

    #[test]
    fn test_coarse_to_fine_agrees_with_exhaustive() {
        let frame = noise_frame(400, 300, 17);
        let needle = crop(&frame, 233, 141, 48, 48);
        let hits = coarse_to_fine(&frame, &needle, ColorMode::Gray, 0.9, coarse_factor(&needle));
        assert!(hits.iter().any(|&(x, y, _)| (x, y) == (233, 141)));
    }
}
