use soft_cascade::config::detect::load_config;
use soft_cascade::diagnostics::{LevelReport, TimingBreakdown};
use soft_cascade::image::io::{load_rgb_image, save_rgb_image, write_json_file, OwnedImageU8};
use soft_cascade::suppress::Suppressor;
use soft_cascade::{CascadeModel, Detection, Rect, SoftCascadeDetector};
use serde::Serialize;
use std::env;
use std::path::Path;

const BOX_COLOR: [u8; 3] = [255, 0, 0];

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;

    let image = load_rgb_image(&config.input).map_err(|e| e.to_string())?;
    let mut model = CascadeModel::from_json_file(&config.model).map_err(|e| e.to_string())?;
    if let Some(params) = config.detector {
        model = model.with_params(params).map_err(|e| e.to_string())?;
    }
    let mut detector = SoftCascadeDetector::new(model);
    if let Some(s) = config.suppression {
        detector = detector
            .with_suppressor(Suppressor::new(s.criterion).with_overlap(s.overlap, s.threshold));
    }

    let (detections, report) = detector
        .detect_with_report(&image.as_view(), &config.rois)
        .map_err(|e| e.to_string())?;

    let summary = DetectionSummary {
        width: image.width(),
        height: image.height(),
        octave_count: detector.model().octaves().len(),
        level_count: report.levels.len(),
        evaluated_windows: report.evaluated_windows(),
        mean_weaks_per_window: report.mean_weaks_per_window(),
        raw_count: report.raw_detections.len(),
        detection_count: detections.len(),
        detections,
        levels: report.levels,
        skipped_scales: report.skipped_scales,
        timings: report.timings,
    };
    write_json_file(&config.output.detections_json, &summary).map_err(|e| e.to_string())?;
    println!(
        "Saved {} detections ({} raw) to {}",
        summary.detection_count,
        summary.raw_count,
        config.output.detections_json.display()
    );

    if let Some(path) = &config.output.annotated_image {
        let mut annotated = image.clone();
        for det in &summary.detections {
            draw_rect(&mut annotated, &det.bbox);
        }
        save_rgb_image(&annotated, path).map_err(|e| e.to_string())?;
        println!("Saved annotated image to {}", path.display());
    }

    Ok(())
}

fn usage() -> String {
    "Usage: cascade_detect <config.json>".to_string()
}

/// One-pixel outline clipped to the image.
fn draw_rect(img: &mut OwnedImageU8, r: &Rect) {
    let (w, h, c) = (img.width() as i32, img.height() as i32, img.channels());
    let mut put = |x: i32, y: i32| {
        if x < 0 || y < 0 || x >= w || y >= h {
            return;
        }
        let base = (y as usize * w as usize + x as usize) * c;
        for (k, v) in BOX_COLOR.iter().take(c).enumerate() {
            img.data_mut()[base + k] = *v;
        }
    };
    for x in r.x..r.right() {
        put(x, r.y);
        put(x, r.bottom() - 1);
    }
    for y in r.y..r.bottom() {
        put(r.x, y);
        put(r.right() - 1, y);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectionSummary {
    width: usize,
    height: usize,
    octave_count: usize,
    level_count: usize,
    evaluated_windows: usize,
    mean_weaks_per_window: f64,
    raw_count: usize,
    detection_count: usize,
    detections: Vec<Detection>,
    levels: Vec<LevelReport>,
    skipped_scales: Vec<f32>,
    timings: TimingBreakdown,
}
