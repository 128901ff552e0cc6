mod common;

use common::synthetic_image::{block_gray_u8, noise_u8};
use soft_cascade::channels::ChannelComputer;
use soft_cascade::image::{ImageU8, OwnedImageU8};
use soft_cascade::training::TrainingWarning;
use soft_cascade::{
    CascadeError, CascadeModel, DetectorParams, IcfFeaturePool, InMemoryDataset, ModelDocument,
    OctaveTrainer, Rect, RejectionCriterion, RejectionPolicy, SoftCascadeDetector,
    TrainingOptions,
};
use std::sync::atomic::AtomicBool;

const SHRINKAGE: usize = 4;
const WEAKS: usize = 8;
const DEPTH: usize = 2;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quick_options() -> TrainingOptions {
    TrainingOptions {
        bootstrap_rounds: 1,
        mining_attempts: 400,
        ..Default::default()
    }
}

fn gray(width: usize, height: usize, data: Vec<u8>) -> OwnedImageU8 {
    OwnedImageU8::new(width, height, 1, data).expect("image")
}

/// White 16x32 block inside a 24x40 noisy frame, at (4, 4) give or take a pixel.
fn framed_positives(count: usize) -> Vec<OwnedImageU8> {
    (0..count)
        .map(|i| {
            let mut img = noise_u8(24, 40, 1, 0, 60, 100 + i as u64);
            let block = block_gray_u8(24, 40, 4 + i % 2, 4 + (i / 2) % 2, 16, 32);
            for (v, b) in img.iter_mut().zip(block) {
                *v = (*v).max(b);
            }
            gray(24, 40, img)
        })
        .collect()
}

fn noise_negatives(count: usize) -> Vec<OwnedImageU8> {
    (0..count)
        .map(|i| gray(64, 64, noise_u8(64, 64, 1, 0, 200, 7 + i as u64)))
        .collect()
}

fn pool(width: usize, height: usize) -> IcfFeaturePool {
    IcfFeaturePool::new(width, height, ChannelComputer::new(SHRINKAGE), 200, 3).expect("pool")
}

fn trained_framed(options: TrainingOptions) -> (OctaveTrainer, IcfFeaturePool) {
    let dataset = InMemoryDataset::new(framed_positives(12), noise_negatives(6));
    let pool = pool(16, 32);
    let mut trainer =
        OctaveTrainer::new(Rect::new(4, 4, 16, 32), 12, 60, 0, SHRINKAGE).with_options(options);
    trainer.train(&dataset, &pool, WEAKS, DEPTH).expect("train");
    (trainer, pool)
}

fn final_score(trace: &[f32]) -> f32 {
    trace.last().copied().unwrap_or(0.0)
}

fn survives(trace: &[f32], thresholds: &[f32]) -> bool {
    trace.iter().zip(thresholds).all(|(s, t)| s >= t)
}

#[test]
fn dbp_keeps_every_accepted_positive() {
    init_logging();
    let (trainer, pool) = trained_framed(quick_options());
    let thresholds = trainer
        .reject_thresholds(RejectionPolicy::Dbp)
        .expect("thresholds");
    assert_eq!(thresholds.len(), WEAKS);

    let traces = trainer.positive_traces();
    let accepted: Vec<&Vec<f32>> = traces.iter().filter(|t| final_score(t) > 0.0).collect();
    let checked: Vec<&Vec<f32>> = if accepted.is_empty() {
        traces.iter().collect()
    } else {
        accepted
    };
    for trace in checked {
        assert!(survives(trace, &thresholds), "{trace:?} vs {thresholds:?}");
    }

    let record = trainer.write(&pool, &thresholds).expect("write");
    assert_eq!(record.thresholds.len(), record.trees.len());
    assert!(record.features.len() <= pool.features().len());
}

#[test]
fn mip_keeps_one_instance_per_live_bag() {
    init_logging();
    let (trainer, _) = trained_framed(quick_options());
    let thresholds = trainer
        .reject_thresholds(RejectionPolicy::Mip)
        .expect("thresholds");
    assert_eq!(thresholds.len(), WEAKS);

    let bags = trainer.bag_traces();
    assert_eq!(bags.len(), trainer.positive_count());
    // radius 1 in 4 px steps: the 24x40 frame fits all 3x3 shifts
    assert!(bags.iter().all(|b| b.len() == 9));
    let live: Vec<_> = bags
        .iter()
        .filter(|bag| bag.iter().any(|t| final_score(t) > 0.0))
        .collect();
    assert!(!live.is_empty(), "the white block should be learnt");
    for bag in live {
        assert!(
            bag.iter()
                .filter(|t| final_score(t) > 0.0)
                .any(|t| survives(t, &thresholds)),
            "bag lost every instance"
        );
    }
}

#[test]
fn heuristic_stays_within_miss_budget() {
    let options = TrainingOptions {
        heuristic_miss_rate: 0.25,
        ..quick_options()
    };
    let (trainer, _) = trained_framed(options);
    let thresholds = trainer
        .reject_thresholds(RejectionPolicy::Heuristic)
        .expect("thresholds");
    let traces = trainer.positive_traces();
    let rejected = traces.iter().filter(|t| !survives(t, &thresholds)).count();
    assert!(rejected <= (0.25 * traces.len() as f32).floor() as usize);
}

#[test]
fn trained_octave_detects_its_calibration_positive() {
    init_logging();
    let white = gray(16, 32, vec![255; 16 * 32]);
    let dataset = InMemoryDataset::new(vec![white.clone(); 4], noise_negatives(6));
    let pool = pool(16, 32);
    let mut trainer = OctaveTrainer::new(Rect::new(0, 0, 16, 32), 4, 40, 0, SHRINKAGE)
        .with_options(quick_options());
    let report = trainer.train(&dataset, &pool, WEAKS, DEPTH).expect("train");
    assert_eq!(report.positives, 4);
    // no room for jitter: every bag is its centre
    assert_eq!(report.bag_instances, 4);

    let thresholds = trainer
        .reject_thresholds(RejectionPolicy::Dbp)
        .expect("thresholds");
    let record = trainer.write(&pool, &thresholds).expect("write");
    assert_eq!(record.bounding_box, Rect::new(0, 0, 16, 32));
    let doc = ModelDocument {
        detector: DetectorParams {
            min_scale: 1.0,
            max_scale: 1.0,
            scales: 1,
            rejection: RejectionCriterion::Dollar,
        },
        octaves: vec![record],
        ..Default::default()
    };
    let json = serde_json::to_string(&doc).expect("json");
    let model = CascadeModel::from_json_str(&json).expect("load");

    let dets = SoftCascadeDetector::new(model)
        .detect(&white.as_view(), &[])
        .expect("detect");
    assert_eq!(dets.len(), 1, "{dets:?}");
    assert_eq!(dets[0].bbox, Rect::new(0, 0, 16, 32));
    assert!(dets[0].confidence > 0.0);
}

#[test]
fn positives_smaller_than_the_box_are_insufficient() {
    let tiny = gray(8, 8, vec![255; 64]);
    let dataset = InMemoryDataset::new(vec![tiny], noise_negatives(1));
    let mut trainer = OctaveTrainer::new(Rect::new(0, 0, 16, 32), 4, 4, 0, SHRINKAGE);
    let err = trainer
        .train(&dataset, &pool(16, 32), WEAKS, DEPTH)
        .expect_err("no positives");
    assert!(matches!(err, CascadeError::InsufficientData(_)), "{err:?}");
}

#[test]
fn exhausted_negative_pool_is_reported() {
    init_logging();
    let white = gray(16, 32, vec![255; 16 * 32]);
    let only = gray(16, 32, noise_u8(16, 32, 1, 0, 200, 11));
    let dataset = InMemoryDataset::new(vec![white; 2], vec![only]);
    let mut trainer = OctaveTrainer::new(Rect::new(0, 0, 16, 32), 2, 20, 0, SHRINKAGE)
        .with_options(quick_options());
    let report = trainer
        .train(&dataset, &pool(16, 32), WEAKS, DEPTH)
        .expect("train");
    assert_eq!(
        report.warnings,
        vec![TrainingWarning::NegativePoolExhausted {
            requested: 20,
            collected: 1
        }]
    );
    assert!(trainer.ensemble().is_some());
}

#[test]
fn cancelled_training_stops() {
    let dataset = InMemoryDataset::new(framed_positives(2), noise_negatives(2));
    let mut trainer = OctaveTrainer::new(Rect::new(4, 4, 16, 32), 2, 8, 0, SHRINKAGE);
    let flag = AtomicBool::new(true);
    let err = trainer
        .train_with_cancel(&dataset, &pool(16, 32), WEAKS, DEPTH, &flag)
        .expect_err("cancelled");
    assert!(matches!(err, CascadeError::Cancelled));
    assert!(trainer.ensemble().is_none());
}

#[test]
fn write_rejects_threshold_count_mismatch() {
    let (trainer, pool) = trained_framed(quick_options());
    let err = trainer.write(&pool, &[0.0; 3]).expect_err("mismatch");
    assert!(matches!(err, CascadeError::InvalidInput(_)));
}

/// White frames broken by sparse black dots, plus noise frames holding part
/// of a white block: windows that look like the positives at first sight.
fn confusable_negatives() -> Vec<OwnedImageU8> {
    let mut out = Vec::new();
    for i in 0..3u64 {
        let mut dotted = vec![255u8; 64 * 64];
        let dots = noise_u8(64, 64, 1, 0, 255, 40 + i);
        for (v, d) in dotted.iter_mut().zip(dots) {
            if d < 4 {
                *v = 0;
            }
        }
        out.push(gray(64, 64, dotted));

        let mut partial = noise_u8(64, 64, 1, 0, 60, 50 + i);
        let block = block_gray_u8(64, 64, 20 + 4 * i as usize, 12, 24, 40);
        for (v, b) in partial.iter_mut().zip(block) {
            *v = (*v).max(b);
        }
        out.push(gray(64, 64, partial));
    }
    out
}

#[test]
fn bootstrap_mines_hard_negatives_within_quota() {
    init_logging();
    const QUOTA: usize = 30;
    let options = TrainingOptions {
        bootstrap_rounds: 3,
        mining_attempts: 800,
        ..Default::default()
    };
    let dataset = InMemoryDataset::new(framed_positives(12), confusable_negatives());
    let pool = pool(16, 32);
    let mut trainer = OctaveTrainer::new(Rect::new(4, 4, 16, 32), 12, QUOTA, 0, SHRINKAGE)
        .with_options(options);
    let report = trainer.train(&dataset, &pool, WEAKS, DEPTH).expect("train");

    assert!(!report.bootstrap.is_empty());
    assert!(report.bootstrap.len() <= 3);
    let first = &report.bootstrap[0];
    assert_eq!(first.round, 1);
    assert!(first.candidates > 0 && first.candidates <= 800);
    assert!(first.hard_negatives > 0, "{:?}", report.bootstrap);
    for (i, round) in report.bootstrap.iter().enumerate() {
        assert_eq!(round.round, i + 1);
        assert!(round.hard_negatives <= QUOTA);
        assert!(round.negatives <= QUOTA, "{round:?}");
    }
    let last = report.bootstrap.last().expect("round");
    assert!(last.hard_negatives == 0 || report.bootstrap.len() == 3);
    assert_eq!(report.negatives, trainer.negative_count());
    assert!(report.negatives <= QUOTA);
}

#[test]
fn positive_shortfall_is_reported() {
    let mut positives = framed_positives(3);
    positives.push(gray(8, 8, vec![255; 64]));
    positives.push(gray(12, 20, vec![255; 240]));
    let dataset = InMemoryDataset::new(positives, noise_negatives(4));
    let mut trainer = OctaveTrainer::new(Rect::new(4, 4, 16, 32), 5, 20, 0, SHRINKAGE)
        .with_options(quick_options());
    let report = trainer
        .train(&dataset, &pool(16, 32), WEAKS, DEPTH)
        .expect("train");
    assert_eq!(report.positives, 3);
    assert!(report.warnings.contains(&TrainingWarning::PositiveShortfall {
        requested: 5,
        collected: 3
    }));
}

#[test]
fn mip_bags_collect_jittered_instances() {
    let (trainer, _) = trained_framed(quick_options());
    let bags = trainer.bag_traces();
    let positives = trainer.positive_traces();
    for (bag, centre) in bags.iter().zip(&positives) {
        assert!(bag.contains(centre));
    }
}
