//! Reject-threshold calibration from per-round score traces.
//!
//! A trace is the running ensemble score of one sample after every round
//! (`trace[t]` includes tree `t`). A window is rejected after round `t` when
//! its running score is strictly below `threshold[t]`.
use crate::error::{CascadeError, Result};
use log::{debug, warn};

fn check_traces<'a, I>(traces: I, rounds: usize) -> Result<()>
where
    I: IntoIterator<Item = &'a Vec<f32>>,
{
    for (i, t) in traces.into_iter().enumerate() {
        if t.len() != rounds {
            return Err(CascadeError::invalid(format!(
                "trace {i} has {} rounds, expected {rounds}",
                t.len()
            )));
        }
    }
    Ok(())
}

#[inline]
fn accepted(trace: &[f32]) -> bool {
    trace.last().is_some_and(|&s| s > 0.0)
}

/// Direct backward pruning: the threshold of each round is the lowest running
/// score among positives the full ensemble accepts, so none of them is ever
/// rejected early. Falls back to every positive when none is accepted.
pub fn direct_backward_pruning(traces: &[Vec<f32>], rounds: usize) -> Result<Vec<f32>> {
    if traces.is_empty() {
        return Err(CascadeError::InsufficientData(
            "no positive traces to calibrate".into(),
        ));
    }
    check_traces(traces, rounds)?;
    let mut kept: Vec<&Vec<f32>> = traces.iter().filter(|t| accepted(t)).collect();
    if kept.is_empty() {
        warn!(
            "DBP: ensemble accepts none of {} positives, calibrating on all of them",
            traces.len()
        );
        kept = traces.iter().collect();
    }
    let thresholds: Vec<f32> = (0..rounds)
        .map(|r| kept.iter().map(|t| t[r]).fold(f32::INFINITY, f32::min))
        .collect();
    debug!(
        "DBP: {} of {} positives define {} thresholds",
        kept.len(),
        traces.len(),
        rounds
    );
    Ok(thresholds)
}

/// Multiple-instance pruning. Each bag holds the traces of jittered copies of
/// one positive; a bag is live when the full ensemble accepts at least one
/// copy. Only accepted copies start alive. Round by round the threshold is
/// the lowest, over live bags, of the best surviving copy's running score,
/// after which copies below it are dropped. Every live bag therefore keeps
/// its best copy through all rounds.
pub fn multiple_instance_pruning(bags: &[Vec<Vec<f32>>], rounds: usize) -> Result<Vec<f32>> {
    if bags.iter().all(|b| b.is_empty()) {
        return Err(CascadeError::InsufficientData(
            "no positive bags to calibrate".into(),
        ));
    }
    check_traces(bags.iter().flatten(), rounds)?;

    let mut alive: Vec<Vec<&Vec<f32>>> = bags
        .iter()
        .map(|b| b.iter().filter(|t| accepted(t)).collect::<Vec<_>>())
        .filter(|b: &Vec<&Vec<f32>>| !b.is_empty())
        .collect();
    if alive.is_empty() {
        warn!(
            "MIP: ensemble accepts no instance of {} bags, calibrating on all instances",
            bags.len()
        );
        alive = bags
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| b.iter().collect())
            .collect();
    }
    let live = alive.len();

    let mut thresholds = Vec::with_capacity(rounds);
    for r in 0..rounds {
        let thr = alive
            .iter()
            .map(|bag| bag.iter().map(|t| t[r]).fold(f32::NEG_INFINITY, f32::max))
            .fold(f32::INFINITY, f32::min);
        for bag in alive.iter_mut() {
            bag.retain(|t| t[r] >= thr);
        }
        thresholds.push(thr);
    }
    debug!("MIP: {} live bags of {} define {} thresholds", live, bags.len(), rounds);
    Ok(thresholds)
}

/// Rejects at most `floor(miss_rate · n · (t+1) / rounds)` positives by round
/// `t`, choosing each threshold as a low percentile of the surviving scores.
pub fn heuristic(traces: &[Vec<f32>], rounds: usize, miss_rate: f32) -> Result<Vec<f32>> {
    if traces.is_empty() {
        return Err(CascadeError::InsufficientData(
            "no positive traces to calibrate".into(),
        ));
    }
    if !(0.0..=1.0).contains(&miss_rate) {
        return Err(CascadeError::invalid(format!(
            "miss rate {miss_rate} outside [0, 1]"
        )));
    }
    check_traces(traces, rounds)?;

    let n = traces.len();
    let mut alive: Vec<&Vec<f32>> = traces.iter().collect();
    let mut rejected = 0usize;
    let mut thresholds = Vec::with_capacity(rounds);
    for r in 0..rounds {
        let budget = (miss_rate as f64 * n as f64 * (r + 1) as f64 / rounds as f64).floor() as usize;
        let allowance = budget.saturating_sub(rejected).min(alive.len() - 1);
        let mut scores: Vec<f32> = alive.iter().map(|t| t[r]).collect();
        scores.sort_by(|a, b| a.total_cmp(b));
        let thr = scores[allowance];
        let before = alive.len();
        alive.retain(|t| t[r] >= thr);
        rejected += before - alive.len();
        thresholds.push(thr);
    }
    debug!("heuristic: {rejected} of {n} positives rejected over {rounds} rounds");
    Ok(thresholds)
}
