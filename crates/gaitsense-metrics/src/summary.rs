//! Session-level aggregation.
//!
//! Turns the per-frame snapshot log and the accumulated gait cycle
//! metrics into a single [`AggregateSummary`] with an overall score and
//! threshold-driven clinical notes. Pure over its inputs; the analyzer
//! calls [`summarize`] on demand.

use gaitsense_core::utils::mean;
use gaitsense_core::SessionId;

use crate::config::{MetricRange, SummaryConfig};
use crate::types::{
    AggregateSummary, BaselineDelta, GaitCycleMetrics, GaitNote, GaitSnapshot, JointRanges,
    MetricEstimate, SidePair,
};

/// Maps a metric value onto a 0-100 score against its normal range.
///
/// Values inside the range score 70-100; below-range values fall off
/// proportionally, above-range values lose 10 points per multiple of
/// the upper bound.
pub(crate) fn range_score(value: f64, range: &MetricRange) -> f64 {
    if value < range.min {
        if range.min <= f64::EPSILON {
            return 0.0;
        }
        return (70.0 * value / range.min).max(0.0);
    }
    if value > range.max {
        if range.max <= f64::EPSILON {
            return 0.0;
        }
        return (100.0 - 10.0 * (value - range.max) / range.max).max(0.0);
    }
    let span = range.max - range.min;
    if span <= f64::EPSILON {
        return 100.0;
    }
    70.0 + 30.0 * (value - range.min) / span
}

/// Mean of the usable estimates in a series.
///
/// The result's confidence is the mean input confidence with unusable
/// entries counted as zero, so occlusion-heavy sessions degrade.
#[allow(clippy::cast_precision_loss)]
fn average_metric<'a, I>(estimates: I, total: usize) -> MetricEstimate
where
    I: Iterator<Item = &'a MetricEstimate>,
{
    let mut values = Vec::new();
    let mut confidence_sum = 0.0;
    for estimate in estimates {
        if estimate.is_usable() {
            values.push(estimate.value);
            confidence_sum += estimate.confidence;
        }
    }
    if values.is_empty() || total == 0 {
        return MetricEstimate::unavailable();
    }
    MetricEstimate::from_confidence(mean(&values), confidence_sum / total as f64)
}

fn observed_range<I>(series: I, min_samples: usize) -> Option<f64>
where
    I: Iterator<Item = Option<f64>>,
{
    let mut count = 0usize;
    let mut lowest = f64::INFINITY;
    let mut highest = f64::NEG_INFINITY;
    for angle in series.flatten() {
        count += 1;
        lowest = lowest.min(angle);
        highest = highest.max(angle);
    }
    if count >= min_samples.max(1) {
        Some(highest - lowest)
    } else {
        None
    }
}

/// Per-joint ranges of motion observed across the snapshot log.
///
/// A joint reports `None` until it has `min_samples` gated angle
/// observations.
pub(crate) fn observed_joint_ranges(snapshots: &[GaitSnapshot], min_samples: usize) -> JointRanges {
    JointRanges {
        hip: SidePair::new(
            observed_range(snapshots.iter().map(|s| s.joint_angles.hip.left), min_samples),
            observed_range(
                snapshots.iter().map(|s| s.joint_angles.hip.right),
                min_samples,
            ),
        ),
        knee: SidePair::new(
            observed_range(
                snapshots.iter().map(|s| s.joint_angles.knee.left),
                min_samples,
            ),
            observed_range(
                snapshots.iter().map(|s| s.joint_angles.knee.right),
                min_samples,
            ),
        ),
        ankle: SidePair::new(
            observed_range(
                snapshots.iter().map(|s| s.joint_angles.ankle.left),
                min_samples,
            ),
            observed_range(
                snapshots.iter().map(|s| s.joint_angles.ankle.right),
                min_samples,
            ),
        ),
    }
}

fn combined_rom(hip: Option<f64>, knee: Option<f64>) -> Option<f64> {
    match (hip, knee) {
        (None, None) => None,
        (hip, knee) => Some(hip.unwrap_or(0.0) + knee.unwrap_or(0.0)),
    }
}

/// Threshold-driven clinical observations over the session aggregates.
///
/// Notes fire only on usable metrics; a missing measurement is not
/// evidence of impairment.
fn clinical_notes(
    cycle: &GaitCycleMetrics,
    balance: &MetricEstimate,
    stability: &MetricEstimate,
    symmetry: &MetricEstimate,
    ranges: &JointRanges,
    config: &SummaryConfig,
) -> Vec<GaitNote> {
    let thresholds = &config.thresholds;
    let normals = &config.normal_ranges;
    let mut notes = Vec::new();

    if cycle.walking_speed_mps.is_usable() {
        let speed = cycle.walking_speed_mps.value;
        if speed < thresholds.severe_speed_mps {
            notes.push(GaitNote::new(
                "walking_speed",
                "severely_reduced",
                0.8,
                "Significantly reduced gait speed, indicating possible mobility limitation",
            ));
        } else if speed < normals.walking_speed.min {
            notes.push(GaitNote::new(
                "walking_speed",
                "reduced",
                0.5,
                "Moderately reduced gait speed",
            ));
        } else if speed > normals.walking_speed.max {
            notes.push(GaitNote::new(
                "walking_speed",
                "increased",
                0.4,
                "Increased walking speed, possibly indicating altered gait pattern",
            ));
        }
    }

    if cycle.cadence.is_usable() {
        if cycle.cadence.value < thresholds.cadence_low_spm {
            notes.push(GaitNote::new(
                "cadence",
                "reduced",
                0.5,
                "Reduced step frequency (cadence)",
            ));
        } else if cycle.cadence.value > thresholds.cadence_high_spm {
            notes.push(GaitNote::new(
                "cadence",
                "increased",
                0.4,
                "Increased step frequency (cadence)",
            ));
        }
    }

    if cycle.stride_length_m.is_usable() && cycle.stride_length_m.value < normals.stride_length.min
    {
        notes.push(GaitNote::new(
            "stride_length",
            "reduced",
            0.5,
            "Reduced stride length",
        ));
    }

    if balance.is_usable() {
        if balance.value < thresholds.balance_impaired {
            notes.push(GaitNote::new(
                "balance",
                "impaired",
                0.8,
                "Significant balance impairment detected",
            ));
        } else if balance.value < thresholds.balance_mild {
            notes.push(GaitNote::new(
                "balance",
                "mildly_limited",
                0.5,
                "Mild to moderate balance limitations",
            ));
        }
    }

    if stability.is_usable() && stability.value < thresholds.stability_low {
        notes.push(GaitNote::new(
            "stability",
            "fall_risk",
            0.7,
            "Reduced stability during walking, increased risk of falls",
        ));
    }

    if symmetry.is_usable() && symmetry.value < thresholds.symmetry_low {
        notes.push(GaitNote::new(
            "symmetry",
            "asymmetric",
            0.7,
            "Significant gait asymmetry detected",
        ));

        let left_total = combined_rom(ranges.hip.left, ranges.knee.left);
        let right_total = combined_rom(ranges.hip.right, ranges.knee.right);
        if let (Some(left), Some(right)) = (left_total, right_total) {
            if left < right * thresholds.side_rom_ratio {
                notes.push(GaitNote::new(
                    "symmetry",
                    "left_limited",
                    0.6,
                    "Left side mobility appears more limited than right",
                ));
            } else if right < left * thresholds.side_rom_ratio {
                notes.push(GaitNote::new(
                    "symmetry",
                    "right_limited",
                    0.6,
                    "Right side mobility appears more limited than left",
                ));
            }
        }
    }

    if cycle.double_support_pct.is_usable()
        && cycle.double_support_pct.value > thresholds.double_support_high_pct
    {
        notes.push(GaitNote::new(
            "double_support",
            "elevated",
            0.5,
            "Increased double support time, indicating cautious gait pattern",
        ));
    }

    let knee_floor = thresholds.normal_knee_flexion_deg * 0.7;
    if ranges.knee.left.is_some_and(|rom| rom < knee_floor)
        || ranges.knee.right.is_some_and(|rom| rom < knee_floor)
    {
        notes.push(GaitNote::new(
            "knee_rom",
            "limited_flexion",
            0.5,
            "Reduced knee flexion during gait cycle",
        ));
    }
    if let (Some(left), Some(right)) = (ranges.knee.left, ranges.knee.right) {
        if (left - right).abs() > thresholds.rom_asymmetry_deg {
            notes.push(GaitNote::new(
                "knee_rom",
                "asymmetric",
                0.5,
                "Asymmetrical knee motion during gait",
            ));
        }
    }
    if let (Some(left), Some(right)) = (ranges.hip.left, ranges.hip.right) {
        if (left - right).abs() > thresholds.rom_asymmetry_deg {
            notes.push(GaitNote::new(
                "hip_rom",
                "asymmetric",
                0.5,
                "Asymmetrical hip motion during gait",
            ));
        }
    }

    if notes.len() >= thresholds.comprehensive_note_count {
        notes.push(GaitNote::new(
            "overall",
            "comprehensive_evaluation",
            0.8,
            "Recommend comprehensive gait evaluation and possible intervention",
        ));
    }

    notes
}

/// Builds a whole-session assessment from the snapshot log and the
/// latest gait cycle metrics.
///
/// An empty log yields an all-unavailable summary with a single
/// insufficient-data note.
pub fn summarize(
    session_id: SessionId,
    snapshots: &[GaitSnapshot],
    cycle: &GaitCycleMetrics,
    config: &SummaryConfig,
) -> AggregateSummary {
    if snapshots.is_empty() {
        return AggregateSummary {
            session_id,
            frames_analyzed: 0,
            overall_score: MetricEstimate::unavailable(),
            walking_speed_mps: MetricEstimate::unavailable(),
            cadence_spm: MetricEstimate::unavailable(),
            stride_length_m: MetricEstimate::unavailable(),
            balance: MetricEstimate::unavailable(),
            stability: MetricEstimate::unavailable(),
            symmetry: MetricEstimate::unavailable(),
            step_symmetry: MetricEstimate::unavailable(),
            double_support_pct: MetricEstimate::unavailable(),
            joint_ranges: JointRanges::default(),
            notes: vec![GaitNote::new(
                "session",
                "insufficient_data",
                0.5,
                "Insufficient data for analysis",
            )],
        };
    }

    let balance = average_metric(snapshots.iter().map(|s| &s.balance), snapshots.len());
    let stability = average_metric(snapshots.iter().map(|s| &s.stability.score), snapshots.len());
    let symmetry = average_metric(
        snapshots.iter().map(|s| &s.symmetry.overall),
        snapshots.len(),
    );
    let joint_ranges = observed_joint_ranges(snapshots, config.min_rom_samples);
    let notes = clinical_notes(cycle, &balance, &stability, &symmetry, &joint_ranges, config);

    let speed_score = if cycle.walking_speed_mps.is_usable() {
        range_score(
            cycle.walking_speed_mps.value,
            &config.normal_ranges.walking_speed,
        )
    } else {
        0.0
    };

    let weights = &config.weights;
    let weight_sum = weights.sum();
    let overall_score = if weight_sum <= f64::EPSILON {
        MetricEstimate::unavailable()
    } else {
        // Unavailable components contribute zero value and confidence
        let value = (speed_score * weights.speed
            + balance.value * weights.balance
            + stability.value * weights.stability
            + symmetry.value * weights.symmetry
            + cycle.step_symmetry.value * weights.step_symmetry)
            / weight_sum;
        let confidence = (cycle.walking_speed_mps.confidence * weights.speed
            + balance.confidence * weights.balance
            + stability.confidence * weights.stability
            + symmetry.confidence * weights.symmetry
            + cycle.step_symmetry.confidence * weights.step_symmetry)
            / weight_sum;
        MetricEstimate::from_confidence(value.round().clamp(0.0, 100.0), confidence)
    };

    AggregateSummary {
        session_id,
        frames_analyzed: snapshots.len(),
        overall_score,
        walking_speed_mps: cycle.walking_speed_mps.clone(),
        cadence_spm: cycle.cadence.clone(),
        stride_length_m: cycle.stride_length_m.clone(),
        balance,
        stability,
        symmetry,
        step_symmetry: cycle.step_symmetry.clone(),
        double_support_pct: cycle.double_support_pct.clone(),
        joint_ranges,
        notes,
    }
}

/// Compares a session's aggregates against a stored baseline summary.
///
/// Per-metric deltas are reported only when both sessions measured the
/// metric; the overall delta always compares the (possibly zero)
/// scores.
pub fn compare_to_baseline(
    current: &AggregateSummary,
    baseline: &AggregateSummary,
    config: &SummaryConfig,
) -> BaselineDelta {
    let speed_change_pct = if current.walking_speed_mps.is_usable()
        && baseline.walking_speed_mps.is_usable()
        && baseline.walking_speed_mps.value > 0.0
    {
        Some(
            (current.walking_speed_mps.value - baseline.walking_speed_mps.value)
                / baseline.walking_speed_mps.value
                * 100.0,
        )
    } else {
        None
    };

    let point_change = |current: &MetricEstimate, baseline: &MetricEstimate| {
        (current.is_usable() && baseline.is_usable()).then(|| current.value - baseline.value)
    };

    let overall_change = current.overall_score.value - baseline.overall_score.value;
    BaselineDelta {
        speed_change_pct,
        balance_change: point_change(&current.balance, &baseline.balance),
        stability_change: point_change(&current.stability, &baseline.stability),
        symmetry_change: point_change(&current.symmetry, &baseline.symmetry),
        overall_change,
        regressed: overall_change < -config.baseline_regression_margin,
    }
}
