//! End-to-end validation of the analysis pipeline on synthetic gait.
//!
//! A scripted walker with a known cadence, stride and symmetry is fed
//! through the full analyzer, and the session summary is checked
//! against the values the kinematic script implies.

use std::f64::consts::PI;

use gaitsense_core::{Confidence, Keypoint, KeypointType, Pose, Timestamp};
use gaitsense_metrics::{AggregateSummary, GaitAnalyzer, GaitAnalyzerConfig};

const FRAME_INTERVAL_MS: i64 = 33;
const FRAME_INTERVAL_S: f64 = 1.0 / 30.0;
const SESSION_FRAMES: usize = 90;

/// A 1 s gait cycle per foot (120 steps/min) with feet in antiphase.
const CYCLE_FRAMES: usize = 30;
const HALF_CYCLE_FRAMES: usize = 15;
const SWING_FRAMES: usize = 12;
const SWING_AMPLITUDE_DEG: f64 = 60.0;
const SHIN_LENGTH_PX: f64 = 100.0;
const WALK_SPEED_PX_PER_FRAME: f64 = 4.0;

#[test]
fn walking_session_matches_scripted_gait() {
    let mut analyzer = GaitAnalyzer::new(GaitAnalyzerConfig::default()).unwrap();
    for frame in 0..SESSION_FRAMES {
        analyzer.process_frame(&walking_pose(frame), FRAME_INTERVAL_S);
    }

    let summary = analyzer.summarize();
    print_summary(&summary);

    assert_eq!(summary.frames_analyzed, SESSION_FRAMES);

    // One knee-extension step per foot per cycle, three cycles each.
    let counts = analyzer.step_counts();
    assert_eq!(
        (counts.left, counts.right),
        (3, 3),
        "expected one step per foot per cycle, got {}/{}",
        counts.left,
        counts.right
    );

    // The script walks at 120 steps/min; counted steps and the ankle
    // signal must agree on it.
    assert!(
        summary.cadence_spm.is_usable(),
        "cadence should be measurable"
    );
    assert!(
        (110.0..=130.0).contains(&summary.cadence_spm.value),
        "cadence {:.1} spm should be close to the scripted 120",
        summary.cadence_spm.value
    );
    assert!(
        summary.cadence_spm.confidence > 0.65,
        "steps plus signal agreement should give high confidence, got {:.3}",
        summary.cadence_spm.confidence
    );

    // Same-phase triggers one cycle apart: 120 px at 0.01 m/px.
    assert!(
        summary.stride_length_m.is_usable(),
        "stride should be measurable"
    );
    assert!(
        (1.1..=1.35).contains(&summary.stride_length_m.value),
        "stride {:.3} m should be close to the scripted 1.2 m",
        summary.stride_length_m.value
    );
    assert!(
        summary.walking_speed_mps.is_usable(),
        "speed should be measurable"
    );
    assert!(
        (1.05..=1.4).contains(&summary.walking_speed_mps.value),
        "speed {:.3} m/s should land near stride * cadence / 120",
        summary.walking_speed_mps.value
    );

    // The walker is mirror-symmetric, upright and steady.
    assert!(
        summary.symmetry.is_usable() && summary.symmetry.value > 90.0,
        "symmetry {:.1} should exceed 90 for a mirrored gait",
        summary.symmetry.value
    );
    assert!(
        summary.step_symmetry.is_usable() && summary.step_symmetry.value > 88.0,
        "step symmetry {:.1} should be high for equal strides",
        summary.step_symmetry.value
    );
    assert!(
        summary.balance.is_usable() && summary.balance.value > 85.0,
        "balance {:.1} should stay high for an upright walker",
        summary.balance.value
    );
    assert!(
        summary.stability.is_usable() && summary.stability.value > 85.0,
        "stability {:.1} should stay high on a straight path",
        summary.stability.value
    );
    assert!(
        summary.overall_score.value >= 85.0,
        "overall score {:.0} should reflect healthy gait",
        summary.overall_score.value
    );

    // Both feet spend a short fraction of each cycle in double support.
    assert!(
        summary.double_support_pct.is_usable(),
        "double support should be measurable"
    );
    assert!(
        (5.0..=25.0).contains(&summary.double_support_pct.value),
        "double support {:.1}% should sit in the brisk-walk range",
        summary.double_support_pct.value
    );

    // The 60 degree swing shows up as knee flexion on both sides.
    for (side, rom) in [
        ("left", summary.joint_ranges.knee.left),
        ("right", summary.joint_ranges.knee.right),
    ] {
        let rom = rom.unwrap_or(0.0);
        assert!(
            rom > 45.0,
            "{side} knee range {rom:.1} deg should reflect the scripted swing"
        );
    }

    assert!(
        summary.notes.is_empty(),
        "healthy scripted gait should produce no clinical notes, got {:?}",
        summary.notes
    );
}

#[test]
fn leg_occlusion_recovers_without_poisoning_summary() {
    let mut analyzer = GaitAnalyzer::new(GaitAnalyzerConfig::default()).unwrap();
    for frame in 0..SESSION_FRAMES {
        let mut pose = walking_pose(frame);
        // Five frames where the lower body is lost entirely.
        if (40..45).contains(&frame) {
            for kind in [
                KeypointType::LeftKnee,
                KeypointType::RightKnee,
                KeypointType::LeftAnkle,
                KeypointType::RightAnkle,
            ] {
                let _ = pose.remove_keypoint(kind);
            }
        }
        analyzer.process_frame(&pose, FRAME_INTERVAL_S);
    }

    let summary = analyzer.summarize();
    print_summary(&summary);

    let counts = analyzer.step_counts();
    assert_eq!(
        (counts.left, counts.right),
        (3, 3),
        "steps outside the occlusion window should all register"
    );
    assert!(
        summary.cadence_spm.is_usable()
            && (110.0..=130.0).contains(&summary.cadence_spm.value),
        "gap interpolation should keep cadence near 120, got {:.1}",
        summary.cadence_spm.value
    );
    assert!(
        summary.symmetry.is_usable() && summary.symmetry.value > 85.0,
        "brief occlusion should only dent symmetry slightly, got {:.1}",
        summary.symmetry.value
    );
    assert!(
        summary.notes.is_empty(),
        "recovered session should stay note-free, got {:?}",
        summary.notes
    );
}

#[test]
fn zero_confidence_session_reports_unavailable_metrics() {
    let mut analyzer = GaitAnalyzer::new(GaitAnalyzerConfig::default()).unwrap();
    for frame in 0..SESSION_FRAMES {
        analyzer.process_frame(&occluded_pose(frame), FRAME_INTERVAL_S);
    }

    let summary = analyzer.summarize();
    assert_eq!(summary.frames_analyzed, SESSION_FRAMES);

    let counts = analyzer.step_counts();
    assert_eq!((counts.left, counts.right), (0, 0));

    for (name, estimate) in [
        ("cadence", &summary.cadence_spm),
        ("speed", &summary.walking_speed_mps),
        ("stride", &summary.stride_length_m),
        ("balance", &summary.balance),
        ("symmetry", &summary.symmetry),
    ] {
        assert!(
            !estimate.is_usable(),
            "{name} should be unavailable without confident keypoints, got {estimate:?}"
        );
    }
    assert!(
        summary.overall_score.confidence < 0.05,
        "overall confidence should collapse, got {:.3}",
        summary.overall_score.confidence
    );
}

// Scenario builders

/// Shank swing angle over one gait cycle: a half-sine burst during the
/// swing frames, flat during stance.
fn swing_deg(cycle_frame: usize) -> f64 {
    if cycle_frame < SWING_FRAMES {
        SWING_AMPLITUDE_DEG * (PI * cycle_frame as f64 / SWING_FRAMES as f64).sin()
    } else {
        0.0
    }
}

/// One frame of an idealized mirror-symmetric walker drifting across
/// the frame at constant speed. The shank rotates about a fixed knee,
/// so each swing both lifts the ankle and advances it, which drives the
/// knee-extension step trigger and the periodic ankle-height signal.
///
/// Leg confidence sits above the step-detection gate but below the
/// tracked-joint filter cutoff so the raw swing dynamics survive
/// smoothing.
fn walking_pose(frame: usize) -> Pose {
    let drift = WALK_SPEED_PX_PER_FRAME * frame as f64;
    let torso = Confidence::clamped(0.9);
    let legs = Confidence::clamped(0.62);

    let left_swing = swing_deg(frame % CYCLE_FRAMES).to_radians();
    let right_swing = swing_deg((frame + HALF_CYCLE_FRAMES) % CYCLE_FRAMES).to_radians();

    let mut pose = Pose::new(Timestamp::from_millis(frame as i64 * FRAME_INTERVAL_MS));
    let fixed = [
        (KeypointType::Nose, 300.0, 50.0),
        (KeypointType::LeftShoulder, 280.0, 100.0),
        (KeypointType::RightShoulder, 320.0, 100.0),
        (KeypointType::LeftElbow, 270.0, 140.0),
        (KeypointType::RightElbow, 330.0, 140.0),
        (KeypointType::LeftWrist, 265.0, 180.0),
        (KeypointType::RightWrist, 335.0, 180.0),
        (KeypointType::LeftHip, 285.0, 200.0),
        (KeypointType::RightHip, 315.0, 200.0),
    ];
    for (kind, x, y) in fixed {
        pose.set_keypoint(Keypoint::new(kind, x + drift, y, torso));
    }
    for (knee_kind, ankle_kind, knee_x, swing) in [
        (
            KeypointType::LeftKnee,
            KeypointType::LeftAnkle,
            285.0,
            left_swing,
        ),
        (
            KeypointType::RightKnee,
            KeypointType::RightAnkle,
            315.0,
            right_swing,
        ),
    ] {
        let knee_x = knee_x + drift;
        let knee_y = 300.0;
        pose.set_keypoint(Keypoint::new(knee_kind, knee_x, knee_y, legs));
        pose.set_keypoint(Keypoint::new(
            ankle_kind,
            knee_x + SHIN_LENGTH_PX * swing.sin(),
            knee_y + SHIN_LENGTH_PX * swing.cos(),
            legs,
        ));
    }
    pose
}

/// The same walker with every keypoint reported at zero confidence.
fn occluded_pose(frame: usize) -> Pose {
    let mut pose = Pose::new(Timestamp::from_millis(frame as i64 * FRAME_INTERVAL_MS));
    for keypoint in walking_pose(frame).keypoints() {
        pose.set_keypoint(Keypoint::new(
            keypoint.keypoint_type,
            keypoint.x,
            keypoint.y,
            Confidence::clamped(0.0),
        ));
    }
    pose
}

fn print_summary(summary: &AggregateSummary) {
    println!(
        "cadence {:.1} spm (conf {:.2}), stride {:.3} m, speed {:.3} m/s",
        summary.cadence_spm.value,
        summary.cadence_spm.confidence,
        summary.stride_length_m.value,
        summary.walking_speed_mps.value,
    );
    println!(
        "balance {:.1}, stability {:.1}, symmetry {:.1}, step symmetry {:.1}",
        summary.balance.value,
        summary.stability.value,
        summary.symmetry.value,
        summary.step_symmetry.value,
    );
    println!(
        "double support {:.1}%, knee ROM {:?}/{:?}, overall {:.0}, notes {}",
        summary.double_support_pct.value,
        summary.joint_ranges.knee.left,
        summary.joint_ranges.knee.right,
        summary.overall_score.value,
        summary.notes.len(),
    );
}
