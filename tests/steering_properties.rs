//! Properties of the proportional steering law and the PWM clamp behind it

use rs_linefollow::actuation::{PwmChannel, PwmTiming};
use rs_linefollow::hal::MockPwm;
use rs_linefollow::{DutyPair, LinePosition, MotorChannel, SteeringConfig, SteeringController};

fn controller() -> SteeringController {
    SteeringController::new(
        SteeringConfig::default()
            .with_frame_width(128)
            .with_base_speed(0.6)
            .with_motor_limits(0.0, 0.75),
    )
}

fn gains() -> impl Iterator<Item = f32> {
    (0..=20).map(|i| i as f32 / 20.0)
}

// ============================================================================
// Range
// ============================================================================

#[test]
fn duties_always_within_motor_limits() {
    let c = controller();
    for p in 0..128 {
        for g in gains() {
            let d = c.compute(LinePosition::new(p), g);
            assert!((0.0..=0.75).contains(&d.left), "left {} at p={} g={}", d.left, p, g);
            assert!((0.0..=0.75).contains(&d.right), "right {} at p={} g={}", d.right, p, g);
        }
    }
}

#[test]
fn narrow_limits_are_respected() {
    let c = SteeringController::new(
        SteeringConfig::default()
            .with_frame_width(80)
            .with_motor_limits(0.2, 0.4),
    );
    for p in -20..100 {
        let d = c.compute(LinePosition::new(p), 0.3);
        assert!((0.2..=0.4).contains(&d.left));
        assert!((0.2..=0.4).contains(&d.right));
    }
}

// ============================================================================
// Dead Center
// ============================================================================

#[test]
fn dead_center_drives_straight_at_any_gain() {
    let c = controller();
    let center = LinePosition::new(c.setpoint());
    for g in gains() {
        let d = c.compute(center, g);
        assert_eq!(d.left, d.right);
        assert!((d.left - 0.6).abs() < 1e-6);
    }
}

// ============================================================================
// Monotonicity
// ============================================================================

#[test]
fn moving_line_left_never_lowers_left_duty() {
    let c = controller();
    for g in gains() {
        let mut prev = c.compute(LinePosition::new(127), g);
        for p in (0..127).rev() {
            let d = c.compute(LinePosition::new(p), g);
            assert!(d.left >= prev.left, "left dropped at p={} g={}", p, g);
            assert!(d.right <= prev.right, "right rose at p={} g={}", p, g);
            prev = d;
        }
    }
}

#[test]
fn strictly_monotonic_until_saturation() {
    let c = controller();
    let g = 0.01;
    // error 1..=15 keeps 0.6 + 0.01 * e below 0.75
    for e in 1..15 {
        let a = c.compute(LinePosition::new(64 - e), g);
        let b = c.compute(LinePosition::new(64 - e - 1), g);
        assert!(b.left > a.left);
        assert!(b.right < a.right);
    }
}

// ============================================================================
// Symmetry and Idempotence
// ============================================================================

#[test]
fn mirrored_offsets_give_swapped_duties() {
    let c = controller();
    let sp = c.setpoint();
    for d in 0..64 {
        for g in gains() {
            let left_of = c.compute(LinePosition::new(sp - d), g);
            let right_of = c.compute(LinePosition::new(sp + d), g);
            assert_eq!(left_of, right_of.swapped(), "d={} g={}", d, g);
        }
    }
}

#[test]
fn compute_is_deterministic() {
    let c = controller();
    for p in [0, 17, 54, 64, 101, 127] {
        let first = c.compute(LinePosition::new(p), 0.37);
        for _ in 0..5 {
            assert_eq!(c.compute(LinePosition::new(p), 0.37), first);
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn ten_pixels_left_of_center() {
    let c = controller();
    let d = c.compute(LinePosition::new(54), 0.005);
    assert!((d.left - 0.65).abs() < 1e-5);
    assert!((d.right - 0.55).abs() < 1e-5);

    // At gain 0.5 the same offset saturates
    assert_eq!(c.compute(LinePosition::new(54), 0.5), DutyPair::new(0.75, 0.0));
}

#[test]
fn line_at_left_edge() {
    let c = controller();
    assert_eq!(c.compute(LinePosition::new(0), 0.5), DutyPair::new(0.75, 0.0));
}

// ============================================================================
// Actuation Clamp
// ============================================================================

#[test]
fn channel_clamps_like_boundaries() {
    let mut pwm = MockPwm::new();
    let mut ch =
        PwmChannel::init(&mut pwm, MotorChannel::Left, &PwmTiming::default(), 0.75).unwrap();

    let neg = ch.set_duty(&mut pwm, -0.5).unwrap();
    assert_eq!(neg, ch.set_duty(&mut pwm, 0.0).unwrap());

    let over = ch.set_duty(&mut pwm, 2.0).unwrap();
    assert_eq!(over, ch.set_duty(&mut pwm, 0.75).unwrap());
    assert_eq!(over, 9_375);
}

#[test]
fn channel_level_is_monotonic_in_duty() {
    let mut pwm = MockPwm::new();
    let ch = PwmChannel::init(&mut pwm, MotorChannel::Right, &PwmTiming::default(), 1.0).unwrap();
    let mut prev = 0;
    for i in 0..=100 {
        let level = ch.level_for(i as f32 / 100.0);
        assert!(level >= prev);
        assert!(level <= ch.wrap() + 1);
        prev = level;
    }
}
