use serde::Serialize;

use crate::error::{CalendarError, CalendarResult};

const SOLAR_RING_DAYS: f64 = 366.0;
const QUADRANT_DAYS: u32 = 91;
const CIVIL_RING_DAYS: f64 = 364.0;
const WEEK_DAYS: f64 = 7.0;
const LUNAR_RING_DAYS: f64 = 354.0;

/// Rotation of each ring of the calendar wheel, in degrees. Every value is
/// zero or negative: rings turn counter-clockwise as time passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelAngles {
    pub sun: f64,
    pub leader: f64,
    pub civil: f64,
    pub week: f64,
    pub lunar: f64,
    pub part: f64,
}

impl WheelAngles {
    pub fn rings(&self) -> [(&'static str, f64); 6] {
        [
            ("sun", self.sun),
            ("leader", self.leader),
            ("civil", self.civil),
            ("week", self.week),
            ("lunar", self.lunar),
            ("part", self.part),
        ]
    }
}

pub fn wheel_angles(day_of_year: u32, progress: f64) -> CalendarResult<WheelAngles> {
    if !(1..=365).contains(&day_of_year) {
        return Err(CalendarError::OutOfRange {
            what: "day of year",
            value: f64::from(day_of_year),
        });
    }
    if !progress.is_finite() || !(0.0..=1.0).contains(&progress) {
        return Err(CalendarError::OutOfRange {
            what: "day progress",
            value: progress,
        });
    }

    let elapsed_days = f64::from(day_of_year - 1) + progress;
    let quadrant = (day_of_year - 1) / QUADRANT_DAYS;

    Ok(WheelAngles {
        sun: ccw(elapsed_days / SOLAR_RING_DAYS * 360.0),
        leader: ccw(f64::from(quadrant) * 90.0),
        civil: ccw(elapsed_days / CIVIL_RING_DAYS * 360.0),
        week: ccw(elapsed_days * (360.0 / WEEK_DAYS)),
        lunar: ccw(elapsed_days.rem_euclid(LUNAR_RING_DAYS) / LUNAR_RING_DAYS * 360.0),
        part: ccw(progress * 360.0),
    })
}

fn ccw(degrees: f64) -> f64 {
    // adding zero folds -0.0 into 0.0
    -degrees + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn part_ring_turns_once_per_day() {
        let start = wheel_angles(1, 0.0).expect("valid");
        assert_eq!(start.part, 0.0);
        assert!(start.part.is_sign_positive());

        let end = wheel_angles(1, 1.0).expect("valid");
        assert_eq!(end.part, -360.0);
        assert_eq!(end.part.rem_euclid(360.0), 0.0);
    }

    #[test]
    fn first_moment_of_year_is_at_rest() {
        let angles = wheel_angles(1, 0.0).expect("valid");
        for (name, value) in angles.rings() {
            assert_eq!(value, 0.0, "{name} ring should start at rest");
        }
    }

    #[test]
    fn leader_steps_every_ninety_one_days() {
        assert_eq!(wheel_angles(91, 0.9).expect("valid").leader, 0.0);
        assert_eq!(wheel_angles(92, 0.0).expect("valid").leader, -90.0);
        assert_eq!(wheel_angles(182, 0.5).expect("valid").leader, -90.0);
        assert_eq!(wheel_angles(183, 0.0).expect("valid").leader, -180.0);
        assert_eq!(wheel_angles(364, 0.5).expect("valid").leader, -270.0);
    }

    #[test]
    fn rings_move_at_their_own_periods() {
        let angles = wheel_angles(8, 0.0).expect("valid");
        assert!(close(angles.week, -360.0));
        assert!(close(angles.civil, -7.0 / 364.0 * 360.0));
        assert!(close(angles.sun, -7.0 / 366.0 * 360.0));

        let last = wheel_angles(364, 1.0).expect("valid");
        assert!(close(last.civil, -360.0));
    }

    #[test]
    fn lunar_ring_wraps_after_354_days() {
        let wrapped = wheel_angles(355, 0.0).expect("valid");
        assert_eq!(wrapped.lunar, 0.0);

        let later = wheel_angles(356, 0.5).expect("valid");
        assert!(close(later.lunar, -(1.5 / 354.0) * 360.0));
    }

    #[test]
    fn rejects_inputs_outside_domain() {
        assert!(wheel_angles(0, 0.5).is_err());
        assert!(wheel_angles(366, 0.5).is_err());
        assert!(wheel_angles(10, 1.5).is_err());
        assert!(wheel_angles(10, f64::NAN).is_err());
    }
}
