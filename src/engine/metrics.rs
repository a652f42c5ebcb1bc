use chrono::{Duration, NaiveDateTime};

use crate::engine::matcher::{detect_shift_for_time, shift_bounds};
use crate::model::shift::Shift;

/// Records with an overtime run shorter than this are not credited OT.
pub const DEFAULT_MIN_OT_MINUTES: i64 = 15;

/// Derived fields for one check-in/check-out pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PunchMetrics {
    pub delay_minutes: i64,
    pub extra_minutes: i64,
    pub total_hours: f64,
    pub ot_hours: f64,
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn hours_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    ((to - from).num_seconds() as f64 / 60.0).round() as i64
}

/// Compute delay / extra time / total worked hours / overtime for a punch
/// pair. The shift is resolved by containment anchored on the check-in, and
/// all shift boundaries are built on the check-in's date.
///
/// Degrades to all-zero metrics when the pair is inverted or the category has
/// no shifts; callers that care must test for the empty catalog themselves.
pub fn compute_metrics(
    check_in: NaiveDateTime,
    check_out: NaiveDateTime,
    shifts: &[Shift],
    is_ot_shift: bool,
    min_ot_minutes: i64,
) -> PunchMetrics {
    if check_out <= check_in {
        return PunchMetrics::default();
    }

    let Some(matched) = detect_shift_for_time(shifts, check_in) else {
        return PunchMetrics::default();
    };

    let total_hours = round2(hours_between(check_in, check_out).max(0.0));

    let (shift_start, shift_end) = shift_bounds(matched.shift, check_in.date());

    let delay_minutes = minutes_between(shift_start, check_in).max(0);
    let extra_minutes = minutes_between(shift_end, check_out).max(0);

    // An OT-context punch earns overtime from shift end without clearing the
    // grace-after hurdle first; a regular punch must outlast it.
    let grace_after = Duration::minutes(matched.shift.grace_after_min.unwrap_or(0));
    let ot_eligible = if is_ot_shift {
        check_out > shift_end
    } else {
        check_out > shift_end + grace_after
    };

    let mut ot_hours = 0.0;
    if ot_eligible {
        let ot_minutes = minutes_between(shift_end, check_out);
        if ot_minutes >= min_ot_minutes {
            ot_hours = round2(ot_minutes as f64 / 60.0);
        }
    }

    PunchMetrics {
        delay_minutes,
        extra_minutes,
        total_hours,
        ot_hours,
    }
}

/// Reporting-side hour breakdown for a closed record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportHours {
    /// Full shift span when the checkout reached shift end, otherwise the
    /// span actually covered from shift start.
    pub regular_hours: f64,
    /// Minutes the checkout fell short of shift end; zero otherwise.
    pub early_checkout_minutes: i64,
    /// Final reported total, honoring a manual OT override above all else.
    pub total_hours: f64,
}

/// Derive the reported hours for a record. The three-way total rule:
/// a manually-set OT always yields actual-worked + manual OT; auto OT yields
/// regular shift hours + auto OT; otherwise the actual worked span stands.
pub fn derive_report_hours(
    check_in: NaiveDateTime,
    check_out: NaiveDateTime,
    shift_start: NaiveDateTime,
    shift_end: NaiveDateTime,
    manual_ot: Option<f64>,
    auto_ot: f64,
) -> ReportHours {
    let worked = round2(hours_between(check_in, check_out).max(0.0));

    let (regular_hours, early_checkout_minutes) = if check_out >= shift_end {
        (round2(hours_between(shift_start, shift_end)), 0)
    } else {
        (
            round2(hours_between(shift_start, check_out).max(0.0)),
            minutes_between(check_out, shift_end).max(0),
        )
    };

    let total_hours = match manual_ot {
        Some(ot) => round2(worked + ot),
        None if auto_ot > 0.0 => round2(regular_hours + auto_ot),
        None => worked,
    };

    ReportHours {
        regular_hours,
        early_checkout_minutes,
        total_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: &str, end: &str, before: Option<i64>, after: Option<i64>) -> Shift {
        Shift {
            id: 1,
            name: "day".into(),
            category: "production".into(),
            start_time: start.into(),
            end_time: end.into(),
            grace_before_min: before,
            grace_after_min: after,
            presence_time_sec: None,
            presence_count: None,
            presence_window_sec: None,
            created_at: None,
        }
    }

    fn dt(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn inverted_pair_yields_zero_metrics() {
        let shifts = vec![shift("09:00", "17:00", None, None)];
        let m = compute_metrics(
            dt("2026-01-05T17:00:00"),
            dt("2026-01-05T09:00:00"),
            &shifts,
            false,
            DEFAULT_MIN_OT_MINUTES,
        );
        assert_eq!(m, PunchMetrics::default());

        let m = compute_metrics(
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T09:00:00"),
            &shifts,
            false,
            DEFAULT_MIN_OT_MINUTES,
        );
        assert_eq!(m, PunchMetrics::default());
    }

    #[test]
    fn empty_catalog_yields_zero_metrics() {
        let m = compute_metrics(
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T17:00:00"),
            &[],
            false,
            DEFAULT_MIN_OT_MINUTES,
        );
        assert_eq!(m, PunchMetrics::default());
    }

    #[test]
    fn grace_scenario_day_shift() {
        // 09:00-17:00, grace 15/30; in 08:50, out 17:45
        let shifts = vec![shift("09:00", "17:00", Some(15), Some(30))];
        let m = compute_metrics(
            dt("2026-01-05T08:50:00"),
            dt("2026-01-05T17:45:00"),
            &shifts,
            false,
            15,
        );
        assert_eq!(m.delay_minutes, 0); // early arrival clamps to zero
        assert_eq!(m.extra_minutes, 45);
        assert_eq!(m.ot_hours, 0.75); // 45 > grace 30, 45 >= min 15
        assert_eq!(m.total_hours, 8.92);
    }

    #[test]
    fn late_arrival_counts_delay() {
        let shifts = vec![shift("09:00", "17:00", None, None)];
        let m = compute_metrics(
            dt("2026-01-05T09:25:00"),
            dt("2026-01-05T17:00:00"),
            &shifts,
            false,
            15,
        );
        assert_eq!(m.delay_minutes, 25);
        assert_eq!(m.extra_minutes, 0);
        assert_eq!(m.ot_hours, 0.0);
    }

    #[test]
    fn overtime_below_grace_is_not_credited() {
        let shifts = vec![shift("09:00", "17:00", Some(15), Some(30))];
        let m = compute_metrics(
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T17:20:00"),
            &shifts,
            false,
            15,
        );
        assert_eq!(m.extra_minutes, 20);
        assert_eq!(m.ot_hours, 0.0); // 17:20 <= 17:30 deadline
    }

    #[test]
    fn overtime_below_minimum_is_dropped() {
        let shifts = vec![shift("09:00", "17:00", Some(0), Some(0))];
        let m = compute_metrics(
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T17:10:00"),
            &shifts,
            false,
            15,
        );
        assert_eq!(m.extra_minutes, 10);
        assert_eq!(m.ot_hours, 0.0); // 10 < MIN_OT_MINUTES
    }

    #[test]
    fn ot_context_punch_skips_grace_gate() {
        let shifts = vec![shift("09:00", "17:00", Some(15), Some(30))];
        let m = compute_metrics(
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T17:20:00"),
            &shifts,
            true,
            15,
        );
        assert_eq!(m.ot_hours, 0.33); // 20 min, grace waived
    }

    #[test]
    fn overnight_scenario() {
        // 22:00-06:00; in 23:30 day D, out 06:10 day D+1
        let shifts = vec![shift("22:00", "06:00", None, None)];
        let m = compute_metrics(
            dt("2026-01-05T23:30:00"),
            dt("2026-01-06T06:10:00"),
            &shifts,
            false,
            15,
        );
        assert_eq!(m.total_hours, 6.67);
        assert_eq!(m.extra_minutes, 10);
        assert_eq!(m.delay_minutes, 90);
    }

    #[test]
    fn metrics_are_never_negative() {
        let shifts = vec![shift("09:00", "17:00", None, None)];
        // checked in early and left mid-shift
        let m = compute_metrics(
            dt("2026-01-05T08:00:00"),
            dt("2026-01-05T12:00:00"),
            &shifts,
            false,
            15,
        );
        assert!(m.delay_minutes >= 0);
        assert!(m.extra_minutes >= 0);
        assert!(m.total_hours >= 0.0);
    }

    #[test]
    fn manual_ot_override_wins_the_total() {
        // worked 8h, admin set OT to 2.5: total must be 8 + 2.5 no matter
        // what auto-calculation would say
        let check_in = dt("2026-01-05T09:00:00");
        let check_out = dt("2026-01-05T17:00:00");
        let r = derive_report_hours(
            check_in,
            check_out,
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T17:00:00"),
            Some(2.5),
            1.0,
        );
        assert_eq!(r.total_hours, 10.5);
    }

    #[test]
    fn auto_ot_total_uses_regular_shift_hours() {
        let r = derive_report_hours(
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T18:00:00"),
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T17:00:00"),
            None,
            1.0,
        );
        assert_eq!(r.regular_hours, 8.0); // full shift, checkout past end
        assert_eq!(r.early_checkout_minutes, 0);
        assert_eq!(r.total_hours, 9.0);
    }

    #[test]
    fn early_checkout_trims_regular_hours() {
        let r = derive_report_hours(
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T15:30:00"),
            dt("2026-01-05T09:00:00"),
            dt("2026-01-05T17:00:00"),
            None,
            0.0,
        );
        assert_eq!(r.regular_hours, 6.5);
        assert_eq!(r.early_checkout_minutes, 90);
        assert_eq!(r.total_hours, 6.5); // plain worked hours
    }
}
