use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::engine::timeparse::parse_shift_time;
use crate::model::shift::Shift;

/// Applied when a shift row has no grace_before_min configured.
pub const DEFAULT_GRACE_BEFORE_MIN: i64 = 30;

/// Window (minutes) before shift end in which a plain check-out is accepted.
pub const CHECK_OUT_WINDOW_MIN: i64 = 30;

/// Transient result of shift matching; index is the shift's position in the
/// catalog. Never persisted.
#[derive(Debug, Clone, Copy)]
pub struct DetectedShiftMatch<'a> {
    pub shift: &'a Shift,
    pub index: usize,
}

fn shift_time(shift_field: &str) -> NaiveTime {
    let t = parse_shift_time(shift_field);
    NaiveTime::from_hms_opt(t.hour, t.minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Concrete start/end timestamps for a shift, anchored to the check-in
/// event's calendar date. An end not strictly after the start is pushed to
/// the next day (overnight wraparound).
pub fn shift_bounds(shift: &Shift, anchor: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = anchor.and_time(shift_time(&shift.start_time));
    let mut end = anchor.and_time(shift_time(&shift.end_time));
    if end <= start {
        end += Duration::days(1);
    }
    (start, end)
}

/// Containment match: the first shift whose [start, end) window holds the
/// time-of-day; an overnight shift (end-minutes < start-minutes) holds
/// `t >= start || t <= end`. A time no shift contains still answers with the
/// first catalog entry. None only when the catalog is empty.
pub fn detect_shift_for_time<'a>(
    shifts: &'a [Shift],
    at: NaiveDateTime,
) -> Option<DetectedShiftMatch<'a>> {
    if shifts.is_empty() {
        return None;
    }

    let t = at.time().hour() * 60 + at.time().minute();

    for (index, shift) in shifts.iter().enumerate() {
        let start = parse_shift_time(&shift.start_time).minutes_of_day();
        let end = parse_shift_time(&shift.end_time).minutes_of_day();

        let contained = if end < start {
            t >= start || t <= end
        } else {
            t >= start && t < end
        };

        if contained {
            return Some(DetectedShiftMatch { shift, index });
        }
    }

    // No window contains the time: answer with the first shift anyway.
    Some(DetectedShiftMatch {
        shift: &shifts[0],
        index: 0,
    })
}

/// Grace-aware punch match: the first shift whose
/// [start - grace_before, end + grace_after] window contains the punch,
/// falling back to the containment match when none does.
pub fn find_shift_for_punch_with_grace<'a>(
    shifts: &'a [Shift],
    at: NaiveDateTime,
) -> Option<DetectedShiftMatch<'a>> {
    for (index, shift) in shifts.iter().enumerate() {
        let (start, end) = shift_bounds(shift, at.date());
        let earliest = start - Duration::minutes(shift.grace_before_min.unwrap_or(0));
        let latest = end + Duration::minutes(shift.grace_after_min.unwrap_or(0));

        if at >= earliest && at <= latest {
            return Some(DetectedShiftMatch { shift, index });
        }
    }

    detect_shift_for_time(shifts, at)
}

/// Check-in acceptance window: from start minus grace-before (30 minutes
/// when the shift has none) through shift end, inclusive.
pub fn is_within_check_in_window(shift: &Shift, at: NaiveDateTime) -> bool {
    let (start, end) = shift_bounds(shift, at.date());
    let earliest =
        start - Duration::minutes(shift.grace_before_min.unwrap_or(DEFAULT_GRACE_BEFORE_MIN));
    at >= earliest && at <= end
}

/// Check-out acceptance window: the last 30 minutes of the shift through
/// shift end, inclusive. Bounds are anchored on the check-in's date so an
/// overnight checkout lands on the right day.
pub fn is_within_check_out_window(
    shift: &Shift,
    check_in: NaiveDateTime,
    at: NaiveDateTime,
) -> bool {
    let (_, end) = shift_bounds(shift, check_in.date());
    at >= end - Duration::minutes(CHECK_OUT_WINDOW_MIN) && at <= end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(id: u64, start: &str, end: &str, before: Option<i64>, after: Option<i64>) -> Shift {
        Shift {
            id,
            name: format!("shift-{id}"),
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

    fn dt(date: &str, time: &str) -> NaiveDateTime {
        format!("{date}T{time}").parse().unwrap()
    }

    #[test]
    fn empty_catalog_yields_no_match() {
        assert!(detect_shift_for_time(&[], dt("2026-01-05", "09:30:00")).is_none());
        assert!(find_shift_for_punch_with_grace(&[], dt("2026-01-05", "09:30:00")).is_none());
    }

    #[test]
    fn containment_picks_first_matching_window() {
        let shifts = vec![
            shift(1, "06:00", "14:00", None, None),
            shift(2, "14:00", "22:00", None, None),
        ];
        let m = detect_shift_for_time(&shifts, dt("2026-01-05", "15:10:00")).unwrap();
        assert_eq!(m.index, 1);
        // [start, end) - exactly 14:00 belongs to the second window
        let m = detect_shift_for_time(&shifts, dt("2026-01-05", "14:00:00")).unwrap();
        assert_eq!(m.index, 1);
    }

    #[test]
    fn uncontained_time_falls_back_to_first_shift() {
        let shifts = vec![shift(1, "09:00", "17:00", None, None)];
        let m = detect_shift_for_time(&shifts, dt("2026-01-05", "03:00:00")).unwrap();
        assert_eq!(m.index, 0);
    }

    #[test]
    fn overnight_shift_contains_both_edges() {
        let shifts = vec![shift(1, "22:00", "06:00", None, None)];
        // just after start
        let m = detect_shift_for_time(&shifts, dt("2026-01-05", "22:05:00")).unwrap();
        assert_eq!(m.index, 0);
        // just before end-of-day wrap
        let m = detect_shift_for_time(&shifts, dt("2026-01-05", "23:59:00")).unwrap();
        assert_eq!(m.index, 0);
        // early morning tail
        let m = detect_shift_for_time(&shifts, dt("2026-01-06", "05:30:00")).unwrap();
        assert_eq!(m.index, 0);
    }

    #[test]
    fn bounds_wrap_overnight_end_to_next_day() {
        let s = shift(1, "22:00", "06:00", None, None);
        let (start, end) = shift_bounds(&s, "2026-01-05".parse().unwrap());
        assert_eq!(start, dt("2026-01-05", "22:00:00"));
        assert_eq!(end, dt("2026-01-06", "06:00:00"));
    }

    #[test]
    fn grace_match_accepts_early_punch() {
        let shifts = vec![shift(1, "09:00", "17:00", Some(15), Some(30))];
        let m = find_shift_for_punch_with_grace(&shifts, dt("2026-01-05", "08:50:00")).unwrap();
        assert_eq!(m.index, 0);
        // beyond grace-before: grace pass fails, containment fallback answers
        let m = find_shift_for_punch_with_grace(&shifts, dt("2026-01-05", "08:30:00")).unwrap();
        assert_eq!(m.index, 0);
    }

    #[test]
    fn grace_match_accepts_late_checkout() {
        let shifts = vec![
            shift(1, "06:00", "14:00", Some(10), Some(20)),
            shift(2, "14:00", "22:00", Some(10), Some(20)),
        ];
        let m = find_shift_for_punch_with_grace(&shifts, dt("2026-01-05", "14:15:00")).unwrap();
        // 14:15 is inside the first shift's grace-after tail; catalog order wins
        assert_eq!(m.index, 0);
    }

    #[test]
    fn check_in_window_defaults_grace_to_30() {
        let s = shift(1, "09:00", "17:00", None, None);
        assert!(is_within_check_in_window(&s, dt("2026-01-05", "08:31:00")));
        assert!(!is_within_check_in_window(&s, dt("2026-01-05", "08:29:00")));
        assert!(is_within_check_in_window(&s, dt("2026-01-05", "17:00:00")));
        assert!(!is_within_check_in_window(&s, dt("2026-01-05", "17:01:00")));
    }

    #[test]
    fn check_out_window_is_last_half_hour() {
        let s = shift(1, "22:00", "06:00", None, None);
        let check_in = dt("2026-01-05", "22:10:00");
        assert!(is_within_check_out_window(&s, check_in, dt("2026-01-06", "05:45:00")));
        assert!(is_within_check_out_window(&s, check_in, dt("2026-01-06", "06:00:00")));
        assert!(!is_within_check_out_window(&s, check_in, dt("2026-01-06", "05:15:00")));
        assert!(!is_within_check_out_window(&s, check_in, dt("2026-01-06", "06:01:00")));
    }
}
