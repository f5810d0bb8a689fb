use crate::model::SlotTime;

// ── Slot Generation ───────────────────────────────────────────────

/// Produce the candidate labels for a day.
///
/// Starts at `open` and advances by `interval_minutes` until reaching `close`
/// (exclusive). Labels inside `[break_start, break_end)` are skipped without
/// shifting the ones that follow, so the break is a hole in the sequence. The
/// break only applies when both ends are given. A trailing remainder shorter
/// than one interval produces no extra label.
pub fn generate_slots(
    open: SlotTime,
    close: SlotTime,
    interval_minutes: u16,
    break_start: Option<SlotTime>,
    break_end: Option<SlotTime>,
) -> Vec<SlotTime> {
    if interval_minutes == 0 || open >= close {
        return Vec::new();
    }
    let step = u32::from(interval_minutes);
    let hole = break_start.zip(break_end);

    let mut slots = Vec::with_capacity(((close.minutes() - open.minutes()) / step + 1) as usize);
    let mut current = open.minutes();
    while current < close.minutes() {
        // current < close < 24h, so the label always exists.
        if let Some(label) = SlotTime::from_minutes(current) {
            let in_break = hole.is_some_and(|(start, end)| start <= label && label < end);
            if !in_break {
                slots.push(label);
            }
        }
        current += step;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> SlotTime {
        s.parse().unwrap()
    }

    fn labels(slots: &[SlotTime]) -> Vec<String> {
        slots.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn hourly_with_lunch_break() {
        let slots = generate_slots(t("09:00"), t("17:00"), 60, Some(t("12:00")), Some(t("13:00")));
        assert_eq!(
            labels(&slots),
            vec!["09:00", "10:00", "11:00", "14:00", "15:00", "16:00"]
        );
    }

    #[test]
    fn half_hour_fallback_day() {
        let slots = generate_slots(t("08:30"), t("20:00"), 30, None, None);
        assert_eq!(slots.first().copied(), Some(t("08:30")));
        assert_eq!(slots.last().copied(), Some(t("19:30")));
        assert_eq!(slots.len(), 23);
    }

    #[test]
    fn minute_carry_across_hours() {
        let slots = generate_slots(t("09:45"), t("11:00"), 25, None, None);
        assert_eq!(labels(&slots), vec!["09:45", "10:10", "10:35"]);
    }

    #[test]
    fn uneven_span_has_no_boundary_slot() {
        let slots = generate_slots(t("09:00"), t("10:00"), 45, None, None);
        assert_eq!(labels(&slots), vec!["09:00", "09:45"]);
    }

    #[test]
    fn break_misaligned_with_grid_keeps_grid() {
        // 12:10 – 12:50 swallows 12:20 and 12:40; 13:00 stays on the grid.
        let slots = generate_slots(t("12:00"), t("13:30"), 20, Some(t("12:10")), Some(t("12:50")));
        assert_eq!(labels(&slots), vec!["12:00", "13:00", "13:20"]);
    }

    #[test]
    fn break_end_is_exclusive() {
        let slots = generate_slots(t("09:00"), t("11:00"), 30, Some(t("09:30")), Some(t("10:00")));
        assert_eq!(labels(&slots), vec!["09:00", "10:00", "10:30"]);
    }

    #[test]
    fn half_configured_break_is_ignored() {
        let slots = generate_slots(t("09:00"), t("10:00"), 30, Some(t("09:00")), None);
        assert_eq!(labels(&slots), vec!["09:00", "09:30"]);
    }

    #[test]
    fn empty_when_open_not_before_close() {
        assert!(generate_slots(t("10:00"), t("10:00"), 30, None, None).is_empty());
        assert!(generate_slots(t("11:00"), t("10:00"), 30, None, None).is_empty());
    }

    #[test]
    fn zero_interval_yields_nothing() {
        assert!(generate_slots(t("10:00"), t("12:00"), 0, None, None).is_empty());
    }

    #[test]
    fn late_close_does_not_overflow() {
        let slots = generate_slots(t("23:00"), t("23:59"), 45, None, None);
        assert_eq!(labels(&slots), vec!["23:00", "23:45"]);
    }

    #[test]
    fn no_break_sequences_are_evenly_spaced() {
        for open_m in (0..24 * 60).step_by(85) {
            for close_m in (open_m + 1..24 * 60).step_by(170) {
                for interval in [15u16, 20, 25, 30, 45, 60, 90] {
                    let open = SlotTime::from_minutes(open_m).unwrap();
                    let close = SlotTime::from_minutes(close_m).unwrap();
                    let slots = generate_slots(open, close, interval, None, None);

                    assert_eq!(slots.first().copied(), Some(open));
                    for pair in slots.windows(2) {
                        assert_eq!(pair[1].minutes() - pair[0].minutes(), u32::from(interval));
                    }
                    assert!(slots.iter().all(|s| *s < close));
                    let last = slots.last().unwrap();
                    assert!(last.minutes() + u32::from(interval) >= close.minutes());
                }
            }
        }
    }

    #[test]
    fn breaks_remove_labels_without_shifting_survivors() {
        let open = t("08:00");
        let close = t("20:00");
        for interval in [15u16, 20, 30, 40, 60] {
            let full = generate_slots(open, close, interval, None, None);
            for bs in (8 * 60..19 * 60).step_by(35) {
                for len in [10u32, 30, 60, 95] {
                    let start = SlotTime::from_minutes(bs).unwrap();
                    let end = SlotTime::from_minutes(bs + len).unwrap();
                    let holed = generate_slots(open, close, interval, Some(start), Some(end));

                    assert!(holed.iter().all(|s| !(start <= *s && *s < end)));
                    let expected: Vec<SlotTime> = full
                        .iter()
                        .copied()
                        .filter(|s| !(start <= *s && *s < end))
                        .collect();
                    assert_eq!(holed, expected);
                    for s in &holed {
                        assert_eq!((s.minutes() - open.minutes()) % u32::from(interval), 0);
                    }
                }
            }
        }
    }

    #[test]
    fn deterministic() {
        let a = generate_slots(t("09:00"), t("19:00"), 30, Some(t("13:00")), Some(t("14:00")));
        let b = generate_slots(t("09:00"), t("19:00"), 30, Some(t("13:00")), Some(t("14:00")));
        assert_eq!(a, b);
        assert_eq!(a.len(), 18);
    }
}
