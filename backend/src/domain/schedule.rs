//! Session time-slot generation.
//!
//! The center operates 07:00-22:00 with sessions starting every 30
//! minutes. TK sessions run 60 minutes; every other level runs 90.
//! 90-minute slots are allowed to end at 22:30 when the end hour is 22
//! (so a 21:00 start still fits the evening), while TK slots must end at
//! or before 22:00.

use shared::{EducationLevel, TimeSlot};

const OPENING_HOUR: u32 = 7;
const CLOSING_HOUR: u32 = 22;

/// Build the ordered slot list for an education level. Deterministic and
/// regenerated per call; nothing is cached.
pub fn generate_time_slots(level: EducationLevel) -> Vec<TimeSlot> {
    let duration_minutes = if level == EducationLevel::TK { 60 } else { 90 };
    let mut slots = Vec::new();

    for hour in OPENING_HOUR..CLOSING_HOUR {
        for minute in [0u32, 30] {
            let end_total = hour * 60 + minute + duration_minutes;
            let end_hour = end_total / 60;
            let end_minute = end_total % 60;

            let fits = end_total <= CLOSING_HOUR * 60
                || (duration_minutes == 90 && end_hour == CLOSING_HOUR && end_minute <= 30);
            if !fits {
                continue;
            }

            let start = format!("{:02}:{:02}", hour, minute);
            let end = format!("{:02}:{:02}", end_hour, end_minute);
            slots.push(TimeSlot {
                label: format!("{} - {}", start, end),
                start,
                end,
            });
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_slot(slots: &[TimeSlot], start: &str, end: &str) -> bool {
        slots.iter().any(|s| s.start == start && s.end == end)
    }

    fn end_minutes(slot: &TimeSlot) -> u32 {
        let (h, m) = slot.end.split_once(':').unwrap();
        h.parse::<u32>().unwrap() * 60 + m.parse::<u32>().unwrap()
    }

    #[test]
    fn tk_slots_are_sixty_minutes_within_closing() {
        let slots = generate_time_slots(EducationLevel::TK);

        assert!(has_slot(&slots, "07:00", "08:00"));
        assert!(has_slot(&slots, "21:00", "22:00"));
        // Nothing may run past 22:00 for TK.
        assert!(slots.iter().all(|s| end_minutes(s) <= 22 * 60));
        assert!(!has_slot(&slots, "21:30", "22:30"));
    }

    #[test]
    fn non_tk_slots_are_ninety_minutes() {
        let slots = generate_time_slots(EducationLevel::SD);

        assert!(has_slot(&slots, "07:00", "08:30"));
        // Boundary slot ending exactly at closing.
        assert!(has_slot(&slots, "20:30", "22:00"));
    }

    #[test]
    fn ninety_minute_slots_get_the_evening_tolerance() {
        // A 21:00 start ends at 22:30, inside the allowed overrun.
        let slots = generate_time_slots(EducationLevel::SMA);
        assert!(has_slot(&slots, "21:00", "22:30"));
        // A 21:30 start would end at 23:00 and is excluded.
        assert!(!has_slot(&slots, "21:30", "23:00"));
        assert!(slots.iter().all(|s| end_minutes(s) <= 22 * 60 + 30));
    }

    #[test]
    fn slots_are_ordered_and_half_hourly() {
        let slots = generate_time_slots(EducationLevel::SMP);
        let starts: Vec<&str> = slots.iter().map(|s| s.start.as_str()).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(slots[0].start, "07:00");
        assert_eq!(slots[1].start, "07:30");
        assert_eq!(slots[0].label, "07:00 - 08:30");
        assert_eq!(slots[0].key(), "07:00-08:30");
    }

    #[test]
    fn unknown_level_uses_the_ninety_minute_rule() {
        let slots = generate_time_slots(EducationLevel::Unknown);
        assert!(has_slot(&slots, "07:00", "08:30"));
    }
}
