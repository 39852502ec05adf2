//! Lunar phase lookup for calendar dates.
//!
//! Phases are counted in whole days since the last new moon, `0..=29`:
//! `0` is new moon, about `7` first quarter, `14` full moon and `22` last
//! quarter.

use chrono::{NaiveDate, NaiveDateTime};

const SYNODIC_MONTH_DAYS: f64 = 29.530_588_853;
const SECONDS_PER_DAY: f64 = 86_400.0;

// Width must stay at 30 characters, one per phase day.
const PHASE_BARS: &str = "  ))))))))))))OOO(((((((((((( ";
const PHASE_FRACTIONS: &str = "00¼¼¼¼½½½½¾¾¾¾111¾¾¾¾½½½½¼¼¼¼0";

fn reference_new_moon() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000, 1, 6)?.and_hms_opt(18, 14, 0)
}

/// Returns the phase day for an ISO `YYYY-MM-DD` date, or `None` when the
/// input cannot be parsed.
pub fn moon_phase(date: &str) -> Option<u8> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    moon_phase_for(date)
}

/// Returns the phase day for a calendar date.
pub fn moon_phase_for(date: NaiveDate) -> Option<u8> {
    let midday = date.and_hms_opt(12, 0, 0)?;
    let elapsed = (midday - reference_new_moon()?).num_seconds() as f64 / SECONDS_PER_DAY;
    let age = elapsed.rem_euclid(SYNODIC_MONTH_DAYS);
    Some((age.round() as i64).rem_euclid(30) as u8)
}

/// Returns the conventional name of a phase day.
pub fn phase_name(phase: u8) -> &'static str {
    match phase % 30 {
        0 => "new moon",
        1..=6 => "waxing crescent",
        7 => "first quarter",
        8..=13 => "waxing gibbous",
        14 | 15 => "full moon",
        16..=21 => "waning gibbous",
        22 => "last quarter",
        _ => "waning crescent",
    }
}

/// Renders a phase day as `"<n> [  <bar>  ] <fraction> <name>"`.
pub fn render_phase(phase: u8) -> String {
    let index = usize::from(phase % 30);
    let bar = PHASE_BARS.chars().nth(index).unwrap_or(' ');
    let fraction = PHASE_FRACTIONS.chars().nth(index).unwrap_or('0');
    format!("{phase} [  {bar}  ] {fraction} {}", phase_name(phase))
}

/// Phase text for an ISO date; empty when the date cannot be parsed.
pub fn moon_phase_text(date: &str) -> String {
    moon_phase(date).map(render_phase).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{moon_phase, moon_phase_text, render_phase, PHASE_BARS, PHASE_FRACTIONS};

    #[test]
    fn lookup_tables_cover_every_phase_day() {
        assert_eq!(PHASE_BARS.chars().count(), 30);
        assert_eq!(PHASE_FRACTIONS.chars().count(), 30);
    }

    #[test]
    fn known_new_and_full_moons() {
        assert_eq!(moon_phase("2024-01-11"), Some(0));
        let full = moon_phase("2024-01-25").expect("valid date");
        assert!((13..=15).contains(&full), "full moon window, got {full}");
    }

    #[test]
    fn unparseable_dates_have_no_phase() {
        assert_eq!(moon_phase("2024-13-40"), None);
        assert_eq!(moon_phase("yesterday"), None);
        assert_eq!(moon_phase_text(""), "");
    }

    #[test]
    fn render_phase_uses_bar_and_fraction() {
        assert_eq!(render_phase(14), "14 [  O  ] 1 full moon");
        assert_eq!(render_phase(0), "0 [     ] 0 new moon");
    }

    #[test]
    fn phases_before_reference_epoch_stay_in_range() {
        let phase = moon_phase("1889-04-02").expect("valid date");
        assert!(phase < 30);
    }
}
