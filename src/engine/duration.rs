//! Human-readable durations for narration ("2 years, 3 days, 04:05:06").

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const YEAR: i64 = 365 * DAY;
const DECADE: i64 = 10 * YEAR;
const CENTURY: i64 = 10 * DECADE;

/// Format `seconds` as optional centuries/decades/years followed by the mandatory
/// `D day(s), HH:MM:SS` trailer. Zero or negative input reads as "a moment".
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "a moment".to_string();
    }
    let mut remaining = seconds;
    let mut sections: Vec<String> = Vec::new();
    for (unit, singular, plural) in [
        (CENTURY, "century", "centuries"),
        (DECADE, "decade", "decades"),
        (YEAR, "year", "years"),
    ] {
        if remaining >= unit {
            let count = remaining / unit;
            sections.push(if count == 1 {
                format!("1 {}", singular)
            } else {
                format!("{} {}", count, plural)
            });
            remaining -= count * unit;
        }
    }
    let days = remaining / DAY;
    sections.push(format!(
        "{} day{}, {:02}:{:02}:{:02}",
        days,
        if days == 1 { "" } else { "s" },
        (remaining % DAY) / HOUR,
        (remaining % HOUR) / MINUTE,
        remaining % MINUTE
    ));
    sections.join(", ")
}
