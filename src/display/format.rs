use chrono::{DateTime, Duration, Utc};

/// Thousands separators: 1234567 -> "1,234,567"
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Token counts with K/M/B suffix
pub fn format_tokens(n: u64) -> String {
    let f = n as f64;
    match n {
        n if n >= 1_000_000_000 => format!("{:.1}B", f / 1_000_000_000.0),
        n if n >= 1_000_000 => format!("{:.1}M", f / 1_000_000.0),
        n if n >= 1_000 => format!("{:.1}K", f / 1_000.0),
        n => n.to_string(),
    }
}

/// "3h 12m", "45m" or "20s"
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    let hours = secs / 3600;
    let minutes = (secs / 60) % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", secs)
    }
}

pub fn format_duration_ms(ms: u64) -> String {
    format_duration(Duration::milliseconds(ms.min(i64::MAX as u64) as i64))
}

/// "just now", "5m ago", "3h ago", "12d ago", or the date beyond 30 days
pub fn relative_time(t: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(t) = t else {
        return "unknown".to_string();
    };
    let d = now - t;
    if d < Duration::minutes(1) {
        "just now".to_string()
    } else if d < Duration::hours(1) {
        format!("{}m ago", d.num_minutes())
    } else if d < Duration::days(1) {
        format!("{}h ago", d.num_hours())
    } else if d < Duration::days(30) {
        format!("{}d ago", d.num_days())
    } else {
        t.format("%Y-%m-%d").to_string()
    }
}

const MODEL_FAMILIES: &[(&str, &str)] = &[("opus", "Opus"), ("sonnet", "Sonnet"), ("haiku", "Haiku")];

/// Short display name: "claude-opus-4-6" -> "Opus 4.6", "claude-sonnet-4-20250514" -> "Sonnet 4".
/// Unrecognised ids are returned unchanged.
pub fn model_short(model: &str) -> String {
    let parts: Vec<&str> = model.split('-').collect();
    for (i, part) in parts.iter().enumerate() {
        let Some((_, family)) = MODEL_FAMILIES.iter().find(|(key, _)| part == key) else {
            continue;
        };
        // Version parts are short numbers; an 8-digit date ends the version
        let version: Vec<&str> = parts[i + 1..]
            .iter()
            .take_while(|p| !p.is_empty() && p.len() <= 2 && p.chars().all(|c| c.is_ascii_digit()))
            .take(2)
            .copied()
            .collect();
        if version.is_empty() {
            return family.to_string();
        }
        return format!("{} {}", family, version.join("."));
    }
    model.to_string()
}

/// Truncate to `max` characters, ending with "..." when cut
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let kept: String = s.chars().take(max - 3).collect();
    format!("{}...", kept)
}

/// Collapse newlines and runs of whitespace so a prompt fits one row
pub fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_500), "1.5K");
        assert_eq!(format_tokens(2_340_000), "2.3M");
        assert_eq!(format_tokens(3_000_000_000), "3.0B");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(300_000), "5m");
        assert_eq!(format_duration_ms(3_600_000 + 120_000), "1h 2m");
        assert_eq!(format_duration_ms(42_000), "42s");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(relative_time(None, now), "unknown");
        assert_eq!(relative_time(Some(now), now), "just now");
        assert_eq!(
            relative_time(Some(now - Duration::minutes(5)), now),
            "5m ago"
        );
        assert_eq!(relative_time(Some(now - Duration::hours(3)), now), "3h ago");
        assert_eq!(relative_time(Some(now - Duration::days(12)), now), "12d ago");
        assert_eq!(
            relative_time(Some(now - Duration::days(60)), now),
            "2024-01-10"
        );
    }

    #[test]
    fn test_model_short() {
        assert_eq!(model_short("claude-opus-4-6"), "Opus 4.6");
        assert_eq!(model_short("claude-sonnet-4-5-20250929"), "Sonnet 4.5");
        assert_eq!(model_short("claude-haiku-4-5"), "Haiku 4.5");
        assert_eq!(model_short("claude-sonnet-4-20250514"), "Sonnet 4");
        assert_eq!(model_short("claude-3-5-sonnet-20241022"), "Sonnet");
        assert_eq!(model_short("<synthetic>"), "<synthetic>");
        assert_eq!(model_short("unknown"), "unknown");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("abcdef", 2), "ab");
        // Multi-byte characters are never split
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_one_line() {
        assert_eq!(one_line("fix\n  the\tbuild "), "fix the build");
    }
}
