//! Display formatting for quotes. Non-finite inputs render as [`PLACEHOLDER`].

pub const PLACEHOLDER: &str = "--";

/// Colour tone of a signed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTone {
    Positive,
    Negative,
    Neutral,
}

impl ChangeTone {
    pub fn of(change: f64) -> Self {
        if !change.is_finite() || change == 0.0 {
            ChangeTone::Neutral
        } else if change > 0.0 {
            ChangeTone::Positive
        } else {
            ChangeTone::Negative
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            ChangeTone::Positive => "positive",
            ChangeTone::Negative => "negative",
            ChangeTone::Neutral => "neutral",
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            ChangeTone::Positive => "▲",
            ChangeTone::Negative => "▼",
            ChangeTone::Neutral => "•",
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `$1,234.56`
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${}.{frac}", group_thousands(int))
}

/// `+1.23` / `-1.23`
pub fn format_change(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{value:+.2}")
}

/// `+1.23%`
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{value:+.2}%")
}

/// Compact magnitude: `2.95T`, `1.20B`, `3.40M`, `12.30K`.
pub fn format_large_number(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        return format!("{value:.0}");
    };
    format!("{scaled:.2}{suffix}")
}

pub fn format_market_cap(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("${}", format_large_number(value))
}

pub fn format_volume(volume: u64) -> String {
    format_large_number(volume as f64)
}
