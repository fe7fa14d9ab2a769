//! Interval strings (`'1h'`, `'10min'`, `'-1d12h'`)

use nom::{
    character::complete::{alpha1, digit1, one_of},
    combinator::opt,
    multi::many1,
    IResult, Parser,
};

/// Seconds per unit, `None` for unknown units
fn unit_seconds(unit: &str) -> Option<i64> {
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hour" | "hours" => Some(3_600),
        "d" | "day" | "days" => Some(86_400),
        "w" | "week" | "weeks" => Some(604_800),
        "mon" | "month" | "months" => Some(2_592_000),
        "y" | "year" | "years" => Some(31_536_000),
        _ => None,
    }
}

type IntervalParts<'a> = (Option<char>, Vec<(&'a str, &'a str)>);

fn interval_parts(input: &str) -> IResult<&str, IntervalParts<'_>> {
    (opt(one_of("+-")), many1((digit1, alpha1))).parse(input)
}

/// Convert an interval string to seconds
///
/// `default_sign` (1 or -1) applies when no explicit sign is written.
pub fn parse_interval(text: &str, default_sign: i64) -> Result<i64, String> {
    let (rest, (sign, parts)) =
        interval_parts(text.trim()).map_err(|_| format!("invalid interval '{}'", text))?;
    if !rest.is_empty() {
        return Err(format!("invalid interval '{}': unexpected '{}'", text, rest));
    }

    let sign = match sign {
        Some('-') => -1,
        Some(_) => 1,
        None => default_sign,
    };

    let mut total: i64 = 0;
    for (count, unit) in parts {
        let count: i64 = count
            .parse()
            .map_err(|_| format!("invalid interval '{}': number too large", text))?;
        let per_unit = unit_seconds(unit)
            .ok_or_else(|| format!("invalid interval '{}': unknown unit '{}'", text, unit))?;
        total = count
            .checked_mul(per_unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| format!("invalid interval '{}': overflow", text))?;
    }

    Ok(sign * total)
}
