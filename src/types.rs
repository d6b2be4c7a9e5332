use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// How tag values are printed by the tool.
///
/// - `Numeric`: raw values (`-n`), e.g. `Orientation: 1`.
/// - `HumanReadable`: converted values, e.g. `Orientation: Horizontal (normal)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadFormat {
    Numeric,
    HumanReadable,
}

impl Default for ReadFormat {
    fn default() -> Self {
        ReadFormat::Numeric
    }
}

impl ReadFormat {
    /// Extra arguments selecting this format.
    pub fn arguments(self) -> &'static [&'static str] {
        match self {
            ReadFormat::Numeric => &["-n"],
            ReadFormat::HumanReadable => &[],
        }
    }
}

impl FromStr for ReadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "numeric" => Ok(ReadFormat::Numeric),
            "human_readable" | "human" => Ok(ReadFormat::HumanReadable),
            other => Err(format!(
                "invalid format: {other} (expected \"numeric\" or \"human_readable\")"
            )),
        }
    }
}

/// Parse a delay such as `"250ms"`, `"30s"`, `"10m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in {s:?} (expected ms, s, m or h)"))?;

    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("missing number in {s:?}"))?;

    let secs_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        other => return Err(format!("unknown unit {other:?} (expected ms, s, m or h)")),
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("delay {s:?} is too large"))
}
