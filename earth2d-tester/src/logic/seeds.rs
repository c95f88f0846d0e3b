use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Cap on how many seeds one range token may expand to.
const MAX_RANGE_LEN: u64 = 100_000;

/// Resolve CLI seed tokens into an ordered, de-duplicated seed list.
///
/// Accepts literal integers (negative values fold to their magnitude),
/// half-open ranges `a..b` and inclusive ranges `a..=b`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for token in tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        for seed in expand_token(token)? {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }

    if seeds.is_empty() {
        seeds.push(42);
    }
    Ok(seeds)
}

fn expand_token(token: &str) -> Result<Vec<u64>> {
    let Some((start, end)) = token.split_once("..") else {
        return Ok(vec![parse_seed(token)?]);
    };
    let (end, inclusive) = match end.strip_prefix('=') {
        Some(end) => (end, true),
        None => (end, false),
    };
    let start = parse_seed(start)?;
    let end = parse_seed(end)?;
    let end = if inclusive { end.saturating_add(1) } else { end };
    if end <= start {
        bail!("empty seed range: {token}");
    }
    if end - start > MAX_RANGE_LEN {
        bail!("seed range too large: {token} (max {MAX_RANGE_LEN} seeds)");
    }
    Ok((start..end).collect())
}

fn parse_seed(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    raw.parse::<i64>()
        .map(i64::unsigned_abs)
        .with_context(|| format!("unrecognized seed token: {raw}"))
}

/// Split a comma-separated CLI value.
#[must_use]
pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
