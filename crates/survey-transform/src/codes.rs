//! Code list helpers.

use crate::error::{Result, TransformError};

/// Expand an abbreviated code range.
///
/// Entries are separated by `,`; `a-b` lists every code between `a` and `b`
/// inclusive, counting down when `b < a`.
///
/// # Examples
///
/// ```
/// use survey_transform::codes::frange;
///
/// assert_eq!(frange("1-3,7,10-8").unwrap(), vec![1, 2, 3, 7, 10, 9, 8]);
/// ```
pub fn frange(range_def: &str) -> Result<Vec<i64>> {
    let mut codes = Vec::new();
    for entry in range_def.split(',') {
        let entry = entry.trim();
        match entry.split_once('-') {
            Some((start, end)) => {
                let start = parse_code(start, range_def)?;
                let end = parse_code(end, range_def)?;
                if start <= end {
                    codes.extend(start..=end);
                } else {
                    codes.extend((end..=start).rev());
                }
            }
            None => codes.push(parse_code(entry, range_def)?),
        }
    }
    Ok(codes)
}

fn parse_code(raw: &str, range_def: &str) -> Result<i64> {
    raw.trim().parse::<i64>().map_err(|_| {
        TransformError::configuration(format!("invalid code '{raw}' in range '{range_def}'"))
    })
}
