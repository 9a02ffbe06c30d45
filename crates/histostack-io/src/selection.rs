//! Parsing of subset and masked-assignment files.
//!
//! Both files are plain numeric tables: values separated by whitespace or
//! commas, `#` starting a comment. Integral floats such as `12.0` are
//! accepted as slice indices.

use anyhow::{bail, Context, Result};
use std::path::Path;
use histostack_core::SliceIndex;

fn parse_index(token: &str, line: usize) -> Result<SliceIndex> {
    if let Ok(value) = token.parse::<SliceIndex>() {
        return Ok(value);
    }
    let value: f64 = token
        .parse()
        .with_context(|| format!("line {}: '{}' is not a number", line, token))?;
    if value.fract() != 0.0 || !value.is_finite() {
        bail!("line {}: '{}' is not an integral slice index", line, token);
    }
    Ok(value as SliceIndex)
}

fn rows(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(i, raw)| {
        let content = raw.split('#').next().unwrap_or("");
        let fields: Vec<&str> = content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .collect();
        (!fields.is_empty()).then_some((i + 1, fields))
    })
}

/// Parse a list of slice indices.
pub fn parse_subset(text: &str) -> Result<Vec<SliceIndex>> {
    let mut indices = Vec::new();
    for (line, fields) in rows(text) {
        for field in fields {
            indices.push(parse_index(field, line)?);
        }
    }
    Ok(indices)
}

/// Parse `slice anchor` pairs, exactly two columns per row.
pub fn parse_masked(text: &str) -> Result<Vec<(SliceIndex, SliceIndex)>> {
    rows(text)
        .map(|(line, fields)| -> Result<(SliceIndex, SliceIndex)> {
            match fields.as_slice() {
                [slice, anchor] => Ok((parse_index(slice, line)?, parse_index(anchor, line)?)),
                _ => bail!("line {}: expected 2 columns, found {}", line, fields.len()),
            }
        })
        .collect()
}

pub fn read_subset_file<P: AsRef<Path>>(path: P) -> Result<Vec<SliceIndex>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read subset file {}", path.display()))?;
    parse_subset(&text).with_context(|| format!("Malformed subset file {}", path.display()))
}

pub fn read_masked_file<P: AsRef<Path>>(path: P) -> Result<Vec<(SliceIndex, SliceIndex)>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read masked assignment file {}", path.display()))?;
    parse_masked(&text).with_context(|| format!("Malformed masked assignment file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subset() {
        let text = "# slices to register\n1 3\n5.0\n\n7, 9 # trailing\n";
        assert_eq!(parse_subset(text).unwrap(), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_parse_subset_rejects_fractions() {
        let err = parse_subset("1\n2.5\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_subset("abc").is_err());
    }

    #[test]
    fn test_parse_masked() {
        let text = "10 12\n11.0 12.0\n";
        assert_eq!(parse_masked(text).unwrap(), vec![(10, 12), (11, 12)]);
    }

    #[test]
    fn test_parse_masked_requires_two_columns() {
        let err = parse_masked("10 12\n11\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_masked("1 2 3").is_err());
    }

    #[test]
    fn test_empty_file_is_empty_list() {
        assert!(parse_subset("# nothing\n").unwrap().is_empty());
        assert!(parse_masked("").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subset.txt");
        let err = read_subset_file(&path).unwrap_err();
        assert!(err.to_string().contains("subset.txt"));
        let err = read_masked_file(dir.path().join("masked.txt")).unwrap_err();
        assert!(format!("{:#}", err).contains("masked.txt"));
    }
}
