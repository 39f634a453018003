//! Best-effort extraction of `key: value` settings embedded in the free text
//! that acquisition software writes into [`TextInfo`].
//!
//! The text has no fixed grammar. Lines that do not look like a setting are
//! skipped, so this never fails, but unusual text may yield odd keys.
use log::trace;

use super::TextInfo;
use crate::params::{MetadataMap, Value};

/// Split `text` on `separator`, discarding empty pieces at the end.
fn split_dropping_trailing(text: &str, separator: char) -> Vec<&str> {
    let mut pieces: Vec<&str> = text.split(separator).collect();
    while pieces.last().is_some_and(|p| p.is_empty()) {
        pieces.pop();
    }
    pieces
}

/// Strip a `{key}` wrapper. Keys that would be empty are rejected.
fn unwrap_key(key: &str) -> Option<&str> {
    let key = match key.strip_prefix('{') {
        Some(inner) => {
            let mut chars = inner.chars();
            chars.next_back()?;
            chars.as_str()
        }
        None => key,
    };
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// A line shaped like `outer \t inner: a: b` whose value runs on into the next line
fn continuation_entry(
    prefix: &str,
    segments: &[&str],
    next_line: Option<&str>,
) -> Option<(String, Value)> {
    let fields = split_dropping_trailing(prefix.trim(), '\t');
    if fields.len() < 2 {
        return None;
    }
    let next_line = next_line?;
    let key = fields[0].trim();
    if key.is_empty() {
        return None;
    }
    let mut value = fields[1].trim().to_string();
    for segment in segments {
        value.push_str(": ");
        value.push_str(segment.trim());
    }
    value.push(' ');
    value.push_str(next_line.trim());
    Some((key.to_string(), Value::String(value)))
}

fn mine_line(line: &str, next_line: Option<&str>) -> Option<(String, Value)> {
    let segments = split_dropping_trailing(line, ':');
    if segments.len() < 2 {
        return None;
    }
    let prefix = segments[0];
    if prefix.contains('\t') {
        return continuation_entry(prefix, &segments[1..], next_line);
    }

    let key = unwrap_key(prefix.trim())?;
    let remainder = &line[prefix.len() + 1..];
    let value = remainder.trim();
    if value.is_empty() {
        return None;
    }

    // A tab right after the colon marks a value that continues on the next line
    if remainder.starts_with('\t') {
        if let Some(next_line) = next_line {
            let value = format!("{} {}", value, next_line.trim());
            return Some((key.to_string(), Value::String(value)));
        }
    }
    Some((key.to_string(), Value::infer(value)))
}

/// Extract every `key: value` pair found in `text`, in the order they appear.
///
/// Later pairs with the same key are expected to replace earlier ones.
pub fn mine_text(text: &str) -> Vec<(String, Value)> {
    let lines = split_dropping_trailing(text, '\n');
    let mut pairs = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        match mine_line(line, lines.get(i + 1).copied()) {
            Some(pair) => pairs.push(pair),
            None => {
                if !line.trim().is_empty() {
                    trace!("Skipping line {i} while mining text: {line:?}");
                }
            }
        }
    }
    pairs
}

/// Mine [`TextInfo::capturing`] followed by [`TextInfo::description`] and merge
/// the results into `map`, overwriting existing keys.
///
/// Returns the number of pairs found.
pub fn mine_text_info(text_info: &TextInfo, map: &mut MetadataMap) -> usize {
    let pairs = mine_text(&text_info.combined_text());
    let n = pairs.len();
    map.extend(pairs);
    n
}

#[cfg(test)]
mod test {
    use super::*;

    fn mined(text: &str) -> MetadataMap {
        mine_text(text).into_iter().collect()
    }

    #[test_log::test]
    fn test_plain_pairs() {
        let map = mined("Gain: 2\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Gain"), Some(&Value::Int(2)));

        let map = mined("Numerical Aperture: 1.4\nCamera Name: Andor Zyla\nTime: 12:30:01");
        assert_eq!(map["Numerical Aperture"], Value::Float(1.4));
        assert_eq!(map["Camera Name"], Value::String("Andor Zyla".into()));
        assert_eq!(map["Time"], Value::String("12:30:01".into()));
    }

    #[test_log::test]
    fn test_tab_after_colon_continues() {
        let map = mined("Exposure:\t100 ms\nGain: 2");
        assert_eq!(map["Exposure"], Value::String("100 ms Gain: 2".into()));
        assert_eq!(map["Gain"], Value::Int(2));

        // Nothing to continue onto
        let map = mined("Exposure:\t100 ms");
        assert_eq!(map["Exposure"], Value::String("100 ms".into()));
        let map = mined("Exposure:\t100\n");
        assert_eq!(map["Exposure"], Value::Int(100));
    }

    #[test_log::test]
    fn test_tab_prefixed_continuation() {
        let map = mined("Camera\tExposure: 100: ms\n  Binning 1x1  ");
        assert_eq!(
            map["Camera"],
            Value::String("Exposure: 100: ms Binning 1x1".into())
        );

        let map = mined("Plane #1\tName: Cy5\n Component Count: 1");
        assert_eq!(map["Plane #1"], Value::String("Name: Cy5 Component Count: 1".into()));
        assert_eq!(map["Component Count"], Value::Int(1));

        // The last line has nothing to continue onto and is dropped
        let map = mined("Camera\tExposure: 100 ms\n\n");
        assert!(map.is_empty());

        // A lone leading tab does not separate two fields
        let map = mined("\tExposure: 100 ms\nnext");
        assert!(map.is_empty());
    }

    #[test_log::test]
    fn test_brace_wrapped_keys() {
        let map = mined("{Zoom}: 1.5\n{uiCount}: 3");
        assert_eq!(map["Zoom"], Value::Float(1.5));
        assert_eq!(map["uiCount"], Value::Int(3));
    }

    #[test_log::test]
    fn test_malformed_lines_are_skipped() {
        let text = "no colon here\n:\n{: x\n{}: y\nKey:\nBlank:    \n: orphan value";
        assert!(mine_text(text).is_empty());
    }

    #[test_log::test]
    fn test_last_write_wins() {
        let map = mined("A: 1\nB: x\nA: 2");
        assert_eq!(map["A"], Value::Int(2));
        assert_eq!(map.len(), 2);
    }

    #[test_log::test]
    fn test_mine_text_info() {
        let text_info = TextInfo {
            capturing: "Exposure: 100\nBinning: 2x2".into(),
            description: "Exposure: 250".into(),
            ..Default::default()
        };
        let mut map = MetadataMap::new();
        map.insert("Binning", "1x1");
        let n = mine_text_info(&text_info, &mut map);
        assert_eq!(n, 3);
        assert_eq!(map["Exposure"], Value::Int(250));
        assert_eq!(map["Binning"], Value::String("2x2".into()));
    }
}
