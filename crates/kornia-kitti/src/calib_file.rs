use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::error::CalibError;

/// Characters allowed in a value that is parsed as a numeric vector.
const FLOAT_CHARS: &str = "0123456789.e+- ";

/// A single value of a calibration file.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibValue {
    /// A space separated list of floating point numbers.
    Numeric(Vec<f64>),
    /// Any value that could not be parsed as numbers, kept verbatim.
    Text(String),
}

impl CalibValue {
    /// Get the numeric values, if any.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            CalibValue::Numeric(values) => Some(values),
            CalibValue::Text(_) => None,
        }
    }

    /// Get the text value, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CalibValue::Numeric(_) => None,
            CalibValue::Text(text) => Some(text),
        }
    }
}

/// The key/value content of a calibration file.
///
/// Fields are not validated at load time. Accessors fail when a field is
/// missing or has the wrong type at the point it is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibData {
    fields: HashMap<String, CalibValue>,
}

impl CalibData {
    /// Create an empty calibration data set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: CalibValue) -> Option<CalibValue> {
        self.fields.insert(key.into(), value)
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&CalibValue> {
        self.fields.get(key)
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Get the numeric values stored under `key`.
    ///
    /// # Errors
    ///
    /// * [`CalibError::MissingField`] if the key is absent.
    /// * [`CalibError::TypeMismatch`] if the value is text.
    pub fn numeric(&self, key: &str) -> Result<&[f64], CalibError> {
        self.fields
            .get(key)
            .ok_or_else(|| CalibError::MissingField(key.to_string()))?
            .as_numeric()
            .ok_or_else(|| CalibError::TypeMismatch(key.to_string()))
    }

    /// Get the text stored under `key`, if present and not numeric.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(CalibValue::as_text)
    }

    /// Number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if there are no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all fields in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CalibValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, CalibValue)> for CalibData {
    fn from_iter<I: IntoIterator<Item = (String, CalibValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Read a calibration file and return its fields.
///
/// # Arguments
///
/// * `path` - The path to the calibration file.
///
/// # Returns
///
/// The parsed calibration data.
///
/// Example:
///
/// ```no_run
/// use kornia_kitti::calib_file::read_calib_file;
///
/// let data = read_calib_file("calib/um_000000.txt").unwrap();
/// let p0 = data.numeric("P0").unwrap();
/// assert_eq!(p0.len(), 12);
/// ```
pub fn read_calib_file(path: impl AsRef<Path>) -> Result<CalibData, CalibError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let data = read_calib(BufReader::new(file))?;
    log::debug!(
        "Loaded {} calibration fields from {}",
        data.len(),
        path.display()
    );
    Ok(data)
}

/// Parse calibration data from an in-memory string.
pub fn parse_calib_str(content: &str) -> Result<CalibData, CalibError> {
    read_calib(content.as_bytes())
}

/// Parse calibration data from a buffered reader.
///
/// Each non-empty line must be `key: value`. The split happens at the first
/// `:`, so values may contain colons but keys may not. Later duplicates of a
/// key replace earlier ones.
pub fn read_calib<R: BufRead>(reader: R) -> Result<CalibData, CalibError> {
    let mut data = CalibData::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let (key, value) = parse_line(&line).ok_or_else(|| CalibError::Parse {
            line: idx + 1,
            content: line.clone(),
        })?;

        data.insert(key, value);
    }

    Ok(data)
}

/// Split a line into its key and typed value.
fn parse_line(line: &str) -> Option<(&str, CalibValue)> {
    let (key, value) = line.split_once(':')?;
    let value = value.trim();

    if !value.chars().all(|c| FLOAT_CHARS.contains(c)) {
        return Some((key, CalibValue::Text(value.to_string())));
    }

    // NOTE: split on single spaces, a double space yields an empty token
    // which fails to parse and keeps the value as text.
    let parsed = value
        .split(' ')
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>();

    match parsed {
        Ok(values) => Some((key, CalibValue::Numeric(values))),
        Err(_) => {
            log::debug!("Keeping calibration field {} as text: {:?}", key, value);
            Some((key, CalibValue::Text(value.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_numeric() -> Result<(), Box<dyn std::error::Error>> {
        let data = parse_calib_str("P0: 1.0 2.0 3.0\n")?;
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("P0"), Some(&CalibValue::Numeric(vec![1.0, 2.0, 3.0])));
        Ok(())
    }

    #[test]
    fn test_parse_text() -> Result<(), Box<dyn std::error::Error>> {
        let data = parse_calib_str("S: foo bar\n")?;
        assert_eq!(data.get("S"), Some(&CalibValue::Text("foo bar".to_string())));
        assert_eq!(data.text("S"), Some("foo bar"));
        assert!(matches!(data.numeric("S"), Err(CalibError::TypeMismatch(_))));
        Ok(())
    }

    #[test]
    fn test_parse_fallback_to_text() -> Result<(), Box<dyn std::error::Error>> {
        // only float characters, but not valid numbers
        let data = parse_calib_str("A: e\nB: 1.0e+\nC: 1.0  2.0\nD:\n")?;
        assert_eq!(data.text("A"), Some("e"));
        assert_eq!(data.text("B"), Some("1.0e+"));
        assert_eq!(data.text("C"), Some("1.0  2.0"));
        assert_eq!(data.text("D"), Some(""));
        Ok(())
    }

    #[test]
    fn test_parse_exponents_and_signs() -> Result<(), Box<dyn std::error::Error>> {
        let data = parse_calib_str("T: 7.215377e+02 -3.875744e+02 +1.5 .5\n")?;
        assert_eq!(data.numeric("T")?, &[721.5377, -387.5744, 1.5, 0.5]);
        Ok(())
    }

    #[test]
    fn test_parse_skips_empty_lines_and_splits_first_colon() -> Result<(), Box<dyn std::error::Error>>
    {
        let data = parse_calib_str("\ncalib_time: 09-Jan-2012 13:57:47\n\nR: 1 2\n")?;
        assert_eq!(data.len(), 2);
        assert_eq!(data.text("calib_time"), Some("09-Jan-2012 13:57:47"));
        assert_eq!(data.numeric("R")?, &[1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_parse_missing_separator() {
        let res = parse_calib_str("P0: 1 2 3\nbroken line\n");
        match res {
            Err(CalibError::Parse { line, content }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "broken line");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_field() -> Result<(), Box<dyn std::error::Error>> {
        let data = parse_calib_str("P0: 1 2 3\n")?;
        assert!(matches!(data.numeric("P1"), Err(CalibError::MissingField(k)) if k == "P1"));
        Ok(())
    }

    #[test]
    fn test_read_calib_file() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "R0_rect: 1 0 0 0 1 0 0 0 1")?;
        writeln!(file, "frame: drive_0001")?;

        let data = read_calib_file(file.path())?;
        assert_eq!(data.numeric("R0_rect")?.len(), 9);
        assert_eq!(data.text("frame"), Some("drive_0001"));
        Ok(())
    }

    #[test]
    fn test_read_calib_file_not_found() {
        let res = read_calib_file("/this/path/does/not/exist.txt");
        assert!(matches!(res, Err(CalibError::Io(_))));
    }
}
