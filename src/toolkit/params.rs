//! Parameter sets for external toolkit invocations.
//!
//! Each pipeline stage assembles a `ParamSet` mapping option names to scalar
//! values or file lists, serialized as `--name value...` command-line tokens.
//! Option names are the compatibility surface of the external toolkit and
//! must never be renamed. Insertion order is preserved so invocations are
//! reproducible byte-for-byte.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    /// Bare flag with no value (`--name`).
    Flag,
    /// A fixed-length numeric tuple (e.g. cutting-plane coordinates).
    Floats(Vec<f64>),
    /// One or more file paths following the flag.
    Paths(Vec<PathBuf>),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
            ParamValue::Flag => Ok(()),
            ParamValue::Floats(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", joined.join(" "))
            }
            ParamValue::Paths(paths) => {
                let joined: Vec<String> =
                    paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "{}", joined.join(" "))
            }
        }
    }
}

/// An ordered option-name to value mapping for one tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    entries: Vec<(String, ParamValue)>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style scalar insertion.
    pub fn set(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Builder-style bare flag.
    pub fn flag(mut self, key: &str) -> Self {
        self.insert(key, ParamValue::Flag);
        self
    }

    /// Builder-style single path value.
    pub fn path(mut self, key: &str, value: &Path) -> Self {
        self.insert(key, ParamValue::Paths(vec![value.to_path_buf()]));
        self
    }

    /// Builder-style path-list value.
    pub fn paths(mut self, key: &str, values: &[PathBuf]) -> Self {
        self.insert(key, ParamValue::Paths(values.to_vec()));
        self
    }

    /// Builder-style numeric-tuple value.
    pub fn floats(mut self, key: &str, values: &[f64]) -> Self {
        self.insert(key, ParamValue::Floats(values.to_vec()));
        self
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, key: &str, value: ParamValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The scalar subset of this set (everything except path values).
    ///
    /// Grooming stages derive one scalar set per stage and reuse it for the
    /// segmentation pass and the paired raw-image pass, so comparing the
    /// scalar subsets of two calls checks the pairing invariant.
    pub fn scalars(&self) -> ParamSet {
        ParamSet {
            entries: self
                .entries
                .iter()
                .filter(|(_, v)| !matches!(v, ParamValue::Paths(_)))
                .cloned()
                .collect(),
        }
    }

    /// A copy of this set with one key removed.
    pub fn without(&self, key: &str) -> ParamSet {
        ParamSet {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }

    /// Serialize to argv tokens: `--name` followed by the value token(s).
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        for (key, value) in &self.entries {
            args.push(OsString::from(format!("--{}", key)));
            match value {
                ParamValue::Flag => {}
                ParamValue::Floats(values) => {
                    for v in values {
                        args.push(OsString::from(v.to_string()));
                    }
                }
                ParamValue::Paths(paths) => {
                    for path in paths {
                        args.push(path.as_os_str().to_os_string());
                    }
                }
                scalar => args.push(OsString::from(scalar.to_string())),
            }
        }
        args
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.entries {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            match value {
                ParamValue::Flag => write!(f, "--{}", key)?,
                v => write!(f, "--{} {}", key, v)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let params = ParamSet::new()
            .set("number_of_particles", 1024u32)
            .set("relative_weighting", 50.0)
            .set("verbosity", 3u32);

        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["number_of_particles", "relative_weighting", "verbosity"]
        );
    }

    #[test]
    fn test_to_args_serialization() {
        let params = ParamSet::new()
            .set("isoSpacing", 1.0)
            .flag("isBinaryImage")
            .paths(
                "inFilename",
                &[PathBuf::from("a.nrrd"), PathBuf::from("b.nrrd")],
            );

        let args: Vec<String> = params
            .to_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--isoSpacing",
                "1",
                "--isBinaryImage",
                "--inFilename",
                "a.nrrd",
                "b.nrrd"
            ]
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut params = ParamSet::new().set("paddingSize", 10u32).set("paddingValue", 0u32);
        params.insert("paddingSize", ParamValue::Int(5));

        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["paddingSize", "paddingValue"]);
        assert_eq!(params.get("paddingSize"), Some(&ParamValue::Int(5)));
    }

    #[test]
    fn test_scalars_excludes_paths() {
        let params = ParamSet::new()
            .set("isoSpacing", 1.0)
            .paths("inFilename", &[PathBuf::from("a.nrrd")])
            .paths("outFilename", &[PathBuf::from("b.nrrd")]);

        let scalars = params.scalars();
        assert!(scalars.get("isoSpacing").is_some());
        assert!(scalars.get("inFilename").is_none());
        assert!(scalars.get("outFilename").is_none());
    }

    #[test]
    fn test_floats_emit_one_token_each() {
        let params = ParamSet::new().floats("cuttingPlanePoints", &[100.0, -100.0, -38.0]);
        let args: Vec<String> = params
            .to_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["--cuttingPlanePoints", "100", "-100", "-38"]);
    }

    #[test]
    fn test_without_drops_key() {
        let params = ParamSet::new().set("isoSpacing", 1.0).flag("isBinaryImage");
        let trimmed = params.without("isBinaryImage");
        assert!(trimmed.get("isBinaryImage").is_none());
        assert!(trimmed.get("isoSpacing").is_some());
    }
}
