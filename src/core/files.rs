//! Ordered per-subject file lists.
//!
//! Every stage consumes and produces one file per subject, and the file at
//! index i always belongs to the same subject across stages. All derivation
//! helpers here preserve order so that invariant cannot be broken by
//! accident; discovery sorts once and nothing re-sorts afterwards.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileList(Vec<PathBuf>);

impl FileList {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }

    /// Discover files matching a glob pattern, sorted by path.
    pub fn from_glob(pattern: &str) -> Result<Self, PipelineError> {
        let matches = glob::glob(pattern).map_err(|e| PipelineError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = matches.filter_map(|entry| entry.ok()).collect();
        paths.sort();
        Ok(Self(paths))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&PathBuf> {
        self.0.get(index)
    }

    /// Keep only the first `n` entries (tiny-test mode).
    pub fn truncated(mut self, n: usize) -> Self {
        self.0.truncate(n);
        self
    }

    /// Derive the output list for a stage: each file moves to `dir` and gains
    /// a `.tag` suffix before the extension, e.g. `a.isores.nrrd` ->
    /// `<dir>/a.isores.pad.nrrd`. Order is preserved.
    pub fn retargeted(&self, dir: &Path, tag: &str, ext: &str) -> Self {
        self.mapped(dir, |stem| format!("{}.{}.{}", stem, tag, ext))
    }

    /// Derive an output list with an arbitrary per-subject filename, built
    /// from each input file's stem. Order is preserved.
    pub fn mapped(&self, dir: &Path, name: impl Fn(&str) -> String) -> Self {
        Self(
            self.0
                .iter()
                .map(|path| {
                    let stem = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    dir.join(name(&stem))
                })
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<PathBuf>> for FileList {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileList {
        FileList::new(vec![
            PathBuf::from("/data/seg_b.nrrd"),
            PathBuf::from("/data/seg_a.nrrd"),
        ])
    }

    #[test]
    fn test_retargeted_preserves_order_and_length() {
        let out = sample().retargeted(Path::new("/out"), "isores", "nrrd");
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(0).unwrap(), &PathBuf::from("/out/seg_b.isores.nrrd"));
        assert_eq!(out.get(1).unwrap(), &PathBuf::from("/out/seg_a.isores.nrrd"));
    }

    #[test]
    fn test_suffix_chaining() {
        let resampled = sample().retargeted(Path::new("/out"), "isores", "nrrd");
        let padded = resampled.retargeted(Path::new("/out"), "pad", "nrrd");
        assert_eq!(
            padded.get(0).unwrap(),
            &PathBuf::from("/out/seg_b.isores.pad.nrrd")
        );
    }

    #[test]
    fn test_mapped_custom_names() {
        let out = sample().mapped(Path::new("/points"), |stem| {
            format!("{}_local.particles", stem)
        });
        assert_eq!(
            out.get(0).unwrap(),
            &PathBuf::from("/points/seg_b_local.particles")
        );
    }

    #[test]
    fn test_truncated() {
        assert_eq!(sample().truncated(1).len(), 1);
        assert_eq!(sample().truncated(10).len(), 2);
    }

    #[test]
    fn test_from_glob_sorts() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["c.nrrd", "a.nrrd", "b.nrrd"] {
            std::fs::write(temp.path().join(name), b"").unwrap();
        }

        let pattern = format!("{}/*.nrrd", temp.path().display());
        let list = FileList::from_glob(&pattern).unwrap();
        let names: Vec<_> = list
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.nrrd", "b.nrrd", "c.nrrd"]);
    }
}
