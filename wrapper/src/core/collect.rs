//! Cardinality check for optimizer outputs.

use std::path::{Path, PathBuf};

use crate::error::TaskError;

/// Return the only candidate, or fail when there are zero or several.
///
/// Leftover files from another execution must never be picked silently, so
/// more than one candidate is as fatal as none.
pub fn select_single(dir: &Path, mut candidates: Vec<PathBuf>) -> Result<PathBuf, TaskError> {
    if candidates.len() == 1
        && let Some(only) = candidates.pop()
    {
        return Ok(only);
    }
    Err(TaskError::ResultAmbiguity {
        dir: dir.to_path_buf(),
        found: candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_candidate_is_selected() {
        let picked =
            select_single(Path::new("output"), vec![PathBuf::from("output/final.json")]).expect("one");
        assert_eq!(picked, PathBuf::from("output/final.json"));
    }

    #[test]
    fn no_candidates_is_ambiguous() {
        let err = select_single(Path::new("output"), Vec::new()).unwrap_err();
        assert!(matches!(err, TaskError::ResultAmbiguity { ref found, .. } if found.is_empty()));
    }

    #[test]
    fn several_candidates_are_ambiguous_and_reported() {
        let err = select_single(
            Path::new("output"),
            vec![PathBuf::from("output/a.json"), PathBuf::from("output/b.json")],
        )
        .unwrap_err();
        match err {
            TaskError::ResultAmbiguity { found, .. } => assert_eq!(found.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
