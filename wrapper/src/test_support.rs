//! Test-only helpers: scripted invokers, task directory fixtures, fake optimizer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::task::{TaskIndex, TaskPaths};
use crate::error::TaskError;
use crate::io::invoker::{InvocationOutcome, InvokeRequest, Invoker};
use crate::pipeline::TaskSettings;

/// Index variable used by fixtures, distinct from any real platform variable.
pub const TEST_INDEX_VAR: &str = "WRAPPER_TEST_TASK_INDEX";

/// Build an environment lookup from fixed pairs.
pub fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

/// Invoker that writes predetermined files into `<workdir>/output` and
/// reports a predetermined outcome, without spawning anything.
pub struct ScriptedInvoker {
    outputs: Vec<(String, String)>,
    outcome: InvocationOutcome,
    requests: RefCell<Vec<InvokeRequest>>,
}

impl ScriptedInvoker {
    pub fn new(outputs: &[(&str, &str)], outcome: InvocationOutcome) -> Self {
        Self {
            outputs: outputs
                .iter()
                .map(|(name, contents)| (name.to_string(), contents.to_string()))
                .collect(),
            outcome,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn succeeding(outputs: &[(&str, &str)]) -> Self {
        Self::new(outputs, InvocationOutcome::Succeeded)
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<InvokeRequest> {
        self.requests.borrow().last().cloned()
    }
}

impl Invoker for ScriptedInvoker {
    fn invoke(&self, request: &InvokeRequest) -> Result<InvocationOutcome, TaskError> {
        self.requests.borrow_mut().push(request.clone());
        let output_dir = request.workdir.join("output");
        for (name, contents) in &self.outputs {
            fs::create_dir_all(&output_dir).map_err(|source| TaskError::Wait { source })?;
            fs::write(output_dir.join(name), contents)
                .map_err(|source| TaskError::Wait { source })?;
        }
        Ok(self.outcome)
    }
}

/// Temporary share root plus optimizer workdir with the task's input in place.
pub struct TaskDir {
    temp: TempDir,
    index: TaskIndex,
}

impl TaskDir {
    pub fn new(index: &str) -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let task = Self {
            temp,
            index: TaskIndex::new(index),
        };
        let input = task.input_path();
        let inputs = input.parent().context("input parent")?;
        fs::create_dir_all(inputs).context("create inputs dir")?;
        fs::create_dir_all(task.workdir()).context("create workdir")?;
        fs::write(&input, "{\"name\":\"fixture\"}\n").context("write input")?;
        Ok(task)
    }

    pub fn index(&self) -> &TaskIndex {
        &self.index
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn share_root(&self) -> PathBuf {
        self.temp.path().join("share")
    }

    pub fn workdir(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    pub fn paths(&self) -> TaskPaths {
        TaskPaths::resolve(&self.share_root(), &self.index)
    }

    pub fn input_path(&self) -> PathBuf {
        self.paths().input
    }

    pub fn result_path(&self) -> PathBuf {
        self.paths().result
    }

    pub fn settings(&self) -> TaskSettings {
        TaskSettings {
            share_root: self.share_root(),
            workdir: self.workdir(),
            output_dir: PathBuf::from("output"),
            binary: PathBuf::from("sparrow"),
            index_var: TEST_INDEX_VAR.to_string(),
            timeout: None,
        }
    }

    /// Lookup with this task's index set plus `extra` pairs.
    pub fn env(&self, extra: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let mut pairs = vec![(TEST_INDEX_VAR, self.index.as_str())];
        pairs.extend_from_slice(extra);
        env(&pairs)
    }

    /// Write a shell script standing in for the optimizer into this directory.
    ///
    /// It records its arguments to `<workdir>/args.txt`, one per line, then
    /// behaves according to `FAKE_MODE`: `fail` exits 1, `none` writes nothing,
    /// `two` writes two JSON files, `sleep` sleeps, anything else writes
    /// `output/final.json` with the contents of `FAKE_PAYLOAD`.
    #[cfg(unix)]
    pub fn fake_optimizer(&self) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.temp.path().join("fake-optimizer.sh");
        fs::write(&path, FAKE_OPTIMIZER).context("write fake optimizer")?;
        let mut perms = fs::metadata(&path).context("stat fake optimizer")?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).context("chmod fake optimizer")?;
        Ok(path)
    }
}

#[cfg(unix)]
const FAKE_OPTIMIZER: &str = r#"#!/bin/sh
printf '%s\n' "$@" > args.txt
mkdir -p output
case "$FAKE_MODE" in
  fail) exit 1 ;;
  none) exit 0 ;;
  two) echo '{}' > output/a.json; echo '{}' > output/b.json ;;
  sleep) exec sleep 30 ;;
  *) printf '%s' "$FAKE_PAYLOAD" > output/final.json ;;
esac
"#;
