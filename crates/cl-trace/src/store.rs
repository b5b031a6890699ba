//! Run storage API.

use crate::types::{RunManifest, Trace};
use crate::{TraceError, TraceResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> TraceResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to a model file, under `.causalens/runs`.
    pub fn for_model_file(model_path: &Path) -> TraceResult<Self> {
        let model_dir = model_path
            .parent()
            .ok_or_else(|| TraceError::InvalidPath {
                message: "model path has no parent directory".to_string(),
            })?;
        Self::new(model_dir.join(".causalens").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, trace: &Trace) -> TraceResult<()> {
        trace.validate()?;
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        save_trace_file(&run_dir.join("trace.json"), trace)
    }

    pub fn load_manifest(&self, run_id: &str) -> TraceResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(TraceError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_trace(&self, run_id: &str) -> TraceResult<Trace> {
        let trace_path = self.run_dir(run_id).join("trace.json");

        if !trace_path.exists() {
            return Err(TraceError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        load_trace_file(&trace_path)
    }

    /// Runs of one model, oldest first.
    pub fn list_runs(&self, model_digest: &str) -> TraceResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.model_digest == model_digest
                {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> TraceResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}

/// Write a trace as pretty JSON.
pub fn save_trace_file(path: &Path, trace: &Trace) -> TraceResult<()> {
    let json = serde_json::to_string_pretty(trace)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read and validate a JSON trace.
pub fn load_trace_file(path: &Path) -> TraceResult<Trace> {
    let content = fs::read_to_string(path)?;
    let trace: Trace = serde_json::from_str(&content)?;
    trace.validate()?;
    Ok(trace)
}
