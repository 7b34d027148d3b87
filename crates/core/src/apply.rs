use crate::config::app_paths;
use crate::planner::{RenameCandidate, RenamePlan};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const TEMP_PREFIX: &str = ".media_renamer_tmp_";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UndoLog {
    operations: Vec<RenameOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RenameOperation {
    from: PathBuf,
    to: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    #[default]
    Move,
    /// Originals stay in place; nothing is written to the undo log.
    Copy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ApplyOptions {
    pub mode: TransferMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub mode: TransferMode,
    pub applied: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResult {
    pub restored: usize,
}

pub fn apply_plan(plan: &RenamePlan, options: &ApplyOptions) -> Result<ApplyResult> {
    let paths = app_paths()?;
    apply_plan_with_undo_log(plan, options, &paths.undo_path)
}

pub fn apply_plan_with_undo_log(
    plan: &RenamePlan,
    options: &ApplyOptions,
    undo_path: &Path,
) -> Result<ApplyResult> {
    let candidates: Vec<&RenameCandidate> = plan.candidates.iter().filter(|c| c.changed).collect();
    if candidates.is_empty() {
        return Ok(ApplyResult {
            mode: options.mode,
            applied: 0,
            unchanged: plan.candidates.len(),
        });
    }

    validate_apply_candidates(plan, &candidates)?;
    create_target_dirs(&candidates)?;

    let applied = match options.mode {
        TransferMode::Move => {
            let operations = move_candidates(&candidates)?;
            persist_undo(&operations, undo_path)?;
            operations.len()
        }
        TransferMode::Copy => copy_candidates(&candidates)?,
    };

    info!(
        "applied {} file(s) in {:?} mode under {}",
        applied,
        options.mode,
        plan.target_root.display()
    );

    Ok(ApplyResult {
        mode: options.mode,
        applied,
        unchanged: plan.candidates.len().saturating_sub(applied),
    })
}

fn validate_apply_candidates(plan: &RenamePlan, candidates: &[&RenameCandidate]) -> Result<()> {
    let input_root = fs::canonicalize(&plan.input_root).with_context(|| {
        format!(
            "failed to resolve input root: {}",
            plan.input_root.display()
        )
    })?;
    let mut seen_original_paths = HashSet::<PathBuf>::new();
    let mut seen_target_paths = HashSet::<PathBuf>::new();

    for candidate in candidates {
        let original_canonical = fs::canonicalize(&candidate.original_path).with_context(|| {
            format!(
                "failed to resolve original file: {}",
                candidate.original_path.display()
            )
        })?;
        if !original_canonical.starts_with(&input_root) {
            bail!(
                "original file is outside the input directory: {}",
                candidate.original_path.display()
            );
        }
        if !seen_original_paths.insert(original_canonical) {
            bail!(
                "duplicate original file in plan: {}",
                candidate.original_path.display()
            );
        }

        if !is_contained(&candidate.target_path, &plan.target_root) {
            bail!(
                "target is outside the target directory: {}",
                candidate.target_path.display()
            );
        }
        if !seen_target_paths.insert(candidate.target_path.clone()) {
            bail!(
                "duplicate target in plan: {}",
                candidate.target_path.display()
            );
        }
        if candidate.target_path.exists() {
            bail!(
                "target already exists: {}",
                candidate.target_path.display()
            );
        }
    }

    Ok(())
}

fn is_contained(target: &Path, root: &Path) -> bool {
    match target.strip_prefix(root) {
        Ok(relative) => {
            !relative.as_os_str().is_empty()
                && relative
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)))
        }
        Err(_) => false,
    }
}

fn create_target_dirs(candidates: &[&RenameCandidate]) -> Result<()> {
    for candidate in candidates {
        if let Some(parent) = candidate.target_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create target directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn move_candidates(candidates: &[&RenameCandidate]) -> Result<Vec<RenameOperation>> {
    let mut operations = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Err(err) = move_file(&candidate.original_path, &candidate.target_path) {
            let move_err = anyhow::Error::from(err).context(format!(
                "failed to move: {} -> {}",
                candidate.original_path.display(),
                candidate.target_path.display()
            ));
            if let Err(rollback_err) = rollback_moves(&operations) {
                return Err(move_err.context(format!(
                    "rollback after failed move also failed: {rollback_err}"
                )));
            }
            return Err(move_err);
        }

        operations.push(RenameOperation {
            from: candidate.original_path.clone(),
            to: candidate.target_path.clone(),
        });
    }

    Ok(operations)
}

fn rollback_moves(operations: &[RenameOperation]) -> Result<()> {
    for op in operations.iter().rev() {
        move_file(&op.to, &op.from).with_context(|| {
            format!(
                "rollback failed: {} -> {}",
                op.to.display(),
                op.from.display()
            )
        })?;
    }
    Ok(())
}

fn copy_candidates(candidates: &[&RenameCandidate]) -> Result<usize> {
    candidates
        .par_iter()
        .try_for_each(|candidate| -> Result<()> {
            copy_into_place(&candidate.original_path, &candidate.target_path).with_context(
                || {
                    format!(
                        "failed to copy: {} -> {}",
                        candidate.original_path.display(),
                        candidate.target_path.display()
                    )
                },
            )
        })?;
    Ok(candidates.len())
}

/// Renames `from` to `to`. Phone mounts and archive disks are usually different
/// filesystems, where the rename fails with `CrossesDevices`; the file is then
/// copied into place and the source removed.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            debug!("{} is on another filesystem, copying", to.display());
            copy_into_place(from, to)?;
            fs::remove_file(from)
        }
        result => result,
    }
}

/// Copies through a hidden file next to `to`, synced before the final rename,
/// so `to` never holds a partial copy.
fn copy_into_place(from: &Path, to: &Path) -> io::Result<()> {
    let temp = temp_path_for(to);
    let result = fs::copy(from, &temp)
        .and_then(|_| File::open(&temp)?.sync_all())
        .and_then(|_| fs::rename(&temp, to));
    if result.is_err() && temp.exists() {
        if let Err(err) = fs::remove_file(&temp) {
            warn!("failed to remove partial copy {}: {err}", temp.display());
        }
    }
    result
}

pub fn undo_last() -> Result<UndoResult> {
    let paths = app_paths()?;
    undo_from(&paths.undo_path)
}

pub fn undo_from(undo_path: &Path) -> Result<UndoResult> {
    if !undo_path.exists() {
        bail!("nothing to undo");
    }

    let raw = fs::read_to_string(undo_path)
        .with_context(|| format!("failed to read undo log: {}", undo_path.display()))?;
    let log = serde_json::from_str::<UndoLog>(&raw).context("undo log is corrupted")?;

    let restored = restore_operations(&log)?;

    fs::remove_file(undo_path)
        .with_context(|| format!("failed to remove undo log: {}", undo_path.display()))?;

    info!("restored {restored} file(s)");
    Ok(UndoResult { restored })
}

fn restore_operations(log: &UndoLog) -> Result<usize> {
    let mut restored = 0usize;
    for op in log.operations.iter().rev() {
        if !op.to.exists() {
            continue;
        }
        move_file(&op.to, &op.from).with_context(|| {
            format!(
                "failed to undo: {} -> {}",
                op.to.display(),
                op.from.display()
            )
        })?;
        restored += 1;
    }
    Ok(restored)
}

fn persist_undo(operations: &[RenameOperation], undo_path: &Path) -> Result<()> {
    if let Some(dir) = undo_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }

    let log = UndoLog {
        operations: operations.to_vec(),
    };
    let body = serde_json::to_string_pretty(&log).context("failed to serialize undo log")?;
    fs::write(undo_path, body)
        .with_context(|| format!("failed to write undo log: {}", undo_path.display()))?;
    Ok(())
}

fn temp_path_for(target_path: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let parent = target_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = target_path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    parent.join(format!("{TEMP_PREFIX}{now}_{file_name}"))
}
