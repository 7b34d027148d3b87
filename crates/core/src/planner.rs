use crate::naming::{standardize_file_name, NameLayout, RenameOptions, StandardizedName};
use crate::pattern::{PatternKind, RenameError};
use anyhow::{bail, Context, Result};
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Report the collision and leave the file alone.
    #[default]
    Skip,
    /// Append `_001`, `_002`, ... to the standardized stem.
    Suffix,
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub input: PathBuf,
    /// Renamed files land here instead of next to their originals.
    pub output_root: Option<PathBuf>,
    pub recursive: bool,
    pub include_hidden: bool,
    pub extensions: Vec<String>,
    pub rename: RenameOptions,
    pub on_collision: CollisionPolicy,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_root: None,
            recursive: false,
            include_hidden: false,
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "mp4".to_string()],
            rename: RenameOptions::default(),
            on_collision: CollisionPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameCandidate {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub kind: PatternKind,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Unrecognized,
    InvalidTimestamp { value: String },
    Collision { target: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenameStats {
    pub scanned_files: usize,
    pub media_files: usize,
    pub skipped_extension: usize,
    pub skipped_hidden: usize,
    pub unrecognized: usize,
    pub invalid_timestamp: usize,
    pub collisions: usize,
    pub planned: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub input_root: PathBuf,
    pub target_root: PathBuf,
    pub layout: NameLayout,
    pub candidates: Vec<RenameCandidate>,
    pub skipped: Vec<SkippedFile>,
    pub stats: RenameStats,
}

pub fn generate_plan(options: &PlanOptions) -> Result<RenamePlan> {
    if !options.input.is_dir() {
        bail!("input directory does not exist: {}", options.input.display());
    }

    let mut stats = RenameStats::default();
    let files = collect_media_files(
        &options.input,
        options.recursive,
        options.include_hidden,
        &options.extensions,
        &mut stats,
    )?;

    let standardized: Vec<(PathBuf, Result<StandardizedName, RenameError>)> = files
        .into_par_iter()
        .map(|path| {
            let result = standardize_file_name(&file_name_of(&path), &options.rename);
            (path, result)
        })
        .collect();

    let mut candidates = Vec::with_capacity(standardized.len());
    let mut skipped = Vec::new();
    let mut planned_paths = HashSet::<PathBuf>::new();

    for (path, result) in standardized {
        let name = match result {
            Ok(name) => name,
            Err(RenameError::UnrecognizedFormat(_)) => {
                warn!("{} does not match any known format, skipping", path.display());
                stats.unrecognized += 1;
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::Unrecognized,
                });
                continue;
            }
            Err(RenameError::InvalidTimestamp { value, .. }) => {
                warn!("{} has invalid timestamp {value}, skipping", path.display());
                stats.invalid_timestamp += 1;
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::InvalidTimestamp { value },
                });
                continue;
            }
        };

        let base_dir = match &options.output_root {
            Some(root) => root.clone(),
            None => path
                .parent()
                .map(Path::to_path_buf)
                .context("file has no parent directory")?,
        };
        let desired = base_dir.join(name.render(&options.rename.layout));

        let resolved =
            resolve_collision(&path, desired, options.on_collision, &mut planned_paths);
        let target = match resolved {
            Ok(target) => target,
            Err(taken) => {
                warn!(
                    "{} would collide with {}, skipping",
                    path.display(),
                    taken.display()
                );
                stats.collisions += 1;
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::Collision { target: taken },
                });
                continue;
            }
        };

        let changed = target != path;
        if !changed {
            stats.unchanged += 1;
        }
        debug!(
            "{} ({}) -> {}",
            path.display(),
            name.kind.label(),
            target.display()
        );

        stats.planned += 1;
        candidates.push(RenameCandidate {
            original_path: path,
            target_path: target,
            kind: name.kind,
            changed,
        });
    }

    Ok(RenamePlan {
        input_root: options.input.clone(),
        target_root: options
            .output_root
            .clone()
            .unwrap_or_else(|| options.input.clone()),
        layout: options.rename.layout.clone(),
        candidates,
        skipped,
        stats,
    })
}

fn collect_media_files(
    root: &Path,
    recursive: bool,
    include_hidden: bool,
    extensions: &[String],
    stats: &mut RenameStats,
) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();

    if recursive {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("failed to walk directory: {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            classify(entry.path(), include_hidden, extensions, stats, &mut out);
        }
    } else {
        for entry in fs::read_dir(root)
            .with_context(|| format!("failed to read directory: {}", root.display()))?
        {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", root.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            classify(&path, include_hidden, extensions, stats, &mut out);
        }
        out.sort();
    }

    Ok(out)
}

fn classify(
    path: &Path,
    include_hidden: bool,
    extensions: &[String],
    stats: &mut RenameStats,
    out: &mut Vec<PathBuf>,
) {
    stats.scanned_files += 1;
    if is_hidden(path) && !include_hidden {
        stats.skipped_hidden += 1;
        return;
    }
    if has_extension(path, extensions) {
        stats.media_files += 1;
        out.push(path.to_path_buf());
    } else {
        stats.skipped_extension += 1;
    }
}

fn resolve_collision(
    original_path: &Path,
    desired: PathBuf,
    policy: CollisionPolicy,
    planned_paths: &mut HashSet<PathBuf>,
) -> std::result::Result<PathBuf, PathBuf> {
    if is_available(&desired, original_path, planned_paths) {
        planned_paths.insert(desired.clone());
        return Ok(desired);
    }

    if policy == CollisionPolicy::Skip {
        return Err(desired);
    }

    let mut n = 1usize;
    loop {
        let candidate = with_suffix(&desired, n);
        if is_available(&candidate, original_path, planned_paths) {
            planned_paths.insert(candidate.clone());
            return Ok(candidate);
        }
        n += 1;
    }
}

fn with_suffix(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut name = format!("{}_{:03}", stem, n);
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

fn is_available(candidate: &Path, original_path: &Path, planned_paths: &HashSet<PathBuf>) -> bool {
    if planned_paths.contains(candidate) {
        return false;
    }
    if candidate == original_path {
        return true;
    }
    !candidate.exists()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dirs must be creatable");
        }
        File::create(path).expect("file must be creatable");
    }

    fn options_for(input: &Path) -> PlanOptions {
        PlanOptions {
            input: input.to_path_buf(),
            ..PlanOptions::default()
        }
    }

    fn target_names(plan: &RenamePlan) -> Vec<String> {
        plan.candidates
            .iter()
            .map(|c| file_name_of(&c.target_path))
            .collect()
    }

    #[test]
    fn plans_known_names_and_skips_the_rest() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("20240724_182842.jpg"));
        touch(&root.join("IMG-unknown_schema.jpg"));
        touch(&root.join("VID-20240721-WA0000.mp4"));
        touch(&root.join("document.pdf"));
        touch(&root.join(".20240101_000000.jpg"));

        let plan = generate_plan(&options_for(root)).expect("plan");

        assert_eq!(
            target_names(&plan),
            vec!["20240724_182842.jpg", "20240721_000000.mp4"]
        );
        assert!(!plan.candidates[0].changed);
        assert!(plan.candidates[1].changed);
        assert_eq!(plan.candidates[1].kind, PatternKind::WhatsAppVideo);

        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].path, root.join("IMG-unknown_schema.jpg"));
        assert_eq!(plan.skipped[0].reason, SkipReason::Unrecognized);

        assert_eq!(plan.stats.scanned_files, 5);
        assert_eq!(plan.stats.media_files, 3);
        assert_eq!(plan.stats.skipped_extension, 1);
        assert_eq!(plan.stats.skipped_hidden, 1);
        assert_eq!(plan.stats.unrecognized, 1);
        assert_eq!(plan.stats.planned, 2);
        assert_eq!(plan.stats.unchanged, 1);
    }

    #[test]
    fn invalid_timestamps_are_skipped_with_their_value() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("IMG-20241399-WA0001.jpg"));

        let plan = generate_plan(&options_for(temp.path())).expect("plan");
        assert!(plan.candidates.is_empty());
        assert_eq!(
            plan.skipped[0].reason,
            SkipReason::InvalidTimestamp {
                value: "20241399".to_string()
            }
        );
        assert_eq!(plan.stats.invalid_timestamp, 1);
    }

    #[test]
    fn same_day_whatsapp_images_collide_by_default() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("IMG-20240721-WA0001.jpg"));
        touch(&root.join("IMG-20240721-WA0002.jpg"));

        let plan = generate_plan(&options_for(root)).expect("plan");
        assert_eq!(target_names(&plan), vec!["20240721_000000.jpg"]);
        assert_eq!(
            plan.skipped[0].reason,
            SkipReason::Collision {
                target: root.join("20240721_000000.jpg")
            }
        );
        assert_eq!(plan.stats.collisions, 1);
    }

    #[test]
    fn existing_file_on_disk_counts_as_collision() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("IMG-20240724-WA0003.jpg"));
        touch(&root.join("20240724_000000.jpg"));

        let plan = generate_plan(&options_for(root)).expect("plan");
        assert_eq!(target_names(&plan), vec!["20240724_000000.jpg"]);
        assert!(!plan.candidates[0].changed);
        assert_eq!(plan.skipped[0].path, root.join("IMG-20240724-WA0003.jpg"));
        assert_eq!(plan.stats.collisions, 1);
    }

    #[test]
    fn suffix_policy_resolves_collisions() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        touch(&root.join("IMG-20240721-WA0001.jpg"));
        touch(&root.join("IMG-20240721-WA0002.jpg"));
        touch(&root.join("IMG-20240721-WA0003.jpg"));

        let options = PlanOptions {
            on_collision: CollisionPolicy::Suffix,
            ..options_for(root)
        };
        let plan = generate_plan(&options).expect("plan");
        assert_eq!(
            target_names(&plan),
            vec![
                "20240721_000000.jpg",
                "20240721_000000_001.jpg",
                "20240721_000000_002.jpg"
            ]
        );
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn archive_layout_targets_dated_folders_under_output_root() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("phone");
        let output = temp.path().join("archive");
        touch(&input.join("Camera/20240707_121110.jpg"));
        touch(&input.join("WhatsApp/IMG-20240721-WA0007.jpg"));
        touch(&input.join("WhatsApp/IMG-20240721-WA0008.jpg"));

        let options = PlanOptions {
            output_root: Some(output.clone()),
            recursive: true,
            rename: RenameOptions {
                layout: NameLayout::Archive {
                    source_id: "D5555C1A".to_string(),
                },
                ..RenameOptions::default()
            },
            ..options_for(&input)
        };
        let plan = generate_plan(&options).expect("plan");

        let targets: Vec<PathBuf> = plan
            .candidates
            .iter()
            .map(|c| c.target_path.clone())
            .collect();
        assert_eq!(
            targets,
            vec![
                output.join("2024/07/20240707T121110_D5555C1A_0000.jpg"),
                output.join("2024/07/20240721T000000_D5555C1A_0007.jpg"),
                output.join("2024/07/20240721T000000_D5555C1A_0008.jpg"),
            ]
        );
        assert_eq!(plan.target_root, output);
        assert!(plan.candidates.iter().all(|c| c.changed));
    }

    #[test]
    fn custom_extensions_accept_leading_dot() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("VID-20240721-WA0001.3gp"));

        let plan = generate_plan(&options_for(temp.path())).expect("plan");
        assert!(plan.candidates.is_empty());
        assert_eq!(plan.stats.skipped_extension, 1);

        let options = PlanOptions {
            extensions: vec![".3GP".to_string()],
            ..options_for(temp.path())
        };
        let plan = generate_plan(&options).expect("plan");
        assert_eq!(target_names(&plan), vec!["20240721_000000.3gp"]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let err = generate_plan(&options_for(&temp.path().join("missing")))
            .expect_err("missing input");
        assert!(err.to_string().contains("input directory does not exist"));
    }
}
