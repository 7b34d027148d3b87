mod apply;
mod config;
mod naming;
mod parsed;
mod pattern;
mod planner;
mod source;

pub use apply::{
    apply_plan, apply_plan_with_undo_log, undo_from, undo_last, ApplyOptions, ApplyResult,
    TransferMode, UndoResult,
};
pub use config::{
    app_paths, layout_for, load_config, parse_default_time, save_config, AppConfig, AppPaths,
    LayoutKind,
};
pub use naming::{
    rename, standardize_file_name, NameLayout, RenameOptions, RenameResult, StandardizedName,
    DEFAULT_SEQUENCE,
};
pub use parsed::ParsedFilename;
pub use pattern::{identify_pattern, parse_file_name, PatternKind, RenameError, PATTERN_ORDER};
pub use planner::{
    generate_plan, CollisionPolicy, PlanOptions, RenameCandidate, RenamePlan, RenameStats,
    SkipReason, SkippedFile,
};
pub use source::{
    compute_source_id, extract_device_identifier, find_mtp_mount, AndroidFolder,
    DEFAULT_GVFS_ROOT, DEFAULT_STORAGE_NAME,
};
