//! Destination planning
//!
//! Computes where a file belongs (`{Photos|Videos}/yyyy-MM/yyyy-MM-dd_<name>`)
//! and resolves what is already there:
//! - nothing: move the file
//! - a byte-identical file: skip it as a duplicate
//! - a different file: pick the first free `_1`, `_2`, ... name
//!
//! The filesystem is the source of truth for occupancy. [`DestinationClaims`]
//! adds an in-process arbiter on top of it: while a worker holds a folder's
//! claims, no other worker can plan into that folder, and names chosen
//! earlier in the run count as occupied even before (or, in dry-run mode,
//! instead of) the file landing on disk.
//!
//! Live runs never record claims: under the folder lock the moved file
//! itself marks the name as taken. Dry runs keep one claim (name plus
//! source path) per planned file until the run ends, so their memory grows
//! with the number of files organized.

use crate::classify::MediaClass;
use crate::config::{PHOTOS_DIR, RunOptions, VIDEOS_DIR};
use crate::error::{Error, Result};
use crate::hash;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Upper bound for numeric collision suffixes
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// What should happen to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    /// The target name is free
    Move,
    /// An identical file already occupies the target name
    SkipDuplicate,
    /// The target name was taken by different content; a suffixed name is used
    RenameCollision,
}

/// Where a file goes and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPlan {
    pub target_folder: PathBuf,
    pub target_file_name: String,
    pub outcome: PlanOutcome,
}

impl DestinationPlan {
    pub fn target_path(&self) -> PathBuf {
        self.target_folder.join(&self.target_file_name)
    }
}

/// Names claimed in one destination folder during a run
///
/// Maps each claimed file name to the source file that claimed it.
#[derive(Debug, Default)]
pub struct FolderClaims {
    names: HashMap<String, PathBuf>,
}

impl FolderClaims {
    /// Record `name` as taken by `source`
    pub fn claim(&mut self, name: String, source: PathBuf) {
        self.names.insert(name, source);
    }

    /// File currently occupying `folder/name`: the file on disk if there is
    /// one, otherwise the source that claimed the name
    fn occupant(&self, folder: &Path, name: &str) -> Option<PathBuf> {
        let on_disk = folder.join(name);
        if on_disk.exists() {
            return Some(on_disk);
        }
        self.names.get(name).cloned()
    }
}

/// Per-folder claim registry shared by all workers of a run
#[derive(Debug, Default)]
pub struct DestinationClaims {
    folders: Mutex<HashMap<PathBuf, Arc<Mutex<FolderClaims>>>>,
}

impl DestinationClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims of one destination folder, created on first use
    pub fn folder(&self, folder: &Path) -> Arc<Mutex<FolderClaims>> {
        let mut folders = lock(&self.folders);
        folders.entry(folder.to_path_buf()).or_default().clone()
    }
}

/// Lock a mutex, recovering the data if a worker panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Computes destination plans under the run's `Photos/` and `Videos/` roots
#[derive(Debug, Clone)]
pub struct PathPlanner {
    source_root: PathBuf,
    photos_root: PathBuf,
    videos_root: PathBuf,
}

impl PathPlanner {
    pub fn new(options: &RunOptions) -> Self {
        Self {
            source_root: options.source_root.clone(),
            photos_root: options.photos_root(),
            videos_root: options.videos_root(),
        }
    }

    pub fn photos_root(&self) -> &Path {
        &self.photos_root
    }

    pub fn videos_root(&self) -> &Path {
        &self.videos_root
    }

    /// Whether `path` already lives under one of the destination roots
    ///
    /// Root names match case-insensitively, so `photos/` counts on file
    /// systems that would resolve it to `Photos/`.
    pub fn is_under_destination(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.source_root) else {
            return false;
        };
        relative
            .components()
            .next()
            .and_then(|first| first.as_os_str().to_str())
            .is_some_and(|first| {
                first.eq_ignore_ascii_case(PHOTOS_DIR) || first.eq_ignore_ascii_case(VIDEOS_DIR)
            })
    }

    /// `{Photos|Videos}/yyyy-MM` for a date and media class
    pub fn target_folder(&self, date: &NaiveDateTime, class: MediaClass) -> Option<PathBuf> {
        let root = match class {
            MediaClass::Image => &self.photos_root,
            MediaClass::Video => &self.videos_root,
            MediaClass::NotMedia => return None,
        };
        Some(root.join(date.format("%Y-%m").to_string()))
    }

    /// Plan against the filesystem alone
    pub fn plan(
        &self,
        source: &Path,
        date: &NaiveDateTime,
        class: MediaClass,
    ) -> Result<DestinationPlan> {
        self.plan_with_claims(source, date, class, &FolderClaims::default())
    }

    /// Plan against the filesystem plus the names already claimed in the
    /// target folder
    ///
    /// Occupancy is checked before identity, and identity before renaming.
    /// A suffixed candidate holding identical content is also a duplicate.
    pub fn plan_with_claims(
        &self,
        source: &Path,
        date: &NaiveDateTime,
        class: MediaClass,
        claims: &FolderClaims,
    ) -> Result<DestinationPlan> {
        let target_folder = self
            .target_folder(date, class)
            .ok_or_else(|| Error::InvalidFileName(source.to_path_buf()))?;
        let original_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidFileName(source.to_path_buf()))?;

        let new_name = prefixed_name(original_name, date);

        let Some(occupant) = claims.occupant(&target_folder, &new_name) else {
            trace!(?source, name = %new_name, "Target name is free");
            return Ok(DestinationPlan {
                target_folder,
                target_file_name: new_name,
                outcome: PlanOutcome::Move,
            });
        };

        if hash::identical(source, &occupant)? {
            debug!(?source, ?occupant, "Identical file already at target");
            return Ok(DestinationPlan {
                target_folder,
                target_file_name: new_name,
                outcome: PlanOutcome::SkipDuplicate,
            });
        }

        for counter in 1..=MAX_COLLISION_SUFFIX {
            let candidate = suffixed_name(&new_name, counter);
            match claims.occupant(&target_folder, &candidate) {
                None => {
                    debug!(?source, name = %candidate, "Name collision resolved");
                    return Ok(DestinationPlan {
                        target_folder,
                        target_file_name: candidate,
                        outcome: PlanOutcome::RenameCollision,
                    });
                }
                Some(occupant) if hash::identical(source, &occupant)? => {
                    debug!(?source, ?occupant, "Identical file already at suffixed name");
                    return Ok(DestinationPlan {
                        target_folder,
                        target_file_name: candidate,
                        outcome: PlanOutcome::SkipDuplicate,
                    });
                }
                Some(_) => {}
            }
        }

        Err(Error::CollisionExhausted {
            path: target_folder.join(new_name),
            attempts: MAX_COLLISION_SUFFIX,
        })
    }
}

/// `yyyy-MM-dd_<name>`, unless the name already carries that exact prefix
pub fn prefixed_name(original_name: &str, date: &NaiveDateTime) -> String {
    let prefix = date.format("%Y-%m-%d_").to_string();
    if original_name.starts_with(&prefix) {
        original_name.to_string()
    } else {
        format!("{}{}", prefix, original_name)
    }
}

/// `<stem>_<counter><.ext>`
fn suffixed_name(name: &str, counter: u32) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("{}_{}{}", stem, counter, extension)
}
