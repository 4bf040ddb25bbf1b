//! The two-trigger stage-then-commit protocol.
//!
//! ```text
//! finalize:  capture ──equal to prior──▶ Captured (consistent, nothing written)
//!                   └─differs/absent──▶ Staged   (temp file written + synced)
//! finish:    Staged ──rename──▶ Committed
//! ```
//!
//! The canonical file is only ever replaced by a rename of a fully written,
//! synced temp file, so a crash anywhere before that rename leaves the previous
//! cache exactly as it was.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::snapshot::{ActiveComponent, ComponentSnapshot, STAGE_PREFIX, STAGE_SUFFIX};

/// Default name of the canonical cache file inside the cache directory.
pub const DEFAULT_CACHE_FILE: &str = "components.bin";

/// Where the cache lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Canonical cache directory.
    pub cache_dir: PathBuf,
    /// Canonical cache file.
    pub cache_file: PathBuf,
    /// Directory in which snapshots are staged.
    pub temp_dir: PathBuf,
}

impl CacheSettings {
    /// Settings with the default file name, staging inside the cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            cache_file: cache_dir.join(DEFAULT_CACHE_FILE),
            temp_dir: cache_dir.clone(),
            cache_dir,
        }
    }

    /// Uses `name` as the cache file name inside the cache directory.
    pub fn with_file_name(mut self, name: &str) -> Self {
        self.cache_file = self.cache_dir.join(name);
        self
    }

    /// Stages snapshots in `dir` instead of the cache directory.
    ///
    /// A directory on another filesystem makes the commit rename fail.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

/// Progress of the current run through the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Snapshot taken; nothing on disk for this run.
    Captured,
    /// Snapshot written to the temp path; canonical file untouched.
    Staged,
    /// Temp file has replaced the canonical file.
    Committed,
}

/// Result of the finish trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The run matched the previous one; no I/O was performed.
    Unchanged,
    /// The staged snapshot replaced the canonical cache file.
    Committed,
    /// The run was inconsistent but staging had failed; nothing was written.
    NothingStaged,
    /// The rename failed; the canonical file was left as it was.
    Failed,
}

/// Per-run cache state shared with the rest of the host.
///
/// Created by [`SessionContext::finalize`] at the first trigger and finished
/// by [`SessionContext::commit`] at the second. Other collaborators only read
/// the paths and the consistency flag.
#[derive(Debug)]
pub struct SessionContext {
    cache_dir: PathBuf,
    cache_file: PathBuf,
    staged: Option<NamedTempFile>,
    stage: Stage,
    consistent: bool,
}

impl SessionContext {
    /// Runs the "component list finalized" step.
    ///
    /// Captures `components`, compares them with the snapshot at the canonical
    /// path, and stages a new snapshot if they differ or no usable snapshot
    /// exists. Never fails: problems are logged and degrade to the safe side.
    pub fn finalize(settings: &CacheSettings, components: &[ActiveComponent]) -> Self {
        info!("querying last run to see if the component list is unchanged");

        if let Err(e) = std::fs::create_dir_all(&settings.cache_dir) {
            error!(
                path = %settings.cache_dir.display(),
                "could not create cache directory: {e}"
            );
        }

        sweep_stale(&settings.temp_dir);

        let current = ComponentSnapshot::capture(components);
        let mut ctx = Self {
            cache_dir: settings.cache_dir.clone(),
            cache_file: settings.cache_file.clone(),
            staged: None,
            stage: Stage::Captured,
            consistent: false,
        };

        match ComponentSnapshot::load(&settings.cache_file) {
            Ok(prior) if prior == current => {
                info!(components = current.len(), "component list is the same as last run");
                ctx.consistent = true;
                return ctx;
            }
            Ok(prior) => {
                debug!(previous = prior.len(), current = current.len(), "component list changed");
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %settings.cache_file.display(), "no prior component cache");
            }
            Err(e) => {
                warn!("prior component cache is unusable, treating it as absent: {e}");
            }
        }

        info!("component list differs from last run, refreshing cache");
        match current.stage_in(&settings.temp_dir) {
            Ok(file) => {
                info!(path = %file.path().display(), "staged temporary component cache");
                ctx.staged = Some(file);
                ctx.stage = Stage::Staged;
            }
            Err(e) => {
                error!("could not create temporary component cache: {e}");
            }
        }
        ctx
    }

    /// Runs the "run finished successfully" step.
    ///
    /// Atomically replaces the canonical file with the staged snapshot. Only
    /// the first call after staging writes anything.
    pub fn commit(&mut self) -> CommitOutcome {
        if self.consistent {
            return CommitOutcome::Unchanged;
        }
        let Some(staged) = self.staged.take() else {
            if self.stage != Stage::Committed {
                warn!("component list changed but nothing was staged; cache not updated");
            }
            return CommitOutcome::NothingStaged;
        };

        match staged.persist(&self.cache_file) {
            Ok(_) => {
                sync_dir(&self.cache_dir);
                self.stage = Stage::Committed;
                info!(
                    path = %self.cache_file.display(),
                    "committed component cache, as nothing failed before startup finished"
                );
                CommitOutcome::Committed
            }
            Err(e) => {
                self.stage = Stage::Captured;
                error!(
                    path = %self.cache_file.display(),
                    "could not persist temporary component cache: {}",
                    e.error
                );
                CommitOutcome::Failed
            }
        }
    }

    /// The canonical cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The canonical cache file. It may not exist yet.
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// The staged snapshot, present only between staging and commit.
    pub fn temp_cache_file(&self) -> Option<&Path> {
        self.staged.as_ref().map(NamedTempFile::path)
    }

    /// Whether this run's component list matches the previous run's.
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    /// Current protocol stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// Removes staged files left behind by runs that were killed before commit.
///
/// Dropping a staged file deletes it, but a process that dies without
/// unwinding never drops it.
fn sweep_stale(dir: &Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %dir.display(), "could not scan for stale temporary caches: {e}");
            return;
        }
    };
    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(STAGE_PREFIX) && name.ends_with(STAGE_SUFFIX)) {
            continue;
        }
        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale temporary cache"),
            Err(e) => debug!(path = %path.display(), "could not remove stale temporary cache: {e}"),
        }
    }
}

/// Flushes directory metadata so the rename survives power loss.
fn sync_dir(dir: &Path) {
    // Not every filesystem supports fsync on directories.
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(pairs: &[(&str, &str)]) -> Vec<ActiveComponent> {
        pairs
            .iter()
            .map(|(id, v)| ActiveComponent::new(*id, *v))
            .collect()
    }

    fn seed(settings: &CacheSettings, pairs: &[(&str, &str)]) -> Vec<u8> {
        std::fs::create_dir_all(&settings.cache_dir).unwrap();
        let bytes = ComponentSnapshot::capture(&components(pairs))
            .to_bytes()
            .unwrap();
        std::fs::write(&settings.cache_file, &bytes).unwrap();
        bytes
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("componentscache"))
            .count()
    }

    #[test]
    fn settings_defaults() {
        let s = CacheSettings::new("/srv/host/caches");
        assert_eq!(s.cache_file, PathBuf::from("/srv/host/caches/components.bin"));
        assert_eq!(s.temp_dir, PathBuf::from("/srv/host/caches"));
        let s = s.with_file_name("mods.bin").with_temp_dir("/tmp");
        assert_eq!(s.cache_file, PathBuf::from("/srv/host/caches/mods.bin"));
        assert_eq!(s.temp_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn identical_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path().join("caches"));
        let before = seed(&settings, &[("core", "1.0"), ("addon", "2.1")]);

        let mut ctx = SessionContext::finalize(&settings, &components(&[("addon", "2.1"), ("core", "1.0")]));
        assert!(ctx.is_consistent());
        assert_eq!(ctx.stage(), Stage::Captured);
        assert!(ctx.temp_cache_file().is_none());
        assert_eq!(staged_files(&settings.cache_dir), 0);

        assert_eq!(ctx.commit(), CommitOutcome::Unchanged);
        assert_eq!(std::fs::read(&settings.cache_file).unwrap(), before);
    }

    #[test]
    fn first_run_stages_then_commits() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path().join("caches"));

        let mut ctx = SessionContext::finalize(&settings, &components(&[("core", "1.0")]));
        assert!(!ctx.is_consistent());
        assert_eq!(ctx.stage(), Stage::Staged);
        assert!(settings.cache_dir.is_dir());
        assert!(!settings.cache_file.exists());
        let temp = ctx.temp_cache_file().unwrap().to_path_buf();
        assert!(temp.exists());

        assert_eq!(ctx.commit(), CommitOutcome::Committed);
        assert_eq!(ctx.stage(), Stage::Committed);
        assert!(!temp.exists());
        assert!(ctx.temp_cache_file().is_none());

        let mut expected = ComponentSnapshot::new();
        expected.insert("core", "1.0");
        assert_eq!(ComponentSnapshot::load(&settings.cache_file).unwrap(), expected);
    }

    #[test]
    fn changed_version_overwrites_prior() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path());
        seed(&settings, &[("core", "1.0")]);

        let mut ctx = SessionContext::finalize(&settings, &components(&[("core", "1.1")]));
        assert!(!ctx.is_consistent());
        assert_eq!(ctx.commit(), CommitOutcome::Committed);

        let loaded = ComponentSnapshot::load(&settings.cache_file).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.version_of("core"), Some("1.1"));
    }

    #[test]
    fn crash_before_finish_leaves_canonical_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path());
        let before = seed(&settings, &[("core", "1.0")]);

        let ctx = SessionContext::finalize(&settings, &components(&[("core", "2.0")]));
        assert_eq!(ctx.stage(), Stage::Staged);
        assert_eq!(std::fs::read(&settings.cache_file).unwrap(), before);
        drop(ctx);

        assert_eq!(std::fs::read(&settings.cache_file).unwrap(), before);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn corrupt_prior_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path());
        std::fs::write(&settings.cache_file, b"not a snapshot").unwrap();

        let mut ctx = SessionContext::finalize(&settings, &components(&[("core", "1.0")]));
        assert!(!ctx.is_consistent());
        assert_eq!(ctx.commit(), CommitOutcome::Committed);
        assert_eq!(
            ComponentSnapshot::load(&settings.cache_file)
                .unwrap()
                .version_of("core"),
            Some("1.0")
        );
    }

    #[test]
    fn stage_failure_means_nothing_to_commit() {
        let dir = tempfile::tempdir().unwrap();
        let settings =
            CacheSettings::new(dir.path()).with_temp_dir(dir.path().join("missing").join("deeper"));

        let mut ctx = SessionContext::finalize(&settings, &components(&[("core", "1.0")]));
        assert!(!ctx.is_consistent());
        assert_eq!(ctx.stage(), Stage::Captured);
        assert!(ctx.temp_cache_file().is_none());
        assert_eq!(ctx.commit(), CommitOutcome::NothingStaged);
        assert!(!settings.cache_file.exists());
    }

    #[test]
    fn commit_failure_keeps_prior_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path());
        let mut ctx = SessionContext::finalize(&settings, &components(&[("core", "1.0")]));
        assert_eq!(ctx.stage(), Stage::Staged);

        // A directory where the file should go makes the rename fail.
        std::fs::create_dir(&settings.cache_file).unwrap();
        assert_eq!(ctx.commit(), CommitOutcome::Failed);
        assert!(settings.cache_file.is_dir());
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn second_commit_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path());
        let mut ctx = SessionContext::finalize(&settings, &components(&[("core", "1.0")]));
        assert_eq!(ctx.commit(), CommitOutcome::Committed);
        let committed = std::fs::read(&settings.cache_file).unwrap();

        assert_eq!(ctx.commit(), CommitOutcome::NothingStaged);
        assert_eq!(std::fs::read(&settings.cache_file).unwrap(), committed);
    }

    #[test]
    fn killed_runs_leave_no_orphans_after_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path());

        for version in ["1.0", "1.1", "1.2"] {
            let ctx = SessionContext::finalize(&settings, &components(&[("core", version)]));
            assert_eq!(ctx.stage(), Stage::Staged);
            // No unwinding, so the staged file is never dropped.
            std::mem::forget(ctx);
        }
        assert_eq!(staged_files(dir.path()), 3);

        let mut ctx = SessionContext::finalize(&settings, &components(&[("core", "2.0")]));
        assert_eq!(staged_files(dir.path()), 1);
        assert_eq!(ctx.commit(), CommitOutcome::Committed);
        assert_eq!(staged_files(dir.path()), 0);

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["components.bin".to_string()]);
    }

    #[test]
    fn sweep_keeps_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path());
        std::fs::write(dir.path().join("componentscache-notes.txt"), b"keep").unwrap();
        std::fs::write(dir.path().join("componentscacheAbC123.tmp"), b"stale").unwrap();

        let _ctx = SessionContext::finalize(&settings, &components(&[("core", "1.0")]));
        assert!(dir.path().join("componentscache-notes.txt").exists());
        assert!(!dir.path().join("componentscacheAbC123.tmp").exists());
    }

    #[test]
    fn exposes_paths() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings::new(dir.path().join("caches"));
        let ctx = SessionContext::finalize(&settings, &[]);
        assert_eq!(ctx.cache_dir(), settings.cache_dir.as_path());
        assert_eq!(ctx.cache_file(), settings.cache_file.as_path());
        assert!(ctx
            .temp_cache_file()
            .unwrap()
            .starts_with(&settings.cache_dir));
    }
}
