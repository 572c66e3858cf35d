//! Indexing pipeline: the parse entry point, multi-unit fan-out, and
//! directory walking.
//!
//! One translation unit is always built by exactly one thread; cross-file
//! parallelism comes from running independent `parse_unit` invocations on a
//! worker pool, each producing its own `IndexedFile`. Joining the results
//! into a global graph is the downstream merger's job.

use crate::builder::IndexBuilder;
use crate::cpp::CppFrontend;
use crate::frontend::Frontend;
use crate::incremental::ChangeDetector;
use crate::indexed_file::IndexedFile;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use symdex_core::{CancelToken, IndexError, SymdexConfig};

/// Parse one translation unit with the default frontend and configuration.
///
/// Failures that prevent any indexing (missing file, frontend
/// initialization error) surface as `Err`, distinguishable from an empty
/// index.
pub fn parse(filename: &Path, compiler_args: &[String]) -> Result<IndexedFile, IndexError> {
    Indexer::new().parse_unit(filename, compiler_args)
}

/// One source file plus the compiler arguments it is compiled with.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl TranslationUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }
}

/// Result of indexing a directory.
#[derive(Debug)]
pub struct IndexResult {
    /// Total number of candidate files scanned (walked).
    pub files_scanned: usize,
    /// Number of files successfully parsed.
    pub files_parsed: usize,
    /// Number of files skipped (unchanged since last index).
    pub files_skipped: usize,
    /// Totals across all parsed files.
    pub total_types: usize,
    pub total_funcs: usize,
    pub total_vars: usize,
    /// The per-file indexes, one per successfully parsed file.
    pub indexes: Vec<IndexedFile>,
}

/// The indexing pipeline: owns a frontend, a change detector, and the
/// configuration.
pub struct Indexer {
    frontend: Box<dyn Frontend>,
    change_detector: ChangeDetector,
    config: SymdexConfig,
}

impl Indexer {
    /// Create an Indexer with the bundled tree-sitter frontend and default
    /// settings.
    pub fn new() -> Self {
        Self::with_config(SymdexConfig::default())
    }

    pub fn with_config(config: SymdexConfig) -> Self {
        Self {
            frontend: Box::new(CppFrontend::with_config(config.frontend.clone())),
            change_detector: ChangeDetector::new(),
            config,
        }
    }

    /// Swap in a different frontend (e.g. a compiler-backed semantic one).
    pub fn with_frontend(frontend: Box<dyn Frontend>, config: SymdexConfig) -> Self {
        Self {
            frontend,
            change_detector: ChangeDetector::new(),
            config,
        }
    }

    pub fn change_detector(&self) -> &ChangeDetector {
        &self.change_detector
    }

    pub fn change_detector_mut(&mut self) -> &mut ChangeDetector {
        &mut self.change_detector
    }

    /// Parse one translation unit into its index.
    pub fn parse_unit(&self, path: &Path, args: &[String]) -> Result<IndexedFile, IndexError> {
        self.parse_unit_cancellable(path, args, CancelToken::new())
    }

    /// Parse one translation unit, checking `cancel` between events. On
    /// cancellation the partial index is discarded and `Cancelled` is
    /// returned.
    pub fn parse_unit_cancellable(
        &self,
        path: &Path,
        args: &[String],
        cancel: CancelToken,
    ) -> Result<IndexedFile, IndexError> {
        let events = self.frontend.parse_unit(path, args)?;
        IndexBuilder::with_cancel(path.to_string_lossy(), cancel).build(events)
    }

    /// Index a batch of translation units on a worker pool, one result per
    /// unit in input order. Units not reached before cancellation report
    /// `Cancelled`.
    pub fn index_units(
        &self,
        units: &[TranslationUnit],
        cancel: &CancelToken,
    ) -> Vec<Result<IndexedFile, IndexError>> {
        if units.is_empty() {
            return Vec::new();
        }

        let workers = match self.config.pipeline.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
        .min(units.len());

        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        for job in units.iter().enumerate() {
            // The receiver outlives every send; this cannot fail.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let mut slots: Vec<Option<Result<IndexedFile, IndexError>>> =
            (0..units.len()).map(|_| None).collect();

        std::thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancel = cancel.clone();
                s.spawn(move || {
                    for (idx, unit) in job_rx.iter() {
                        let result = if cancel.is_cancelled() {
                            Err(IndexError::Cancelled)
                        } else {
                            self.parse_unit_cancellable(&unit.path, &unit.args, cancel.clone())
                        };
                        let _ = result_tx.send((idx, result));
                    }
                });
            }
            drop(result_tx);

            for (idx, result) in result_rx.iter() {
                slots[idx] = Some(result);
            }
        });

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(IndexError::Cancelled)))
            .collect()
    }

    /// Index a directory, returning one `IndexedFile` per changed source
    /// file.
    ///
    /// Walks the directory respecting `.gitignore` rules (via the `ignore`
    /// crate), filters by the frontend's file extensions, checks incremental
    /// state, and parses each changed file with no extra compiler arguments.
    pub fn index_directory(&mut self, root: &Path) -> Result<IndexResult, IndexError> {
        let mut files_scanned = 0usize;
        let mut files_parsed = 0usize;
        let mut files_skipped = 0usize;
        let mut indexes = Vec::new();

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!("Walk error: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let ext = match path.extension().and_then(|e| e.to_str()) {
                Some(e) => e,
                None => continue,
            };
            if !self.frontend.file_extensions().contains(&ext) {
                continue;
            }

            files_scanned += 1;

            let content = match std::fs::read(path) {
                Ok(c) => c,
                Err(err) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), err);
                    continue;
                }
            };

            let path_str = path.to_string_lossy().to_string();
            if !self.change_detector.is_changed(&path_str, &content) {
                files_skipped += 1;
                continue;
            }

            match self.parse_unit(path, &[]) {
                Ok(index) => {
                    files_parsed += 1;
                    self.change_detector.update_hash(&path_str, &content);
                    indexes.push(index);
                }
                Err(err) => {
                    tracing::warn!("Failed to index {}: {}", path_str, err);
                }
            }
        }

        let total_types = indexes.iter().map(|i| i.types.len()).sum();
        let total_funcs = indexes.iter().map(|i| i.funcs.len()).sum();
        let total_vars = indexes.iter().map(|i| i.vars.len()).sum();

        tracing::info!(
            "Indexed {}: {} scanned, {} parsed, {} skipped, {} types, {} funcs, {} vars",
            root.display(),
            files_scanned,
            files_parsed,
            files_skipped,
            total_types,
            total_funcs,
            total_vars,
        );

        Ok(IndexResult {
            files_scanned,
            files_parsed,
            files_skipped,
            total_types,
            total_funcs,
            total_vars,
            indexes,
        })
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}
