use crate::session::{prepare_chords, Session};
use crate::text::highlight_chords;
use crate::SUPPORTED_EXTENSIONS;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("Output path {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Keys and destination for a batch run.
pub struct BatchOptions<'a> {
    pub output_dir: &'a Path,
    pub original_key: &'a str,
    pub target_key: &'a str,
    pub jobs: usize,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub rendered: u64,
    pub failed: u64,
}

/// Collect song files under `paths`, sorted for a stable processing order.
pub fn find_song_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files
}

struct Prepared {
    source: PathBuf,
    lyrics: String,
}

fn read_and_prepare(path: &Path, opts: &BatchOptions<'_>) -> Result<Prepared, BatchError> {
    let raw = std::fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Prepared {
        source: path.to_path_buf(),
        lyrics: prepare_chords(&raw, opts.original_key, opts.target_key),
    })
}

fn output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "song".to_string());
    output_dir.join(format!("{stem}.html"))
}

/// Render every song file under `paths` to `<stem>.html` in the output
/// directory.
///
/// Files are read, compacted and transposed in parallel chunks; each chunk is
/// then segmented through `session` in order, and the learning store is saved
/// once at the end.
pub fn render_dir(
    session: &mut Session,
    paths: &[PathBuf],
    opts: &BatchOptions<'_>,
) -> Result<BatchResult, BatchError> {
    if opts.output_dir.exists() && !opts.output_dir.is_dir() {
        return Err(BatchError::NotADirectory(opts.output_dir.to_path_buf()));
    }
    std::fs::create_dir_all(opts.output_dir).map_err(|source| BatchError::Io {
        path: opts.output_dir.to_path_buf(),
        source,
    })?;

    let files = find_song_files(paths);
    let mut result = BatchResult::default();
    if files.is_empty() {
        log::info!("No song files found");
        return Ok(result);
    }

    let jobs = opts.jobs.max(1);
    log::info!("Rendering {} songs with {} workers", files.len(), jobs);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    for chunk in files.chunks(jobs * 4) {
        let prepared: Vec<_> = pool.install(|| {
            use rayon::prelude::*;
            chunk
                .par_iter()
                .map(|path| read_and_prepare(path, opts))
                .collect()
        });

        for item in prepared {
            match item.and_then(|p| write_song(session, &p, opts.output_dir)) {
                Ok(()) => result.rendered += 1,
                Err(e) => {
                    log::warn!("Render failed: {}", e);
                    result.failed += 1;
                }
            }
            pb.inc(1);
        }

        pb.set_message(format!("{} rendered, {} failed", result.rendered, result.failed));
    }

    session.persist();
    pb.finish_with_message(format!(
        "Done: {} rendered, {} failed",
        result.rendered, result.failed
    ));

    Ok(result)
}

fn write_song(session: &mut Session, song: &Prepared, output_dir: &Path) -> Result<(), BatchError> {
    let blocks = session.segment_deferred(&song.lyrics);
    let html = highlight_chords(&crate::structure::render::to_markup(&blocks));
    let dest = output_path(&song.source, output_dir);
    log::debug!("{} -> {}", song.source.display(), dest.display());
    std::fs::write(&dest, html).map_err(|source| BatchError::Io { path: dest, source })
}
