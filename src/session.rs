use crate::config::{AppConfig, LearningMode};
use crate::db::Database;
use crate::learning::{LearningStats, LearningStore};
use crate::structure::render::to_markup;
use crate::structure::{segment_into_blocks, BlockType, LabelLanguage, SongBlock};
use crate::text::{compact_chord_spacing, highlight_chords};
use crate::transpose::{semitone_offset, transpose_text};

/// Compact chord-line spacing, then transpose from `original_key` to
/// `target_key`. Pure; safe to run in parallel.
pub fn prepare_chords(lyrics: &str, original_key: &str, target_key: &str) -> String {
    let compacted = compact_chord_spacing(lyrics);
    let offset = semitone_offset(original_key, target_key);
    transpose_text(&compacted, offset, target_key)
}

/// One application session: the learning store plus where it is persisted.
pub struct Session {
    db: Option<Database>,
    store: LearningStore,
    mode: LearningMode,
    labels: LabelLanguage,
}

impl Session {
    /// Start a session backed by `db`, loading whatever was learned before.
    /// A store that fails to load is logged and replaced by an empty one.
    pub fn open(db: Database, config: &AppConfig) -> Self {
        let store = match db.load_learning() {
            Ok(store) => {
                let stats = store.stats();
                log::info!(
                    "Loaded learning store: {} corrections, {} patterns, {} scores",
                    stats.user_corrections,
                    stats.pattern_history,
                    stats.confidence_scores
                );
                store
            }
            Err(e) => {
                log::warn!("Failed to load learning store: {}. Starting empty.", e);
                LearningStore::default()
            }
        };
        Self {
            db: Some(db),
            store,
            mode: config.learning.mode,
            labels: config.labels,
        }
    }

    /// A session that never touches disk.
    pub fn in_memory(mode: LearningMode, labels: LabelLanguage) -> Self {
        Self {
            db: None,
            store: LearningStore::default(),
            mode,
            labels,
        }
    }

    pub fn store(&self) -> &LearningStore {
        &self.store
    }

    pub fn learning_stats(&self) -> LearningStats {
        self.store.stats()
    }

    /// Split `lyrics` into structural blocks and persist what was learned.
    pub fn segment(&mut self, lyrics: &str) -> Vec<SongBlock> {
        let blocks = self.segment_deferred(lyrics);
        self.persist();
        blocks
    }

    /// Segment without writing the store back; callers batch the write with
    /// [`Session::persist`].
    pub(crate) fn segment_deferred(&mut self, lyrics: &str) -> Vec<SongBlock> {
        if self.mode == LearningMode::Session {
            self.store.clear();
        }
        segment_into_blocks(lyrics, &mut self.store, self.labels)
    }

    pub fn segment_markup(&mut self, lyrics: &str) -> String {
        to_markup(&self.segment(lyrics))
    }

    /// Teach the classifier that `legend` introduces a `block_type` block
    /// shown as `label`.
    pub fn record_correction(&mut self, legend: &str, block_type: BlockType, label: &str) {
        log::info!("Correction: '{}' -> {} ({})", legend.trim(), block_type, label);
        self.store.record_correction(legend, block_type, label);
        self.persist();
    }

    /// Forget everything learned, in memory and on disk.
    pub fn reset_learning(&mut self) {
        self.store.clear();
        if let Some(db) = &self.db {
            if let Err(e) = db.clear_learning() {
                log::warn!("Failed to clear persisted learning data: {}", e);
            }
        }
    }

    /// Full pipeline: compact spacing, transpose, segment, highlight.
    pub fn render_song(&mut self, lyrics: &str, original_key: &str, target_key: &str) -> String {
        let prepared = prepare_chords(lyrics, original_key, target_key);
        let markup = self.segment_markup(&prepared);
        highlight_chords(&markup)
    }

    /// Write the store back to the database, if there is one.
    pub fn persist(&self) {
        if let Some(db) = &self.db {
            if let Err(e) = db.save_learning(&self.store) {
                log::warn!("Failed to save learning store: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::CHORD_OPEN;

    const SONG: &str = "Мост\nслова моста\nПрипев\nЛя-ля";

    fn corrected(mode: LearningMode) -> Session {
        let mut session = Session::in_memory(mode, LabelLanguage::English);
        session.record_correction("Мост", BlockType::Bridge, "Bridge");
        session
    }

    #[test]
    fn durable_mode_honours_corrections() {
        let mut session = corrected(LearningMode::Durable);
        let blocks = session.segment(SONG);
        assert_eq!(blocks[0].legend, "Bridge");
        assert_eq!(blocks[0].block_type, Some(BlockType::Bridge));
        assert_eq!(blocks[0].confidence, 1.0);
        // Still there on the next run
        let again = session.segment(SONG);
        assert_eq!(again[0].legend, "Bridge");
    }

    #[test]
    fn session_mode_forgets_corrections() {
        let mut session = corrected(LearningMode::Session);
        let blocks = session.segment(SONG);
        assert_ne!(blocks[0].legend, "Bridge");
        assert!(session.store().correction_for("мост").is_none());
    }

    #[test]
    fn reset_drops_corrections() {
        let mut session = corrected(LearningMode::Durable);
        session.reset_learning();
        assert!(session.store().is_empty());
        let blocks = session.segment(SONG);
        assert_ne!(blocks[0].legend, "Bridge");
    }

    #[test]
    fn learning_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songsheet.db");
        let config = AppConfig::default();

        let mut session = Session::open(Database::open(&path).unwrap(), &config);
        session.record_correction("Мост", BlockType::Bridge, "Bridge");
        drop(session);

        let mut session = Session::open(Database::open(&path).unwrap(), &config);
        assert_eq!(session.learning_stats().user_corrections, 1);
        assert_eq!(session.segment(SONG)[0].legend, "Bridge");

        session.reset_learning();
        drop(session);
        let session = Session::open(Database::open(&path).unwrap(), &config);
        assert!(session.store().is_empty());
    }

    #[test]
    fn render_song_runs_the_whole_pipeline() {
        let mut session = Session::in_memory(LearningMode::Durable, LabelLanguage::English);
        let html = session.render_song("Verse 1\nC    G\nAmazing grace", "C", "D");
        assert!(html.starts_with("<fieldset class=\"song-block high-confidence\" data-type=\"verse\""));
        assert!(html.contains("<span class=\"chord\">D</span>  <span class=\"chord\">A</span>"));
        assert!(html.contains("Amazing grace"));
        assert_eq!(html.matches(CHORD_OPEN).count(), 2);
    }

    #[test]
    fn prepare_chords_compacts_then_transposes() {
        assert_eq!(prepare_chords("C    G\nслова  тут", "C", "D"), "D  A\nслова  тут");
        assert_eq!(prepare_chords("C G", "", "D"), "C G");
    }
}
