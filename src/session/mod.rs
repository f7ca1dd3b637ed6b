//! Import session state machine
//!
//! ```text
//! Idle -> Parsing -> Staged -> Importing -> Idle
//!            |                     |
//!            v                     v
//!          Idle                  Error (fail-fast only, staged playlist kept)
//! ```
//!
//! [`ImportSession`] holds the transitions as plain synchronous methods so each
//! one can be tested in isolation. [`SessionService`] wraps a shared session
//! and performs the I/O between `begin_*` and `finish_*`, so the lock is never
//! held across a fetch or a submission. A load or import whose future is
//! dropped before `finish_*` (client disconnect, timeout) is rolled back by
//! [`ImportSession::interrupt`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{AppResult, SessionError, SessionResult};
use crate::importer::Importer;
use crate::ingestor::{PlaylistIngestor, PlaylistSource};
use crate::models::{FilterCriteria, ImportReport, ParseSummary, PendingChannel};

pub mod staged;

pub use staged::{distinct_groups, filter_indices, StagedEntry, StagedPlaylist};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Parsing,
    Staged,
    Importing,
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Parsing => "parsing",
            SessionState::Staged => "staged",
            SessionState::Importing => "importing",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    Parsing { source: String },
    Staged(StagedPlaylist),
    Importing(StagedPlaylist),
    Error { staged: StagedPlaylist },
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: SessionState,
    pub source: Option<String>,
    pub summary: Option<ParseSummary>,
    pub selected: usize,
    pub filter: Option<FilterCriteria>,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Last user-facing failure message, cleared by the next successful transition
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct ImportSession {
    id: Uuid,
    phase: Phase,
    message: Option<String>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Phase::Idle,
            message: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Parsing { .. } => SessionState::Parsing,
            Phase::Staged(_) => SessionState::Staged,
            Phase::Importing(_) => SessionState::Importing,
            Phase::Error { .. } => SessionState::Error,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn ensure_not_busy(&self) -> SessionResult<()> {
        match self.state() {
            state @ (SessionState::Parsing | SessionState::Importing) => {
                Err(SessionError::busy(state))
            }
            _ => Ok(()),
        }
    }

    /// Enter `Parsing`. Any previously staged playlist is discarded.
    pub fn begin_load(&mut self, source: &str) -> SessionResult<()> {
        self.ensure_not_busy()?;
        self.phase = Phase::Parsing {
            source: source.to_string(),
        };
        self.message = None;
        Ok(())
    }

    /// Leave `Parsing`: stage the parsed records, or return to `Idle` with the
    /// read failure as the session message.
    pub fn finish_load(
        &mut self,
        result: AppResult<Vec<PendingChannel>>,
    ) -> AppResult<ParseSummary> {
        let source = match &self.phase {
            Phase::Parsing { source } => source.clone(),
            _ => return Err(SessionError::busy(self.state()).into()),
        };

        match result {
            Ok(channels) => {
                let staged = StagedPlaylist::new(source, channels);
                let summary = staged.summary();
                self.phase = Phase::Staged(staged);
                Ok(summary)
            }
            Err(e) => {
                self.phase = Phase::Idle;
                self.message = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn staged(&self) -> SessionResult<&StagedPlaylist> {
        match &self.phase {
            Phase::Staged(staged) | Phase::Error { staged } => Ok(staged),
            Phase::Parsing { .. } | Phase::Importing(_) => Err(SessionError::busy(self.state())),
            Phase::Idle => Err(SessionError::NotStaged),
        }
    }

    /// Mutable access to the staged playlist. Editing a playlist left in
    /// `Error` moves the session back to `Staged`.
    fn staged_mut(&mut self) -> SessionResult<&mut StagedPlaylist> {
        if let Phase::Error { .. } = self.phase {
            if let Phase::Error { staged } = std::mem::replace(&mut self.phase, Phase::Idle) {
                self.phase = Phase::Staged(staged);
            }
        }
        let state = self.state();
        match &mut self.phase {
            Phase::Staged(staged) => Ok(staged),
            Phase::Idle => Err(SessionError::NotStaged),
            _ => Err(SessionError::busy(state)),
        }
    }

    pub fn set_filter(&mut self, filter: FilterCriteria) -> SessionResult<()> {
        self.staged_mut()?.set_filter(filter);
        Ok(())
    }

    pub fn toggle(&mut self, index: usize) -> SessionResult<bool> {
        self.staged_mut()?.toggle(index)
    }

    pub fn select_all(&mut self) -> SessionResult<usize> {
        Ok(self.staged_mut()?.select_all_visible())
    }

    pub fn deselect_all(&mut self) -> SessionResult<usize> {
        Ok(self.staged_mut()?.deselect_all_visible())
    }

    /// Replace the whole selection with the records matching `filter` and
    /// leave `filter` as the current view. Returns the number selected.
    pub fn select_only(&mut self, filter: FilterCriteria) -> SessionResult<usize> {
        let staged = self.staged_mut()?;
        staged.set_filter(FilterCriteria::default());
        staged.deselect_all_visible();
        staged.set_filter(filter);
        Ok(staged.select_all_visible())
    }

    /// Enter `Importing` and hand out the selected records in staged order
    pub fn begin_import(&mut self) -> SessionResult<Vec<(usize, PendingChannel)>> {
        let batch = self.staged_mut()?.selected_channels();
        if batch.is_empty() {
            return Err(SessionError::NothingSelected);
        }

        if let Phase::Staged(staged) = std::mem::replace(&mut self.phase, Phase::Idle) {
            self.phase = Phase::Importing(staged);
        }
        self.message = None;
        Ok(batch)
    }

    /// Leave `Importing`. A completed pass clears the session even when
    /// individual submissions failed; an aborted fail-fast pass keeps the
    /// playlist with the already-submitted records deselected.
    pub fn finish_import(&mut self, report: &ImportReport) -> SessionResult<()> {
        let Phase::Importing(_) = self.phase else {
            return Err(SessionError::busy(self.state()));
        };
        let Phase::Importing(mut staged) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return Ok(());
        };

        if report.aborted {
            staged.deselect(&report.submitted);
            let message = report
                .failures
                .last()
                .map(|f| format!("Import stopped at '{}': {}", f.name, f.error))
                .unwrap_or_else(|| "Import stopped".to_string());
            self.message = Some(message);
            self.phase = Phase::Error { staged };
        } else if !report.failures.is_empty() {
            self.message = Some(format!(
                "{} of {} channels failed to import",
                report.failures.len(),
                report.attempted
            ));
        }
        Ok(())
    }

    /// Recover from a load or import that stopped before its `finish_*` step.
    /// An interrupted load returns to `Idle`; an interrupted import returns
    /// to `Staged` with the records in `submitted` deselected. Other states
    /// are left alone.
    pub fn interrupt(&mut self, submitted: &[usize]) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Parsing { source } => {
                self.message = Some(format!("Loading {} was interrupted", source));
            }
            Phase::Importing(mut staged) => {
                staged.deselect(submitted);
                self.message = Some(format!(
                    "Import was interrupted after {} channels",
                    submitted.len()
                ));
                self.phase = Phase::Staged(staged);
            }
            other => self.phase = other,
        }
    }

    /// Drop any staged playlist and return to `Idle`
    pub fn abandon(&mut self) -> SessionResult<()> {
        self.ensure_not_busy()?;
        self.phase = Phase::Idle;
        self.message = None;
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let staged = match &self.phase {
            Phase::Staged(staged) | Phase::Importing(staged) | Phase::Error { staged } => {
                Some(staged)
            }
            _ => None,
        };
        let source = match &self.phase {
            Phase::Parsing { source } => Some(source.clone()),
            _ => staged.map(|s| s.source().to_string()),
        };

        SessionSnapshot {
            id: self.id,
            state: self.state(),
            source,
            summary: staged.map(StagedPlaylist::summary),
            selected: staged.map_or(0, StagedPlaylist::selected_count),
            filter: staged.map(|s| s.filter().clone()),
            loaded_at: staged.map(StagedPlaylist::loaded_at),
            message: self.message.clone(),
        }
    }
}

/// Rolls the session back with [`ImportSession::interrupt`] when a load or
/// import future is dropped while still armed
struct InterruptGuard {
    session: Arc<Mutex<ImportSession>>,
    submitted: Arc<std::sync::Mutex<Vec<usize>>>,
    armed: bool,
}

impl InterruptGuard {
    fn new(session: &Arc<Mutex<ImportSession>>) -> Self {
        Self {
            session: session.clone(),
            submitted: Arc::new(std::sync::Mutex::new(Vec::new())),
            armed: true,
        }
    }

    /// Must be called while holding the session lock, right before `finish_*`
    fn disarm(mut self) {
        self.armed = false;
    }

    fn submitted(&self) -> Vec<usize> {
        self.submitted
            .lock()
            .map(|submitted| submitted.clone())
            .unwrap_or_default()
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let submitted = self.submitted();
        warn!("Session operation cancelled before completion, rolling back");
        match self.session.try_lock() {
            Ok(mut session) => session.interrupt(&submitted),
            Err(_) => {
                let session = self.session.clone();
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            session.lock().await.interrupt(&submitted);
                        });
                    }
                    Err(_) => error!("No runtime available to roll back the import session"),
                }
            }
        }
    }
}

/// Shared import session plus the collaborators needed to load and import
#[derive(Clone)]
pub struct SessionService {
    session: Arc<Mutex<ImportSession>>,
    ingestor: PlaylistIngestor,
    importer: Importer,
}

impl SessionService {
    pub fn new(ingestor: PlaylistIngestor, importer: Importer) -> Self {
        Self {
            session: Arc::new(Mutex::new(ImportSession::new())),
            ingestor,
            importer,
        }
    }

    /// Run a synchronous operation against the session
    pub async fn with_session<T>(&self, f: impl FnOnce(&mut ImportSession) -> T) -> T {
        let mut session = self.session.lock().await;
        f(&mut *session)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Read, parse and stage a playlist
    pub async fn load(&self, source: PlaylistSource) -> AppResult<ParseSummary> {
        let label = source.to_string();
        let mut session = self.session.lock().await;
        session.begin_load(&label)?;
        let guard = InterruptGuard::new(&self.session);
        drop(session);
        info!("Loading playlist from {}", label);

        let result = self
            .ingestor
            .read(source)
            .await
            .map(|text| self.ingestor.parse(&text));

        if let Err(e) = &result {
            error!("Failed to load playlist from {}: {}", label, e);
        }

        let mut session = self.session.lock().await;
        guard.disarm();
        let summary = session.finish_load(result)?;
        info!("Staged {} from {}", summary, label);
        Ok(summary)
    }

    /// Import the selected records
    pub async fn commit(&self) -> AppResult<ImportReport> {
        let mut session = self.session.lock().await;
        let batch = session.begin_import()?;
        let guard = InterruptGuard::new(&self.session);
        drop(session);

        let progress = guard.submitted.clone();
        let report = self
            .importer
            .run_with_progress(batch, move |index| {
                if let Ok(mut submitted) = progress.lock() {
                    submitted.push(index);
                }
            })
            .await;

        let mut session = self.session.lock().await;
        guard.disarm();
        session.finish_import(&report)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ImportPolicy};
    use crate::errors::{AppError, ImportError, ReadError};
    use crate::importer::ChannelSink;
    use crate::ingestor::M3uParser;
    use crate::models::{ImportFailure, ImportedChannel, TypeFilter};
    use std::time::Duration;

    const PLAYLIST: &str = "#EXTINF:-1 group-title=\"Haber\",Kanal 1\nhttp://a\n#EXTINF:-1 group-title=\"Radyo\",FM\nhttp://b\n#EXTINF:-1 group-title=\"Film\",Film 1\nhttp://c\n";

    fn staged_session() -> ImportSession {
        let mut session = ImportSession::new();
        session.begin_load("test.m3u").unwrap();
        session
            .finish_load(Ok(M3uParser::default().parse(PLAYLIST)))
            .unwrap();
        session
    }

    fn report(submitted: Vec<usize>, failures: Vec<ImportFailure>, aborted: bool) -> ImportReport {
        ImportReport {
            attempted: submitted.len() + failures.len(),
            imported: ParseSummary::default(),
            submitted,
            failures,
            aborted,
            finished_at: Utc::now(),
        }
    }

    fn failure(index: usize) -> ImportFailure {
        ImportFailure {
            index,
            name: "FM".to_string(),
            error: "HTTP 500".to_string(),
        }
    }

    #[test]
    fn test_load_stages_everything_selected() {
        let session = staged_session();
        let snapshot = session.snapshot();

        assert_eq!(snapshot.state, SessionState::Staged);
        assert_eq!(snapshot.selected, 3);
        assert_eq!(snapshot.summary.unwrap().total, 3);
        assert_eq!(snapshot.source.as_deref(), Some("test.m3u"));
    }

    #[test]
    fn test_zero_records_is_a_valid_stage() {
        let mut session = ImportSession::new();
        session.begin_load("empty.m3u").unwrap();
        let summary = session.finish_load(Ok(Vec::new())).unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(session.state(), SessionState::Staged);
        assert_eq!(session.begin_import(), Err(SessionError::NothingSelected));
    }

    #[test]
    fn test_failed_load_returns_to_idle_with_message() {
        let mut session = staged_session();
        session.begin_load("broken.m3u").unwrap();

        let error = AppError::Read(ReadError::Io {
            path: "broken.m3u".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert!(session.finish_load(Err(error)).is_err());

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.message().unwrap().contains("broken.m3u"));
        assert_eq!(session.toggle(0), Err(SessionError::NotStaged));
    }

    #[test]
    fn test_busy_while_parsing_or_importing() {
        let mut session = ImportSession::new();
        session.begin_load("a.m3u").unwrap();
        assert!(matches!(session.begin_load("b.m3u"), Err(SessionError::Busy { .. })));
        assert!(matches!(session.abandon(), Err(SessionError::Busy { .. })));

        let mut session = staged_session();
        session.begin_import().unwrap();
        assert_eq!(session.state(), SessionState::Importing);
        assert!(matches!(session.toggle(0), Err(SessionError::Busy { .. })));
        assert!(matches!(session.begin_import(), Err(SessionError::Busy { .. })));
    }

    #[test]
    fn test_import_batch_is_selected_records_in_order() {
        let mut session = staged_session();
        session.toggle(1).unwrap();

        let batch = session.begin_import().unwrap();
        assert_eq!(batch.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_completed_import_clears_session() {
        let mut session = staged_session();
        session.begin_import().unwrap();
        session.finish_import(&report(vec![0, 1, 2], vec![], false)).unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.message().is_none());
    }

    #[test]
    fn test_best_effort_partial_failure_still_clears() {
        let mut session = staged_session();
        session.begin_import().unwrap();
        session
            .finish_import(&report(vec![0, 2], vec![failure(1)], false))
            .unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.message(), Some("1 of 3 channels failed to import"));
    }

    #[test]
    fn test_fail_fast_keeps_unsubmitted_records() {
        let mut session = staged_session();
        session.begin_import().unwrap();
        session.finish_import(&report(vec![0], vec![failure(1)], true)).unwrap();

        assert_eq!(session.state(), SessionState::Error);
        let staged = session.staged().unwrap();
        assert!(!staged.is_selected(0));
        assert!(staged.is_selected(1));
        assert!(staged.is_selected(2));

        // editing resumes the staged playlist
        session.toggle(2).unwrap();
        assert_eq!(session.state(), SessionState::Staged);
        let batch = session.begin_import().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].0, 1);
    }

    #[test]
    fn test_filter_scoped_selection() {
        let mut session = staged_session();
        session.deselect_all().unwrap();
        session
            .set_filter(FilterCriteria {
                content_type: TypeFilter::Radio,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(session.select_all().unwrap(), 1);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.selected, 1);
        assert_eq!(snapshot.filter.unwrap().content_type, TypeFilter::Radio);
    }

    #[test]
    fn test_abandon() {
        let mut session = staged_session();
        session.abandon().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.staged().unwrap_err(), SessionError::NotStaged);
    }

    #[test]
    fn test_select_only_replaces_selection() {
        let mut session = staged_session();
        session.toggle(0).unwrap();

        let selected = session
            .select_only(FilterCriteria {
                group: Some("Haber".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(selected, 1);
        assert_eq!(
            session.snapshot().filter.unwrap().group.as_deref(),
            Some("Haber")
        );

        let batch = session.begin_import().unwrap();
        assert_eq!(batch.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_select_only_without_matches() {
        let mut session = staged_session();
        let selected = session
            .select_only(FilterCriteria {
                search: "nothing like this".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(selected, 0);
        assert_eq!(session.begin_import(), Err(SessionError::NothingSelected));
        assert_eq!(
            ImportSession::new().select_only(FilterCriteria::default()),
            Err(SessionError::NotStaged)
        );
    }

    #[test]
    fn test_interrupted_load_returns_to_idle() {
        let mut session = ImportSession::new();
        session.begin_load("slow.m3u").unwrap();
        session.interrupt(&[]);

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.message().unwrap().contains("slow.m3u"));
        assert!(session.begin_load("again.m3u").is_ok());
    }

    #[test]
    fn test_interrupted_import_deselects_submitted_records() {
        let mut session = staged_session();
        session.begin_import().unwrap();
        session.interrupt(&[0]);

        assert_eq!(session.state(), SessionState::Staged);
        let staged = session.staged().unwrap();
        assert!(!staged.is_selected(0));
        assert!(staged.is_selected(1));
        assert!(staged.is_selected(2));
    }

    #[test]
    fn test_interrupt_leaves_resting_states_alone() {
        let mut session = staged_session();
        session.interrupt(&[0, 1, 2]);

        assert_eq!(session.state(), SessionState::Staged);
        assert_eq!(session.snapshot().selected, 3);
        assert!(session.message().is_none());
    }

    /// Accepts every channel except `FM`, which never completes
    struct StallingSink;

    #[async_trait::async_trait]
    impl ChannelSink for StallingSink {
        async fn submit(&self, channel: &ImportedChannel) -> Result<(), ImportError> {
            if channel.name == "FM" {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dropped_commit_rolls_back_to_staged() {
        let service = SessionService::new(
            PlaylistIngestor::from_config(&Config::default()),
            Importer::new(Arc::new(StallingSink), ImportPolicy::BestEffort),
        );
        service
            .load(PlaylistSource::Upload {
                name: "list.m3u".to_string(),
                bytes: PLAYLIST.as_bytes().to_vec(),
            })
            .await
            .unwrap();

        let result = tokio::time::timeout(Duration::from_millis(100), service.commit()).await;
        assert!(result.is_err());

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.state, SessionState::Staged);
        assert_eq!(snapshot.selected, 2);
        assert!(snapshot.message.unwrap().contains("interrupted"));

        let first_selected = service
            .with_session(|session| session.staged().map(|staged| staged.is_selected(0)))
            .await
            .unwrap();
        assert!(!first_selected);
        assert!(service.with_session(|session| session.abandon()).await.is_ok());
    }
}
