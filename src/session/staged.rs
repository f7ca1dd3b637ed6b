//! Staged playlist: parsed records, selection set and the current view filter

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::errors::{SessionError, SessionResult};
use crate::models::{FilterCriteria, PendingChannel, ParseSummary};

/// Indices of the records passing `criteria`, in staged order
pub fn filter_indices(channels: &[PendingChannel], criteria: &FilterCriteria) -> Vec<usize> {
    channels
        .iter()
        .enumerate()
        .filter(|(_, channel)| criteria.matches(channel))
        .map(|(index, _)| index)
        .collect()
}

/// Distinct group titles in first-appearance order
pub fn distinct_groups(channels: &[PendingChannel]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    channels
        .iter()
        .filter(|channel| seen.insert(channel.group.as_str()))
        .map(|channel| channel.group.clone())
        .collect()
}

/// One row of the filtered view
#[derive(Debug, Clone, Serialize)]
pub struct StagedEntry {
    pub index: usize,
    pub selected: bool,
    #[serde(flatten)]
    pub channel: PendingChannel,
}

#[derive(Debug, Clone)]
pub struct StagedPlaylist {
    source: String,
    channels: Vec<PendingChannel>,
    selected: BTreeSet<usize>,
    filter: FilterCriteria,
    loaded_at: DateTime<Utc>,
}

impl StagedPlaylist {
    /// Stage freshly parsed records with every index selected
    pub fn new(source: impl Into<String>, channels: Vec<PendingChannel>) -> Self {
        let selected = (0..channels.len()).collect();
        Self {
            source: source.into(),
            channels,
            selected,
            filter: FilterCriteria::default(),
            loaded_at: Utc::now(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn channels(&self) -> &[PendingChannel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn summary(&self) -> ParseSummary {
        ParseSummary::from_channels(&self.channels)
    }

    pub fn groups(&self) -> Vec<String> {
        distinct_groups(&self.channels)
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterCriteria) {
        self.filter = filter;
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        filter_indices(&self.channels, &self.filter)
    }

    pub fn view(&self) -> Vec<StagedEntry> {
        self.visible_indices()
            .into_iter()
            .map(|index| StagedEntry {
                index,
                selected: self.selected.contains(&index),
                channel: self.channels[index].clone(),
            })
            .collect()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Flip one record's selection; returns the new state
    pub fn toggle(&mut self, index: usize) -> SessionResult<bool> {
        if index >= self.channels.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.channels.len(),
            });
        }
        if self.selected.remove(&index) {
            Ok(false)
        } else {
            self.selected.insert(index);
            Ok(true)
        }
    }

    /// Select every record in the current view. Records outside the view
    /// keep their selection state.
    pub fn select_all_visible(&mut self) -> usize {
        let visible = self.visible_indices();
        let count = visible.len();
        self.selected.extend(visible);
        count
    }

    /// Deselect every record in the current view
    pub fn deselect_all_visible(&mut self) -> usize {
        let visible = self.visible_indices();
        for index in &visible {
            self.selected.remove(index);
        }
        visible.len()
    }

    pub fn deselect(&mut self, indices: &[usize]) {
        for index in indices {
            self.selected.remove(index);
        }
    }

    /// Selected records in staged order
    pub fn selected_channels(&self) -> Vec<(usize, PendingChannel)> {
        self.selected
            .iter()
            .map(|&index| (index, self.channels[index].clone()))
            .collect()
    }
}
