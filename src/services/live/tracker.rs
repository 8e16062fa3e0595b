use std::collections::HashMap;

use crate::services::live::model::{ChangeSet, EventId, LiveEvent};

/// Concatenation of the fields that move during a match. Compared, never parsed.
pub fn fingerprint(event: &LiveEvent) -> String {
    format!(
        "{}|{}|{}",
        event.score_line(),
        event.status.description,
        event.clock()
    )
}

/// Selects the events worth tracking by tournament name
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    keywords: Vec<String>,
}

impl EventFilter {
    /// Case-insensitive substring keywords; an empty list accepts everything
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn matches(&self, event: &LiveEvent) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let name = event.tournament.name.to_lowercase();
        self.keywords.iter().any(|k| name.contains(k))
    }
}

/// Last-seen fingerprint per event
#[derive(Debug, Default)]
pub struct ChangeTracker {
    seen: HashMap<EventId, String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff the qualifying events against the stored fingerprints and record the new ones.
    ///
    /// When nothing qualifies after something did, all state is forgotten so the
    /// next appearance of any event counts as new.
    pub fn diff(&mut self, events: Vec<LiveEvent>, filter: &EventFilter) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut qualifying = 0usize;

        for event in events.into_iter().filter(|e| filter.matches(e)) {
            qualifying += 1;
            let print = fingerprint(&event);
            if self.seen.get(&event.id) == Some(&print) {
                continue;
            }
            self.seen.insert(event.id, print);
            changes.push(event);
        }

        if qualifying == 0 && !self.seen.is_empty() {
            tracing::info!("No qualifying live events, clearing {} tracked", self.seen.len());
            self.seen.clear();
        }

        changes
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
