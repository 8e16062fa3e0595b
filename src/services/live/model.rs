use serde::{Deserialize, Serialize};

pub type EventId = i64;

/// Live snapshot as returned by the upstream `/events/live` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LiveSnapshot {
    pub events: Vec<LiveEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LiveEvent {
    pub id: EventId,
    pub tournament: Tournament,
    pub home_team: Team,
    pub away_team: Team,
    pub home_score: Score,
    pub away_score: Score,
    pub status: EventStatus,
    pub time: EventTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Tournament {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Team {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Score {
    pub current: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventStatus {
    pub code: u32,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EventTime {
    /// Seconds played so far, when the sport has a running clock
    pub played: Option<u64>,
    pub current_period_start_timestamp: Option<i64>,
}

impl LiveEvent {
    /// Score as "home:away", blank sides when not started
    pub fn score_line(&self) -> String {
        let side = |s: &Score| s.current.map(|v| v.to_string()).unwrap_or_default();
        format!("{}:{}", side(&self.home_score), side(&self.away_score))
    }

    /// Elapsed clock text, empty when the upstream does not report one
    pub fn clock(&self) -> String {
        match (self.time.played, self.time.current_period_start_timestamp) {
            (Some(played), _) => format!("{}'", played / 60),
            (None, Some(start)) => format!("@{}", start),
            (None, None) => String::new(),
        }
    }
}

/// Events that changed since the previous tick
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChangeSet {
    pub event_ids: Vec<EventId>,
    pub events: Vec<LiveEvent>,
}

impl ChangeSet {
    pub fn push(&mut self, event: LiveEvent) {
        self.event_ids.push(event.id);
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.event_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.event_ids.len()
    }
}
