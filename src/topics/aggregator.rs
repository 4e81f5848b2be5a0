// WindowedTopicAggregator — turns the current window of log entries into a
// ranked hot-topics list.
//
// The result is rebuilt from scratch on every window change. Nothing carries
// over between calls, so a replaced window never leaves residue behind.

use std::collections::HashMap;

use tracing::debug;

use crate::chat::models::{LogEntry, TopicScore};

/// How many of the most recent messages feed the topic summary.
pub const DEFAULT_WINDOW_SIZE: usize = 12;

/// Outcome of aggregating one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResult {
    /// True iff at least one entry contributed at least one entity
    pub has_entities: bool,
    /// Topics by accumulated salience, highest first
    pub ranked_topics: Vec<TopicScore>,
}

impl AggregationResult {
    /// Topic names in rank order.
    pub fn topic_names(&self) -> Vec<&str> {
        self.ranked_topics.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct WindowedTopicAggregator {
    /// Upper bound on entries the subscription delivers per window
    pub window_size: usize,
}

impl Default for WindowedTopicAggregator {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl WindowedTopicAggregator {
    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    /// Recompute the ranked topics for a complete window (not a delta).
    ///
    /// Only the last `window_size` entries count; anything older is ignored.
    /// Salience is summed per entity name across every entry. A NaN or
    /// negative salience counts as zero. Equal scores keep the order in which
    /// their names were first seen.
    pub fn on_window_changed(&self, entries: &[LogEntry]) -> AggregationResult {
        let entries = &entries[entries.len().saturating_sub(self.window_size)..];

        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut topics: Vec<TopicScore> = Vec::new();
        let mut has_entities = false;

        for entry in entries {
            for entity in &entry.entities {
                has_entities = true;
                let salience = entity.salience.max(0.0);
                match index.get(entity.name.as_str()) {
                    Some(&i) => topics[i].score += salience,
                    None => {
                        index.insert(entity.name.as_str(), topics.len());
                        topics.push(TopicScore {
                            name: entity.name.clone(),
                            score: salience,
                        });
                    }
                }
            }
        }

        if !has_entities {
            return AggregationResult::default();
        }

        topics.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            entries = entries.len(),
            topics = topics.len(),
            top_topic = topics.first().map(|t| t.name.as_str()),
            "Recomputed hot topics"
        );

        AggregationResult {
            has_entities,
            ranked_topics: topics,
        }
    }
}
