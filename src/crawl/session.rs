//! Session queue/visited restoration (spec §4.2, §4.3 "Resume after kill").
//!
//! Session *state* (the `CrawlSessionState` record and its persistence) is
//! owned by [`crate::crawl::metadata::CrawlMetadata`]; this module turns
//! that checkpoint into the in-memory queue/visited-set the engine drives
//! its loop from, and builds a fresh one for a new crawl.

use std::collections::{HashSet, VecDeque};

use chrono::Utc;

use crate::crawl::metadata::CrawlSessionState;

/// The engine's working queue/visited state, derived from or destined for
/// a [`CrawlSessionState`] checkpoint.
pub struct Session {
    pub visited: HashSet<String>,
    pub queue: VecDeque<(String, usize)>,
    pub start_url: String,
    pub output_directory: std::path::PathBuf,
}

impl Session {
    pub fn new(start_url: String, output_directory: std::path::PathBuf) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back((start_url.clone(), 0));
        Self {
            visited: HashSet::new(),
            queue,
            start_url,
            output_directory,
        }
    }

    /// Restore a queue/visited set from a checkpointed session (spec §4.2:
    /// "presence of this marker triggers queue/visited restoration").
    pub fn from_checkpoint(state: &CrawlSessionState) -> Self {
        Self {
            visited: state.visited.iter().cloned().collect(),
            queue: state.queue.iter().cloned().collect(),
            start_url: state.start_url.clone(),
            output_directory: state.output_directory.clone(),
        }
    }

    pub fn to_checkpoint(&self) -> CrawlSessionState {
        CrawlSessionState {
            visited: self.visited.iter().cloned().collect(),
            queue: self.queue.iter().cloned().collect(),
            start_url: self.start_url.clone(),
            output_directory: self.output_directory.clone(),
            session_start_time: Utc::now(),
            last_save_time: Utc::now(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_checkpoint() {
        let mut session = Session::new("https://x/start".to_string(), "/tmp/out".into());
        session.visited.insert("https://x/start".to_string());
        session.queue.push_back(("https://x/next".to_string(), 1));

        let checkpoint = session.to_checkpoint();
        let restored = Session::from_checkpoint(&checkpoint);

        assert_eq!(restored.visited.len(), 1);
        assert!(restored.queue.iter().any(|(u, _)| u == "https://x/next"));
    }
}
