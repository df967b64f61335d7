use std::path::PathBuf;

/// A downstream stage was pointed at a bundle missing its input.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("events.jsonl not found: {}", .0.display())]
    EventsNotFound(PathBuf),
    #[error("episodes.jsonl not found: {}", .0.display())]
    EpisodesNotFound(PathBuf),
}
