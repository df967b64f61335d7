mod episodes;
mod error;
mod patterns;

pub use episodes::{map_events, map_run_to_episodes, relative_run_dir, EpisodeLog, PATCH_REF};
pub use error::StageError;
pub use patterns::{
    analyze_patterns, basic_catalog, count_occurrences, extract_patterns, load_catalog,
    PatternReport, SignatureSpec,
};
