pub mod beats;
pub mod clock;
pub mod drums;
pub mod error;
pub mod highlight;
pub mod project;
pub mod rhyme;
pub mod scheduler;
pub mod session;
pub mod sheet;
pub mod sync;
pub mod syllables;

pub use beats::{compute_beats, partition, BeatGroups};
pub use error::*;
pub use highlight::{DisplayEvent, DisplaySink};
pub use project::{HighlightMode, Project, SectionKey, Tempo};
pub use session::Session;
pub use sheet::parse;
pub use syllables::{count_line, estimate};

/// Load a project from either a saved JSON project or a beat sheet.
pub fn load(source: &str) -> Result<Project, BeatSheetError> {
    if source.trim_start().starts_with('{') {
        Project::from_json(source)
    } else {
        parse(source)
    }
}

/// Load a project and render its beat-split export.
/// This is the main entry point for the library.
pub fn split_sheet(source: &str) -> Result<String, BeatSheetError> {
    let project = load(source)?;
    Ok(sheet::to_split_text(&project))
}

/// Load a project and render it back as normalized full text.
pub fn normalize_sheet(source: &str) -> Result<String, BeatSheetError> {
    let project = load(source)?;
    Ok(sheet::to_full_text(&project))
}
