//! Comment-side parsing: attachment, tag parsing and member merging.

pub mod attach;
pub mod merge;
pub mod tags;

use crate::diagnostics::Diagnostics;
use crate::model::Location;
use crate::source::SourceFile;
use tags::DocComment;

/// Parse every doc comment in `file`. The result is indexed like
/// `file.comments`; non-doc comments are `None`.
pub fn parse_comments(file: &SourceFile, diags: &mut Diagnostics) -> Vec<Option<DocComment>> {
    file.comments
        .iter()
        .map(|comment| {
            if !comment.is_doc() {
                return None;
            }
            let location = Location {
                file: file.path.clone(),
                line: comment.span.start_line,
            };
            Some(tags::parse(&comment.text, &location, diags))
        })
        .collect()
}
