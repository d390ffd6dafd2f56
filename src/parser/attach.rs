//! Comment attachment: which doc comment documents which declaration.

use crate::source::{Declaration, SourceFile, Span};

/// Lookup over one file's doc comments. Built once per file; lookups are
/// pure.
pub struct CommentIndex<'a> {
    file: &'a SourceFile,
    /// Indices into `file.comments`, ordered by end position.
    docs: Vec<usize>,
    /// Every declaration span in the file, nested ones included.
    decls: Vec<Span>,
    max_gap: u32,
}

impl<'a> CommentIndex<'a> {
    /// Index the doc comments of `file`, leaving out the comment indices in
    /// `skip` (file-level comments that document no declaration).
    pub fn new(file: &'a SourceFile, max_gap: u32, skip: &[usize]) -> Self {
        let mut docs: Vec<usize> = file
            .comments
            .iter()
            .enumerate()
            .filter(|(i, c)| c.is_doc() && !skip.contains(i))
            .map(|(i, _)| i)
            .collect();
        docs.sort_by_key(|&i| file.comments[i].span.end());

        let mut decls = Vec::new();
        collect_spans(&file.declarations, &mut decls);

        Self {
            file,
            docs,
            decls,
            max_gap,
        }
    }

    /// The comment documenting `decl`, as an index into the file's
    /// comments. `None` is an annotation gap, not an error.
    pub fn comment_for(&self, decl: &Declaration) -> Option<usize> {
        let start = decl.span.start();
        let idx = self
            .docs
            .iter()
            .rev()
            .copied()
            .find(|&i| self.file.comments[i].span.end() <= start)?;
        let comment = &self.file.comments[idx].span;

        let blank_lines = decl
            .span
            .start_line
            .saturating_sub(comment.end_line)
            .saturating_sub(1);
        if blank_lines > self.max_gap {
            return None;
        }

        // Another declaration begins between the comment and this one.
        if self
            .decls
            .iter()
            .any(|s| comment.end() <= s.start() && s.start() < start)
        {
            return None;
        }

        // The comment sits inside a body that does not also hold `decl`.
        if self
            .decls
            .iter()
            .any(|s| s.contains(comment) && !s.contains(&decl.span))
        {
            return None;
        }

        Some(idx)
    }
}

fn collect_spans(decls: &[Declaration], out: &mut Vec<Span>) {
    for decl in decls {
        out.push(decl.span);
        collect_spans(&decl.children, out);
    }
}
