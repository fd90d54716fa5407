use crate::PipelineError;
use crate::pipeline::record::{
    BodyKind, DiffKind, Group, GroupKind, HeaderKind, HeaderSet, HunkRef, Info,
};
use std::rc::Rc;

/// Fourth pipeline stage: back-references each body line in a diff group to
/// the file-header set and hunk marker it sits under.
///
/// All body lines under one hunk share a single [`HunkRef`] snapshot.
pub struct HeaderLinker<I> {
    input: I,
}

impl<I> HeaderLinker<I> {
    pub fn new(input: I) -> Self {
        HeaderLinker { input }
    }
}

impl<I> Iterator for HeaderLinker<I>
where
    I: Iterator<Item = Result<Group, PipelineError>>,
{
    type Item = Result<Group, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let group = match self.input.next()? {
            Ok(group) => group,
            Err(e) => return Some(Err(e)),
        };
        if group.kind == GroupKind::Diff {
            link(&group);
        }
        Some(Ok(group))
    }
}

fn link(group: &Group) {
    let mut header = HeaderSet::default();
    let mut current_ref: Option<Rc<HunkRef>> = None;
    let mut prev_was_header = false;

    for item in &group.items {
        match &item.info {
            Info::Diff(DiffKind::FileHeader(kind)) => {
                if !prev_was_header {
                    // A new file-header run starts a fresh header set
                    header = HeaderSet::default();
                    current_ref = None;
                }
                prev_was_header = true;
                match kind {
                    HeaderKind::Git { .. } => header.git = Some(item.clone()),
                    HeaderKind::From { .. } => header.from = Some(item.clone()),
                    HeaderKind::To { .. } => header.to = Some(item.clone()),
                    HeaderKind::Generic => {}
                }
            }
            Info::Diff(DiffKind::Body(kind)) => {
                prev_was_header = false;
                match kind {
                    BodyKind::HunkHeader => {
                        current_ref = Some(Rc::new(HunkRef {
                            header: header.clone(),
                            hunk: item.clone(),
                        }));
                    }
                    _ => {
                        if let Some(hunk_ref) = &current_ref {
                            item.set_hunk_ref(hunk_ref.clone());
                        }
                    }
                }
            }
            _ => prev_was_header = false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::classify::Classifier;
    use crate::pipeline::group::Grouper;
    use crate::pipeline::normalize::Normalizer;
    use similar_asserts::assert_eq;

    fn linked(lines: &[&str]) -> Vec<Group> {
        HeaderLinker::new(Grouper::new(Classifier::new(Normalizer::new(
            lines.iter().map(|s| Ok(s.to_string())),
        ))))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
    }

    #[test]
    fn body_lines_reference_their_headers() {
        let groups = linked(&[
            "diff --git a/x b/x",
            "index 111..222 100644",
            "--- a/x",
            "+++ b/x",
            "@@ -1 +1 @@",
            "-alpha",
            "+beta",
        ]);
        let hunk_ref = groups[0].items[5].hunk_ref().unwrap();
        assert_eq!(hunk_ref.from_file(), Some("a/x"));
        assert_eq!(hunk_ref.to_file(), Some("b/x"));
        assert!(hunk_ref.header.git.is_some());
        assert_eq!(hunk_ref.hunk.line_number, 5);
    }

    #[test]
    fn body_lines_under_one_hunk_share_the_snapshot() {
        let groups = linked(&["--- a/x", "+++ b/x", "@@ -1,2 +1,2 @@", "-a", "+b", " c"]);
        let items = &groups[0].items;
        let first = items[3].hunk_ref().unwrap();
        assert!(Rc::ptr_eq(first, items[4].hunk_ref().unwrap()));
        assert!(Rc::ptr_eq(first, items[5].hunk_ref().unwrap()));
    }

    #[test]
    fn each_hunk_gets_its_own_snapshot() {
        let groups = linked(&[
            "--- a/x",
            "+++ b/x",
            "@@ -1 +1 @@",
            "-a",
            "@@ -5 +5 @@",
            "-b",
        ]);
        let items = &groups[0].items;
        let first = items[3].hunk_ref().unwrap();
        let second = items[5].hunk_ref().unwrap();
        assert!(!Rc::ptr_eq(first, second));
        assert_eq!(second.hunk.line_number, 5);
        // Same header set carried into the second hunk
        assert_eq!(second.from_file(), Some("a/x"));
    }

    #[test]
    fn new_file_header_run_resets_the_set() {
        let groups = linked(&[
            "--- a/x",
            "+++ b/x",
            "@@ -1 +1 @@",
            "-gone",
            "--- a/y",
            "+++ b/y",
            "@@ -1 +1 @@",
            "+here",
        ]);
        let items = &groups[0].items;
        let second = items[7].hunk_ref().unwrap();
        assert_eq!(second.from_file(), Some("a/y"));
        assert_eq!(second.to_file(), Some("b/y"));
        // The first file's headers must not leak into the second set
        assert!(second.header.git.is_none());
    }

    #[test]
    fn explicit_from_header_wins_over_git_header() {
        let groups = linked(&[
            "diff --git a/old-name b/new-name",
            "--- a/old-name",
            "+++ b/new-name",
            "@@ -1 +1 @@",
            "-x",
        ]);
        let hunk_ref = groups[0].items[4].hunk_ref().unwrap();
        assert_eq!(hunk_ref.from_file(), Some("a/old-name"));
        assert_eq!(hunk_ref.to_file(), Some("b/new-name"));
    }
}
