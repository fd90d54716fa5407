use crate::styled::StyledText;
use std::cell::OnceCell;
use std::rc::Rc;

/// One input line together with its 1-based position and classification.
///
/// Body lines additionally carry a back-reference to their surrounding file
/// header and hunk, filled in once by the header-linker stage.
#[derive(Debug)]
pub struct Record {
    pub line_number: u32,
    pub text: StyledText,
    pub info: Info,
    hunk_ref: OnceCell<Rc<HunkRef>>,
}

impl Record {
    pub fn new(line_number: u32, text: StyledText, info: Info) -> Self {
        Record {
            line_number,
            text,
            info,
            hunk_ref: OnceCell::new(),
        }
    }

    /// The header/hunk context this body line belongs to, if linked.
    pub fn hunk_ref(&self) -> Option<&Rc<HunkRef>> {
        self.hunk_ref.get()
    }

    pub(crate) fn set_hunk_ref(&self, hunk_ref: Rc<HunkRef>) {
        // A record is linked at most once; later hunks snapshot new refs.
        let _ = self.hunk_ref.set(hunk_ref);
    }
}

/// Top-level classification of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Info {
    NonDiff,
    Diff(DiffKind),
}

impl Info {
    pub fn group_kind(&self) -> GroupKind {
        match self {
            Info::NonDiff => GroupKind::NonDiff,
            Info::Diff(_) => GroupKind::Diff,
        }
    }
}

/// Role of a line within a diff block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffKind {
    FileHeader(HeaderKind),
    Body(BodyKind),
    Comment(CommentKind),
}

/// Which file-header line this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderKind {
    /// `diff --git a/X b/Y`
    Git { from_file: String, to_file: String },
    /// `--- path`
    From { from_file: String },
    /// `+++ path`
    To { to_file: String },
    /// Extended header lines (`index ...`, `old mode ...`, ...)
    Generic,
}

/// Which body line this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// `Binary files X and Y differ`
    Binary { from_file: String, to_file: String },
    /// `@@ ... @@` hunk marker
    HunkHeader,
    Added,
    Removed,
    Context,
    /// `\ No newline at end of file`
    NoNewline,
}

/// Comment lines synthesized by the move detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Moved,
}

/// Whether a run of records is diff content or surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Diff,
    NonDiff,
}

/// A maximal run of consecutive records sharing a [`GroupKind`].
#[derive(Debug)]
pub struct Group {
    pub kind: GroupKind,
    pub items: Vec<Rc<Record>>,
}

/// The file-header records in effect for a hunk.
#[derive(Debug, Clone, Default)]
pub struct HeaderSet {
    pub git: Option<Rc<Record>>,
    pub from: Option<Rc<Record>>,
    pub to: Option<Rc<Record>>,
}

impl HeaderSet {
    pub fn is_empty(&self) -> bool {
        self.git.is_none() && self.from.is_none() && self.to.is_none()
    }
}

/// Shared header/hunk context attached to every body line under one hunk.
#[derive(Debug)]
pub struct HunkRef {
    pub header: HeaderSet,
    pub hunk: Rc<Record>,
}

impl HunkRef {
    /// Source path, from the `---` header when present, else the git header.
    pub fn from_file(&self) -> Option<&str> {
        if let Some(rec) = &self.header.from
            && let Info::Diff(DiffKind::FileHeader(HeaderKind::From { from_file })) = &rec.info
        {
            return Some(from_file);
        }
        if let Some(rec) = &self.header.git
            && let Info::Diff(DiffKind::FileHeader(HeaderKind::Git { from_file, .. })) = &rec.info
        {
            return Some(from_file);
        }
        None
    }

    /// Destination path, from the `+++` header when present, else the git
    /// header.
    pub fn to_file(&self) -> Option<&str> {
        if let Some(rec) = &self.header.to
            && let Info::Diff(DiffKind::FileHeader(HeaderKind::To { to_file })) = &rec.info
        {
            return Some(to_file);
        }
        if let Some(rec) = &self.header.git
            && let Info::Diff(DiffKind::FileHeader(HeaderKind::Git { to_file, .. })) = &rec.info
        {
            return Some(to_file);
        }
        None
    }
}
