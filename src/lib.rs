#![allow(missing_docs)]

use error_set::error_set;

mod pipeline;
mod styled;
mod tokenize;

pub use pipeline::mover::{MatchInfo, MoveMatch, MoverOptions, detect_moves};
pub use pipeline::record::{
    BodyKind, CommentKind, DiffKind, Group, GroupKind, HeaderKind, HeaderSet, HunkRef, Info,
    Record,
};
pub use pipeline::{annotate_lines, annotate_reader, render_groups};
pub use styled::{Color, Extent, SgrError, StyledText, Tag, strip_ansi};
pub use tokenize::Tokenizer;

error_set! {
    /// Fatal failures while streaming a diff through the annotation pipeline.
    ///
    /// Lines whose escapes merely are not SGR color sequences do not error;
    /// they are kept with their ANSI codes stripped.
    PipelineError = {
        #[display("failed to read input: {message}")]
        Read { message: String },
        #[display("line {line}: bad escape sequence: {message}")]
        BadEscape { line: u32, message: String },
        #[display("line {line}: unrecognized diff line: {text}")]
        UnrecognizedLine { line: u32, text: String },
    };
}
