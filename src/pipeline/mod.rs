pub mod classify;
pub mod group;
pub mod link;
pub mod mover;
pub mod normalize;
pub mod record;

use crate::PipelineError;
use classify::Classifier;
use group::Grouper;
use link::HeaderLinker;
use mover::{Mover, MoverOptions};
use normalize::Normalizer;
use record::Group;
use std::io;

/// Run the full annotation pipeline over raw input lines.
///
/// The returned iterator is lazy: each group is produced on demand, and only
/// the group currently being annotated is buffered.
///
/// ```
/// use diff_moves::{MoverOptions, annotate_lines};
///
/// let diff = ["--- a/x", "+++ b/x", "@@ -1 +1 @@", "-hello world"];
/// let groups: Result<Vec<_>, _> = annotate_lines(
///     diff.iter().map(|s| Ok::<_, std::io::Error>(s.to_string())),
///     MoverOptions::default(),
/// )
/// .collect();
/// assert_eq!(groups.unwrap().len(), 1);
/// ```
pub fn annotate_lines<I>(
    input: I,
    options: MoverOptions,
) -> impl Iterator<Item = Result<Group, PipelineError>>
where
    I: Iterator<Item = io::Result<String>>,
{
    Mover::new(
        HeaderLinker::new(Grouper::new(Classifier::new(Normalizer::new(input)))),
        options,
    )
}

/// Run the annotation pipeline over a buffered reader.
pub fn annotate_reader<R>(
    reader: R,
    options: MoverOptions,
) -> impl Iterator<Item = Result<Group, PipelineError>>
where
    R: io::BufRead,
{
    annotate_lines(reader.lines(), options)
}

/// Render annotated groups back to ANSI text, one line per record.
///
/// Annotation records may carry an embedded newline and then render as two
/// physical lines; hunk headers are left as they were, so the extra lines are
/// not reflected in `@@` counts.
pub fn render_groups<I>(groups: I) -> Result<String, PipelineError>
where
    I: Iterator<Item = Result<Group, PipelineError>>,
{
    let mut out = String::new();
    for group in groups {
        for item in &group?.items {
            out.push_str(&item.text.to_ansi());
            out.push('\n');
        }
    }
    Ok(out)
}
