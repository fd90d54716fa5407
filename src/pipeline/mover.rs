use crate::PipelineError;
use crate::pipeline::record::{
    BodyKind, CommentKind, DiffKind, Group, GroupKind, Info, Record,
};
use crate::styled::{StyledText, Tag};
use crate::tokenize::Tokenizer;
use similar::{Algorithm, ChangeTag, DiffOp, TextDiff, capture_diff_slices};
use std::rc::Rc;
use tracing::{debug, trace};

/// Sigil on comments pointing at where removed content went.
const TO_SIGIL: &str = "#→";
/// Sigil on comments pointing at where added content came from.
const FROM_SIGIL: &str = "#←";

const DEFAULT_THRESHOLD: f64 = 0.3;

/// 256-color indexes used by annotation styling.
const MOVED_BG: u8 = 8;
const SOURCE_FG: u8 = 8 + 1;
const DEST_FG: u8 = 8 + 2;
const WORD_DIFF_FG: u8 = 8 + 7;
const UNCHANGED_FG: u8 = 117;

/// Tuning for the move detector.
#[derive(Debug, Clone, Copy)]
pub struct MoverOptions {
    /// Relative token-edit-distance tolerance in `[0, 1]`. A removed/added
    /// pair is a candidate when
    /// `distance <= floor(threshold * max(len_r, len_a))`.
    pub threshold: f64,
    /// How line payloads are tokenized before comparison.
    pub tokenizer: Tokenizer,
}

impl Default for MoverOptions {
    fn default() -> Self {
        MoverOptions {
            threshold: DEFAULT_THRESHOLD,
            tokenizer: Tokenizer::default(),
        }
    }
}

impl MoverOptions {
    /// Read the threshold from the `T` environment variable, keeping the
    /// default for unset, unparseable, or out-of-range values.
    pub fn from_env() -> Self {
        MoverOptions {
            threshold: parse_threshold(std::env::var("T").ok().as_deref()),
            ..Default::default()
        }
    }
}

pub(crate) fn parse_threshold(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|t| (0.0..=1.0).contains(t))
        .unwrap_or(DEFAULT_THRESHOLD)
}

/// A removed/added pair the detector considers the same content.
#[derive(Debug)]
pub struct MoveMatch {
    /// Index of the removed line in the group's item list
    pub removed: usize,
    /// Index of the added line in the group's item list
    pub added: usize,
    pub info: MatchInfo,
}

/// Auxiliary detail carried with every retained match.
#[derive(Debug)]
pub struct MatchInfo {
    /// Levenshtein distance over the two token sequences
    pub distance: usize,
    /// Shortest edit script over the token sequences
    pub edit_script: Vec<DiffOp>,
}

struct Entry {
    tokens: Vec<String>,
    index: usize,
}

/// Final pipeline stage: detects moved lines within each diff group and
/// splices styled cross-reference comments next to both ends of every move.
pub struct Mover<I> {
    input: I,
    options: MoverOptions,
}

impl<I> Mover<I> {
    pub fn new(input: I, options: MoverOptions) -> Self {
        Mover { input, options }
    }
}

impl<I> Iterator for Mover<I>
where
    I: Iterator<Item = Result<Group, PipelineError>>,
{
    type Item = Result<Group, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut group = match self.input.next()? {
            Ok(group) => group,
            Err(e) => return Some(Err(e)),
        };
        if group.kind == GroupKind::Diff {
            annotate(&mut group, &self.options);
        }
        Some(Ok(group))
    }
}

/// Pair every removed line in the group with its closest added lines.
///
/// Candidates are filtered by the relative distance cap, ordered by ascending
/// distance, then narrowed: a removed line with exact token-level twins keeps
/// all of them, otherwise it keeps its best two approximations. Matches come
/// out in removed-line input order.
pub fn detect_moves(group: &Group, options: &MoverOptions) -> Vec<MoveMatch> {
    let mut removed: Vec<Entry> = Vec::new();
    let mut added: Vec<Entry> = Vec::new();
    for (index, item) in group.items.iter().enumerate() {
        let kind = match &item.info {
            Info::Diff(DiffKind::Body(kind @ (BodyKind::Added | BodyKind::Removed))) => kind,
            _ => continue,
        };
        let tokens = options.tokenizer.tokenize(&payload(item));
        if tokens.is_empty() {
            continue;
        }
        let entry = Entry { tokens, index };
        match kind {
            BodyKind::Added => added.push(entry),
            _ => removed.push(entry),
        }
    }
    if removed.is_empty() || added.is_empty() {
        return Vec::new();
    }
    debug!(
        removed = removed.len(),
        added = added.len(),
        "scanning group for moved lines"
    );

    let mut matches = Vec::new();
    for r in &removed {
        let mut candidates: Vec<(usize, usize)> = Vec::new();
        for (position, a) in added.iter().enumerate() {
            let cap = (options.threshold * r.tokens.len().max(a.tokens.len()) as f64).floor()
                as usize;
            let distance = strsim::generic_levenshtein(&r.tokens, &a.tokens);
            if distance <= cap {
                candidates.push((position, distance));
            }
        }
        candidates.sort_by_key(|&(_, distance)| distance);

        let exact = candidates
            .iter()
            .take_while(|&&(_, distance)| distance == 0)
            .count();
        let keep = if exact > 0 {
            &candidates[..exact]
        } else {
            &candidates[..candidates.len().min(2)]
        };

        for &(position, distance) in keep {
            let a = &added[position];
            trace!(
                removed = r.index,
                added = a.index,
                distance,
                "retained move candidate"
            );
            matches.push(MoveMatch {
                removed: r.index,
                added: a.index,
                info: MatchInfo {
                    distance,
                    edit_script: capture_diff_slices(Algorithm::Myers, &r.tokens, &a.tokens),
                },
            });
        }
    }
    matches
}

fn annotate(group: &mut Group, options: &MoverOptions) {
    let matches = detect_moves(group, options);
    if matches.is_empty() {
        return;
    }
    debug!(matches = matches.len(), "splicing move annotations");

    let mut annotations: Vec<(usize, Record)> = Vec::new();
    for m in &matches {
        let removed = &group.items[m.removed];
        let added = &group.items[m.added];
        let Some(from_file) = removed.hunk_ref().and_then(|h| h.from_file()) else {
            continue;
        };
        let Some(to_file) = added.hunk_ref().and_then(|h| h.to_file()) else {
            continue;
        };
        let old = payload(removed).trim().to_string();
        let new = payload(added).trim().to_string();

        annotations.push((
            m.removed,
            comment(
                removed.line_number,
                TO_SIGIL,
                to_file,
                Tag::FgIndex(DEST_FG),
                m.info.distance,
                &old,
                &new,
            ),
        ));
        annotations.push((
            m.added,
            comment(
                added.line_number,
                FROM_SIGIL,
                from_file,
                Tag::FgIndex(SOURCE_FG),
                m.info.distance,
                &old,
                &new,
            ),
        ));
    }

    // Stable by target index, so comments at one index keep emission order
    annotations.sort_by_key(|&(index, _)| index);
    for (offset, (index, record)) in annotations.into_iter().enumerate() {
        group.items.insert(index + offset, Rc::new(record));
    }
}

/// Line content without its `+`/`-`/` ` prefix.
fn payload(record: &Record) -> String {
    let text = record.text.plain_text();
    text.chars().skip(1).collect()
}

/// Build one styled cross-reference comment line.
fn comment(
    line_number: u32,
    sigil: &str,
    path: &str,
    path_fg: Tag,
    distance: usize,
    old: &str,
    new: &str,
) -> Record {
    let mut text = StyledText::new();
    text.push_str(sigil);
    text.push_str(" ");
    let path_start = text.len();
    text.push_str(path);
    let path_end = text.len();
    text.apply(Tag::Bold, path_start..path_end);
    text.apply(path_fg, path_start..path_end);
    text.apply(Tag::BgIndex(MOVED_BG), path_start..path_end);

    if distance == 0 {
        let start = text.len();
        text.push_str(": (unchanged)");
        text.apply(Tag::FgIndex(UNCHANGED_FG), start..text.len());
    } else {
        text.push_str(":\n");
        text.push_str(sigil);
        text.push_str("\t");
        text.push_styled(&word_diff(old, new));
    }

    Record::new(
        line_number,
        text,
        Info::Diff(DiffKind::Comment(CommentKind::Moved)),
    )
}

/// Word-level diff of the two payloads: deletions in bright red, insertions
/// in bright green, everything on the annotation background in bold, with
/// bright white filling positions that carry no change color.
fn word_diff(old: &str, new: &str) -> StyledText {
    let diff = TextDiff::from_words(old, new);
    let mut out = StyledText::new();
    for change in diff.iter_all_changes() {
        let start = out.len();
        out.push_str(change.value());
        match change.tag() {
            ChangeTag::Delete => out.apply(Tag::FgIndex(SOURCE_FG), start..out.len()),
            ChangeTag::Insert => out.apply(Tag::FgIndex(DEST_FG), start..out.len()),
            ChangeTag::Equal => {}
        }
    }
    let len = out.len();
    out.apply(Tag::Bold, 0..len);
    out.apply(Tag::BgIndex(MOVED_BG), 0..len);
    out.fill_missing_fg(Tag::FgIndex(WORD_DIFF_FG));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::annotate_lines;
    use similar_asserts::assert_eq;

    fn run(lines: &[&str], options: MoverOptions) -> Vec<Group> {
        annotate_lines(lines.iter().map(|s| Ok(s.to_string())), options)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn comments(group: &Group) -> Vec<(usize, String)> {
        group
            .items
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                matches!(r.info, Info::Diff(DiffKind::Comment(CommentKind::Moved)))
            })
            .map(|(i, r)| (i, r.text.plain_text()))
            .collect()
    }

    const EXACT_MOVE: &[&str] = &[
        "--- a/x",
        "+++ b/x",
        "@@ -1 +1 @@",
        "-hello world",
        "--- a/y",
        "+++ b/y",
        "@@ -1 +1 @@",
        "+hello world",
    ];

    #[test]
    fn single_token_rename_is_below_the_cap() {
        // distance 1 over [alpha] vs [beta], cap floor(0.3 * 1) = 0
        let groups = run(
            &[
                "diff --git a/x b/x",
                "index 111..222 100644",
                "--- a/x",
                "+++ b/x",
                "@@ -1,1 +1,1 @@",
                "-alpha",
                "+beta",
            ],
            MoverOptions::default(),
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 7);
        assert!(comments(&groups[0]).is_empty());
    }

    #[test]
    fn exact_move_is_annotated_unchanged() {
        let groups = run(EXACT_MOVE, MoverOptions::default());
        let group = &groups[0];
        assert_eq!(group.items.len(), 10);
        assert_eq!(
            comments(group),
            vec![
                (3, "#→ b/y: (unchanged)".to_string()),
                (8, "#← a/x: (unchanged)".to_string()),
            ]
        );
        // Comments sit directly against the lines they annotate
        assert_eq!(group.items[4].text.plain_text(), "-hello world");
        assert_eq!(group.items[9].text.plain_text(), "+hello world");
        // and carry the annotated line's number
        assert_eq!(group.items[3].line_number, group.items[4].line_number);
        assert_eq!(group.items[8].line_number, group.items[9].line_number);
    }

    #[test]
    fn approximate_move_gets_a_word_diff() {
        let groups = run(
            &[
                "--- a/x",
                "+++ b/x",
                "@@ -1 +1 @@",
                "-foo(a + b)",
                "--- a/y",
                "+++ b/y",
                "@@ -1 +1 @@",
                "+foo(a + b + c)",
            ],
            MoverOptions::default(),
        );
        let found = comments(&groups[0]);
        assert_eq!(found.len(), 2);
        let (_, source_side) = &found[0];
        assert!(source_side.starts_with("#→ b/y:\n#→\t"));
        assert!(!source_side.contains("(unchanged)"));
        let (_, dest_side) = &found[1];
        assert!(dest_side.starts_with("#← a/x:\n#←\t"));
    }

    #[test]
    fn word_diff_styles_changes_and_fills_the_rest() {
        let diff = word_diff("foo(a + b)", "foo(a + b + c)");
        let rendered = diff.to_ansi();
        assert!(rendered.contains("48;5;8"));
        assert!(rendered.contains("38;5;10"));
        assert!(rendered.contains("38;5;15"));
    }

    #[test]
    fn zero_threshold_keeps_only_exact_twins() {
        let options = MoverOptions {
            threshold: 0.0,
            ..Default::default()
        };
        let groups = run(EXACT_MOVE, options);
        assert_eq!(comments(&groups[0]).len(), 2);

        let groups = run(
            &[
                "--- a/x",
                "+++ b/x",
                "@@ -1 +1 @@",
                "-foo(a + b)",
                "+foo(a + b + c)",
            ],
            options,
        );
        assert!(comments(&groups[0]).is_empty());
    }

    #[test]
    fn loose_threshold_narrows_to_best_two() {
        let options = MoverOptions {
            threshold: 1.0,
            ..Default::default()
        };
        let groups = run(
            &[
                "--- a/x",
                "+++ b/x",
                "@@ -1 +1,3 @@",
                "-one two three",
                "+one two four",
                "+one five six",
                "+seven eight nine",
            ],
            options,
        );
        // One removed line, three candidates, two kept: four comments total
        let found = comments(&groups[0]);
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn multiple_exact_twins_all_annotate() {
        let groups = run(
            &[
                "--- a/x",
                "+++ b/x",
                "@@ -1 +1,2 @@",
                "-same line",
                "+same line",
                "+same line",
            ],
            MoverOptions::default(),
        );
        // Two zero-distance destinations: 2 source-side + 2 dest-side comments
        assert_eq!(comments(&groups[0]).len(), 4);
    }

    #[test]
    fn removals_without_additions_pass_through() {
        let input = &["--- a/x", "+++ b/x", "@@ -1,2 +0,0 @@", "-gone", "-also gone"];
        let groups = run(input, MoverOptions::default());
        assert_eq!(groups[0].items.len(), input.len());
        assert!(comments(&groups[0]).is_empty());
    }

    #[test]
    fn blank_payloads_are_not_compared() {
        let groups = run(
            &["--- a/x", "+++ b/x", "@@ -1 +1 @@", "-   ", "+   "],
            MoverOptions::default(),
        );
        assert!(comments(&groups[0]).is_empty());
    }

    #[test]
    fn splicing_preserves_original_relative_order() {
        let groups = run(EXACT_MOVE, MoverOptions::default());
        let originals: Vec<u32> = groups[0]
            .items
            .iter()
            .filter(|r| !matches!(r.info, Info::Diff(DiffKind::Comment(_))))
            .map(|r| r.line_number)
            .collect();
        assert_eq!(originals, (1..=8).collect::<Vec<u32>>());
    }

    #[test]
    fn match_info_carries_the_edit_script() {
        let groups = run(EXACT_MOVE, MoverOptions::default());
        // Re-detect on the annotated group: comment lines are not body lines,
        // so the same single match comes back
        let matches = detect_moves(&groups[0], &MoverOptions::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].info.distance, 0);
        assert!(!matches[0].info.edit_script.is_empty());
        assert!(
            matches[0]
                .info
                .edit_script
                .iter()
                .all(|op| matches!(op, DiffOp::Equal { .. }))
        );
    }

    #[test]
    fn threshold_parsing_rejects_junk() {
        assert_eq!(parse_threshold(None), 0.3);
        assert_eq!(parse_threshold(Some("0.5")), 0.5);
        assert_eq!(parse_threshold(Some("1")), 1.0);
        assert_eq!(parse_threshold(Some("nope")), 0.3);
        assert_eq!(parse_threshold(Some("7.5")), 0.3);
        assert_eq!(parse_threshold(Some("-1")), 0.3);
    }
}
