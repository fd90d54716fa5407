use crate::PipelineError;
use crate::pipeline::normalize::SourceLine;
use crate::pipeline::record::{BodyKind, DiffKind, HeaderKind, Info, Record};
use regex::Regex;
use std::sync::LazyLock;

static GIT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git (a/.+?) (b/.+?)$").expect("git header regex"));
static HEADER_LEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]{3} ").expect("header lead regex"));
static FROM_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--- ([^\t]+)(\t.*)?$").expect("from file regex"));
static TO_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\+\+ ([^\t]+)(\t.*)?$").expect("to file regex"));
static BINARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Binary files (\S*) and (\S*)").expect("binary regex"));

/// Second pipeline stage: attaches an [`Info`] classification to each line.
///
/// The scan is stateful: `diff_start` marks that we are inside a diff block
/// and `in_header` that we are still in its header region. The header region
/// closes on the `+++` line (or a binary placeholder), which is what lets
/// extended git header lines (`index ...`, `old mode ...`) pass through as
/// generic header lines.
pub struct Classifier<I> {
    input: I,
    diff_start: bool,
    in_header: bool,
}

impl<I> Classifier<I> {
    pub fn new(input: I) -> Self {
        Classifier {
            input,
            diff_start: false,
            in_header: false,
        }
    }

    fn classify(&mut self, text: &str, line_number: u32) -> Result<Info, PipelineError> {
        if let Some(caps) = GIT_HEADER_RE.captures(text) {
            self.diff_start = true;
            self.in_header = true;
            return Ok(Info::Diff(DiffKind::FileHeader(HeaderKind::Git {
                from_file: caps[1].to_string(),
                to_file: caps[2].to_string(),
            })));
        }

        if self.in_header || HEADER_LEAD_RE.is_match(text) {
            self.diff_start = true;
            self.in_header = true;
            if let Some(caps) = FROM_FILE_RE.captures(text) {
                return Ok(Info::Diff(DiffKind::FileHeader(HeaderKind::From {
                    from_file: caps[1].to_string(),
                })));
            }
            if let Some(caps) = TO_FILE_RE.captures(text) {
                // Last header line before the body
                self.in_header = false;
                return Ok(Info::Diff(DiffKind::FileHeader(HeaderKind::To {
                    to_file: caps[1].to_string(),
                })));
            }
            if let Some(caps) = BINARY_RE.captures(text) {
                self.in_header = false;
                return Ok(Info::Diff(DiffKind::Body(BodyKind::Binary {
                    from_file: caps[1].to_string(),
                    to_file: caps[2].to_string(),
                })));
            }
            return Ok(Info::Diff(DiffKind::FileHeader(HeaderKind::Generic)));
        }

        if self.diff_start && !self.in_header && !text.is_empty() {
            let kind = match text.chars().next() {
                Some('@') if text.starts_with("@@") => BodyKind::HunkHeader,
                Some('-') => BodyKind::Removed,
                Some('+') => BodyKind::Added,
                Some(' ') => BodyKind::Context,
                Some('\\') => BodyKind::NoNewline,
                _ => {
                    return Err(PipelineError::UnrecognizedLine {
                        line: line_number,
                        text: text.to_string(),
                    });
                }
            };
            return Ok(Info::Diff(DiffKind::Body(kind)));
        }

        self.diff_start = false;
        self.in_header = false;
        Ok(Info::NonDiff)
    }
}

impl<I> Iterator for Classifier<I>
where
    I: Iterator<Item = Result<SourceLine, PipelineError>>,
{
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.input.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e)),
        };
        let stripped = line.text.plain_text();
        Some(
            self.classify(&stripped, line.line_number)
                .map(|info| Record::new(line.line_number, line.text, info)),
        )
    }
}
