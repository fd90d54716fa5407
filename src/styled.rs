use error_set::error_set;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[@-Z\\-_]").expect("ansi regex"));

error_set! {
    /// Failures while parsing a line as an ANSI-styled string.
    ///
    /// `NonSgr` is recoverable (callers strip color and keep the plain text);
    /// the other variants are not.
    SgrError = {
        #[display("escape sequence is not an SGR color sequence")]
        NonSgr,
        #[display("unterminated escape sequence")]
        Unterminated,
        #[display("malformed SGR parameters: {params}")]
        MalformedParams { params: String },
    };
}

/// The eight base terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    fn from_sgr_offset(offset: u16) -> Self {
        match offset {
            0 => Color::Black,
            1 => Color::Red,
            2 => Color::Green,
            3 => Color::Yellow,
            4 => Color::Blue,
            5 => Color::Magenta,
            6 => Color::Cyan,
            _ => Color::White,
        }
    }

    fn sgr_offset(self) -> u8 {
        match self {
            Color::Black => 0,
            Color::Red => 1,
            Color::Green => 2,
            Color::Yellow => 3,
            Color::Blue => 4,
            Color::Magenta => 5,
            Color::Cyan => 6,
            Color::White => 7,
        }
    }
}

/// A single style attribute attached to a range of a [`StyledText`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Named foreground color (SGR 30-37)
    Fg(Color),
    /// Named background color (SGR 40-47)
    Bg(Color),
    /// 256-color foreground (SGR 38;5;n)
    FgIndex(u8),
    /// 256-color background (SGR 48;5;n)
    BgIndex(u8),
    /// Bold weight (SGR 1)
    Bold,
}

impl Tag {
    fn is_fg(self) -> bool {
        matches!(self, Tag::Fg(_) | Tag::FgIndex(_))
    }
}

/// A tag applied over a half-open code-point range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extent {
    pub start: usize,
    pub end: usize,
    pub tag: Tag,
}

/// A string carrying per-range style tags.
///
/// Positions are code-point offsets, not byte offsets, so slicing and tag
/// arithmetic stay aligned with what a terminal will display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledText {
    chars: Vec<char>,
    extents: Vec<Extent>,
}

/// Resolved style at one position. Later extents win within each slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Style {
    bold: bool,
    fg: Option<Tag>,
    bg: Option<Tag>,
}

impl Style {
    fn is_plain(&self) -> bool {
        !self.bold && self.fg.is_none() && self.bg.is_none()
    }

    fn sgr_codes(&self) -> String {
        let mut codes: Vec<String> = Vec::new();
        if self.bold {
            codes.push("1".to_string());
        }
        match self.fg {
            Some(Tag::Fg(c)) => codes.push((30 + c.sgr_offset()).to_string()),
            Some(Tag::FgIndex(n)) => codes.push(format!("38;5;{}", n)),
            _ => {}
        }
        match self.bg {
            Some(Tag::Bg(c)) => codes.push((40 + c.sgr_offset()).to_string()),
            Some(Tag::BgIndex(n)) => codes.push(format!("48;5;{}", n)),
            _ => {}
        }
        codes.join(";")
    }
}

impl StyledText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap text with no styling.
    pub fn plain(text: &str) -> Self {
        StyledText {
            chars: text.chars().collect(),
            extents: Vec::new(),
        }
    }

    /// Length in code points.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The text with all styling discarded.
    pub fn plain_text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Substring over a code-point range, with tags clipped to the range.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let chars = self.chars[range.clone()].to_vec();
        let extents = self
            .extents
            .iter()
            .filter_map(|e| {
                let start = e.start.max(range.start);
                let end = e.end.min(range.end);
                (start < end).then(|| Extent {
                    start: start - range.start,
                    end: end - range.start,
                    tag: e.tag,
                })
            })
            .collect();
        StyledText { chars, extents }
    }

    /// Append unstyled text.
    pub fn push_str(&mut self, text: &str) {
        self.chars.extend(text.chars());
    }

    /// Append another styled string, shifting its tags past the current end.
    pub fn push_styled(&mut self, other: &StyledText) {
        let base = self.chars.len();
        self.chars.extend_from_slice(&other.chars);
        self.extents.extend(other.extents.iter().map(|e| Extent {
            start: e.start + base,
            end: e.end + base,
            tag: e.tag,
        }));
    }

    /// Apply a tag over a code-point range.
    pub fn apply(&mut self, tag: Tag, range: Range<usize>) {
        debug_assert!(range.end <= self.chars.len());
        if range.start < range.end {
            self.extents.push(Extent {
                start: range.start,
                end: range.end,
                tag,
            });
        }
    }

    /// Apply `tag` over every maximal run of positions that has no foreground
    /// tag yet.
    pub fn fill_missing_fg(&mut self, tag: Tag) {
        debug_assert!(tag.is_fg());
        let mut fills = Vec::new();
        let mut run_start = None;
        for pos in 0..self.chars.len() {
            let has_fg = self.style_at(pos).fg.is_some();
            match (has_fg, run_start) {
                (false, None) => run_start = Some(pos),
                (true, Some(start)) => {
                    fills.push(start..pos);
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            fills.push(start..self.chars.len());
        }
        for range in fills {
            self.apply(tag, range);
        }
    }

    fn style_at(&self, pos: usize) -> Style {
        let mut style = Style::default();
        for e in &self.extents {
            if e.start <= pos && pos < e.end {
                match e.tag {
                    Tag::Bold => style.bold = true,
                    t if t.is_fg() => style.fg = Some(t),
                    t => style.bg = Some(t),
                }
            }
        }
        style
    }

    /// Parse a line bearing ANSI SGR escapes into a styled string.
    ///
    /// Only SGR (`ESC [ ... m`) sequences are understood; anything else is an
    /// error so callers can decide whether to fall back to stripped text.
    pub fn from_ansi(input: &str) -> Result<Self, SgrError> {
        let mut text = StyledText::new();
        let mut open_bold: Option<usize> = None;
        let mut open_fg: Option<(Tag, usize)> = None;
        let mut open_bg: Option<(Tag, usize)> = None;

        let mut chars = input.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '\x1b' {
                text.chars.push(c);
                continue;
            }
            if chars.next_if_eq(&'[').is_none() {
                return Err(SgrError::NonSgr);
            }
            let mut params = String::new();
            let final_byte = loop {
                match chars.next() {
                    None => return Err(SgrError::Unterminated),
                    Some(ch) if ch.is_ascii_digit() || ch == ';' => params.push(ch),
                    Some(ch) => break ch,
                }
            };
            if final_byte != 'm' {
                return Err(SgrError::NonSgr);
            }
            let pos = text.chars.len();
            text.apply_sgr(&params, pos, &mut open_bold, &mut open_fg, &mut open_bg)?;
        }

        let end = text.chars.len();
        if let Some(start) = open_bold.take() {
            text.apply(Tag::Bold, start..end);
        }
        if let Some((tag, start)) = open_fg.take() {
            text.apply(tag, start..end);
        }
        if let Some((tag, start)) = open_bg.take() {
            text.apply(tag, start..end);
        }
        Ok(text)
    }

    fn apply_sgr(
        &mut self,
        params: &str,
        pos: usize,
        open_bold: &mut Option<usize>,
        open_fg: &mut Option<(Tag, usize)>,
        open_bg: &mut Option<(Tag, usize)>,
    ) -> Result<(), SgrError> {
        let malformed = || SgrError::MalformedParams {
            params: params.to_string(),
        };
        let codes: Vec<u16> = if params.is_empty() {
            vec![0]
        } else {
            params
                .split(';')
                .map(|p| if p.is_empty() { Ok(0) } else { p.parse() })
                .collect::<Result<_, _>>()
                .map_err(|_| malformed())?
        };

        let close = |text: &mut Self, open: &mut Option<(Tag, usize)>| {
            if let Some((tag, start)) = open.take() {
                text.apply(tag, start..pos);
            }
        };

        let mut i = 0;
        while i < codes.len() {
            match codes[i] {
                0 => {
                    if let Some(start) = open_bold.take() {
                        self.apply(Tag::Bold, start..pos);
                    }
                    close(self, open_fg);
                    close(self, open_bg);
                }
                1 => {
                    open_bold.get_or_insert(pos);
                }
                22 => {
                    if let Some(start) = open_bold.take() {
                        self.apply(Tag::Bold, start..pos);
                    }
                }
                n @ 30..=37 => {
                    close(self, open_fg);
                    *open_fg = Some((Tag::Fg(Color::from_sgr_offset(n - 30)), pos));
                }
                39 => close(self, open_fg),
                n @ 40..=47 => {
                    close(self, open_bg);
                    *open_bg = Some((Tag::Bg(Color::from_sgr_offset(n - 40)), pos));
                }
                49 => close(self, open_bg),
                code @ (38 | 48) => match codes.get(i + 1).copied() {
                    Some(5) => {
                        let n = codes.get(i + 2).ok_or_else(|| malformed())?;
                        let n = u8::try_from(*n).map_err(|_| malformed())?;
                        if code == 38 {
                            close(self, open_fg);
                            *open_fg = Some((Tag::FgIndex(n), pos));
                        } else {
                            close(self, open_bg);
                            *open_bg = Some((Tag::BgIndex(n), pos));
                        }
                        i += 2;
                    }
                    // 24-bit color: well-formed but not tracked
                    Some(2) => {
                        if codes.len() < i + 5 {
                            return Err(malformed());
                        }
                        i += 4;
                    }
                    _ => return Err(malformed()),
                },
                n @ 90..=97 => {
                    close(self, open_fg);
                    *open_fg = Some((Tag::FgIndex((n - 90 + 8) as u8), pos));
                }
                n @ 100..=107 => {
                    close(self, open_bg);
                    *open_bg = Some((Tag::BgIndex((n - 100 + 8) as u8), pos));
                }
                // Attributes we do not track (italic, underline, ...)
                _ => {}
            }
            i += 1;
        }
        Ok(())
    }

    /// Render back to a string bearing ANSI SGR escapes.
    pub fn to_ansi(&self) -> String {
        let mut out = String::with_capacity(self.chars.len());
        let mut prev = Style::default();
        for (i, &c) in self.chars.iter().enumerate() {
            let cur = self.style_at(i);
            if cur != prev {
                if !prev.is_plain() {
                    out.push_str("\x1b[0m");
                }
                if !cur.is_plain() {
                    out.push_str("\x1b[");
                    out.push_str(&cur.sgr_codes());
                    out.push('m');
                }
                prev = cur;
            }
            out.push(c);
        }
        if !prev.is_plain() {
            out.push_str("\x1b[0m");
        }
        out
    }
}

impl fmt::Display for StyledText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ansi())
    }
}

/// Remove every ANSI escape sequence from a string.
pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}
