use std::str::FromStr;

use logos::Logos;
use serde::Deserialize;

use crate::error::{Result, StampError};
use crate::record::TimestampRecord;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum TokenKind {
    #[token("{{")]
    OpenBrace,
    #[token("}}")]
    CloseBrace,
    #[regex(r"\{[A-Za-z_][A-Za-z0-9_]*\}")]
    Field,
    #[regex(r"[^{}]+")]
    Text,

    #[error]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Now,
    Hash,
    Subject,
    CommitTime,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "now" => Some(Field::Now),
            "hash" => Some(Field::Hash),
            // the older footer scripts called the subject "message"
            "subject" | "message" => Some(Field::Subject),
            "commit_time" => Some(Field::CommitTime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escape {
    #[default]
    None,
    Html,
}

impl FromStr for Escape {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Escape::None),
            "html" => Ok(Escape::Html),
            other => Err(StampError::Config(format!(
                "unknown escape mode '{}' (expected none or html)",
                other
            ))),
        }
    }
}

/// Built-in templates, one per footer style that has been in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// `Last updated: {now} ({hash} - {subject})`
    #[default]
    Plain,
    /// `<br>`-separated lines for an HTML footer
    Footer,
    /// Self-contained `<div>` block
    Html,
}

impl Preset {
    pub fn source(self) -> &'static str {
        match self {
            Preset::Plain => "Last updated: {now} ({hash} - {subject})",
            Preset::Footer => "Last updated: {now}<br>Commit: {subject}<br>Time: {commit_time}",
            Preset::Html => concat!(
                "<div style=\"font-size: 0.7rem; color: var(--md-default-fg-color--light); text-align: center;\">\n",
                "  Last Deployment: {now}<br>\n",
                "  ({commit_time}: {subject})\n",
                "</div>\n",
            ),
        }
    }
}

impl FromStr for Preset {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Preset::Plain),
            "footer" => Ok(Preset::Footer),
            "html" => Ok(Preset::Html),
            other => Err(StampError::Config(format!(
                "unknown preset '{}' (expected plain, footer or html)",
                other
            ))),
        }
    }
}

/// A parsed template. Field names are checked at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    escape: Escape,
}

impl Template {
    pub fn parse(input: &str, escape: Escape) -> Result<Self> {
        let mut lex = TokenKind::lexer(input);
        // Precompute line starts for line/col mapping
        let mut line_starts: Vec<usize> = vec![0];
        for (i, ch) in input.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        let find_line_col = |start: usize| -> (usize, usize) {
            // greatest index with line_starts[idx] <= start
            let lo = line_starts.partition_point(|&s| s <= start) - 1;
            let line = lo + 1; // 1-based
            let col = input[line_starts[lo]..start].chars().count() + 1; // 1-based
            (line, col)
        };

        let mut segments: Vec<Segment> = Vec::new();
        while let Some(kind) = lex.next() {
            let text = lex.slice();
            let span = lex.span();
            match kind {
                TokenKind::Text => push_literal(&mut segments, text),
                TokenKind::OpenBrace => push_literal(&mut segments, "{"),
                TokenKind::CloseBrace => push_literal(&mut segments, "}"),
                TokenKind::Field => {
                    let name = &text[1..text.len() - 1];
                    let field = Field::from_name(name).ok_or_else(|| {
                        let (line, col) = find_line_col(span.start);
                        StampError::UnknownField {
                            name: name.to_string(),
                            line,
                            col,
                        }
                    })?;
                    segments.push(Segment::Field(field));
                }
                TokenKind::Error => {
                    let (line, col) = find_line_col(span.start);
                    return Err(StampError::Template {
                        line,
                        col,
                        msg: format!("unbalanced brace near '{}' (use {{{{ or }}}} for a literal brace)", text),
                    });
                }
            }
        }
        Ok(Self { segments, escape })
    }

    pub fn render(&self, record: &TimestampRecord) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(f) => {
                    let value = match f {
                        Field::Now => record.current_time.as_str(),
                        Field::Hash => record.commit_hash.as_str(),
                        Field::Subject => record.commit_message.as_str(),
                        Field::CommitTime => record.commit_time.as_deref().unwrap_or_default(),
                    };
                    match self.escape {
                        Escape::None => out.push_str(value),
                        Escape::Html => push_html_escaped(&mut out, value),
                    }
                }
            }
        }
        out
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if let Some(Segment::Literal(prev)) = segments.last_mut() {
        prev.push_str(text);
    } else {
        segments.push(Segment::Literal(text.to_string()));
    }
}

fn push_html_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
