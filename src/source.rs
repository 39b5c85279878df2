//! Producer-side description of an event stream.
//!
//! The scanner that turns serialized source into events lives outside this
//! crate. [`SourceEvent`] is what it hands over, and [`EventScript`] builds
//! such streams by hand or from a line-oriented text form:
//!
//! ```text
//! line 3
//! open function
//! token int
//! close function
//! ```

use crate::{
    construct::{ConstructKind, Phase},
    context::FileInfo,
    error::{DispatchError, DispatchResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Open(ConstructKind),
    Close(ConstructKind),
    /// A token string; its text becomes the current token.
    Token(String),
    Line(u32),
    /// Start of a new document.
    File(FileInfo),
    GenericEnter,
    GenericExit,
}

impl SourceEvent {
    pub fn phased(kind: ConstructKind, phase: Phase) -> Self {
        match phase {
            Phase::Open => SourceEvent::Open(kind),
            Phase::Close => SourceEvent::Close(kind),
        }
    }

    /// Parses one line of the text form. Blank lines and `#` comments
    /// yield `None`.
    pub fn parse_line(line: &str) -> DispatchResult<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let event = match head {
            "token" => SourceEvent::Token(rest.to_string()),
            "line" => SourceEvent::Line(rest.parse().map_err(|_| DispatchError::MalformedEvent {
                raw: line.to_string(),
            })?),
            "generic" => match rest {
                "enter" => SourceEvent::GenericEnter,
                "exit" => SourceEvent::GenericExit,
                _ => {
                    return Err(DispatchError::MalformedEvent {
                        raw: line.to_string(),
                    })
                }
            },
            "file" => SourceEvent::File(FileInfo {
                path: rest.to_string(),
                name: rest.rsplit('/').next().unwrap_or(rest).to_string(),
                ..FileInfo::default()
            }),
            phase => {
                let phase = Phase::parse(phase)?;
                SourceEvent::phased(ConstructKind::parse(rest)?, phase)
            }
        };
        Ok(Some(event))
    }
}

/// Builder for event streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventScript {
    events: Vec<SourceEvent>,
}

impl EventScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> DispatchResult<Self> {
        let mut script = Self::new();
        for line in text.lines() {
            if let Some(event) = SourceEvent::parse_line(line)? {
                script.events.push(event);
            }
        }
        Ok(script)
    }

    pub fn open(mut self, kind: ConstructKind) -> Self {
        self.events.push(SourceEvent::Open(kind));
        self
    }

    pub fn close(mut self, kind: ConstructKind) -> Self {
        self.events.push(SourceEvent::Close(kind));
        self
    }

    pub fn token<S: Into<String>>(mut self, text: S) -> Self {
        self.events.push(SourceEvent::Token(text.into()));
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.events.push(SourceEvent::Line(line));
        self
    }

    pub fn file(mut self, file: FileInfo) -> Self {
        self.events.push(SourceEvent::File(file));
        self
    }

    /// `open(kind)`, the token, `close(kind)`.
    pub fn wrapped_token<S: Into<String>>(self, kind: ConstructKind, text: S) -> Self {
        self.open(kind).token(text).close(kind)
    }

    pub fn events(&self) -> &[SourceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl IntoIterator for EventScript {
    type Item = SourceEvent;
    type IntoIter = std::vec::IntoIter<SourceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
