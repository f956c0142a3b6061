use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reserved action id that aggregates all actions of a subject.
///
/// Mapping rows with this id never correspond to a processable sequence.
pub const ALL_ACTIONS_ID: &str = "1";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("expected SUBJECT:ACTION:SUBACTION, got {0:?}")]
    BadSequence(String),
    #[error("subject {0:?} is not of the form S<number>")]
    BadSubject(String),
    #[error("{kind} id {value:?} is not numeric")]
    NotNumeric { kind: &'static str, value: String },
}

/// One `(subject, action, subaction)` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceKey {
    pub subject: String,
    pub action: String,
    pub subaction: String,
}

impl SequenceKey {
    pub fn new(
        subject: impl Into<String>,
        action: impl Into<String>,
        subaction: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            action: action.into(),
            subaction: subaction.into(),
        }
    }

    pub fn is_all_actions(&self) -> bool {
        self.action == ALL_ACTIONS_ID
    }

    pub fn view(&self, camera: impl Into<String>) -> ViewKey {
        ViewKey {
            subject: self.subject.clone(),
            action: self.action.clone(),
            subaction: self.subaction.clone(),
            camera: camera.into(),
        }
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.subject, self.action, self.subaction)
    }
}

impl FromStr for SequenceKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [subject, action, subaction]
                if !subject.is_empty() && !action.is_empty() && !subaction.is_empty() =>
            {
                Ok(Self::new(*subject, *action, *subaction))
            }
            _ => Err(IdError::BadSequence(s.to_string())),
        }
    }
}

/// One camera's view of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewKey {
    pub subject: String,
    pub action: String,
    pub subaction: String,
    pub camera: String,
}

impl ViewKey {
    pub fn new(
        subject: impl Into<String>,
        action: impl Into<String>,
        subaction: impl Into<String>,
        camera: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            action: action.into(),
            subaction: subaction.into(),
            camera: camera.into(),
        }
    }

    pub fn sequence(&self) -> SequenceKey {
        SequenceKey::new(&self.subject, &self.action, &self.subaction)
    }

    /// Numeric tags `(subject, action, subaction, camera)` stored per frame.
    pub fn numeric_tags(&self) -> Result<ViewTags, IdError> {
        Ok(ViewTags {
            subject: subject_number(&self.subject)?,
            action: parse_numeric("action", &self.action)?,
            subaction: parse_numeric("subaction", &self.subaction)?,
            camera: parse_numeric("camera", &self.camera)?,
        })
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.subject, self.action, self.subaction, self.camera
        )
    }
}

/// Numeric identity of a view, repeated once per selected frame in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTags {
    pub subject: i64,
    pub action: i64,
    pub subaction: i64,
    pub camera: i64,
}

/// `"S11"` -> `11`.
pub fn subject_number(subject: &str) -> Result<i64, IdError> {
    subject
        .strip_prefix('S')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| IdError::BadSubject(subject.to_string()))
}

fn parse_numeric(kind: &'static str, value: &str) -> Result<i64, IdError> {
    value.parse().map_err(|_| IdError::NotNumeric {
        kind,
        value: value.to_string(),
    })
}
