//! Output buffer and the commit handler that mutates it.

use crate::events::{EventSender, GazeEvent};
use crate::target::{Action, InteractiveTarget};
use log::info;
use serde::Serialize;

/// Typed text. Append and delete-last are the only mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    /// No-op on an empty buffer.
    pub fn delete_last(&mut self) -> Option<char> {
        self.text.pop()
    }

    /// Apply an action. Returns whether the buffer changed.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::AppendChar { ch } => {
                self.push(ch);
                true
            }
            Action::AppendSpace => {
                self.push(' ');
                true
            }
            Action::DeleteLast => self.delete_last().is_some(),
            Action::NoOp => false,
        }
    }
}

/// Record of one committed selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub target_id: String,
    pub action: Action,
    /// Buffer contents after the mutation
    pub buffer: String,
}

/// Applies committed actions and publishes one notification per commit.
#[derive(Debug, Default)]
pub struct CommitHandler {
    buffer: OutputBuffer,
    events: EventSender,
    count: u64,
}

impl CommitHandler {
    pub fn new(events: EventSender) -> Self {
        Self {
            buffer: OutputBuffer::new(),
            events,
            count: 0,
        }
    }

    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Number of commits handled so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn commit(&mut self, target: &InteractiveTarget) -> Commit {
        self.buffer.apply(target.action);
        self.count += 1;

        let commit = Commit {
            target_id: target.id.clone(),
            action: target.action,
            buffer: self.buffer.as_str().to_string(),
        };
        info!("commit {} ({}) -> {:?}", target.id, target.action, commit.buffer);
        self.events.send(GazeEvent::Committed(commit.clone()));
        commit
    }
}
