//! Bounded undo/redo history
//!
//! Frames live in a ring buffer with a cursor. `pointer` counts the frames
//! currently applied: frames before it can be undone, frames at or after it
//! can be redone. Pushing a new frame discards the redo branch.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ulid::Ulid;

use crate::error::{HomeError, ParseError};
use crate::widget::{DocMeta, HomeDoc, WidgetState};

/// Default number of frames kept per home
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// A forward patch and its inverse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoFrame {
    pub id: String,
    pub ts: DateTime<Utc>,
    pub patch: Value,
    pub inverse: Value,
}

impl UndoFrame {
    pub fn new(patch: Value, inverse: Value, ts: DateTime<Utc>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            ts,
            patch,
            inverse,
        }
    }

    /// Record the transition between two versions of a document
    ///
    /// Both sides carry the full widget list and the document meta, which
    /// keeps application independent of how the change was produced.
    pub fn capture(before: &HomeDoc, after: &HomeDoc, ts: DateTime<Utc>) -> Self {
        Self::new(
            json!({ "widgets": after.widgets, "meta": after.meta }),
            json!({ "widgets": before.widgets, "meta": before.meta }),
            ts,
        )
    }
}

/// Apply a frame payload (either `patch` or `inverse`) to a document
///
/// Frames written before meta was captured leave the meta alone.
pub fn apply_payload(doc: &HomeDoc, payload: &Value, now: DateTime<Utc>) -> Result<HomeDoc, HomeError> {
    let widgets = payload
        .get("widgets")
        .cloned()
        .ok_or_else(|| HomeError::validation("undo payload", "missing widgets"))?;
    let widgets: Vec<WidgetState> = serde_json::from_value(widgets).map_err(ParseError::from)?;

    let meta: Option<DocMeta> = match payload.get("meta") {
        Some(meta) => Some(serde_json::from_value(meta.clone()).map_err(ParseError::from)?),
        None => None,
    };

    let mut next = doc.clone();
    next.widgets = widgets;
    if let Some(meta) = meta {
        next.meta = meta;
    }
    next.updated_at = now;
    Ok(next)
}

/// Serialized form of an [`UndoStack`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoStackState {
    pub capacity: usize,
    pub frames: Vec<UndoFrame>,
    pub pointer: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoStack {
    capacity: usize,
    frames: VecDeque<UndoFrame>,
    pointer: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_CAPACITY)
    }
}

impl UndoStack {
    /// Create an empty stack holding at most `capacity` frames (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
            pointer: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Record a new frame, dropping the redo branch and the oldest frame
    /// when over capacity
    pub fn push(&mut self, frame: UndoFrame) {
        self.frames.truncate(self.pointer);
        self.frames.push_back(frame);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
        self.pointer = self.frames.len();
    }

    /// Step back; the caller applies the returned frame's `inverse`
    pub fn undo(&mut self) -> Option<&UndoFrame> {
        if self.pointer == 0 {
            return None;
        }
        self.pointer -= 1;
        self.frames.get(self.pointer)
    }

    /// Step forward; the caller re-applies the returned frame's `patch`
    pub fn redo(&mut self) -> Option<&UndoFrame> {
        if self.pointer >= self.frames.len() {
            return None;
        }
        self.pointer += 1;
        self.frames.get(self.pointer - 1)
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer < self.frames.len()
    }

    pub fn frames(&self) -> impl Iterator<Item = &UndoFrame> {
        self.frames.iter()
    }

    pub fn to_state(&self) -> UndoStackState {
        UndoStackState {
            capacity: self.capacity,
            frames: self.frames.iter().cloned().collect(),
            pointer: self.pointer,
        }
    }

    /// Rebuild a stack, keeping frame order and pointer position
    ///
    /// A state holding more frames than its capacity keeps the newest ones
    /// and shifts the pointer with them.
    pub fn from_state(state: UndoStackState) -> Self {
        let mut stack = Self::new(state.capacity);
        let mut frames: VecDeque<UndoFrame> = state.frames.into();
        let mut pointer = state.pointer.min(frames.len());
        while frames.len() > stack.capacity {
            frames.pop_front();
            pointer = pointer.saturating_sub(1);
        }
        stack.frames = frames;
        stack.pointer = pointer;
        stack
    }

    pub fn to_json(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string_pretty(&self.to_state())?)
    }

    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        let state: UndoStackState = serde_json::from_str(text)?;
        Ok(Self::from_state(state))
    }
}
