//! Scripted in-memory annotation channel for exercising the engine without
//! a chat platform.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{AnnotationChannel, Error, Result, params::AnnotationKind};

/// One scripted answer to `fetch_annotation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    Holders(Vec<i64>),
    Fail,
}

/// A recorded `set_annotation` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub message_id: i64,
    pub kind: AnnotationKind,
    pub present: bool,
}

/// Replays queued fetch answers per emoji id and records every write.
///
/// Once a queue runs dry, further fetches for that emoji return nobody.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    fetches: Mutex<HashMap<u32, VecDeque<Fetch>>>,
    fetch_counts: Mutex<HashMap<u32, usize>>,
    rejected: Mutex<HashSet<u32>>,
    writes: Mutex<Vec<Write>>,
}

impl ScriptedChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next answer for fetches of `kind`.
    #[must_use]
    pub fn with_fetch(self, kind: AnnotationKind, fetch: Fetch) -> Self {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind.id)
            .or_default()
            .push_back(fetch);
        self
    }

    /// Make every write of `kind` fail.
    #[must_use]
    pub fn rejecting_writes(self, kind: AnnotationKind) -> Self {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind.id);
        self
    }

    /// Writes attempted so far, rejected ones included.
    #[must_use]
    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    #[must_use]
    pub fn fetch_count(&self, kind: AnnotationKind) -> usize {
        self.fetch_counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind.id)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnnotationChannel for ScriptedChannel {
    async fn set_annotation(
        &self,
        message_id: i64,
        kind: AnnotationKind,
        present: bool,
    ) -> Result<()> {
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Write {
                message_id,
                kind,
                present,
            });
        let rejected = self
            .rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&kind.id);
        if rejected {
            return Err(Error::unavailable(format!("write of {kind} rejected")));
        }
        Ok(())
    }

    async fn fetch_annotation(&self, _message_id: i64, kind: AnnotationKind) -> Result<Vec<i64>> {
        *self
            .fetch_counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind.id)
            .or_default() += 1;
        let next = self
            .fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&kind.id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Fetch::Holders(ids)) => Ok(ids),
            Some(Fetch::Fail) => Err(Error::unavailable(format!("fetch of {kind} failed"))),
            None => Ok(Vec::new()),
        }
    }
}
