//! Shared test doubles for studyplan integration tests.
//!
//! - [`ScriptedCompletion`]: answers from a closure and records every call.
//! - [`FailingCompletion`]: fails every call.
//! - [`MemorySink`]: keeps persisted documents in memory, or refuses them.
//!
//! Plus canned completion texts in the formats the workflow parses.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;

use studyplan_core::{OutputSink, TextCompletion};

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

/// One recorded completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCall {
    pub prompt: String,
    pub temperature: f64,
    pub search_enabled: bool,
}

type Responder = Box<dyn Fn(&CompletionCall) -> Result<String> + Send + Sync>;

/// Completion collaborator driven by a closure.
pub struct ScriptedCompletion {
    responder: Responder,
    calls: Mutex<Vec<CompletionCall>>,
}

impl ScriptedCompletion {
    pub fn new(responder: impl Fn(&CompletionCall) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Books for search-enabled calls, `other` for everything else.
    pub fn routed(books: impl Into<String>, other: impl Into<String>) -> Self {
        let books = books.into();
        let other = other.into();
        Self::new(move |call| {
            if call.search_enabled {
                Ok(books.clone())
            } else {
                Ok(other.clone())
            }
        })
    }

    /// A collaborator that answers every call well: three plan stages and
    /// five highly rated, well-reviewed books per search.
    pub fn well_behaved() -> Self {
        Self::routed(FIVE_GOOD_BOOKS, THREE_STAGE_PLAN)
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of search-enabled calls so far.
    pub fn search_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.search_enabled)
            .count()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, temperature: f64, search_enabled: bool) -> Result<String> {
        let call = CompletionCall {
            prompt: prompt.to_string(),
            temperature,
            search_enabled,
        };
        let response = (self.responder)(&call);
        self.calls.lock().unwrap().push(call);
        response
    }
}

/// Collaborator whose every call fails.
#[derive(Debug, Default)]
pub struct FailingCompletion {
    calls: Mutex<usize>,
}

impl FailingCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl TextCompletion for FailingCompletion {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _prompt: &str, _temperature: f64, _search_enabled: bool) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        bail!("completion service unavailable")
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// A persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    pub filename: String,
    pub document: String,
}

/// Sink that keeps documents in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<SavedDocument>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every document.
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn saved(&self) -> Vec<SavedDocument> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn persist(&self, document: &str, suggested_filename: &str) -> Result<PathBuf> {
        if self.fail {
            bail!("disk full");
        }
        self.saved.lock().unwrap().push(SavedDocument {
            filename: suggested_filename.to_string(),
            document: document.to_string(),
        });
        Ok(PathBuf::from(suggested_filename))
    }
}

// ---------------------------------------------------------------------------
// Canned texts
// ---------------------------------------------------------------------------

/// A three-stage plan in the stage-header format. Free of the words the
/// workflow treats as signals, so analysis and validation fall back to their
/// defaults when this text is the answer.
pub const THREE_STAGE_PLAN: &str = "\
Stage 1: Foundations
Description: Core ideas and notation
Duration: 4 weeks
Prerequisites: None
Objectives:
- Read pseudocode fluently
- Analyze simple loops

Stage 2: Data Structures
Description: Lists, trees and heaps
Duration: 6 weeks
Prerequisites: Foundations
Objectives:
- Implement a binary heap
- Compare tree variants

Stage 3: Graph Search
Description: Traversals and shortest paths
Duration: 8 weeks
Prerequisites: Data Structures
Objectives:
- Implement BFS and DFS
- Apply Dijkstra
";

/// Five books in the field-marker format, all rated at least 4.0 with at
/// least 50 reviews.
pub const FIVE_GOOD_BOOKS: &str = "\
Title: Introduction to Algorithms
Author: Thomas H. Cormen
Year: 2009
Rating: 4.4
Reviews: 12,000
Why: Comprehensive reference.
---
Title: The Algorithm Design Manual
Author: Steven Skiena
Year: 2008
Rating: 4.5
Reviews: 3,100
Why: Practical war stories.
---
Title: Grokking Algorithms
Author: Aditya Bhargava
Year: 2016
Rating: 4.4
Reviews: 5,400
Why: Illustrated and approachable.
---
Title: Algorithms
Author: Robert Sedgewick
Year: 2011
Rating: 4.4
Reviews: 2,200
Why: Clear implementations.
---
Title: Algorithm Design
Author: Jon Kleinberg
Year: 2005
Rating: 4.2
Reviews: 900
Why: Strong on proofs.
---
";
