//! Client-side gallery of signatures.
//!
//! The gallery owns the ordered list of records the user sees and keeps it
//! in step with two actions:
//!
//! - **mount**: fetch the full list and replace the local one. A failed
//!   fetch is logged and leaves the previous list in place.
//! - **submit**: refuse a blank pad with a prompt (nothing goes to the
//!   network), otherwise post `{name, signature}` and, once the response
//!   arrives, append the returned record and reset the pad and name.
//!   There is no optimistic insert; failures are logged and swallowed.
//!
//! Requests may complete after the gallery was unmounted. Every request is
//! tagged with a [`Ticket`]; [`Gallery::unmount`] advances the generation
//! so late completions are dropped instead of touching a torn-down view.
//! The `begin_*` / `finish_*` pairs let async callers await the request in
//! between; [`Gallery::mount`] and [`Gallery::submit`] do both halves with a
//! blocking [`SignatureApi`].

use crate::capture::SignaturePad;
use crate::client::SignatureApi;
use crate::record::{NewSignature, RecordId, SignatureRecord};
use crate::visibility::VisibilityObserver;
use crate::{Error, Result};
use log::{debug, error};
use std::sync::Arc;

type PromptHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Tags an in-flight request with the gallery generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// What happened to a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Stored and appended to the gallery
    Saved(SignatureRecord),
    /// The pad was blank; the user was prompted and nothing was sent
    EmptyCanvas,
    /// The request failed; logged, gallery unchanged
    Failed,
    /// The gallery was unmounted before the response arrived
    Stale,
}

/// First half of a submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Send `payload`, then hand the result to [`Gallery::finish_submit`]
    Ready { ticket: Ticket, payload: NewSignature },
    /// Nothing to send
    Done(SubmitOutcome),
}

/// One rendered gallery entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryTile {
    pub key: RecordId,
    pub name: String,
    pub image_src: String,
}

pub struct Gallery {
    records: Vec<SignatureRecord>,
    name: String,
    generation: u64,
    mounted: bool,
    visibility: VisibilityObserver,
    on_prompt: Option<PromptHandler>,
}

impl Gallery {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            name: String::new(),
            generation: 0,
            mounted: false,
            visibility: VisibilityObserver::new(0.5),
            on_prompt: None,
        }
    }

    /// Register the handler that shows user-facing prompts.
    pub fn on_prompt<F>(&mut self, cb: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_prompt = Some(Arc::new(cb));
    }

    pub fn clear_on_prompt(&mut self) {
        self.on_prompt = None;
    }

    pub fn records(&self) -> &[SignatureRecord] {
        &self.records
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Entries in display order.
    pub fn tiles(&self) -> Vec<GalleryTile> {
        self.records
            .iter()
            .map(|r| GalleryTile {
                key: r.id.clone(),
                name: r.name.clone(),
                image_src: r.signature.clone(),
            })
            .collect()
    }

    /// Feed the section's intersection ratio; returns a visibility change.
    pub fn observe_visibility(&mut self, ratio: f32) -> Option<bool> {
        self.visibility.observe(ratio)
    }

    /// Whether the content block is currently revealed.
    pub fn is_revealed(&self) -> bool {
        self.visibility.is_visible()
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.generation == self.generation
    }

    fn prompt(&self, message: &str) {
        match &self.on_prompt {
            Some(cb) => cb(message),
            None => log::warn!("{}", message),
        }
    }

    /// Mark the gallery mounted and tag the initial list request.
    pub fn begin_mount(&mut self) -> Ticket {
        self.mounted = true;
        self.ticket()
    }

    /// Apply the initial list response. Returns whether it was applied.
    pub fn finish_mount(&mut self, ticket: Ticket, result: Result<Vec<SignatureRecord>>) -> bool {
        if !self.is_current(ticket) {
            debug!("dropping list response for a previous mount");
            return false;
        }
        match result {
            Ok(records) => {
                self.records = records;
                true
            }
            Err(e) => {
                error!("Error fetching signatures: {}", e);
                false
            }
        }
    }

    /// Tear the view down; responses still in flight will be ignored.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.generation += 1;
    }

    /// Check the pad and build the create payload.
    pub fn begin_submit(&mut self, pad: &SignaturePad) -> Submission {
        if pad.is_empty() {
            self.prompt(&Error::EmptySignature.to_string());
            return Submission::Done(SubmitOutcome::EmptyCanvas);
        }
        match pad.export() {
            Ok(image) => Submission::Ready {
                ticket: self.ticket(),
                payload: NewSignature::new(self.name.clone(), image),
            },
            Err(e) => {
                error!("Error saving signature: {}", e);
                Submission::Done(SubmitOutcome::Failed)
            }
        }
    }

    /// Apply the create response: append, then reset the pad and name.
    pub fn finish_submit(
        &mut self,
        ticket: Ticket,
        result: Result<SignatureRecord>,
        pad: &mut SignaturePad,
    ) -> SubmitOutcome {
        if !self.is_current(ticket) {
            debug!("dropping create response for a previous mount");
            return SubmitOutcome::Stale;
        }
        match result {
            Ok(record) => {
                self.records.push(record.clone());
                self.name.clear();
                pad.clear();
                SubmitOutcome::Saved(record)
            }
            Err(e) => {
                error!("Error saving signature: {}", e);
                SubmitOutcome::Failed
            }
        }
    }

    /// Blocking mount: fetch and apply the list.
    pub fn mount<A: SignatureApi>(&mut self, api: &A) -> bool {
        let ticket = self.begin_mount();
        let result = api.list();
        self.finish_mount(ticket, result)
    }

    /// Blocking submit of the pad's current content.
    pub fn submit<A: SignatureApi>(&mut self, api: &A, pad: &mut SignaturePad) -> SubmitOutcome {
        match self.begin_submit(pad) {
            Submission::Done(outcome) => outcome,
            Submission::Ready { ticket, payload } => {
                let result = api.create(&payload);
                self.finish_submit(ticket, result, pad)
            }
        }
    }
}

impl Default for Gallery {
    fn default() -> Self {
        Self::new()
    }
}
