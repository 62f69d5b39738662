//! Signbook
//!
//! A guestbook where visitors sign with a hand-drawn signature. The crate
//! covers the whole path of a signature:
//!
//! - **Capture**: [`capture::SignaturePad`] records strokes and exports them
//!   as a PNG data URI
//! - **Service**: [`service::SignatureService`] exposes list / create /
//!   delete over HTTP (`server` feature, tiny_http)
//! - **Store**: [`store::JournalStore`] keeps records durably in insertion
//!   order; [`store::MemoryStore`] for tests
//! - **Gallery**: [`gallery::Gallery`] keeps the visitor's view in step with
//!   the service (`client` feature, reqwest)
//!
//! # Example
//!
//! ```no_run
//! use signbook::capture::{Point, SignaturePad};
//! use signbook::gallery::{Gallery, SubmitOutcome};
//! use signbook::{ClientConfig, HttpClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let api = HttpClient::new(ClientConfig::default())?;
//! let mut gallery = Gallery::new();
//! gallery.mount(&api);
//!
//! let mut pad = SignaturePad::new();
//! pad.draw_stroke([Point::new(20.0, 80.0), Point::new(200.0, 30.0)]);
//! gallery.set_name("Alice");
//! if let SubmitOutcome::Saved(record) = gallery.submit(&api, &mut pad) {
//!     println!("signed as {}", record.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{ClientConfig, ServerConfig};

pub mod record;
pub use record::{NewSignature, RecordId, SignatureRecord};

pub mod store;

// Transport-independent routing; the tiny_http listener lives in `service::http`
pub mod service;

pub mod client;
#[cfg(feature = "client")]
pub use client::HttpClient;

// Async facade over the blocking client
#[cfg(feature = "client")]
pub mod async_api;
#[cfg(feature = "client")]
pub use async_api::AsyncClient;

pub mod capture;
pub mod gallery;
pub mod visibility;

/// Open a durable store and start serving it as described by `config`.
#[cfg(feature = "server")]
pub fn start_server(config: &ServerConfig) -> Result<service::http::ServerHandle<store::JournalStore>> {
    let store = store::JournalStore::open(
        &config.data_path,
        store::JournalOptions {
            sync: config.sync,
            ..Default::default()
        },
    )?;
    service::http::serve(config, store)
}
