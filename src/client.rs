//! Client side of the signature API.
//!
//! [`SignatureApi`] is what the gallery talks to. [`HttpClient`] implements it
//! over blocking reqwest; tests substitute their own implementations.

use crate::record::{NewSignature, RecordId, SignatureRecord};
use crate::Result;

#[cfg(feature = "client")]
use crate::{config::ClientConfig, Error};
#[cfg(feature = "client")]
use reqwest::blocking::{Client, Response};
#[cfg(feature = "client")]
use std::time::Duration;
#[cfg(feature = "client")]
use url::Url;

/// The three operations the service exposes.
pub trait SignatureApi {
    fn list(&self) -> Result<Vec<SignatureRecord>>;

    fn create(&self, signature: &NewSignature) -> Result<SignatureRecord>;

    fn delete(&self, id: &RecordId) -> Result<SignatureRecord>;
}

impl<A: SignatureApi + ?Sized> SignatureApi for &A {
    fn list(&self) -> Result<Vec<SignatureRecord>> {
        (**self).list()
    }

    fn create(&self, signature: &NewSignature) -> Result<SignatureRecord> {
        (**self).create(signature)
    }

    fn delete(&self, id: &RecordId) -> Result<SignatureRecord> {
        (**self).delete(id)
    }
}

/// Blocking HTTP client for a running signature service.
#[cfg(feature = "client")]
pub struct HttpClient {
    client: Client,
    collection: Url,
}

#[cfg(feature = "client")]
impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| Error::ConfigError(format!("invalid base url {}: {}", config.base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let collection = base
            .join("signatures")
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, collection })
    }

    /// URL of the signatures collection.
    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    fn item_url(&self, id: &RecordId) -> Result<Url> {
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| Error::ConfigError("base url cannot carry a path".into()))?
            .push(id.as_str());
        Ok(url)
    }
}

/// Turn a non-success response into [`Error::Http`], using the body's
/// `message` field when it has one.
#[cfg(feature = "client")]
fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    if status.as_u16() == 404 && message == Error::NotFound.to_string() {
        return Err(Error::NotFound);
    }
    Err(Error::Http {
        status: status.as_u16(),
        message,
    })
}

#[cfg(feature = "client")]
impl SignatureApi for HttpClient {
    fn list(&self) -> Result<Vec<SignatureRecord>> {
        let response = self.client.get(self.collection.clone()).send()?;
        Ok(check(response)?.json()?)
    }

    fn create(&self, signature: &NewSignature) -> Result<SignatureRecord> {
        let response = self
            .client
            .post(self.collection.clone())
            .json(signature)
            .send()?;
        Ok(check(response)?.json()?)
    }

    fn delete(&self, id: &RecordId) -> Result<SignatureRecord> {
        let response = self.client.delete(self.item_url(id)?).send()?;
        Ok(check(response)?.json()?)
    }
}
