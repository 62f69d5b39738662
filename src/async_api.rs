use crate::client::{HttpClient, SignatureApi};
use crate::config::ClientConfig;
use crate::record::{NewSignature, RecordId, SignatureRecord};
use crate::{Error, Result};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    List(oneshot::Sender<Result<Vec<SignatureRecord>>>),
    Create(NewSignature, oneshot::Sender<Result<SignatureRecord>>),
    Delete(RecordId, oneshot::Sender<Result<SignatureRecord>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly signature client backed by a dedicated worker thread.
///
/// The worker thread owns a blocking [`HttpClient`] and executes commands
/// sent from async tasks, so a request only suspends the task awaiting it
/// and never blocks the runtime. Requests are not cancellable; dropping the
/// returned future just discards the response when it arrives.
#[derive(Clone)]
pub struct AsyncClient {
    cmd_tx: Sender<Command>,
}

impl AsyncClient {
    /// Create a new client (spawns a background thread that owns the HTTP client).
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::Builder::new()
            .name("signbook-client".into())
            .spawn(move || {
                let client = match HttpClient::new(config) {
                    Ok(c) => c,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };

                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::List(resp) => {
                            let _ = resp.send(client.list());
                        }
                        Command::Create(new, resp) => {
                            let _ = resp.send(client.create(&new));
                        }
                        Command::Delete(id, resp) => {
                            let _ = resp.send(client.delete(&id));
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(Ok(()));
                            break;
                        }
                    }
                }
            })?;

        init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    /// Fetch every record in insertion order.
    pub async fn list(&self) -> Result<Vec<SignatureRecord>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::List(tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("List canceled: {}", e)))?
    }

    /// Submit a new record; resolves to the stored record with its id.
    pub async fn create(&self, signature: NewSignature) -> Result<SignatureRecord> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Create(signature, tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Create canceled: {}", e)))?
    }

    /// Delete a record by id.
    pub async fn delete(&self, id: &RecordId) -> Result<SignatureRecord> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Delete(id.clone(), tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Delete canceled: {}", e)))?
    }

    /// Shut down the background worker.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::Other("client worker has shut down".into()))
    }
}
