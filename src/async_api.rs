use crate::element::Element;
use crate::renderer::{OgpRenderer, RenderOptions};
#[cfg(all(feature = "http", feature = "svg"))]
use crate::renderer::RendererConfig;
use crate::{Error, Result};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Initialize(oneshot::Sender<Result<()>>),
    Render(Box<Element>, RenderOptions, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly renderer backed by a dedicated worker thread.
///
/// The worker thread owns the `OgpRenderer` and runs commands one at a
/// time, so blocking fetches never stall the async runtime and renders
/// issued through one handle execute in submission order.
#[derive(Clone)]
pub struct AsyncRenderer {
    cmd_tx: Sender<Command>,
}

impl AsyncRenderer {
    /// Spawn a worker running the default engines.
    #[cfg(all(feature = "http", feature = "svg"))]
    pub async fn new(config: Option<RendererConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        Self::with_builder(move || OgpRenderer::new(config)).await
    }

    /// Spawn a worker whose renderer is produced by `build` on the worker
    /// thread itself.
    pub async fn with_builder<F>(build: F) -> Result<Self>
    where
        F: FnOnce() -> Result<OgpRenderer> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let renderer = match build() {
                Ok(r) => r,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Initialize(resp) => {
                        let _ = resp.send(renderer.initialize());
                    }
                    Command::Render(element, options, resp) => {
                        let _ = resp.send(renderer.render(&element, &options));
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
        });

        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Initialize the engines ahead of the first render.
    pub async fn initialize(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Initialize(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Initialize canceled: {}", e)))?
    }

    /// Render `element` to PNG bytes.
    pub async fn render(&self, element: Element, options: RenderOptions) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(Command::Render(Box::new(element), options, tx));
        rx.await
            .map_err(|e| Error::Other(format!("Render canceled: {}", e)))?
    }

    /// Stop the worker. Other clones of this handle stop working too.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}
