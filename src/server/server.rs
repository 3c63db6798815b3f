use crate::scheduler::MidnightScheduler;
use crate::sequence::SequenceCounter;
use crate::server::{TicketFormat, TicketService};
use crate::storage::{FileStore, StoreError};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::{debug, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

pub struct SeqServerOptions {
    pub host: String,
    pub port: u16,
    pub state_path: PathBuf,
    pub ticket_format: TicketFormat,
    pub persist_queue: usize,
}

pub struct SeqServer {
    options: SeqServerOptions,
}

impl SeqServer {
    pub fn new(options: SeqServerOptions) -> Self {
        SeqServer { options }
    }

    /// Loads the sequence, then serves until `shutdown` resolves. Nothing is
    /// bound when the state cannot be loaded.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), StartupError> {
        let store = Arc::new(FileStore::new(&self.options.state_path));
        info!("sequence state file: {}", store.path().display());

        let counter = Arc::new(SequenceCounter::open(store, self.options.persist_queue).await?);

        let addr = format!("{}:{}", self.options.host, self.options.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;

        let scheduler = MidnightScheduler::new(Arc::clone(&counter)).start();

        let service = TicketService::new(Arc::clone(&counter), self.options.ticket_format);

        info!("seq http is listening, addr = {}", listener.local_addr()?);

        Self::serve(listener, service, shutdown).await;

        scheduler.abort();
        counter.shutdown().await;

        info!("server stopped, seq={}", counter.current());

        Ok(())
    }

    async fn serve(listener: TcpListener, service: TicketService, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote)) => Self::spawn_connection(stream, remote, service.clone()),
                        Err(err) => warn!("accept error: {}", err),
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    return;
                }
            }
        }
    }

    fn spawn_connection(stream: tokio::net::TcpStream, remote: SocketAddr, service: TicketService) {
        tokio::spawn(async move {
            let handler = service_fn(move |request| {
                let service = service.clone();
                async move { service.handle(request).await }
            });

            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), handler)
                .await
            {
                debug!("connection error, remote={}, err={}", remote, err);
            }
        });
    }
}

/// Failures that stop the process before it serves anything.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("sequence state unavailable: {0}")]
    State(#[from] StoreError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("listener error: {0}")]
    Listener(#[from] io::Error),
}
