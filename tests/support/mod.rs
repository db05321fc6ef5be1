//! In-memory verifier stand-in shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};

use verifier_client::error::Result;
use verifier_client::protocol::{codes, Command, FrameBuffer, Opcode, Response};
use verifier_client::transport::{Connection, Connector};

/// What the stand-in does with one command.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with a well-formed frame.
    Respond(Response),
    /// Write these bytes verbatim, then close the connection.
    Raw(Vec<u8>),
    /// Close the connection without answering.
    Hangup,
}

type Responder = dyn Fn(&Command) -> Reply + Send + Sync;

/// Scripted verifier behaviour plus a record of what it saw.
#[derive(Clone)]
pub struct MockVerifier {
    greeting: Response,
    responder: Arc<Responder>,
    commands: Arc<Mutex<Vec<Command>>>,
    connects: Arc<AtomicUsize>,
}

impl MockVerifier {
    /// A verifier that accepts everything.
    pub fn new() -> Self {
        Self::with_responder(default_reply)
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> Reply + Send + Sync + 'static,
    {
        Self {
            greeting: Response::new(codes::OK, "verifier ready"),
            responder: Arc::new(responder),
            commands: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn greeting(mut self, greeting: Response) -> Self {
        self.greeting = greeting;
        self
    }

    /// Commands received so far, across all connections.
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count(&self, opcode: Opcode) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.opcode == opcode)
            .count()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            verifier: self.clone(),
        }
    }

    /// Serve one connection until the peer leaves or a hangup is scripted.
    pub async fn serve<S>(&self, mut stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if stream.write_all(&self.greeting.encode().unwrap()).await.is_err() {
            return;
        }

        let mut buffer = FrameBuffer::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            for command in buffer.push_commands(&chunk[..n]).unwrap() {
                self.commands.lock().unwrap().push(command.clone());
                match (self.responder)(&command) {
                    Reply::Respond(response) => {
                        if stream.write_all(&response.encode().unwrap()).await.is_err() {
                            return;
                        }
                    }
                    Reply::Raw(bytes) => {
                        let _ = stream.write_all(&bytes).await;
                        return;
                    }
                    Reply::Hangup => return,
                }
            }
        }
    }
}

/// Answers the way a healthy verifier does.
pub fn default_reply(command: &Command) -> Reply {
    let response = match command.opcode {
        Opcode::Mod | Opcode::Iface => Response::new(codes::MORE, ""),
        Opcode::Text => Response::new(codes::OK, "<span>checked</span>"),
        Opcode::Finish => Response::new(codes::OK, "ok"),
        Opcode::Del => Response::new(codes::OK, ""),
        Opcode::Quit => Response::new(codes::GOODBYE, "bye"),
    };
    Reply::Respond(response)
}

/// Connects to a [`MockVerifier`] over an in-memory pipe.
#[derive(Clone)]
pub struct MockConnector {
    verifier: MockVerifier,
}

impl Connector for MockConnector {
    type Stream = DuplexStream;

    async fn connect(&self) -> Result<Connection<DuplexStream>> {
        let (client, server) = duplex(64 * 1024);
        let verifier = self.verifier.clone();
        tokio::spawn(async move { verifier.serve(server).await });
        Ok(Connection::new(client, Duration::from_secs(2), "mock"))
    }
}
