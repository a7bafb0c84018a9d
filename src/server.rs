use crate::commands::CommandInterpreter;
use crate::config::Config;
use crate::error::{Result, WaypointError};
use crate::logger::{log, LogSeverity};
use crate::protocol::{Codec, Schema};
use crate::proxy::{DirectedPacket, ProxySession};
use crate::world::{updater, SharedWorld, World};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use LogSeverity::*;

/// Process-wide state handed to every connection.
#[derive(Clone)]
struct Shared {
    config: Arc<Config>,
    codec: Codec,
    world: SharedWorld,
    world_tx: UnboundedSender<DirectedPacket>,
}

/// Starts the world worker and relays every accepted client to the upstream
/// server. Only returns if the listener cannot be bound.
pub async fn run(config: Config) -> Result<()> {
    let listener = TcpListener::bind(&config.listen_address).await?;
    log(
        format!(
            "Listening on {}, relaying to {}",
            config.listen_address, config.server_address
        ),
        Info,
    );

    let world = World::shared();
    let (world_tx, world_rx) = mpsc::unbounded_channel();
    tokio::spawn(updater::run(world.clone(), world_rx));

    let shared = Shared {
        codec: Codec::new(Arc::new(Schema::beta()), config.float_mode),
        config: Arc::new(config),
        world,
        world_tx,
    };

    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                log(format!("New connection from: {}", addr), Info);
                tokio::spawn(handle_connection(socket, addr, shared.clone()));
            }
            Err(err) => log(format!("Failed to accept connection: {}", err), Error),
        }
    }
}

/// Connects upstream for one client and runs the session to completion.
async fn handle_connection(client: TcpStream, addr: SocketAddr, shared: Shared) {
    let server = match TcpStream::connect(&shared.config.server_address).await {
        Ok(server) => server,
        Err(err) => {
            log(
                format!(
                    "Failed to connect to {} for {}: {}",
                    shared.config.server_address, addr, err
                ),
                Error,
            );
            return;
        }
    };
    for socket in [&client, &server] {
        if let Err(err) = socket.set_nodelay(true) {
            log(format!("Failed to set TCP_NODELAY: {}", err), Warning);
        }
    }

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (session, handle) = ProxySession::new(
        &shared.config,
        shared.codec.clone(),
        client,
        server,
        shared.world_tx.clone(),
        command_tx,
    );
    let interpreter = CommandInterpreter::new(
        shared.codec.clone(),
        handle,
        shared.world.clone(),
        shared.config.command_prefix.clone(),
    );
    tokio::spawn(interpreter.run(command_rx));

    match session.run().await {
        Err(WaypointError::IoError(err)) if is_disconnect(&err) => {
            log(format!("Session for {} closed: {}", addr, err), Info)
        }
        Err(err) => log(format!("Session for {} failed: {}", addr, err), Error),
        Ok(()) => log(format!("Session for {} closed", addr), Info),
    }
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
