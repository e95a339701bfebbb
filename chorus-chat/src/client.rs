//! Chat client: connection, registration, events.
//!
//! This is the entry point for connector consumers. It manages the TCP
//! (optionally TLS) connection and IRC registration, emits events on an
//! mpsc channel, and accepts outbound commands through [`ClientHandle`].
//! Commands sent before registration completes are queued and flushed after
//! the server's 001 reply.
//!
//! The client does not reconnect on its own. Consumers listen for
//! [`Event::Disconnected`] and decide what to do.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls;

use crate::event::Event;
use crate::irc::Message;

/// Configuration for connecting to a chat server.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Server address (host:port).
    pub server_addr: String,
    /// Desired nickname.
    pub nick: String,
    /// Username (ident).
    pub user: String,
    /// Real name.
    pub realname: String,
    /// Server password (sent as PASS), if the server requires one.
    pub server_pass: Option<String>,
    /// Use TLS (also auto-detected from port 6697).
    pub tls: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:6667".to_string(),
            nick: "chorus".to_string(),
            user: "chorus".to_string(),
            realname: "chorus".to_string(),
            server_pass: None,
            tls: false,
        }
    }
}

/// Commands the consumer can send to the client.
#[derive(Debug)]
pub enum Command {
    Join(String),
    Privmsg { target: String, text: String },
    Raw(String),
    Quit(Option<String>),
}

/// A handle to a running client connection.
#[derive(Clone)]
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl ClientHandle {
    pub async fn join(&self, channel: &str) -> Result<()> {
        self.cmd_tx.send(Command::Join(channel.to_string())).await?;
        Ok(())
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        self.cmd_tx
            .send(Command::Privmsg {
                target: target.to_string(),
                text: text.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn raw(&self, line: &str) -> Result<()> {
        self.cmd_tx.send(Command::Raw(line.to_string())).await?;
        Ok(())
    }

    pub async fn quit(&self, message: Option<&str>) -> Result<()> {
        self.cmd_tx
            .send(Command::Quit(message.map(|s| s.to_string())))
            .await?;
        Ok(())
    }
}

/// Connect to a chat server and run the protocol in a spawned task.
///
/// Returns a handle for sending commands and a receiver for events.
pub fn connect(config: ConnectConfig) -> (ClientHandle, mpsc::Receiver<Event>) {
    let (event_tx, event_rx) = mpsc::channel(4096);
    let (cmd_tx, cmd_rx) = mpsc::channel(256);

    let handle = ClientHandle { cmd_tx };

    tokio::spawn(async move {
        if let Err(e) = run_client(config, event_tx.clone(), cmd_rx).await {
            let _ = event_tx
                .send(Event::Disconnected {
                    reason: e.to_string(),
                })
                .await;
        }
    });

    (handle, event_rx)
}

async fn run_client(
    config: ConnectConfig,
    event_tx: mpsc::Sender<Event>,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<()> {
    let use_tls = config.tls || config.server_addr.ends_with(":6697");

    tracing::debug!(server = %config.server_addr, tls = use_tls, "connecting");
    let tcp = TcpStream::connect(&config.server_addr)
        .await
        .map_err(|e| anyhow::anyhow!("TCP connect to {} failed: {e}", config.server_addr))?;
    let _ = event_tx.send(Event::Connected).await;

    if use_tls {
        let connector = TlsConnector::from(Arc::new(rustls_config()));
        let server_name = config
            .server_addr
            .split(':')
            .next()
            .unwrap_or("localhost");
        let dns_name = rustls::pki_types::ServerName::try_from(server_name.to_string())?;
        let tls = connector
            .connect(dns_name, tcp)
            .await
            .map_err(|e| anyhow::anyhow!("TLS handshake with {} failed: {e}", config.server_addr))?;
        let (reader, writer) = tokio::io::split(tls);
        run_protocol(BufReader::new(reader), writer, &config, event_tx, cmd_rx).await
    } else {
        let (reader, writer) = tokio::io::split(tcp);
        run_protocol(BufReader::new(reader), writer, &config, event_tx, cmd_rx).await
    }
}

fn rustls_config() -> rustls::ClientConfig {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

async fn run_protocol<R, W>(
    mut reader: R,
    mut writer: W,
    config: &ConnectConfig,
    event_tx: mpsc::Sender<Event>,
    mut cmd_rx: mpsc::Receiver<Command>,
) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Some(pass) = &config.server_pass {
        writer.write_all(format!("PASS {pass}\r\n").as_bytes()).await?;
    }
    writer
        .write_all(format!("NICK {}\r\n", config.nick).as_bytes())
        .await?;
    writer
        .write_all(format!("USER {} 0 * :{}\r\n", config.user, config.realname).as_bytes())
        .await?;

    let mut registered = false;
    let mut nick_tries: u32 = 0;
    let mut pending: Vec<Command> = Vec::new();
    let mut line_buf = String::new();
    let mut last_activity = tokio::time::Instant::now();
    let mut keepalive = tokio::time::interval(Duration::from_secs(30));
    const PING_IDLE: Duration = Duration::from_secs(60);
    const PING_DEAD: Duration = Duration::from_secs(120);

    loop {
        tokio::select! {
            result = reader.read_line(&mut line_buf) => {
                let n = result?;
                if n == 0 {
                    let _ = event_tx.send(Event::Disconnected { reason: "EOF".to_string() }).await;
                    break;
                }
                last_activity = tokio::time::Instant::now();
                let _ = event_tx.send(Event::RawLine(line_buf.trim_end().to_string())).await;

                if let Some(msg) = Message::parse(&line_buf) {
                    match msg.command.as_str() {
                        "PING" => {
                            let token = msg.params.first().map(|s| s.as_str()).unwrap_or("");
                            writer.write_all(format!("PONG :{token}\r\n").as_bytes()).await?;
                        }
                        "001" => {
                            let nick = msg.params.first().cloned().unwrap_or_default();
                            let _ = event_tx.send(Event::Registered { nick }).await;
                            registered = true;
                            for cmd in pending.drain(..) {
                                write_command(&mut writer, cmd).await?;
                            }
                        }
                        // ERR_NICKNAMEINUSE: retry with a numeric suffix a few times
                        "433" => {
                            nick_tries += 1;
                            if nick_tries <= 5 {
                                writer
                                    .write_all(format!("NICK {}{}\r\n", config.nick, nick_tries).as_bytes())
                                    .await?;
                            } else {
                                let _ = event_tx.send(Event::Disconnected {
                                    reason: "nick in use".to_string(),
                                }).await;
                                break;
                            }
                        }
                        "PRIVMSG" => {
                            if msg.params.len() >= 2 {
                                let from = msg.source_nick().unwrap_or("").to_string();
                                let _ = event_tx.send(Event::Message {
                                    from,
                                    target: msg.params[0].clone(),
                                    text: msg.params[1].clone(),
                                }).await;
                            }
                        }
                        "JOIN" => {
                            let channel = msg.params.first().cloned().unwrap_or_default();
                            let nick = msg.source_nick().unwrap_or("").to_string();
                            let _ = event_tx.send(Event::Joined { channel, nick }).await;
                        }
                        "PART" => {
                            let channel = msg.params.first().cloned().unwrap_or_default();
                            let nick = msg.source_nick().unwrap_or("").to_string();
                            let _ = event_tx.send(Event::Parted { channel, nick }).await;
                        }
                        "QUIT" => {
                            let nick = msg.source_nick().unwrap_or("").to_string();
                            let reason = msg.params.first().cloned().unwrap_or_default();
                            let _ = event_tx.send(Event::UserQuit { nick, reason }).await;
                        }
                        _ => {}
                    }
                }
                line_buf.clear();
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Quit(message)) => {
                        write_command(&mut writer, Command::Quit(message)).await?;
                        break;
                    }
                    Some(cmd) if registered => write_command(&mut writer, cmd).await?,
                    Some(cmd) => pending.push(cmd),
                    None => break,
                }
            }

            _ = keepalive.tick() => {
                let idle = last_activity.elapsed();
                if idle >= PING_DEAD {
                    let _ = event_tx.send(Event::Disconnected {
                        reason: "ping timeout".to_string(),
                    }).await;
                    break;
                }
                if idle >= PING_IDLE {
                    writer.write_all(b"PING :keepalive\r\n").await?;
                }
            }
        }
    }

    Ok(())
}

async fn write_command<W: AsyncWrite + Unpin>(writer: &mut W, cmd: Command) -> Result<()> {
    let line = match cmd {
        Command::Join(channel) => format!("JOIN {channel}"),
        Command::Privmsg { target, text } => format!("PRIVMSG {target} :{text}"),
        Command::Raw(line) => line,
        Command::Quit(message) => match message {
            Some(m) => format!("QUIT :{m}"),
            None => "QUIT".to_string(),
        },
    };
    writer.write_all(format!("{line}\r\n").as_bytes()).await?;
    Ok(())
}
