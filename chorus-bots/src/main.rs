//! Process entry: settings, fleet launch, chat connection, ingress task,
//! and the perpetual turn loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use chorus_chat::client::{self, ConnectConfig};
use chorus_chat::event::Event;

use chorus_bots::config::Settings;
use chorus_bots::extract::Extractor;
use chorus_bots::fleet::Fleet;
use chorus_bots::mailbox::Mailbox;
use chorus_bots::scheduler::{self, Scheduler, SchedulerConfig};

#[derive(Parser)]
#[command(name = "chorus-bots", about = "Unattended multi-speaker chat conversation")]
struct Args {
    /// Settings file.
    #[arg(long, default_value = "chorus.toml")]
    config: PathBuf,

    /// Override the chat server address (host:port).
    #[arg(long)]
    server: Option<String>,

    /// Override the channel.
    #[arg(long)]
    channel: Option<String>,

    /// Override the nick.
    #[arg(long)]
    nick: Option<String>,

    /// Server password (or set CHORUS_SERVER_PASS).
    #[arg(long, env = "CHORUS_SERVER_PASS")]
    server_pass: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chorus_bots=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(&args.config)?;
    if let Some(server) = args.server {
        settings.server = server;
    }
    if let Some(channel) = args.channel {
        settings.channel = channel;
    }
    if let Some(nick) = args.nick {
        settings.nick = nick;
    }
    if args.server_pass.is_some() {
        settings.server_pass = args.server_pass;
    }

    tracing::info!(
        server = %settings.server,
        channel = %settings.channel,
        speakers = settings.speakers.len(),
        "starting chorus"
    );

    let extractor = Extractor::new()?;
    let fleet = Arc::new(Fleet::launch(&settings)?);
    let mailbox = Arc::new(Mailbox::new());

    let (handle, mut events) = client::connect(ConnectConfig {
        server_addr: settings.server.clone(),
        nick: settings.nick.clone(),
        user: settings.nick.clone(),
        realname: "chorus conversation bot".to_string(),
        server_pass: settings.server_pass.clone(),
        tls: settings.tls,
    });

    // The loop may not start before the platform says we're in.
    wait_for_ready(&mut events).await?;
    handle.join(&settings.channel).await?;

    // Ingress runs beside the turn loop; it only touches the mailbox, so
    // inbound messages keep flowing while a worker query is in flight.
    {
        let fleet = Arc::clone(&fleet);
        let mailbox = Arc::clone(&mailbox);
        let nick = settings.nick.clone();
        let channel = settings.channel.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    Event::Message { from, target, text } => {
                        if from != nick && target == channel {
                            scheduler::record_inbound(fleet.speakers(), &mailbox, &text);
                        }
                    }
                    Event::Disconnected { reason } => {
                        tracing::warn!(%reason, "chat connection lost");
                    }
                    _ => {}
                }
            }
        });
    }

    // Workers need time to load their models before taking traffic.
    tracing::info!(secs = settings.warmup_secs, "waiting for workers to warm up");
    tokio::time::sleep(Duration::from_secs(settings.warmup_secs)).await;

    let scheduler = Scheduler::new(
        Arc::clone(&fleet),
        handle.clone(),
        Arc::clone(&mailbox),
        extractor,
        SchedulerConfig {
            channel: settings.channel.clone(),
            min_pause_ms: settings.min_pause_ms,
            max_pause_ms: settings.max_pause_ms,
            reply_bias: settings.reply_bias,
        },
    );

    tracing::info!("conversation loop running, Ctrl+C to stop");
    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt, shutting down");
        }
    }

    let _ = handle.quit(Some("conversation over")).await;
    fleet.shutdown().await;
    Ok(())
}

async fn wait_for_ready(events: &mut tokio::sync::mpsc::Receiver<Event>) -> Result<()> {
    loop {
        match tokio::time::timeout(Duration::from_secs(15), events.recv()).await {
            Ok(Some(Event::Registered { nick })) => {
                tracing::info!(%nick, "registered with chat server");
                return Ok(());
            }
            Ok(Some(_)) => continue,
            Ok(None) => anyhow::bail!("connection closed during registration"),
            Err(_) => anyhow::bail!("registration timeout"),
        }
    }
}
