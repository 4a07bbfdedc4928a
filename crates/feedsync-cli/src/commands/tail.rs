//! Tail a feed
//!
//! Reads simple commands from stdin while the feed runs:
//! `more` loads the next older page, `top` scrolls to the top (which loads
//! the next page when the feed allows it), `status` prints the feed state
//! and `quit` unmounts.

use crate::terminal_sink::TerminalSink;
use anyhow::Result;
use clap::Args;
use feedsync_client::{launch_feed, ClientConfig, FeedHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Follow one configured feed
#[derive(Args)]
pub struct TailCommand {
    /// Feed name from the config
    #[arg(short, long)]
    pub feed: String,

    /// Visible rows of the simulated viewport
    #[arg(long, default_value = "24")]
    pub rows: u32,
}

/// Run the feed until `quit`, end of input or Ctrl+C
pub async fn run(cmd: TailCommand, config: &ClientConfig) -> Result<()> {
    let sink = TerminalSink::new(cmd.rows);
    let (handle, task) = launch_feed(config, &cmd.feed, sink.clone())?;
    info!(feed = %cmd.feed, "Tailing feed; commands: more, top, status, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !dispatch(line.trim(), &handle, &sink).await? {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    if let Err(e) = handle.teardown() {
        warn!(error = %e, "Feed already stopped");
    }
    let model = task.await?;
    info!(feed = %cmd.feed, entries = model.len(), "Feed closed");
    Ok(())
}

/// Returns false when the loop should stop
async fn dispatch(command: &str, handle: &FeedHandle, sink: &TerminalSink) -> Result<bool> {
    match command {
        "" => {}
        "more" => handle.load_more()?,
        "top" => {
            sink.scroll_to_top();
            handle.scrolled()?;
        }
        "status" => {
            let snapshot = handle.snapshot().await?;
            println!(
                "entries={} page={} has_more={} loading={} channel={}",
                snapshot.len(),
                snapshot.cursor,
                snapshot.has_more,
                snapshot.in_flight,
                snapshot.channel_state
            );
        }
        "quit" | "q" => return Ok(false),
        other => eprintln!("unknown command: {other} (more, top, status, quit)"),
    }
    Ok(true)
}
