//! Configuration check

use anyhow::Result;
use feedsync_client::ClientConfig;

/// Print every feed with its resolved endpoints
///
/// The config was validated on load, so this only reports.
pub fn run(config: &ClientConfig) -> Result<()> {
    let base = config.base_url()?;
    let channel = config.channel_config();
    println!("server    {base}");
    println!(
        "channel   reconnect every {:?}, connect timeout {:?}",
        channel.reconnect_delay, channel.connect_timeout
    );

    for feed in &config.feeds {
        let endpoints = feed.endpoints(&base)?;
        let options = feed.options();
        println!();
        println!("[{}] {}", feed.name, feed.kind);
        println!("  channel {}", endpoints.channel);
        match &endpoints.history {
            Some(url) => println!("  history {url}"),
            None => println!("  history none"),
        }
        println!("  stick   {:?}", options.stick);
    }
    Ok(())
}
