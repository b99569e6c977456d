//! Follow the relay and print messages as they arrive.

use anyhow::{Context, Result};
use std::cell::Cell;
use std::rc::Rc;

use relaychat_client::{ChatSession, HttpTransport};

use super::{format_message, now_secs};

/// Run the watch command.
pub async fn run<T: HttpTransport + 'static>(session: &Rc<ChatSession<T>>) -> Result<()> {
    println!("Watching as {} (Ctrl-C to stop)", session.identity());

    let me = session.identity().clone();
    let printed = Rc::new(Cell::new(0usize));
    let p = Rc::clone(&printed);
    let _log = session.log().subscribe(move |log| {
        let now = now_secs();
        for message in log.as_slice().iter().skip(p.get()) {
            println!("{}", format_message(message, &me, now));
        }
        p.set(log.len());
    });
    let _status = session
        .connectivity()
        .subscribe(|state| println!("[{}]", state));

    let poller = session.spawn_poller();
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    poller.abort();

    println!();
    println!("{} messages received", printed.get());
    Ok(())
}
