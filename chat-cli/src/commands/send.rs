//! Send a message.

use anyhow::{Context, Result};

use relaychat_client::{ChatSession, HttpTransport};

/// Run the send command.
pub async fn run<T: HttpTransport + 'static>(
    session: &ChatSession<T>,
    contact: &str,
    text: &str,
) -> Result<()> {
    println!("Sending to {}...", contact);

    let id = session
        .send(contact, text)
        .await
        .context("Message rejected")?;

    println!("Accepted by relay (send id {})", id);
    Ok(())
}
