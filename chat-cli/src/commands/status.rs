//! Show session status.

use anyhow::Result;

use relaychat_client::{ChatSession, HttpTransport};

/// Run the status command.
pub async fn run<T: HttpTransport + 'static>(session: &ChatSession<T>) -> Result<()> {
    session.poll_once().await;
    print!("{}", render(session));
    Ok(())
}

/// Status report as printed by the command.
pub fn render<T: HttpTransport + 'static>(session: &ChatSession<T>) -> String {
    let log = session.log().get();
    let cursor = session
        .cursor()
        .get()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "(none)".to_string());

    let mut out = String::new();
    out.push_str("=== relaychat status ===\n\n");
    out.push_str(&format!("Identity:     {}\n", session.identity()));
    out.push_str(&format!("Contacts:     {}\n", session.contacts().get().len()));
    out.push_str(&format!("Messages:     {}\n", log.len()));
    out.push_str(&format!(
        "Unseen:       {}\n",
        session.unseen_counts().get().total()
    ));
    out.push_str(&format!("Cursor:       {}\n", cursor));
    out.push_str(&format!("Connectivity: {}\n", session.connectivity().get()));
    out
}
