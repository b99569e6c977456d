//! List contacts with their unseen message counts.

use anyhow::Result;

use relaychat_client::{ChatSession, HttpTransport};

/// Run the contacts command.
pub async fn run<T: HttpTransport + 'static>(session: &ChatSession<T>) -> Result<()> {
    session.poll_once().await;
    print!("{}", render(session));
    Ok(())
}

/// Contact list as printed by the command.
pub fn render<T: HttpTransport + 'static>(session: &ChatSession<T>) -> String {
    let counts = session.unseen_counts().get();
    let mut out = format!("Contacts of {}:\n", session.identity());

    if counts.iter().next().is_none() {
        out.push_str("  (none)\n");
    }
    for (contact, unseen) in counts.iter() {
        if unseen > 0 {
            out.push_str(&format!("  {} ({} unseen)\n", contact, unseen));
        } else {
            out.push_str(&format!("  {}\n", contact));
        }
    }
    out
}
