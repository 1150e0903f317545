//! Binary entry point. The concrete transport that delivers a notification
//! to a target agent session lives outside this crate as an injected
//! capability; this binary wires in a logging stand-in so the service is
//! runnable standalone, and `mission_control::rocket` can be called directly
//! by an embedder that supplies its own `SendViaSessions`.

use async_trait::async_trait;
use mission_control::worker::{SendOutcome, SendRequest, SendViaSessions};
use std::sync::Arc;

struct LoggingSender;

#[async_trait]
impl SendViaSessions for LoggingSender {
    async fn send(&self, request: SendRequest) -> SendOutcome {
        println!(
            "mission control: would deliver notification {} to {} (task {})",
            request.notification_id, request.target_session_key, request.task_id
        );
        SendOutcome {
            ok: true,
            ..Default::default()
        }
    }
}

#[rocket::main]
async fn main() {
    let sender: Arc<dyn SendViaSessions> = Arc::new(LoggingSender);
    let result = mission_control::rocket(sender).launch().await;
    if let Err(e) = result {
        eprintln!("mission control: server error: {e}");
        std::process::exit(1);
    }
}
