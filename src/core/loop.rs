use colored::*;
use tokio::sync::mpsc::Receiver;

use crate::core::handler::TriggerHandler;
use crate::io::events::FlagEvent;

/// The processing loop. Single consumer: each handler invocation is awaited
/// before the next notification is taken, so rapid-fire changes queue up in
/// the channel instead of overlapping. Returns when the subscription task
/// goes away.
pub async fn bridge_loop(mut rx: Receiver<FlagEvent>, handler: TriggerHandler) {
    while let Some(event) = rx.recv().await {
        match event {
            FlagEvent::FlagChanged(value) => handler.handle(value).await,
            FlagEvent::SubscriptionError(e) => {
                println!("{} Subscription error: {}", "⚠️".red(), e);
            }
        }
    }
}
