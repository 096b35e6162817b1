use pushsync_client::{
    NotificationPresenter, Presentation, SubscriptionView, format_subscription,
};
use pushsync_sdk::{PushTransport, SdkError, SdkResult, SubscriptionRecord};

/// Prints the subscription list to stdout.
pub struct ConsoleView;

impl SubscriptionView for ConsoleView {
    fn show_subscriptions(&self, records: &[SubscriptionRecord]) {
        println!("📋 Subscriptions ({} total):", records.len());
        for (i, record) in records.iter().enumerate() {
            println!("  {}. {}", i + 1, format_subscription(record));
        }
    }
}

/// Prints alerts and notifications to stdout.
pub struct ConsolePresenter;

impl NotificationPresenter for ConsolePresenter {
    fn present(&self, presentation: &Presentation) {
        match presentation {
            Presentation::Alert(alert) => {
                println!("💬 {}", alert.title);
                println!("   {}", alert.body);
                println!("   [{}]", alert.dismiss_label);
            }
            Presentation::Notification(n) => {
                println!("🔔 {} (slot {})", n.title, n.slot);
                println!("   Message: {}", n.body);
                if let Some(badge) = n.badge {
                    println!("   Badge: {}", badge);
                }
                if n.sound {
                    println!("   Sound: on");
                }
                println!("   Time: {}", n.posted_at.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }
}

/// Transport used by one-shot commands that never wait for a token.
pub struct OfflineTransport;

impl PushTransport for OfflineTransport {
    fn request_token(&self) -> SdkResult<()> {
        Err(SdkError::NetworkError(
            "no push transport connected; use `pushsync run`".to_string(),
        ))
    }
}
