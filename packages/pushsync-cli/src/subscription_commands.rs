use anyhow::{Result, bail};
use clap::Subcommand;
use pushsync_client::RegistrationMachine;

#[derive(Subcommand)]
pub enum SubscriptionAction {
    /// List the device's subscriptions
    List,
    /// Subscribe to a topic
    Add {
        /// Subscription name
        name: String,
    },
    /// Unsubscribe from a topic
    Remove {
        /// Subscription name
        name: String,
    },
}

/// `machine` must already be started from a stored token.
pub async fn handle_subscription_command(
    machine: &mut RegistrationMachine,
    action: SubscriptionAction,
) -> Result<()> {
    if !machine.state().is_registered() {
        bail!("device is not registered (state: {})", machine.state());
    }

    match action {
        SubscriptionAction::List => {}
        SubscriptionAction::Add { name } => toggle(machine, &name, true).await?,
        SubscriptionAction::Remove { name } => toggle(machine, &name, false).await?,
    }
    Ok(())
}

async fn toggle(machine: &mut RegistrationMachine, name: &str, subscribed: bool) -> Result<()> {
    if let Some(record) = machine.subscriptions().find(name) {
        if record.subscribed == subscribed {
            println!("ℹ️  '{}' is already {}", name, describe(subscribed));
        }
    } else {
        println!("⚠️  '{}' is not in the current subscription list", name);
    }

    machine.reconciler().on_toggle(name, subscribed).await?;
    println!("✅ '{}' {}", name, describe(subscribed));

    // 开关不会修改本地列表，重新拉取以显示最新状态
    machine.refresh_subscriptions().await?;
    Ok(())
}

fn describe(subscribed: bool) -> &'static str {
    if subscribed { "subscribed" } else { "unsubscribed" }
}
