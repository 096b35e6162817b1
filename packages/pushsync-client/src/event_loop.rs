use crate::dispatcher::MessageDispatcher;
use crate::error::ClientResult;
use crate::registration::RegistrationMachine;
use pushsync_sdk::PushEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Routes one transport event to the state machine or the dispatcher.
pub async fn handle_event(
    event: PushEvent,
    machine: &mut RegistrationMachine,
    dispatcher: &MessageDispatcher,
) -> ClientResult<()> {
    match event {
        PushEvent::Registered(token) => machine.handle_token(token).await,
        PushEvent::RegistrationFailed(kind) => machine.handle_transport_error(kind),
        PushEvent::Unregistered => machine.handle_unregistered(),
        PushEvent::Message(msg) => {
            dispatcher.dispatch(&msg);
            Ok(())
        }
    }
}

/// 单消费者事件循环，按到达顺序处理事件，直到通道关闭
///
/// Returns the number of events processed.
pub async fn run_event_loop(
    mut events: mpsc::UnboundedReceiver<PushEvent>,
    machine: &mut RegistrationMachine,
    dispatcher: &MessageDispatcher,
) -> usize {
    let mut processed = 0;
    while let Some(event) = events.recv().await {
        processed += 1;
        if let Err(e) = handle_event(event, machine, dispatcher).await {
            warn!(error = %e, "push event handling failed");
        }
    }
    debug!(processed, "push event queue closed");
    processed
}
