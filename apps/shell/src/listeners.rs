use herald_events::{
    AsyncListenerFn, DispatchError, Dispatcher, Event, EventKey, ListenerFn, ListenerResult,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) const USER_LOGIN: &str = "user:login";
pub(crate) const ORDER_PLACED: &str = "order:placed";
pub(crate) const SYSTEM_SHUTDOWN: &str = "system:shutdown";

/// Payload shared by every event family the shell emits.
#[derive(Debug, Clone)]
pub(crate) enum ShellEvent {
    UserLogin { user: String },
    OrderPlaced { id: u64, total_cents: u64 },
    Shutdown { reason: &'static str },
}

/// Registers the shell's listeners.
///
/// # Errors
/// Returns [`DispatchError::InvalidKey`] if one of the keys above is blank.
pub(crate) fn register_all(dispatcher: &Dispatcher<ShellEvent>) -> Result<(), DispatchError> {
    dispatcher.register(EventKey::wildcard(), ListenerFn::arc(audit));
    dispatcher.register(EventKey::new(USER_LOGIN)?, ListenerFn::arc(greet));
    dispatcher.register(EventKey::new(ORDER_PLACED)?, AsyncListenerFn::arc(charge));
    dispatcher.register(EventKey::new(ORDER_PLACED)?, AsyncListenerFn::arc(reserve_stock));
    dispatcher.register(EventKey::new(SYSTEM_SHUTDOWN)?, AsyncListenerFn::arc(flush));
    Ok(())
}

fn audit(event: Arc<Event<ShellEvent>>) -> ListenerResult {
    info!(event = %event.name(), payload = ?event.payload(), "Audit");
    Ok(())
}

fn greet(event: Arc<Event<ShellEvent>>) -> ListenerResult {
    let ShellEvent::UserLogin { user } = event.payload() else {
        return Ok(());
    };
    if user.trim().is_empty() {
        return Err("anonymous login rejected".into());
    }
    info!(%user, "Welcome back");
    Ok(())
}

async fn charge(event: Arc<Event<ShellEvent>>) -> ListenerResult {
    let ShellEvent::OrderPlaced { id, total_cents } = *event.payload() else {
        return Ok(());
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    if total_cents == 0 {
        return Err(format!("order {id} has nothing to charge").into());
    }
    info!(order = id, total_cents, "Payment captured");
    Ok(())
}

/// Slower for larger order ids, which lets the timeout kick in.
async fn reserve_stock(event: Arc<Event<ShellEvent>>) -> ListenerResult {
    let ShellEvent::OrderPlaced { id, .. } = *event.payload() else {
        return Ok(());
    };
    tokio::time::sleep(Duration::from_millis(id.saturating_mul(100))).await;
    info!(order = id, "Stock reserved");
    Ok(())
}

async fn flush(event: Arc<Event<ShellEvent>>) -> ListenerResult {
    if let ShellEvent::Shutdown { reason } = event.payload() {
        info!(reason, "Flushing buffers");
    }
    tokio::time::sleep(Duration::from_secs(1)).await;
    info!("Buffers flushed");
    Ok(())
}
