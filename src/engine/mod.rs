pub mod guard;
pub mod lifecycle;
pub mod locks;
pub mod payment;
pub mod rating;

use std::future::Future;
use std::time::Instant;

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::ride::Ride;
use crate::notify::Delivery;
use crate::state::AppState;

/// Runs one ride operation and records its outcome and latency.
pub(crate) async fn timed<T, F>(
    state: &AppState,
    operation: &'static str,
    fut: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    let start = Instant::now();
    let result = fut.await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    };
    state
        .metrics
        .ride_operations_total
        .with_label_values(&[operation, outcome])
        .inc();
    state
        .metrics
        .ride_operation_latency_seconds
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());

    result
}

/// Takes the ride's lock. Unknown ids fail with `NotFound` before any lock
/// entry is created.
pub(crate) async fn lock_ride(
    state: &AppState,
    ride_id: Uuid,
) -> Result<OwnedMutexGuard<()>, AppError> {
    if !state.store.contains_ride(ride_id) {
        return Err(AppError::NotFound(format!("ride {ride_id} not found")));
    }
    Ok(state.ride_locks.acquire(ride_id).await)
}

/// Applies a guarded mutation to the stored ride. The closure must leave the
/// record untouched when it returns an error.
pub(crate) fn apply_to_ride<F>(state: &AppState, ride_id: Uuid, mutate: F) -> Result<Ride, AppError>
where
    F: FnOnce(&mut Ride) -> Result<(), AppError>,
{
    let mut outcome = Ok(());
    let updated = state
        .store
        .update_ride(ride_id, |ride| outcome = mutate(ride))
        .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;

    outcome.map(|()| updated)
}

pub(crate) fn notify(state: &AppState, user_id: Uuid, notification: Notification) -> Delivery {
    let delivery = state.notifier.send_to_user(user_id, notification);
    count_delivery(state, delivery);
    delivery
}

pub(crate) fn count_delivery(state: &AppState, delivery: Delivery) {
    state
        .metrics
        .notifications_total
        .with_label_values(&[delivery.as_str()])
        .inc();
}

/// Counts the transition and pushes the new status to the ride's subscribers.
pub(crate) fn publish_transition(state: &AppState, ride: &Ride) {
    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[ride.status.as_str()])
        .inc();

    let update = Notification::new(
        NotificationKind::RideUpdate,
        format!("Ride is now {}", ride.status),
        serde_json::json!({
            "ride_id": ride.ride_id,
            "status": ride.status,
            "driver_id": ride.driver_id,
        }),
    );

    for delivery in state.notifier.send_ride_update(ride.ride_id, &update) {
        count_delivery(state, delivery);
    }
}
