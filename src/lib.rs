pub mod aliases;
pub mod config;
pub mod db;
pub mod error;
pub mod mentions;
pub mod models;
pub mod routes;
pub mod state_machine;
pub mod store;
pub mod worker;

use db::Db;
use rocket_cors::CorsOptions;
use std::sync::Arc;
use store::NotificationStore;
use worker::{DeliveryWorker, SendViaSessions, StoreMessageText};

/// Builds the Rocket instance using `MISSION_CONTROL_DB_PATH` (or the
/// conventional default) for the database, and starts the delivery worker
/// loop against the same store the HTTP routes use.
pub fn rocket(sender: Arc<dyn SendViaSessions>) -> rocket::Rocket<rocket::Build> {
    let db_path = config::resolve_db_path(None);
    rocket_with_db(&db_path, sender)
}

pub fn rocket_with_db(
    db_path: &str,
    sender: Arc<dyn SendViaSessions>,
) -> rocket::Rocket<rocket::Build> {
    build_rocket(db_path, sender, config::WorkerConfig::from_env())
}

fn build_rocket(
    db_path: &str,
    sender: Arc<dyn SendViaSessions>,
    worker_config: config::WorkerConfig,
) -> rocket::Rocket<rocket::Build> {
    let db = Arc::new(Db::new(db_path));
    let store = Arc::new(NotificationStore::new(db));

    let cors = CorsOptions::default()
        .to_cors()
        .expect("Failed to create CORS");

    let worker_store = store.clone();
    let message_text = Arc::new(StoreMessageText {
        store: store.clone(),
    });

    rocket::build()
        .manage(store)
        .attach(cors)
        .register("/", rocket::catchers![routes::not_found])
        .mount(
            "/",
            rocket::routes![
                routes::health,
                routes::get_task_notifications,
                routes::notifications_post_not_allowed,
                routes::notifications_put_not_allowed,
                routes::notifications_delete_not_allowed,
                routes::notifications_patch_not_allowed,
                routes::get_task_messages,
                routes::get_thread_unread,
                routes::mark_thread_read,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff(
            "Delivery Worker",
            move |_rocket| {
                Box::pin(async move {
                    let worker = Arc::new(DeliveryWorker::new(
                        worker_store,
                        sender,
                        message_text,
                        worker_config,
                    ));
                    let interval_ms = (worker_config.retry_delay_ms.max(1000) as u64) / 6;
                    worker::spawn_delivery_loop(
                        worker,
                        std::time::Duration::from_millis(interval_ms.max(1000)),
                    );
                    println!("mission control: delivery worker started");
                })
            },
        ))
}
