pub mod broadcast;
pub mod classes;
pub mod config;
pub mod cron;
pub mod events;
pub mod identity;
pub mod models;
pub mod notifications;
pub mod realtime;
pub mod settings;
pub mod visibility;

use actix_web::web;

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    identity::routes::config(cfg);
    events::routes::config(cfg);
    notifications::routes::config(cfg);
    broadcast::routes::config(cfg);
    classes::routes::config(cfg);
    settings::config(cfg);
    cron::config(cfg);
}
