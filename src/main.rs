mod anim;
mod app;
mod bubble;
mod config;
mod events;
mod follow;
mod interact;
mod pet;
mod platform;
mod render;
mod sched;
mod sprite;
mod tray;
mod ui;

fn main() {
    env_logger::init();
    log::info!("Deskpet starting up");

    if let Err(e) = app::run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
