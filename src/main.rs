mod app;
mod assets;
mod click;
mod facing;
mod pet;
mod platform;
mod render;
mod surface;
mod tray;
mod tuning;

fn main() {
    env_logger::init();
    log::info!("Perch Cat starting up");

    if let Err(e) = app::run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
