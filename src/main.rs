use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use log::{info, warn};
use tokio::sync::Notify;

use shutterman::api::ButtonId;
use shutterman::bridge::Hub;
use shutterman::button::Buttons;
use shutterman::cli::{Opts, GIT_VERSION};
use shutterman::config::Config;
use shutterman::gpio::{DryRun, GpioDriver, RelayBoard};
use shutterman::server;
use shutterman::window::WindowRef;
use shutterman::Result;

/// # Shutterman
/// Drives a roller shutter through two direction relays and exposes it as an
/// accessory with current position, target position and position state.
///
/// Position is not persisted: every start assumes the shutter is closed.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts: Opts = Opts::parse();
    let config = Config::try_from(&opts)?;
    info!("Shutterman {} ({:?} per step)", GIT_VERSION, config.step_duration());

    let gpio: Arc<dyn GpioDriver> = if opts.dry_run {
        Arc::new(DryRun)
    } else {
        Arc::new(RelayBoard::new(opts.up_pin, opts.down_pin, opts.led_pin)?)
    };

    let hub = Arc::new(Hub::new(opts.accessory_info(), config.numbering()));
    let (window, _task) = WindowRef::new(&config, gpio.clone(), hub.clone());

    let _buttons = attach_buttons(&opts, &window)?;

    let interrupted = Arc::new(Notify::new());
    let notify = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || notify.notify_one()) {
        warn!("Error setting Ctrl-C handler: {}", e);
    }

    let routes = server::routes(Arc::new(window), hub);
    let addr = SocketAddr::new(opts.address, opts.port);
    info!("accessory bridge ready on ws://{}/accessory", addr);

    tokio::select! {
        _ = warp::serve(routes).run(addr) => {}
        _ = interrupted.notified() => info!("received Ctrl+C, releasing relays"),
    }

    gpio.stop_all();
    gpio.set_led(false);
    Ok(())
}

/// Arms both buttons unless running dry. A pin that cannot be claimed aborts startup.
fn attach_buttons(opts: &Opts, window: &WindowRef) -> Result<Option<Buttons>> {
    if opts.dry_run {
        return Ok(None);
    }
    let buttons = Buttons::attach(
        &[(ButtonId::A, opts.button_a_pin), (ButtonId::B, opts.button_b_pin)],
        opts.debounce(),
        window.clone(),
    )?;
    Ok(Some(buttons))
}
