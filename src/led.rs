use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::time::sleep;

use crate::gpio::GpioDriver;

const BLINK: Duration = Duration::from_millis(100);
const PAUSE: Duration = Duration::from_millis(250);
const GROUPS: usize = 3;
const BLINKS_PER_GROUP: usize = 2;

/// Blinks the status LED six times in three pairs, then leaves it off.
pub async fn identify(gpio: Arc<dyn GpioDriver>) {
    info!("LED identify");
    for _ in 0..GROUPS {
        for _ in 0..BLINKS_PER_GROUP {
            gpio.set_led(true);
            sleep(BLINK).await;
            gpio.set_led(false);
            sleep(BLINK).await;
        }
        sleep(PAUSE).await;
    }
    gpio.set_led(false);
}
