//! The poll loop that owns the engine and the LED strip
//!
//! Web handlers only send [`EngineMessage`]s; the engine and its buffer are
//! never shared, so nothing here needs a lock.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::Instant;

use esp_idf_hal::delay::FreeRtos;
use gametable_zones::{Command, Engine, StateSnapshot};
use log::{debug, info, warn};

use crate::leds::LedController;
use crate::watchdog::WatchdogHandle;

pub enum EngineMessage {
    Command(Command),
    /// Reply with the current state
    Snapshot(oneshot::Sender<StateSnapshot>),
}

pub type EngineSender = Sender<EngineMessage>;

/// Apply at most one message, run one scheduler step, flush if anything was
/// painted, then yield one tick. Never returns.
pub fn run(
    mut engine: Engine,
    mut leds: LedController,
    rx: &Receiver<EngineMessage>,
    watchdog: &WatchdogHandle,
) -> ! {
    let start = Instant::now();
    let mut server_gone = false;

    if let Err(e) = leds.write(engine.pixels(), engine.brightness()) {
        warn!("Initial LED flush failed: {e}");
    }
    info!("Engine loop running ({} LEDs)", engine.led_count());

    loop {
        let mut dirty = match rx.try_recv() {
            Ok(EngineMessage::Command(command)) => engine.apply(command),
            Ok(EngineMessage::Snapshot(reply)) => {
                if reply.send(engine.snapshot()).is_err() {
                    debug!("Snapshot requester gone");
                }
                false
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                if !server_gone {
                    warn!("Web server channel closed, rendering without control");
                    server_gone = true;
                }
                false
            }
        };

        // u64 milliseconds outlast the hardware by a wide margin
        #[allow(clippy::cast_possible_truncation)]
        let now_ms = start.elapsed().as_millis() as u64;
        dirty |= engine.tick(now_ms);

        if dirty {
            if let Err(e) = leds.write(engine.pixels(), engine.brightness()) {
                warn!("LED flush failed: {e}");
            }
        }

        watchdog.feed();
        FreeRtos::delay_ms(1);
    }
}
