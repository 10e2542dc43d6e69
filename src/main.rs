#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Input, Pull};
use embassy_nrf::{bind_interrupts, config::Config, interrupt};
use embassy_time::{Instant, Timer};
use nrf_softdevice::Softdevice;
use panic_probe as _;
use static_cell::StaticCell;

use nrf52820_pwm_fade::ble::dispatcher::EventDispatcher;
use nrf52820_pwm_fade::ble::softdevice::{
    advertising_task, dropped_events, event_receiver, softdevice_task, FadeSecurity, FadeServer, SoftdeviceStack,
};
use nrf52820_pwm_fade::bootloader::{enter_dfu, BootloaderSwitch, SwitchDecision};
use nrf52820_pwm_fade::config::{
    softdevice_config, BRIGHTNESS_DECREASE, IDLE_POLL_MS, MAX_PERIOD_VALUE, STARTUP_DELAY_MS,
};
use nrf52820_pwm_fade::diag::ActiveSink;
use nrf52820_pwm_fade::pwm::nrf::{led_pin, FadePwm, TerminalCountHandler};

bind_interrupts!(struct Irqs {
    TIMER1 => TerminalCountHandler;
});

static SERVER: StaticCell<FadeServer> = StaticCell::new();
static SECURITY: FadeSecurity = FadeSecurity::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // Configure nRF peripherals
    let mut nrf_config = Config::default();
    // Configure interrupt priorities to avoid SoftDevice reserved levels (0, 1, 4)
    nrf_config.gpiote_interrupt_priority = interrupt::Priority::P2;
    nrf_config.time_interrupt_priority = interrupt::Priority::P2;

    let p = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&softdevice_config());

    let server = match FadeServer::new(sd) {
        Ok(server) => SERVER.init(server),
        Err(e) => defmt::panic!("Failed to register GATT server: {}", e),
    };

    let sd: &'static Softdevice = sd;
    let mut stack = SoftdeviceStack::new(sd);

    // Spawn SoftDevice task (CRITICAL!)
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(advertising_task(sd, server, &SECURITY)));

    // Let the stack settle before anything is printed
    Timer::after_millis(STARTUP_DELAY_MS).await;
    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let button = Input::new(p.P0_14, Pull::Up);

    let mut pwm = FadePwm::new(
        p.TIMER1,
        p.GPIOTE_CH0,
        p.PPI_CH0,
        p.PPI_CH1,
        led_pin(p.P0_15),
        Irqs,
        BRIGHTNESS_DECREASE,
    );
    pwm.start(MAX_PERIOD_VALUE);

    let mut dispatcher = EventDispatcher::new(ActiveSink::default());
    let mut bootloader_switch = BootloaderSwitch::new();
    let events = event_receiver();

    stack.announce();

    loop {
        match select(events.receive(), Timer::after_millis(IDLE_POLL_MS)).await {
            Either::First(event) => dispatcher.dispatch(&mut stack, &event),
            Either::Second(()) => {}
        }

        if bootloader_switch.poll(button.is_low(), Instant::now().as_millis()) == SwitchDecision::Enter {
            warn!("Button held, {} stack events dropped since boot", dropped_events());
            enter_dfu();
        }
    }
}
