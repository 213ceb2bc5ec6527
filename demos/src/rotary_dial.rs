//! Rotary dial decoder on a Teensy 4.1.
//!
//! Decodes the FeTAp pulse dial and blinks the on-board LED once per dialed
//! digit when the number is complete (3 s after the last digit).
//!
//! Hardware: Teensy 4.1, dial pulse contact between p2 and GND.
//!
//! ```text
//!   p2 (GPIO4_IO04) ──┬── dial pulse contact ── GND
//!                     └── internal 100k pull-up
//! ```
//!
//! Contexts:
//! ```text
//!   PIT ISR (1 kHz, prio 3)    tick counter, SoftTimer::poll → TimeoutHandler,
//!                              LED blinker draining the number queue
//!   GPIO4 ISR (prio 2)         EdgeDetector::on_rising_edge
//!   idle                       DialTask::run (sampling, aggregation)
//! ```
//!
//! The sampler publishes into a `heapless` SPSC queue. Publishing never
//! blocks, so a digit dialed while the LED is still blinking keeps its
//! sampling grid.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use teensy4_panic as _;

use heapless::spsc::Consumer;

use fetap::clock::{is_reached, Monotonic, Ticks};
use fetap::dial::{DialShared, DialedNumber, SoftTimer};

/// PIT reload value for a 1 kHz tick.
const PIT_TICKS_PER_MS: u32 = teensy4_bsp::board::PERCLK_FREQUENCY / 1000;

/// Dial pin: Teensy p2 is GPIO4_IO04.
const DIAL_PIN: u8 = 4;

/// Published numbers waiting to be blinked. One slot stays unused.
const NUMBER_QUEUE_LEN: usize = 4;

/// LED on or off time per blink.
const BLINK_HALF_PERIOD_MS: u32 = 200;

static TICKS: AtomicU32 = AtomicU32::new(0);
static DIAL: DialShared = DialShared::new();
static TIMEOUT: SoftTimer = SoftTimer::new();

fn now() -> Ticks {
    TICKS.load(Ordering::Relaxed)
}

// ── Clock: 1 kHz PIT tick, sleeps with WFI ──────────────────────────

struct TickClock;

impl Monotonic for TickClock {
    const TICK_HZ: u32 = 1000;

    fn now(&self) -> Ticks {
        now()
    }

    fn delay_until(&mut self, deadline: Ticks) {
        while !is_reached(now(), deadline) {
            cortex_m::asm::wfi();
        }
    }

    fn idle(&mut self) {
        cortex_m::asm::wfi();
    }
}

// ── Dial line: reads the pad state straight from GPIO4.PSR ──────────
//
// The `Input` pin itself is owned by the edge ISR, which needs it to
// acknowledge interrupts.

struct DialLine {
    gpio: imxrt_ral::gpio::GPIO4,
}

impl embedded_hal::digital::ErrorType for DialLine {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for DialLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let psr = imxrt_ral::read_reg!(imxrt_ral::gpio, self.gpio, PSR);
        Ok(psr & (1 << DIAL_PIN) != 0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

// ── Blinker: once per digit, stepped from the tick ISR ──────────────

struct Blinker {
    led: teensy4_bsp::board::Led,
    numbers: Consumer<'static, DialedNumber, NUMBER_QUEUE_LEN>,
    /// LED toggles left for the number being shown.
    toggles: u32,
    /// Ticks until the next toggle.
    countdown: u32,
}

impl Blinker {
    fn tick(&mut self) {
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        if self.toggles == 0 {
            let Some(number) = self.numbers.dequeue() else {
                return;
            };
            // On and off for every digit; an empty number blinks nothing.
            self.toggles = 2 * number.len() as u32;
            if self.toggles == 0 {
                return;
            }
        }
        self.led.toggle();
        self.toggles -= 1;
        self.countdown = BLINK_HALF_PERIOD_MS;
    }
}

#[rtic::app(device = teensy4_bsp, peripherals = true)]
mod app {
    use super::{
        Blinker, DialLine, TickClock, DIAL, DIAL_PIN, NUMBER_QUEUE_LEN, PIT_TICKS_PER_MS, TICKS,
        TIMEOUT,
    };
    use core::sync::atomic::Ordering;

    use bsp::board;
    use bsp::hal;
    use bsp::pins::t41::P2;
    use teensy4_bsp as bsp;

    use hal::gpio::{Input, Port, Trigger};
    use hal::iomuxc::{self, Config, PullKeeper};

    use heapless::spsc::Queue;

    use fetap::dial::{
        DialConfig, DialInterrupt, DialSensor, DialTask, DialedNumber, EdgeDetector, QueueSink,
        SoftTimer, TimeoutHandler,
    };

    type Sink = QueueSink<'static, NUMBER_QUEUE_LEN>;
    type Task = DialTask<'static, DialLine, TickClock, Sink, &'static SoftTimer>;

    // ── Edge interrupt installer ─────────────────────────────────────

    #[derive(Debug)]
    enum GpioError {
        UnsupportedPin(u8),
    }

    struct Gpio4Edge<'a> {
        port: &'a mut Port<4>,
        input: &'a Input<P2>,
    }

    impl DialInterrupt for Gpio4Edge<'_> {
        type Error = GpioError;

        fn install_isr_service(&mut self) -> Result<(), GpioError> {
            // GPIO4_COMBINED_0_15 is unmasked by RTIC through `binds`.
            Ok(())
        }

        fn configure_pin(&mut self, pin: u8) -> Result<(), GpioError> {
            if pin != DIAL_PIN {
                return Err(GpioError::UnsupportedPin(pin));
            }
            Ok(())
        }

        fn register_handler(&mut self, pin: u8) -> Result<(), GpioError> {
            if pin != DIAL_PIN {
                return Err(GpioError::UnsupportedPin(pin));
            }
            self.port.set_interrupt(self.input, Some(Trigger::RisingEdge));
            Ok(())
        }
    }

    // ── RTIC resources ───────────────────────────────────────────────

    #[local]
    struct Local {
        pit: hal::pit::Pit<0>,
        blinker: Blinker,
        dial_input: Input<P2>,
        task: Task,
    }

    #[shared]
    struct Shared {}

    // ── Init ─────────────────────────────────────────────────────────

    #[init(local = [numbers: Queue<DialedNumber, NUMBER_QUEUE_LEN> = Queue::new()])]
    fn init(cx: init::Context) -> (Shared, Local) {
        let board::Resources {
            mut gpio2,
            mut gpio4,
            mut pins,
            pit: (mut pit, _, _, _),
            ..
        } = board::t41(cx.device);

        let led = board::led(&mut gpio2, pins.p13);
        let (producer, consumer) = cx.local.numbers.split();
        let blinker = Blinker {
            led,
            numbers: consumer,
            toggles: 0,
            countdown: 0,
        };

        // ── Dial contact: input with pull-up, rising edge on open ───
        iomuxc::configure(
            &mut pins.p2,
            Config::zero().set_pull_keeper(Some(PullKeeper::Pullup100k)),
        );
        let dial_input = gpio4.input(pins.p2);

        let line = DialLine {
            gpio: unsafe { imxrt_ral::gpio::GPIO4::instance() },
        };

        let config = DialConfig::new(DIAL_PIN).with_timeout_ms(3000);
        let sink = QueueSink::new(producer);
        let sensor = DialSensor::new(config, &DIAL, line, TickClock, sink, &TIMEOUT);
        let mut edge = Gpio4Edge {
            port: &mut gpio4,
            input: &dial_input,
        };
        let task = match sensor.setup(&mut edge) {
            Ok(task) => task,
            Err(err) => panic!("{}", err),
        };

        // ── 1 kHz tick ──────────────────────────────────────────────
        pit.set_load_timer_value(PIT_TICKS_PER_MS);
        pit.set_interrupt_enable(true);
        pit.enable();

        (
            Shared {},
            Local {
                pit,
                blinker,
                dial_input,
                task,
            },
        )
    }

    // ── Tick ISR: time base, inter-digit timeout, LED ────────────────

    #[task(binds = PIT, local = [pit, blinker], priority = 3)]
    fn tick(cx: tick::Context) {
        let pit = cx.local.pit;
        while pit.is_elapsed() {
            pit.clear_elapsed();
        }

        let now = TICKS.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if TIMEOUT.poll(now) {
            TimeoutHandler::new(&DIAL).on_expiry();
        }
        cx.local.blinker.tick();
    }

    // ── Dial ISR: first rising edge of a pulse train ─────────────────

    #[task(binds = GPIO4_COMBINED_0_15, local = [dial_input], priority = 2)]
    fn dial_edge(cx: dial_edge::Context) {
        let input = cx.local.dial_input;
        if input.is_triggered() {
            input.clear_triggered();
            EdgeDetector::new(&DIAL).on_rising_edge(super::now());
        }
    }

    // ── Sampler task ─────────────────────────────────────────────────

    #[idle(local = [task])]
    fn idle(cx: idle::Context) -> ! {
        cx.local.task.run()
    }
}
