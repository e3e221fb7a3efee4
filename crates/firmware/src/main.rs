//! Embassy-based firmware for a MIDI to CV/gate converter running on the
//! [Nucleo-F767ZI development board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html).
//!
//! MIDI arrives on a serial DIN input. Notes are voiced monophonically (last-note priority, with legato) on the
//! pitch output; one selectable source (modulation wheel, breath controller, aftertouch or velocity) drives the
//! modulation output. Both control voltages come from an external MCP4922 DAC, and a gate output tells the
//! synthesizer when to sound.
//!
//! The front panel has three knobs (MIDI channel, CV-A source, CV-A level), a SET/RUN toggle and a panic button.
//! Knobs and the panic button only take effect in SET; MIDI is only read in RUN.
//!
//! Pinout:
//!
//! | signal           | pin  |
//! |------------------|------|
//! | MIDI in (USART6) | PG9  |
//! | DAC SCK (SPI1)   | PA5  |
//! | DAC SDI (SPI1)   | PA7  |
//! | DAC CS           | PD14 |
//! | gate             | PG0  |
//! | gate indicator   | PB0  |
//! | channel knob     | PA3  |
//! | CV-A source knob | PC0  |
//! | CV-A level knob  | PC3  |
//! | SET/RUN switch   | PD1  |
//! | panic button     | PC13 |

#![no_std]
#![no_main]

#[macro_use]
mod fmt;

use embassy_executor::Spawner;
use embassy_stm32::{
    Config,
    adc::Adc,
    bind_interrupts,
    gpio::{Input, Level, Output, Pull, Speed},
    peripherals,
    spi::{self, Spi},
    time::Hertz,
    usart::{self, UartRx},
};
use embassy_time::{Duration, with_timeout};
use measurements::Voltage;
use midicv_lib::{
    configuration::{
        ChannelConfig,
        panel::{KnobId, Panel, PanelMode},
    },
    cv,
    io::{
        Outputs,
        button::EdgeLatch,
        gate::CoupledGate,
        mcp4922::{self, Mcp4922},
    },
    midi_state::MidiState,
};
use static_cell::StaticCell;
use wmidi::U7;

#[cfg(not(feature = "debug"))]
use panic_halt as _;
#[cfg(feature = "debug")]
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        USART6 => usart::InterruptHandler<peripherals::USART6>;
    }
);

const MIDI_BAUD_RATE: u32 = 31_250;

/// How long a RUN iteration waits for a MIDI byte before going back to the panel.
const READ_TIMEOUT: Duration = Duration::from_millis(1);

/// The MCP4922's reference inputs are tied to the 3.3V rail.
const DAC_REFERENCE_VOLTS: f64 = 3.3;

/// The ADC is 12 bits, right aligned; knobs expect 16.
const KNOB_SCALE_SHIFT: u32 = 4;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Initializing MIDI to CV converter");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock, supplied by the ST-LINK
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            divq: None,
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        // SPI1 and USART6 hang off APB2: 108Mhz
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
    }
    let p = embassy_stm32::init(config);

    let mut uart_config = usart::Config::default();
    uart_config.baudrate = MIDI_BAUD_RATE;
    static RX_BUFFER: StaticCell<[u8; 64]> = StaticCell::new();
    let mut midi_in = unwrap!(UartRx::new(
        p.USART6,
        Irqs,
        p.PG9,
        p.DMA2_CH1,
        uart_config
    ))
    .into_ring_buffered(RX_BUFFER.init([0; 64]));

    // the MCP4922 tops out at 20Mhz; the HAL rounds down to the nearest achievable rate
    let mut spi_config = spi::Config::default();
    spi_config.frequency = Hertz(8_000_000);
    let spi = Spi::new_blocking_txonly(p.SPI1, p.PA5, p.PA7, spi_config);
    let chip_select = Output::new(p.PD14, Level::High, Speed::VeryHigh);

    let gate = CoupledGate::new(
        Output::new(p.PG0, Level::Low, Speed::Low),
        Output::new(p.PB0, Level::Low, Speed::Low),
    );
    let mut outputs = Outputs::new(Mcp4922::new(spi, chip_select), gate);

    let mut adc = Adc::new(p.ADC1);
    let mut channel_knob = p.PA3;
    let mut cc_mode_knob = p.PC0;
    let mut attenuation_knob = p.PC3;
    let mut panel = Panel::new(
        adc.blocking_read(&mut channel_knob) << KNOB_SCALE_SHIFT,
        adc.blocking_read(&mut cc_mode_knob) << KNOB_SCALE_SHIFT,
        adc.blocking_read(&mut attenuation_knob) << KNOB_SCALE_SHIFT,
    );

    let mode_switch = Input::new(p.PD1, Pull::Up);
    let panic_button = Input::new(p.PC13, Pull::None);
    let mut panic_latch = EdgeLatch::new();

    let mut state = MidiState::new();
    let mut channel_config = panel.config();
    let mut mode: Option<PanelMode> = None;

    // start from silence in case the synth was left with its gate high
    if let Err(e) = state.panic(&mut outputs) {
        warn!("Failed to reset outputs: {}", e);
    }

    loop {
        panel.poll(|knob| {
            let raw = match knob {
                KnobId::Channel => adc.blocking_read(&mut channel_knob),
                KnobId::CcMode => adc.blocking_read(&mut cc_mode_knob),
                KnobId::Attenuation => adc.blocking_read(&mut attenuation_knob),
            };
            raw << KNOB_SCALE_SHIFT
        });

        let current = PanelMode::from_switch(mode_switch.is_high());
        if mode != Some(current) {
            mode = Some(current);
            log_config(current, &channel_config);
        }

        match current {
            PanelMode::Set => {
                let dialed = panel.config();
                if dialed != channel_config {
                    channel_config = dialed;
                    log_config(current, &channel_config);
                }

                if panic_latch.pressed(panic_button.is_high()) {
                    if let Err(e) = state.panic(&mut outputs) {
                        warn!("Failed to silence outputs: {}", e);
                    }
                }
            }
            PanelMode::Run => {
                let mut byte = [0_u8; 1];
                match with_timeout(READ_TIMEOUT, midi_in.read(&mut byte)).await {
                    Ok(Ok(1)) => {
                        if let Err(e) = state.update(byte[0], &channel_config, &mut outputs) {
                            warn!("Failed to drive outputs: {}", e);
                        }
                    }
                    Ok(Ok(_)) => {}
                    // overruns are expected after a stretch in SET, when the input isn't drained
                    Ok(Err(e)) => warn!("MIDI input error: {}", e),
                    Err(_) => {}
                }
            }
        }
    }
}

fn log_config(mode: PanelMode, config: &ChannelConfig) {
    let cv_a_ceiling = mcp4922::voltage(
        cv::control_to_code(U7::from_u8_lossy(127), config.attenuation),
        Voltage::from_volts(DAC_REFERENCE_VOLTS),
    );
    info!(
        "{}: channel {}, CV-A follows {} at {}% (up to {}V)",
        mode.label(),
        config.channel.number(),
        config.cc_mode.label(),
        config.attenuation.percent(),
        cv_a_ceiling.as_volts()
    );
}
