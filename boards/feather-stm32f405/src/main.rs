#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;

#[cfg(feature = "trigger-gesture")]
mod accel;
mod display;
mod eth;
mod network;

#[cfg(all(feature = "trigger-button", feature = "trigger-gesture"))]
compile_error!("enable exactly one of `trigger-button` and `trigger-gesture`");
#[cfg(not(any(feature = "trigger-button", feature = "trigger-gesture")))]
compile_error!("enable one of `trigger-button` or `trigger-gesture`");

/// I2C1 handle shared by the OLED and the accelerometer
pub type SharedI2c = embedded_hal_bus::i2c::RefCellDevice<
    'static,
    embassy_stm32::i2c::I2c<'static, embassy_stm32::mode::Blocking, embassy_stm32::i2c::Master>,
>;

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1])]
mod app {
    use super::*;
    use core::cell::RefCell;
    use defmt::{error, info};
    use embassy_futures::join::join3;
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::i2c::{self, I2c};
    use embassy_stm32::mode::Blocking;
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::Hse;
    use embassy_stm32::rcc::HseMode;
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embedded_hal_bus::i2c::RefCellDevice;
    use static_cell::StaticCell;
    use wake_clock_core::{Device, DeviceConfig};

    use display::OledDisplay;
    use network::stack::{RX_BUFFER_LEN, TX_BUFFER_LEN};
    use network::{manager, EmbassyNetwork, NetworkConfig};

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;

    struct NetworkPeripherals {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        int: PinPC2,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    /// Everything on the I2C1 bus plus the wake input
    struct UiPeripherals {
        i2c: I2c<'static, Blocking, i2c::Master>,
        #[cfg(feature = "trigger-button")]
        button: embassy_stm32::Peri<'static, peripherals::PC5>,
    }

    #[shared]
    struct Shared {}

    #[local]
    struct Local {}

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Wake clock starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        info!("System initialized: SYSCLK=84MHz");

        // Feather I2C header: SCL=PB6, SDA=PB7
        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = Hertz(400_000);
        let i2c = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, i2c_config);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };
        let ui_periph = UiPeripherals {
            i2c,
            #[cfg(feature = "trigger-button")]
            button: p.PC5,
        };

        device_task::spawn(net_periph, ui_periph).ok();

        (Shared {}, Local {})
    }

    /// Device task: network runners plus the wake/fetch/display loop
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn device_task(
        _cx: device_task::Context,
        net_periph: NetworkPeripherals,
        ui_periph: UiPeripherals,
    ) -> ! {
        use embassy_net::{Config, StackResources};

        info!("Device task started");
        let net_config = NetworkConfig::default();

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            net_periph.spi,
            net_periph.sck,
            net_periph.mosi,
            net_periph.miso,
            net_periph.dma_tx,
            net_periph.dma_rx,
            spi_config,
        );

        let eth_periph = eth::EthPeripherals {
            spi,
            cs: Output::new(net_periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(net_periph.reset, Level::High, Speed::Low),
            int: ExtiInput::new(net_periph.int, net_periph.exti, Pull::Up),
        };

        let (eth_device, w5500_runner) = match eth::init_w5500(eth_periph, net_config.mac_addr).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("Ethernet unavailable: {}", e);
                loop {
                    cortex_m::asm::wfi();
                }
            }
        };

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            eth_device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        info!("Network stack initialized with DHCP");

        let app_logic = async {
            manager::wait_for_config(&stack).await;
            run_device(stack, ui_periph).await
        };

        let (never, _, _) = join3(w5500_runner.run(), net_runner.run(), app_logic).await;
        never
    }

    async fn run_device(stack: embassy_net::Stack<'static>, ui: UiPeripherals) -> ! {
        static I2C_BUS: StaticCell<RefCell<I2c<'static, Blocking, i2c::Master>>> = StaticCell::new();
        static RX_BUFFER: StaticCell<[u8; RX_BUFFER_LEN]> = StaticCell::new();
        static TX_BUFFER: StaticCell<[u8; TX_BUFFER_LEN]> = StaticCell::new();

        let i2c_bus: &'static RefCell<_> = I2C_BUS.init(RefCell::new(ui.i2c));

        let display = loop {
            match OledDisplay::new(RefCellDevice::new(i2c_bus)) {
                Ok(display) => break display,
                Err(e) => {
                    error!("OLED init failed: {}, retrying", e);
                    embassy_time::Timer::after_secs(1).await;
                }
            }
        };
        info!("OLED initialized");

        let network = EmbassyNetwork::new(
            stack,
            RX_BUFFER.init([0; RX_BUFFER_LEN]),
            TX_BUFFER.init([0; TX_BUFFER_LEN]),
        );

        #[cfg(feature = "trigger-button")]
        let trigger = {
            use embassy_stm32::gpio::Input;
            use wake_clock_core::config::ButtonConfig;
            use wake_clock_core::ButtonTrigger;

            info!("Trigger: push button on PC5");
            ButtonTrigger::new(Input::new(ui.button, Pull::Up), ButtonConfig::default())
        };

        #[cfg(feature = "trigger-gesture")]
        let trigger = {
            use wake_clock_core::config::GestureConfig;
            use wake_clock_core::GestureTrigger;

            info!("Trigger: MPU-6050 wrist raise");
            GestureTrigger::new(
                accel::Mpu6050::new(RefCellDevice::new(i2c_bus)),
                GestureConfig::default(),
            )
        };

        let mut device = Device::new(
            trigger,
            display,
            network,
            embassy_time::Delay,
            DeviceConfig::default(),
        );
        device.run().await
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
