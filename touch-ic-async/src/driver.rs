//! The touch controller driver.

use crate::bus::{I2cBus, Register, RegisterBus};
use crate::error::{pin_fault, Error};
use crate::pins::{ControlPin, Level, NoPin, PinMode};
use crate::profile::{
    cst_mutual, goodix, zinitix, ChipFamily, DeviceProfile, Resolution, MAX_REPORT_LEN,
};
use crate::report::{decode, Frame, FrameError, Gesture, Points, TouchPoint};
use crate::scale::{Scaling, Transform};
use embassy_time::{Duration, Instant};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(100);
const DEFAULT_IRQ_RETRIGGER: Duration = Duration::from_millis(1000);

/// Bring-up progress of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// `init()` has not run yet.
    Uninitialized,
    /// The reset pulse (or soft reset) is being applied.
    ResetAsserted,
    /// Waiting for the firmware to boot.
    AwaitingSettle,
    /// Reading and checking the chip identity.
    HandshakeInProgress,
    /// The chip was identified; reports can be read.
    Ready,
    /// The last `init()` or `wakeup()` failed.
    Failed,
}

/// Identity of an initialized chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Family the driver was created for.
    pub family: ChipFamily,
    /// Chip id or chip type as reported by the part.
    pub chip_id: u32,
    /// Project or vendor id, where the part has one.
    pub project_id: u16,
    /// Firmware version.
    pub firmware_version: u32,
    /// Sensor resolution, reported by the chip or taken from the profile.
    pub resolution: Option<Resolution>,
}

/// Driver for one touch controller.
///
/// `RST` and `IRQ` are the optional reset and interrupt lines. Without a reset
/// line the family's soft reset command is used; without an interrupt line
/// [`TouchDriver::is_pressed`] polls the report.
pub struct TouchDriver<BUS, D, RST = NoPin, IRQ = NoPin> {
    pub(crate) bus: BUS,
    pub(crate) delay: D,
    pub(crate) profile: &'static DeviceProfile,
    pub(crate) address: u8,
    reset_pin: Option<RST>,
    irq_pin: Option<IRQ>,
    state: DriverState,
    info: Option<DeviceInfo>,
    pub(crate) handshake_timeout: Duration,
    display: Option<Resolution>,
    scaling: Option<Scaling>,
    transform: Transform,
    last_gesture: Option<Gesture>,
    home_button_callback: Option<fn()>,
    irq_retrigger: Duration,
    last_irq_trigger: Option<Instant>,
}

impl<BUS, D> TouchDriver<BUS, D>
where
    BUS: RegisterBus,
    D: DelayNs,
{
    /// Creates a driver for a chip of `family` at its default address.
    pub fn new(bus: BUS, delay: D, family: ChipFamily) -> Self {
        let profile = family.profile();
        Self {
            bus,
            delay,
            profile,
            address: profile.i2c_address,
            reset_pin: None,
            irq_pin: None,
            state: DriverState::Uninitialized,
            info: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            display: None,
            scaling: None,
            transform: Transform::IDENTITY,
            last_gesture: None,
            home_button_callback: None,
            irq_retrigger: DEFAULT_IRQ_RETRIGGER,
            last_irq_trigger: None,
        }
    }
}

impl<I2cType, D> TouchDriver<I2cBus<I2cType>, D>
where
    I2cType: I2c<SevenBitAddress>,
    D: DelayNs,
{
    /// Creates a driver directly on an `embedded-hal-async` I2C bus.
    pub fn new_i2c(i2c: I2cType, delay: D, family: ChipFamily) -> Self {
        Self::new(I2cBus::new(i2c), delay, family)
    }
}

impl<BUS, D, RST, IRQ> TouchDriver<BUS, D, RST, IRQ>
where
    BUS: RegisterBus,
    D: DelayNs,
    RST: ControlPin,
    IRQ: ControlPin,
{
    /// Attaches the reset line.
    pub fn with_reset_pin<P: ControlPin>(self, pin: P) -> TouchDriver<BUS, D, P, IRQ> {
        TouchDriver {
            bus: self.bus,
            delay: self.delay,
            profile: self.profile,
            address: self.address,
            reset_pin: Some(pin),
            irq_pin: self.irq_pin,
            state: self.state,
            info: self.info,
            handshake_timeout: self.handshake_timeout,
            display: self.display,
            scaling: self.scaling,
            transform: self.transform,
            last_gesture: self.last_gesture,
            home_button_callback: self.home_button_callback,
            irq_retrigger: self.irq_retrigger,
            last_irq_trigger: self.last_irq_trigger,
        }
    }

    /// Attaches the interrupt line (active low "data ready").
    pub fn with_irq_pin<P: ControlPin>(self, pin: P) -> TouchDriver<BUS, D, RST, P> {
        TouchDriver {
            bus: self.bus,
            delay: self.delay,
            profile: self.profile,
            address: self.address,
            reset_pin: self.reset_pin,
            irq_pin: Some(pin),
            state: self.state,
            info: self.info,
            handshake_timeout: self.handshake_timeout,
            display: self.display,
            scaling: self.scaling,
            transform: self.transform,
            last_gesture: self.last_gesture,
            home_button_callback: self.home_button_callback,
            irq_retrigger: self.irq_retrigger,
            last_irq_trigger: self.last_irq_trigger,
        }
    }

    /// Overrides the I2C address. For the GT911 this also selects the address
    /// latched during reset (0x5D or 0x14).
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Sets the timeout applied to each handshake transfer.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Scales reported points onto a display of this size.
    pub fn set_display_resolution(&mut self, display: Resolution) {
        self.display = Some(display);
        self.update_scaling();
    }

    /// Sets axis swap and mirroring, applied after scaling.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Minimum time between two positive [`TouchDriver::is_pressed`] results.
    pub fn set_irq_retrigger_interval(&mut self, interval: Duration) {
        self.irq_retrigger = interval;
    }

    /// Called whenever a CST226 reports its home key.
    pub fn set_home_button_callback(&mut self, callback: fn()) {
        self.home_button_callback = Some(callback);
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Identity read by the last successful `init()`.
    pub fn info(&self) -> Option<DeviceInfo> {
        self.info
    }

    pub fn profile(&self) -> &'static DeviceProfile {
        self.profile
    }

    /// Most fingers the chip reports.
    pub fn supported_point_count(&self) -> u8 {
        self.profile.max_points
    }

    /// The last gesture reported by a self-capacitance chip.
    pub fn last_gesture(&self) -> Option<Gesture> {
        self.last_gesture
    }

    /// Returns the last gesture and forgets it.
    pub fn take_gesture(&mut self) -> Option<Gesture> {
        self.last_gesture.take()
    }

    /// Resets the chip and identifies it.
    ///
    /// May be called again at any time to recover from a failure.
    pub async fn init(&mut self) -> Result<DeviceInfo, Error<BUS::Error>> {
        log::trace!("touch::init start ({:?} at {:#04x})", self.profile.family, self.address);
        self.info = None;
        self.last_irq_trigger = None;

        match self.bring_up().await {
            Ok(info) => {
                self.info = Some(info);
                self.state = DriverState::Ready;
                self.update_scaling();
                log::trace!("touch::init done: {info:?}");
                Ok(info)
            }
            Err(err) => {
                self.state = DriverState::Failed;
                log::warn!("Touch controller init failed: {err:?}");
                Err(err)
            }
        }
    }

    async fn bring_up(&mut self) -> Result<DeviceInfo, Error<BUS::Error>> {
        self.reset_sequence().await?;
        log::trace!("touch::init reset done");
        self.state = DriverState::HandshakeInProgress;
        self.handshake().await
    }

    /// Reads one report and returns at most `max_out` points in display
    /// coordinates. Discarded reports yield an empty list.
    pub async fn get_touch_points(&mut self, max_out: usize) -> Result<Points, Error<BUS::Error>> {
        self.ensure_ready()?;

        let mut buf = [0u8; MAX_REPORT_LEN];
        let raw = &mut buf[..self.profile.report_len];
        let address = self.address;
        let read = self
            .bus
            .read_register(address, self.profile.report_register, raw)
            .await
            .map_err(|e| {
                log::warn!("Error reading touch report: {e:?}");
                Error::Bus(e)
            })?;
        if read < raw.len() {
            log::debug!("Discarding short touch report ({read} of {} bytes)", raw.len());
            return Ok(Points::new());
        }

        let decoded = decode(self.profile, raw);
        self.acknowledge(raw, &decoded).await?;
        let frame = match decoded {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("Discarding touch report: {err}");
                return Ok(Points::new());
            }
        };

        Ok(self.deliver(frame, max_out))
    }

    fn deliver(&mut self, frame: Frame, max_out: usize) -> Points {
        if frame.home_button {
            if let Some(callback) = self.home_button_callback {
                callback();
            }
        }
        if frame.gesture.is_some() {
            self.last_gesture = frame.gesture;
        }

        let mut points = frame.points;
        points.truncate(max_out.min(self.profile.max_points as usize));
        for point in points.iter_mut() {
            self.map_point(point);
        }
        points
    }

    /// Hands the report buffer back to the chip where the family requires it.
    async fn acknowledge(
        &mut self,
        raw: &[u8],
        decoded: &Result<Frame, FrameError>,
    ) -> Result<(), Error<BUS::Error>> {
        let address = self.address;
        let result = match self.profile.family {
            ChipFamily::Cst226 | ChipFamily::Cst328 => {
                if !matches!(decoded, Err(FrameError::TooManyPoints(_))) {
                    return Ok(());
                }
                self.bus
                    .write_register(address, self.profile.report_register, &[cst_mutual::REPORT_SYNC])
                    .await
            }
            ChipFamily::Gt911 => {
                if raw[0] & 0x80 == 0 {
                    return Ok(());
                }
                self.bus
                    .write_register(address, self.profile.report_register, &[0x00])
                    .await
            }
            ChipFamily::Ztw622 => {
                if raw[0] == 0 && raw[1] == 0 {
                    return Ok(());
                }
                self.bus
                    .write_register(
                        address,
                        Register::U16Le(zinitix::CMD_CLEAR_INT_STATUS),
                        &[],
                    )
                    .await
            }
            ChipFamily::CstSelfCap => return Ok(()),
        };
        result.map_err(|e| {
            log::warn!("Error acknowledging touch report: {e:?}");
            Error::Bus(e)
        })
    }

    fn map_point(&self, point: &mut TouchPoint) {
        if let Some(scaling) = self.scaling {
            scaling.apply(point);
        }
        let bounds = self
            .display
            .or_else(|| self.info.and_then(|info| info.resolution));
        self.transform.apply(point, bounds);
    }

    fn update_scaling(&mut self) {
        let sensor = self.info.and_then(|info| info.resolution);
        self.scaling = match (sensor, self.display) {
            (Some(sensor), Some(display)) => Some(Scaling::new(sensor, display)),
            _ => None,
        };
    }

    /// Reports whether a finger is down.
    ///
    /// With an interrupt line this samples it (active low) and reports a touch
    /// at most once per re-trigger interval. Without one, a report is read.
    pub async fn is_pressed(&mut self) -> Result<bool, Error<BUS::Error>> {
        self.ensure_ready()?;

        if let Some(irq) = self.irq_pin.as_mut() {
            if irq.level().await.map_err(pin_fault)? == Level::High {
                return Ok(false);
            }
            let now = Instant::now();
            if let Some(last) = self.last_irq_trigger {
                if now.duration_since(last) < self.irq_retrigger {
                    return Ok(false);
                }
            }
            self.last_irq_trigger = Some(now);
            return Ok(true);
        }

        let max = self.profile.max_points as usize;
        Ok(!self.get_touch_points(max).await?.is_empty())
    }

    /// Puts the chip into its low-power mode.
    pub async fn sleep(&mut self) -> Result<(), Error<BUS::Error>> {
        self.ensure_ready()?;

        if self.profile.family == ChipFamily::Gt911 {
            if let Some(irq) = self.irq_pin.as_mut() {
                irq.set_mode(PinMode::Output).await.map_err(pin_fault)?;
                irq.set_level(Level::Low).await.map_err(pin_fault)?;
            }
        }

        let sleep = self.profile.sleep;
        let address = self.address;
        log::trace!("touch::sleep {:?}", sleep.register);
        self.bus
            .write_register(address, sleep.register, sleep.data)
            .await
            .map_err(|e| {
                log::warn!("Error sending touch sleep command: {e:?}");
                Error::Bus(e)
            })
    }

    /// Wakes the chip by running the reset sequence again. Families that lose
    /// their configuration in reset are identified again.
    pub async fn wakeup(&mut self) -> Result<(), Error<BUS::Error>> {
        self.ensure_ready()?;

        let result = self.rejoin().await;
        self.state = match result {
            Ok(()) => DriverState::Ready,
            Err(_) => DriverState::Failed,
        };
        result
    }

    async fn rejoin(&mut self) -> Result<(), Error<BUS::Error>> {
        self.reset_sequence().await?;
        if matches!(self.profile.family, ChipFamily::Ztw622 | ChipFamily::CstSelfCap) {
            self.state = DriverState::HandshakeInProgress;
            let info = self.handshake().await?;
            self.info = Some(info);
            self.update_scaling();
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), Error<BUS::Error>> {
        if self.state != DriverState::Ready {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    /// GT911 reset: the INT level while reset rises selects 0x14 (high) or
    /// 0x5D (low).
    async fn latch_goodix_address(&mut self) -> Result<(), Error<BUS::Error>> {
        let timing = self.profile.reset;
        let select = Level::from(self.address == goodix::ALTERNATE_ADDRESS);
        let (Some(rst), Some(irq)) = (self.reset_pin.as_mut(), self.irq_pin.as_mut()) else {
            return Ok(());
        };

        irq.set_mode(PinMode::Output).await.map_err(pin_fault)?;
        irq.set_level(Level::Low).await.map_err(pin_fault)?;
        rst.set_mode(PinMode::Output).await.map_err(pin_fault)?;
        rst.set_level(Level::Low).await.map_err(pin_fault)?;
        self.delay.delay_ms(timing.low_ms).await;
        irq.set_level(select).await.map_err(pin_fault)?;
        self.delay.delay_ms(1).await;
        rst.set_level(Level::High).await.map_err(pin_fault)?;
        self.delay.delay_ms(5).await;
        irq.set_level(Level::Low).await.map_err(pin_fault)?;
        irq.set_mode(PinMode::Input).await.map_err(pin_fault)?;
        Ok(())
    }

    /// GT911 wake from screen-off: a short high pulse on INT, after which the
    /// line is released back to an input.
    async fn pulse_goodix_wake(&mut self) -> Result<(), Error<BUS::Error>> {
        let Some(irq) = self.irq_pin.as_mut() else {
            return Ok(());
        };

        irq.set_mode(PinMode::Output).await.map_err(pin_fault)?;
        irq.set_level(Level::High).await.map_err(pin_fault)?;
        self.delay.delay_ms(5).await;
        irq.set_level(Level::Low).await.map_err(pin_fault)?;
        irq.set_mode(PinMode::Input).await.map_err(pin_fault)?;
        Ok(())
    }

    /// Hardware reset pulse, GT911 address latch, or soft reset, followed by
    /// the settle delay.
    async fn reset_sequence(&mut self) -> Result<(), Error<BUS::Error>> {
        let timing = self.profile.reset;
        self.state = DriverState::ResetAsserted;

        let latch_address = self.profile.family == ChipFamily::Gt911
            && self.irq_pin.is_some()
            && self.reset_pin.is_some();
        if latch_address {
            self.latch_goodix_address().await?;
        } else if let Some(rst) = self.reset_pin.as_mut() {
            rst.set_mode(PinMode::Output).await.map_err(pin_fault)?;
            rst.set_level(Level::High).await.map_err(pin_fault)?;
            self.delay.delay_ms(timing.high_ms).await;
            rst.set_level(Level::Low).await.map_err(pin_fault)?;
            self.delay.delay_ms(timing.low_ms).await;
            rst.set_level(Level::High).await.map_err(pin_fault)?;
        } else if let Some(command) = self.profile.soft_reset {
            if self.profile.family == ChipFamily::Gt911 {
                self.pulse_goodix_wake().await?;
            }
            self.hs_write(command.register, command.data).await?;
        }

        self.state = DriverState::AwaitingSettle;
        self.delay.delay_ms(timing.settle_ms).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InitError;
    use crate::mock::{trace, BusEvent, FakeDelay, FakeI2c, FakePin, Step, Trace};
    use crate::profile::Resolution;
    use crate::report::TouchState;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use embassy_futures::block_on;

    type Driver<RST = NoPin, IRQ = NoPin> = TouchDriver<I2cBus<FakeI2c>, FakeDelay, RST, IRQ>;

    fn driver(chip: &FakeI2c, family: ChipFamily, steps: &Trace) -> Driver {
        TouchDriver::new_i2c(chip.clone(), FakeDelay::new(steps), family)
    }

    /// A CST226 that passes the handshake with a 170x320 sensor.
    fn cst226_chip() -> FakeI2c {
        FakeI2c::default()
            .respond(&[0xD1, 0xFC], &[0x00, 0x00, 0xCA, 0xCA])
            .respond(&[0xD1, 0xF8], &[0xAA, 0x00, 0x40, 0x01])
            .respond(&[0xD2, 0x04], &[0x26, 0x00, 0x26, 0xA8])
            .respond(&[0xD2, 0x08], &[0x01, 0x02, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12])
    }

    fn point(id: u8, x: u16, y: u16, pressure: u8) -> TouchPoint {
        TouchPoint {
            id,
            x,
            y,
            pressure,
            state: TouchState::Pressed,
        }
    }

    #[test]
    fn uninitialized_driver_stays_off_the_bus() {
        let chip = cst226_chip();
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::Cst226, &steps);

        assert_eq!(
            block_on(touch.get_touch_points(5)),
            Err(Error::NotInitialized)
        );
        assert_eq!(block_on(touch.is_pressed()), Err(Error::NotInitialized));
        assert_eq!(block_on(touch.sleep()), Err(Error::NotInitialized));
        assert_eq!(block_on(touch.wakeup()), Err(Error::NotInitialized));
        assert!(chip.log().is_empty());
        assert!(steps.borrow().is_empty());
        assert_eq!(touch.state(), DriverState::Uninitialized);
    }

    #[test]
    fn cst226_init_pulses_reset_and_reads_identity() {
        let chip = cst226_chip();
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::Cst226, &steps)
            .with_reset_pin(FakePin::new("rst", &steps));

        let info = block_on(touch.init()).unwrap();
        assert_eq!(
            info,
            DeviceInfo {
                family: ChipFamily::Cst226,
                chip_id: 0xA826,
                project_id: 0x0026,
                firmware_version: 0x0201,
                resolution: Some(Resolution::new(170, 320)),
            }
        );
        assert_eq!(touch.state(), DriverState::Ready);
        assert_eq!(touch.supported_point_count(), 5);

        assert_eq!(
            steps.borrow()[..7],
            [
                Step::Mode("rst", PinMode::Output),
                Step::Drive("rst", Level::High),
                Step::DelayMs(5),
                Step::Drive("rst", Level::Low),
                Step::DelayMs(5),
                Step::Drive("rst", Level::High),
                Step::DelayMs(30),
            ]
        );
        assert_eq!(
            chip.writes(),
            [vec![0xD1, 0x01], vec![0xD1, 0x09]],
            "command mode is entered and left, no soft reset"
        );
    }

    #[test]
    fn erased_firmware_is_reported() {
        let chip = cst226_chip().respond(
            &[0xD2, 0x08],
            &[0xA5, 0xA5, 0xA5, 0xA5, 0x00, 0x00, 0x00, 0x00],
        );
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::Cst226, &steps);

        assert_eq!(
            block_on(touch.init()),
            Err(Error::Init(InitError::FirmwareMissing))
        );
        assert_eq!(touch.state(), DriverState::Failed);
        assert_eq!(touch.info(), None);
        assert_eq!(
            block_on(touch.get_touch_points(5)),
            Err(Error::NotInitialized)
        );
    }

    #[test]
    fn erased_firmware_wins_over_bad_check_code() {
        let chip = cst226_chip()
            .respond(&[0xD1, 0xFC], &[0x00, 0x00, 0x00, 0x00])
            .respond(&[0xD2, 0x08], &[0x00, 0x00, 0x00, 0x00, 0xA5, 0xA5, 0xA5, 0xA5]);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        assert_eq!(
            block_on(touch.init()),
            Err(Error::Init(InitError::FirmwareMissing))
        );
    }

    #[test]
    fn wrong_check_code_is_a_mismatch() {
        let chip = cst226_chip().respond(&[0xD1, 0xFC], &[0x00, 0x00, 0xCA, 0xCB]);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        assert_eq!(
            block_on(touch.init()),
            Err(Error::Init(InitError::IdentificationMismatch))
        );
    }

    #[test]
    fn absent_chip_is_unavailable() {
        let chip = FakeI2c::absent();
        let mut touch = driver(&chip, ChipFamily::Cst328, &trace());
        assert_eq!(
            block_on(touch.init()),
            Err(Error::Init(InitError::BusUnavailable))
        );
        assert_eq!(touch.state(), DriverState::Failed);
    }

    #[test]
    fn soft_reset_without_reset_line() {
        let chip = cst226_chip();
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::Cst226, &steps);

        block_on(touch.init()).unwrap();
        assert_eq!(chip.writes()[0], [0xD1, 0x02]);
        assert_eq!(steps.borrow()[0], Step::DelayMs(30));
    }

    #[test]
    fn reinit_recovers_after_failure() {
        let chip = cst226_chip().respond(&[0xD1, 0xFC], &[0, 0, 0, 0]);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        assert!(block_on(touch.init()).is_err());

        chip.set_response(&[0xD1, 0xFC], &[0x00, 0x00, 0xCA, 0xCA]);
        assert!(block_on(touch.init()).is_ok());
        assert_eq!(touch.state(), DriverState::Ready);
    }

    struct ShortReads {
        chip: FakeI2c,
        delivered: usize,
    }

    impl RegisterBus for ShortReads {
        type Error = crate::mock::FakeError;

        async fn write_register(
            &mut self,
            address: u8,
            register: Register,
            data: &[u8],
        ) -> Result<(), Self::Error> {
            I2cBus::new(self.chip.clone())
                .write_register(address, register, data)
                .await
        }

        async fn read_register(
            &mut self,
            address: u8,
            register: Register,
            buf: &mut [u8],
        ) -> Result<usize, Self::Error> {
            let n = I2cBus::new(self.chip.clone())
                .read_register(address, register, buf)
                .await?;
            if register == Register::U8(0x00) {
                return Ok(n.min(self.delivered));
            }
            Ok(n)
        }

        async fn write_read(
            &mut self,
            address: u8,
            bytes: &[u8],
            buf: &mut [u8],
        ) -> Result<usize, Self::Error> {
            I2cBus::new(self.chip.clone())
                .write_read(address, bytes, buf)
                .await
        }
    }

    #[test]
    fn short_report_is_discarded() {
        let mut report = [0u8; 28];
        report[..7].copy_from_slice(&[0x00, 0x01, 0x02, 0x34, 0x50, 0x81, 0xAB]);
        let chip = cst226_chip().respond(&[0x00], &report);
        let bus = ShortReads {
            chip: chip.clone(),
            delivered: 20,
        };
        let mut touch = TouchDriver::new(bus, FakeDelay::new(&trace()), ChipFamily::Cst226);
        block_on(touch.init()).unwrap();

        assert!(block_on(touch.get_touch_points(5)).unwrap().is_empty());

        touch.bus.delivered = 28;
        assert_eq!(
            block_on(touch.get_touch_points(5)).unwrap(),
            [point(0, 0x13, 0x24, 0x50)]
        );
    }

    #[test]
    fn two_fingers_are_scaled_to_the_display() {
        let mut report = [0u8; 28];
        report[..12].copy_from_slice(&[
            0x06, 0x05, 0x0A, 0x50, 0x40, 0x02, 0xAB, 0x16, 0x0A, 0x14, 0x00, 0x22,
        ]);
        let chip = cst226_chip().respond(&[0x00], &report);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        block_on(touch.init()).unwrap();
        touch.set_display_resolution(Resolution::new(340, 640));

        // Raw (85, 160) and (160, 320) on a 170x320 sensor.
        assert_eq!(
            block_on(touch.get_touch_points(5)).unwrap(),
            [point(0, 170, 320, 0x40), point(1, 320, 640, 0x22)]
        );
        assert_eq!(
            block_on(touch.get_touch_points(1)).unwrap(),
            [point(0, 170, 320, 0x40)]
        );
    }

    #[test]
    fn transform_follows_scaling() {
        let mut report = [0u8; 28];
        report[..7].copy_from_slice(&[0x06, 0x05, 0x0A, 0x50, 0x40, 0x01, 0xAB]);
        let chip = cst226_chip().respond(&[0x00], &report);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        block_on(touch.init()).unwrap();
        touch.set_display_resolution(Resolution::new(340, 640));
        touch.set_transform(Transform {
            swap_xy: true,
            mirror_x: true,
            mirror_y: false,
        });

        // Scaled (170, 320), swapped (320, 170), x mirrored within 0..=640.
        assert_eq!(
            block_on(touch.get_touch_points(5)).unwrap(),
            [point(0, 320, 170, 0x40)]
        );
    }

    #[test]
    fn overflowing_count_resyncs_the_report_buffer() {
        let mut report = [0u8; 28];
        report[5] = 0x86;
        report[6] = 0xAB;
        let chip = cst226_chip().respond(&[0x00], &report);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        block_on(touch.init()).unwrap();
        chip.clear_log();

        assert!(block_on(touch.get_touch_points(5)).unwrap().is_empty());
        assert_eq!(
            chip.log(),
            [
                BusEvent::Read(0x5A, vec![0x00], 28),
                BusEvent::Write(0x5A, vec![0x00, 0xAB]),
            ]
        );
    }

    static HOME_PRESSES: AtomicUsize = AtomicUsize::new(0);

    fn on_home() {
        HOME_PRESSES.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn home_key_reaches_the_callback() {
        let mut report = [0u8; 28];
        report[..7].copy_from_slice(&[0x83, 0x17, 0x00, 0x00, 0x00, 0x80, 0x00]);
        let chip = cst226_chip().respond(&[0x00], &report);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        touch.set_home_button_callback(on_home);
        block_on(touch.init()).unwrap();

        assert!(block_on(touch.get_touch_points(5)).unwrap().is_empty());
        assert_eq!(HOME_PRESSES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn interrupt_line_is_rate_limited() {
        let chip = cst226_chip();
        let steps = trace();
        let irq = FakePin::new("int", &steps);
        let level = irq.input.clone();
        let mut touch = driver(&chip, ChipFamily::Cst226, &steps).with_irq_pin(irq);
        block_on(touch.init()).unwrap();
        chip.clear_log();

        assert!(!block_on(touch.is_pressed()).unwrap());
        level.set(Level::Low);
        assert!(block_on(touch.is_pressed()).unwrap());
        assert!(!block_on(touch.is_pressed()).unwrap());

        touch.set_irq_retrigger_interval(Duration::from_millis(0));
        assert!(block_on(touch.is_pressed()).unwrap());
        assert!(chip.log().is_empty(), "the interrupt line replaces polling");
    }

    #[test]
    fn without_interrupt_line_is_pressed_polls() {
        let mut report = [0u8; 28];
        report[..7].copy_from_slice(&[0x00, 0x01, 0x02, 0x34, 0x50, 0x81, 0xAB]);
        let chip = cst226_chip().respond(&[0x00], &report);
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        block_on(touch.init()).unwrap();

        assert!(block_on(touch.is_pressed()).unwrap());
        report[5] = 0x80;
        chip.set_response(&[0x00], &report);
        assert!(!block_on(touch.is_pressed()).unwrap());
    }

    #[test]
    fn report_bus_errors_are_returned() {
        let chip = cst226_chip();
        let mut touch = driver(&chip, ChipFamily::Cst226, &trace());
        block_on(touch.init()).unwrap();

        // No response configured for the report register: the read NACKs.
        assert!(matches!(
            block_on(touch.get_touch_points(5)),
            Err(Error::Bus(_))
        ));
        assert_eq!(touch.state(), DriverState::Ready);
    }

    fn gt911_chip() -> FakeI2c {
        FakeI2c::default().respond(
            &[0x81, 0x40],
            &[b'9', b'1', b'1', 0x00, 0x60, 0x10, 0xE0, 0x01, 0x20, 0x03, 0x02],
        )
    }

    #[test]
    fn gt911_latches_alternate_address() {
        let chip = gt911_chip();
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::Gt911, &steps)
            .with_reset_pin(FakePin::new("rst", &steps))
            .with_irq_pin(FakePin::new("int", &steps))
            .with_address(0x14);

        let info = block_on(touch.init()).unwrap();
        assert_eq!(info.chip_id, 911);
        assert_eq!(info.firmware_version, 0x1060);
        assert_eq!(info.project_id, 0x02);
        assert_eq!(info.resolution, Some(Resolution::new(480, 800)));

        assert_eq!(
            *steps.borrow(),
            [
                Step::Mode("int", PinMode::Output),
                Step::Drive("int", Level::Low),
                Step::Mode("rst", PinMode::Output),
                Step::Drive("rst", Level::Low),
                Step::DelayMs(10),
                Step::Drive("int", Level::High),
                Step::DelayMs(1),
                Step::Drive("rst", Level::High),
                Step::DelayMs(5),
                Step::Drive("int", Level::Low),
                Step::Mode("int", PinMode::Input),
                Step::DelayMs(50),
            ]
        );
        assert_eq!(
            chip.log(),
            [
                BusEvent::Read(0x14, vec![0x81, 0x40], 11),
                BusEvent::Write(0x14, vec![0x81, 0x4E, 0x00]),
            ]
        );
    }

    #[test]
    fn gt911_report_is_acknowledged() {
        let mut report = [0u8; 41];
        report[0] = 0x81;
        report[1..9].copy_from_slice(&[0x03, 0x40, 0x01, 0xF0, 0x00, 0x20, 0x00, 0x00]);
        let chip = gt911_chip().respond(&[0x81, 0x4E], &report);
        let mut touch = driver(&chip, ChipFamily::Gt911, &trace());
        block_on(touch.init()).unwrap();
        chip.clear_log();

        assert_eq!(
            block_on(touch.get_touch_points(5)).unwrap(),
            [point(3, 320, 240, 32)]
        );
        assert_eq!(
            chip.log()[1],
            BusEvent::Write(0x5D, vec![0x81, 0x4E, 0x00])
        );

        // A buffer that is not ready is left alone.
        report[0] = 0x00;
        chip.set_response(&[0x81, 0x4E], &report);
        chip.clear_log();
        assert!(block_on(touch.get_touch_points(5)).unwrap().is_empty());
        assert_eq!(chip.log().len(), 1);
    }

    fn ztw622_chip() -> FakeI2c {
        FakeI2c::default()
            .respond(&[0x00, 0xCC], &[0x22, 0xE6])
            .respond(&[0x12, 0x00], &[0x05, 0x01])
            .respond(&[0xC0, 0x00], &[0xF0, 0x00])
            .respond(&[0xC1, 0x00], &[0x40, 0x01])
    }

    #[test]
    fn ztw622_bring_up_and_report() {
        let chip = ztw622_chip();
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::Ztw622, &steps);

        let info = block_on(touch.init()).unwrap();
        assert_eq!(info.chip_id, 0xE622);
        assert_eq!(info.firmware_version, 0x0105);
        assert_eq!(info.resolution, Some(Resolution::new(240, 320)));
        assert_eq!(
            chip.writes(),
            [
                vec![0x00, 0x00],
                vec![0x00, 0xC0, 0x01, 0x00],
                vec![0x04, 0xC0, 0x01, 0x00],
                vec![0x02, 0xC0, 0x01, 0x00],
                vec![0x01, 0xC0, 0x01, 0x00],
                vec![0xF0, 0x00, 0x0F, 0x00],
                vec![0x03, 0x00],
            ]
        );
        assert!(steps.borrow().contains(&Step::DelayMs(150)));

        let mut report = [0u8; 44];
        report[..4].copy_from_slice(&[0x02, 0x08, 0x01, 0x00]);
        report[4..12].copy_from_slice(&[0x2C, 0x01, 0xC8, 0x00, 0x05, 0x03, 0x00, 0x00]);
        chip.set_response(&[0x80, 0x00], &report);
        chip.clear_log();

        assert_eq!(
            block_on(touch.get_touch_points(5)).unwrap(),
            [point(0, 300, 200, 5)]
        );
        assert_eq!(chip.writes(), [vec![0x03, 0x00]]);
    }

    #[test]
    fn ztw622_erased_firmware() {
        let chip = ztw622_chip().respond(&[0x12, 0x00], &[0xFF, 0xFF]);
        let mut touch = driver(&chip, ChipFamily::Ztw622, &trace());
        assert_eq!(
            block_on(touch.init()),
            Err(Error::Init(InitError::FirmwareMissing))
        );
    }

    #[test]
    fn ztw622_foreign_chip_id() {
        let chip = ztw622_chip().respond(&[0x00, 0xCC], &[0x22, 0xE5]);
        let mut touch = driver(&chip, ChipFamily::Ztw622, &trace());
        assert_eq!(
            block_on(touch.init()),
            Err(Error::Init(InitError::IdentificationMismatch))
        );
    }

    fn self_cap_chip() -> FakeI2c {
        FakeI2c::default().respond(&[0xA7], &[0xB5, 0x01, 0x02])
    }

    #[test]
    fn self_cap_identity_and_gesture() {
        let chip = self_cap_chip();
        let mut touch = driver(&chip, ChipFamily::CstSelfCap, &trace());

        let info = block_on(touch.init()).unwrap();
        assert_eq!(info.chip_id, 0xB5);
        assert_eq!(info.project_id, 0x01);
        assert_eq!(info.firmware_version, 0x02);
        assert_eq!(info.resolution, Some(Resolution::new(240, 240)));
        assert_eq!(chip.writes(), [vec![0xFE, 0x01]]);

        let mut report = [0u8; 13];
        report[1] = 0x04;
        chip.set_response(&[0x00], &report);
        assert!(block_on(touch.get_touch_points(1)).unwrap().is_empty());
        assert_eq!(touch.last_gesture(), Some(Gesture::SwipeRight));

        // No gesture in the next report keeps the last one.
        report[1] = 0x00;
        chip.set_response(&[0x00], &report);
        block_on(touch.get_touch_points(1)).unwrap();
        assert_eq!(touch.take_gesture(), Some(Gesture::SwipeRight));
        assert_eq!(touch.last_gesture(), None);
    }

    #[test]
    fn self_cap_unknown_chip() {
        let chip = FakeI2c::default().respond(&[0xA7], &[0x11, 0x00, 0x00]);
        let mut touch = driver(&chip, ChipFamily::CstSelfCap, &trace());
        assert_eq!(
            block_on(touch.init()),
            Err(Error::Init(InitError::IdentificationMismatch))
        );
    }

    #[test]
    fn sleep_and_wakeup() {
        let chip = self_cap_chip();
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::CstSelfCap, &steps)
            .with_reset_pin(FakePin::new("rst", &steps));
        block_on(touch.init()).unwrap();
        chip.clear_log();

        block_on(touch.sleep()).unwrap();
        assert_eq!(chip.writes(), [vec![0xA5, 0x03]]);

        steps.borrow_mut().clear();
        block_on(touch.wakeup()).unwrap();
        assert_eq!(touch.state(), DriverState::Ready);
        assert_eq!(steps.borrow()[1], Step::Drive("rst", Level::High));
        // Auto sleep is disabled again after the reset.
        assert_eq!(chip.writes().last(), Some(&vec![0xFE, 0x01]));
    }

    #[test]
    fn gt911_sleep_pulls_interrupt_low() {
        let chip = gt911_chip();
        let steps = trace();
        let mut touch = driver(&chip, ChipFamily::Gt911, &steps)
            .with_irq_pin(FakePin::new("int", &steps));
        block_on(touch.init()).unwrap();
        steps.borrow_mut().clear();
        chip.clear_log();

        block_on(touch.sleep()).unwrap();
        assert_eq!(
            *steps.borrow(),
            [
                Step::Mode("int", PinMode::Output),
                Step::Drive("int", Level::Low),
            ]
        );
        assert_eq!(chip.writes(), [vec![0x80, 0x40, 0x05]]);
    }

    #[test]
    fn gt911_wakeup_releases_interrupt_without_reset_line() {
        let chip = gt911_chip();
        let steps = trace();
        let irq = FakePin::new("int", &steps);
        let input = irq.input.clone();
        let mut touch = driver(&chip, ChipFamily::Gt911, &steps).with_irq_pin(irq);
        block_on(touch.init()).unwrap();
        block_on(touch.sleep()).unwrap();
        steps.borrow_mut().clear();
        chip.clear_log();

        block_on(touch.wakeup()).unwrap();
        assert_eq!(
            *steps.borrow(),
            [
                Step::Mode("int", PinMode::Output),
                Step::Drive("int", Level::High),
                Step::DelayMs(5),
                Step::Drive("int", Level::Low),
                Step::Mode("int", PinMode::Input),
                Step::DelayMs(50),
            ]
        );
        assert_eq!(chip.writes(), [vec![0x80, 0x40, 0x02]]);

        // The line is sampled again, so an idle panel reads as released.
        input.set(Level::High);
        assert_eq!(block_on(touch.is_pressed()), Ok(false));
    }
}
