//! Identification handshakes, one per family.
//!
//! Every transfer made here runs under the driver's handshake timeout, and
//! any failure or expiry is reported as [`InitError::BusUnavailable`].

use crate::bus::{Register, RegisterBus};
use crate::driver::{DeviceInfo, TouchDriver};
use crate::error::{Error, InitError};
use crate::pins::ControlPin;
use crate::profile::{cst_mutual, cst_self_cap, goodix, zinitix, ChipFamily, Resolution};
use embassy_time::with_timeout;
use embedded_hal_async::delay::DelayNs;

fn le16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Identity block read from a CST mutual-capacitance chip in command mode.
#[derive(Debug)]
struct CstIdentity {
    checkcode: u32,
    resolution: Option<Resolution>,
    project_id: u16,
    chip_type: u16,
    firmware_version: u32,
    checksum: u32,
}

/// A reported resolution of zero on either axis means "not configured".
fn reported(x: u16, y: u16) -> Option<Resolution> {
    (x != 0 && y != 0).then_some(Resolution::new(x, y))
}

impl<BUS, D, RST, IRQ> TouchDriver<BUS, D, RST, IRQ>
where
    BUS: RegisterBus,
    D: DelayNs,
    RST: ControlPin,
    IRQ: ControlPin,
{
    pub(crate) async fn hs_write(
        &mut self,
        register: Register,
        data: &[u8],
    ) -> Result<(), Error<BUS::Error>> {
        let address = self.address;
        match with_timeout(
            self.handshake_timeout,
            self.bus.write_register(address, register, data),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                log::warn!("Error writing touch register {register:?}: {err:?}");
                Err(InitError::BusUnavailable.into())
            }
            Err(_) => {
                log::warn!("Timeout writing touch register {register:?}");
                Err(InitError::BusUnavailable.into())
            }
        }
    }

    pub(crate) async fn hs_read(
        &mut self,
        register: Register,
        buf: &mut [u8],
    ) -> Result<(), Error<BUS::Error>> {
        let address = self.address;
        let wanted = buf.len();
        match with_timeout(
            self.handshake_timeout,
            self.bus.read_register(address, register, buf),
        )
        .await
        {
            Ok(Ok(read)) if read == wanted => Ok(()),
            Ok(Ok(read)) => {
                log::warn!("Short read of touch register {register:?}: {read} of {wanted} bytes");
                Err(InitError::BusUnavailable.into())
            }
            Ok(Err(err)) => {
                log::warn!("Error reading touch register {register:?}: {err:?}");
                Err(InitError::BusUnavailable.into())
            }
            Err(_) => {
                log::warn!("Timeout reading touch register {register:?}");
                Err(InitError::BusUnavailable.into())
            }
        }
    }

    pub(crate) async fn handshake(&mut self) -> Result<DeviceInfo, Error<BUS::Error>> {
        match self.profile.family {
            ChipFamily::Cst226 | ChipFamily::Cst328 => self.handshake_cst_mutual().await,
            ChipFamily::CstSelfCap => self.handshake_cst_self_cap().await,
            ChipFamily::Ztw622 => self.handshake_zinitix().await,
            ChipFamily::Gt911 => self.handshake_goodix().await,
        }
    }

    async fn handshake_cst_mutual(&mut self) -> Result<DeviceInfo, Error<BUS::Error>> {
        use cst_mutual::*;

        self.hs_write(Register::U16Be(CMD_COMMAND_MODE), &[]).await?;
        self.delay.delay_ms(10).await;
        log::trace!("touch::init command mode");

        let identity = self.read_cst_identity().await;
        // Leave command mode even when a read failed.
        let exit = self.hs_write(Register::U16Be(CMD_NORMAL_MODE), &[]).await;
        let CstIdentity {
            checkcode,
            resolution,
            project_id,
            chip_type,
            firmware_version,
            checksum,
        } = identity?;
        exit?;

        if firmware_version == FIRMWARE_ERASED || checksum == FIRMWARE_ERASED {
            return Err(InitError::FirmwareMissing.into());
        }
        if checkcode >> 16 != CHECKCODE_MAGIC {
            return Err(InitError::IdentificationMismatch.into());
        }

        Ok(DeviceInfo {
            family: self.profile.family,
            chip_id: chip_type as u32,
            project_id,
            firmware_version,
            resolution: resolution.or(self.profile.default_resolution),
        })
    }

    async fn read_cst_identity(&mut self) -> Result<CstIdentity, Error<BUS::Error>> {
        use cst_mutual::*;

        let mut buf = [0u8; 4];
        self.hs_read(Register::U16Be(REG_CHECKCODE), &mut buf).await?;
        let checkcode = le32(&buf);

        self.hs_read(Register::U16Be(REG_RESOLUTION), &mut buf).await?;
        let resolution = reported(le16(&buf[0..2]), le16(&buf[2..4]));

        self.hs_read(Register::U16Be(REG_CHIP_TYPE), &mut buf).await?;
        let project_id = le16(&buf[0..2]);
        let chip_type = le16(&buf[2..4]);

        let mut firmware = [0u8; 8];
        self.hs_read(Register::U16Be(REG_FIRMWARE), &mut firmware).await?;
        let identity = CstIdentity {
            checkcode,
            resolution,
            project_id,
            chip_type,
            firmware_version: le32(&firmware[0..4]),
            checksum: le32(&firmware[4..8]),
        };
        log::trace!("touch::init {identity:?}");
        Ok(identity)
    }

    async fn handshake_cst_self_cap(&mut self) -> Result<DeviceInfo, Error<BUS::Error>> {
        use cst_self_cap::*;

        // Chip id, project id and firmware version are consecutive registers.
        let mut id = [0u8; 3];
        self.hs_read(Register::U8(REG_CHIP_ID), &mut id).await?;
        let [chip_id, project_id, firmware_version] = id;
        log::trace!("touch::init chip {chip_id:#04x}, project {project_id:#04x}, firmware {firmware_version:#04x}");
        if !KNOWN_CHIP_IDS.contains(&chip_id) {
            return Err(InitError::IdentificationMismatch.into());
        }

        self.hs_write(Register::U8(REG_DISABLE_AUTO_SLEEP), &[0x01])
            .await?;

        Ok(DeviceInfo {
            family: self.profile.family,
            chip_id: chip_id as u32,
            project_id: project_id as u16,
            firmware_version: firmware_version as u32,
            resolution: self.profile.default_resolution,
        })
    }

    async fn handshake_zinitix(&mut self) -> Result<DeviceInfo, Error<BUS::Error>> {
        use zinitix::*;
        const ONE: [u8; 2] = 1u16.to_le_bytes();

        self.hs_write(Register::U16Le(REG_VENDOR_ENABLE), &ONE).await?;

        let mut word = [0u8; 2];
        self.hs_read(Register::U16Le(REG_CHIP_ID), &mut word).await?;
        let chip_id = le16(&word);
        log::trace!("touch::init chip {chip_id:#06x}");
        if (chip_id >> 8) as u8 != CHIP_ID_FAMILY {
            return Err(InitError::IdentificationMismatch.into());
        }

        self.hs_write(Register::U16Le(REG_INTN_CLEAR), &ONE).await?;
        self.hs_write(Register::U16Le(REG_NVM_INIT), &ONE).await?;
        self.delay.delay_ms(2).await;
        self.hs_write(Register::U16Le(REG_PROGRAM_START), &ONE).await?;
        self.delay.delay_ms(FIRMWARE_ON_DELAY_MS).await;

        self.hs_read(Register::U16Le(REG_FIRMWARE_VERSION), &mut word).await?;
        let firmware_version = le16(&word);
        log::trace!("touch::init firmware {firmware_version:#06x}");
        if firmware_version == FIRMWARE_ERASED {
            return Err(InitError::FirmwareMissing.into());
        }

        self.hs_read(Register::U16Le(REG_X_RESOLUTION), &mut word).await?;
        let x = le16(&word);
        self.hs_read(Register::U16Le(REG_Y_RESOLUTION), &mut word).await?;
        let y = le16(&word);

        self.hs_write(Register::U16Le(REG_INT_ENABLE), &INT_MASK.to_le_bytes())
            .await?;
        self.hs_write(Register::U16Le(CMD_CLEAR_INT_STATUS), &[]).await?;

        Ok(DeviceInfo {
            family: self.profile.family,
            chip_id: chip_id as u32,
            project_id: 0,
            firmware_version: firmware_version as u32,
            resolution: reported(x, y).or(self.profile.default_resolution),
        })
    }

    async fn handshake_goodix(&mut self) -> Result<DeviceInfo, Error<BUS::Error>> {
        use goodix::*;

        let mut info = [0u8; PRODUCT_INFO_LEN];
        self.hs_read(Register::U16Be(REG_PRODUCT_INFO), &mut info).await?;
        let product = &info[..4];
        log::trace!("touch::init product {product:?}");
        if !product.starts_with(PRODUCT_ID) {
            return Err(InitError::IdentificationMismatch.into());
        }
        let chip_id = product
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .fold(0u32, |id, b| id * 10 + (b - b'0') as u32);

        // Drop anything latched in the report buffer during reset.
        self.hs_write(Register::U16Be(REG_POINT_STATUS), &[0x00]).await?;

        Ok(DeviceInfo {
            family: self.profile.family,
            chip_id,
            project_id: info[10] as u16,
            firmware_version: le16(&info[4..6]) as u32,
            resolution: reported(le16(&info[6..8]), le16(&info[8..10]))
                .or(self.profile.default_resolution),
        })
    }
}
