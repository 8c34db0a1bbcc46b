//! Per-family constant tables.
//!
//! A [`DeviceProfile`] describes everything about a chip family that the
//! driver needs without talking to the chip: where it answers, where its
//! report lives and how long it is, how many fingers it tracks, and which
//! commands reset it and put it to sleep.

use crate::bus::Register;

/// Supported controller families. The tag selects the report decoder and the
/// identification handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipFamily {
    /// Hynitron CST226(SE), mutual capacitance, 8-bit report register.
    Cst226,
    /// Hynitron CST328 and other CST3xx mutual-capacitance parts.
    Cst328,
    /// Hynitron CST8xx self-capacitance parts (CST816S/T/D, CST716).
    CstSelfCap,
    /// Zinitix ZTW622.
    Ztw622,
    /// Goodix GT911.
    Gt911,
}

impl ChipFamily {
    /// The constant profile of this family.
    pub const fn profile(self) -> &'static DeviceProfile {
        match self {
            ChipFamily::Cst226 => &CST226,
            ChipFamily::Cst328 => &CST328,
            ChipFamily::CstSelfCap => &CST_SELF_CAP,
            ChipFamily::Ztw622 => &ZTW622,
            ChipFamily::Gt911 => &GT911,
        }
    }
}

/// Delays of the high→low→high reset pulse, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTiming {
    /// Time the line is held high before the pulse.
    pub high_ms: u32,
    /// Width of the low pulse.
    pub low_ms: u32,
    /// Firmware boot time after the line is released.
    pub settle_ms: u32,
}

/// A register write with a fixed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Target register.
    pub register: Register,
    /// Payload; may be empty for "command registers" that act on address alone.
    pub data: &'static [u8],
}

/// Sensor or display resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Horizontal extent.
    pub x: u16,
    /// Vertical extent.
    pub y: u16,
}

impl Resolution {
    /// Creates a resolution.
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Immutable description of a chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Family tag.
    pub family: ChipFamily,
    /// Default 7-bit I2C address.
    pub i2c_address: u8,
    /// Start of the touch report.
    pub report_register: Register,
    /// Bytes read per report.
    pub report_len: usize,
    /// Most fingers the family reports.
    pub max_points: u8,
    /// GPIO reset pulse timing.
    pub reset: ResetTiming,
    /// Reset command used when no reset line is wired.
    pub soft_reset: Option<Command>,
    /// Low-power command.
    pub sleep: Command,
    /// Resolution assumed when the chip does not report one.
    pub default_resolution: Option<Resolution>,
}

/// Largest `report_len` over all profiles.
pub(crate) const MAX_REPORT_LEN: usize = 48;

/// Hynitron CST3xx register map, shared by the CST226 and CST328.
///
/// The CST226 addresses its report with a single byte, but its command space
/// is the same big-endian `0xD1xx` block as on the CST328.
pub(crate) mod cst_mutual {
    pub const DEFAULT_ADDRESS_CST226: u8 = 0x5A;
    pub const DEFAULT_ADDRESS_CST328: u8 = 0x1A;

    pub const REG_REPORT_CST226: u8 = 0x00;
    pub const REG_REPORT_CST328: u16 = 0xD000;

    pub const CMD_COMMAND_MODE: u16 = 0xD101;
    pub const CMD_RESET_MODE: u16 = 0xD102;
    pub const CMD_DEEP_SLEEP: u16 = 0xD105;
    pub const CMD_NORMAL_MODE: u16 = 0xD109;

    pub const REG_RESOLUTION: u16 = 0xD1F8;
    pub const REG_CHECKCODE: u16 = 0xD1FC;
    pub const REG_CHIP_TYPE: u16 = 0xD204;
    pub const REG_FIRMWARE: u16 = 0xD208;

    /// Upper half of a valid check code.
    pub const CHECKCODE_MAGIC: u32 = 0xCACA;
    /// Firmware version/checksum read from an erased part.
    pub const FIRMWARE_ERASED: u32 = 0xA5A5_A5A5;

    /// Byte written to the report register to resynchronise the report buffer.
    pub const REPORT_SYNC: u8 = 0xAB;
}

/// Hynitron CST8xx register map.
pub(crate) mod cst_self_cap {
    pub const DEFAULT_ADDRESS: u8 = 0x15;
    pub const REG_REPORT: u8 = 0x00;
    pub const REG_CHIP_ID: u8 = 0xA7;
    pub const REG_SLEEP: u8 = 0xA5;
    pub const REG_DISABLE_AUTO_SLEEP: u8 = 0xFE;

    pub const SLEEP_DEEP: u8 = 0x03;

    /// CST816S, CST816T, CST816D and CST716.
    pub const KNOWN_CHIP_IDS: [u8; 4] = [0xB4, 0xB5, 0xB6, 0x20];
}

/// Zinitix register map. Registers and values are 16-bit little endian.
pub(crate) mod zinitix {
    pub const DEFAULT_ADDRESS: u8 = 0x20;

    pub const CMD_SW_RESET: u16 = 0x0000;
    pub const CMD_CLEAR_INT_STATUS: u16 = 0x0003;
    pub const CMD_SLEEP: u16 = 0x0005;

    pub const REG_FIRMWARE_VERSION: u16 = 0x0012;
    pub const REG_POINT_STATUS: u16 = 0x0080;
    pub const REG_X_RESOLUTION: u16 = 0x00C0;
    pub const REG_Y_RESOLUTION: u16 = 0x00C1;
    pub const REG_INT_ENABLE: u16 = 0x00F0;

    pub const REG_VENDOR_ENABLE: u16 = 0xC000;
    pub const REG_PROGRAM_START: u16 = 0xC001;
    pub const REG_NVM_INIT: u16 = 0xC002;
    pub const REG_INTN_CLEAR: u16 = 0xC004;
    pub const REG_CHIP_ID: u16 = 0xCC00;

    /// High byte of the ZTW6xx chip id.
    pub const CHIP_ID_FAMILY: u8 = 0xE6;
    pub const FIRMWARE_ERASED: u16 = 0xFFFF;

    /// Point count change, down, move and up events.
    pub const INT_MASK: u16 = 0x000F;

    pub const FIRMWARE_ON_DELAY_MS: u32 = 150;
}

/// Goodix GT911 register map. Registers are 16-bit big endian.
pub(crate) mod goodix {
    pub const DEFAULT_ADDRESS: u8 = 0x5D;
    pub const ALTERNATE_ADDRESS: u8 = 0x14;

    pub const REG_COMMAND: u16 = 0x8040;
    pub const REG_PRODUCT_INFO: u16 = 0x8140;
    pub const REG_POINT_STATUS: u16 = 0x814E;

    pub const CMD_SOFT_RESET: u8 = 0x02;
    pub const CMD_SCREEN_OFF: u8 = 0x05;

    /// Product id, firmware version, x/y resolution and vendor id.
    pub const PRODUCT_INFO_LEN: usize = 11;
    pub const PRODUCT_ID: &[u8] = b"911";
}

pub use cst_mutual::{DEFAULT_ADDRESS_CST226, DEFAULT_ADDRESS_CST328};
pub use goodix::{ALTERNATE_ADDRESS as GT911_ALTERNATE_ADDRESS, DEFAULT_ADDRESS as GT911_DEFAULT_ADDRESS};

/// CST226(SE): the first finger record is 7 bytes long, every other one 5.
pub const CST226: DeviceProfile = DeviceProfile {
    family: ChipFamily::Cst226,
    i2c_address: cst_mutual::DEFAULT_ADDRESS_CST226,
    report_register: Register::U8(cst_mutual::REG_REPORT_CST226),
    report_len: 28,
    max_points: 5,
    reset: ResetTiming {
        high_ms: 5,
        low_ms: 5,
        settle_ms: 30,
    },
    soft_reset: Some(Command {
        register: Register::U16Be(cst_mutual::CMD_RESET_MODE),
        data: &[],
    }),
    sleep: Command {
        register: Register::U16Be(cst_mutual::CMD_DEEP_SLEEP),
        data: &[],
    },
    default_resolution: None,
};

/// CST328: same report layout as the CST226 behind a 16-bit register.
pub const CST328: DeviceProfile = DeviceProfile {
    family: ChipFamily::Cst328,
    i2c_address: cst_mutual::DEFAULT_ADDRESS_CST328,
    report_register: Register::U16Be(cst_mutual::REG_REPORT_CST328),
    report_len: 27,
    max_points: 5,
    reset: ResetTiming {
        high_ms: 1,
        low_ms: 10,
        settle_ms: 200,
    },
    soft_reset: Some(Command {
        register: Register::U16Be(cst_mutual::CMD_RESET_MODE),
        data: &[],
    }),
    sleep: Command {
        register: Register::U16Be(cst_mutual::CMD_DEEP_SLEEP),
        data: &[],
    },
    default_resolution: None,
};

/// CST8xx: single finger plus gesture code. No soft reset command.
pub const CST_SELF_CAP: DeviceProfile = DeviceProfile {
    family: ChipFamily::CstSelfCap,
    i2c_address: cst_self_cap::DEFAULT_ADDRESS,
    report_register: Register::U8(cst_self_cap::REG_REPORT),
    report_len: 13,
    max_points: 1,
    reset: ResetTiming {
        high_ms: 1,
        low_ms: 20,
        settle_ms: 50,
    },
    soft_reset: None,
    sleep: Command {
        register: Register::U8(cst_self_cap::REG_SLEEP),
        data: &[cst_self_cap::SLEEP_DEEP],
    },
    default_resolution: Some(Resolution::new(240, 240)),
};

/// ZTW622: 4-byte status header followed by one 8-byte record per finger slot.
pub const ZTW622: DeviceProfile = DeviceProfile {
    family: ChipFamily::Ztw622,
    i2c_address: zinitix::DEFAULT_ADDRESS,
    report_register: Register::U16Le(zinitix::REG_POINT_STATUS),
    report_len: 4 + 8 * 5,
    max_points: 5,
    reset: ResetTiming {
        high_ms: 1,
        low_ms: 10,
        settle_ms: 20,
    },
    soft_reset: Some(Command {
        register: Register::U16Le(zinitix::CMD_SW_RESET),
        data: &[],
    }),
    sleep: Command {
        register: Register::U16Le(zinitix::CMD_SLEEP),
        data: &[],
    },
    default_resolution: None,
};

/// GT911: status byte followed by 8-byte records starting at 0x814F.
pub const GT911: DeviceProfile = DeviceProfile {
    family: ChipFamily::Gt911,
    i2c_address: goodix::DEFAULT_ADDRESS,
    report_register: Register::U16Be(goodix::REG_POINT_STATUS),
    report_len: 1 + 8 * 5,
    max_points: 5,
    reset: ResetTiming {
        high_ms: 1,
        low_ms: 10,
        settle_ms: 50,
    },
    soft_reset: Some(Command {
        register: Register::U16Be(goodix::REG_COMMAND),
        data: &[goodix::CMD_SOFT_RESET],
    }),
    sleep: Command {
        register: Register::U16Be(goodix::REG_COMMAND),
        data: &[goodix::CMD_SCREEN_OFF],
    },
    default_resolution: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MAX_TOUCH_POINTS;

    const ALL: [ChipFamily; 5] = [
        ChipFamily::Cst226,
        ChipFamily::Cst328,
        ChipFamily::CstSelfCap,
        ChipFamily::Ztw622,
        ChipFamily::Gt911,
    ];

    #[test]
    fn profiles_fit_the_driver_buffers() {
        for family in ALL {
            let profile = family.profile();
            assert_eq!(profile.family, family);
            assert!(profile.report_len <= MAX_REPORT_LEN, "{family:?}");
            assert!(profile.max_points as usize <= MAX_TOUCH_POINTS, "{family:?}");
            assert!(profile.reset.settle_ms >= profile.reset.low_ms, "{family:?}");
        }
    }

    #[test]
    fn cst_mutual_report_covers_five_fingers() {
        // 7 bytes for the first record, 5 for each of the other four.
        assert!(CST226.report_len >= 7 + 5 * 4);
        assert_eq!(CST328.report_len, 7 + 5 * 4);
    }
}
