//! Decoding of raw touch reports.
//!
//! Every family lays out its report buffer differently. [`decode`] turns one
//! buffer into a [`Frame`]: an ordered list of points in sensor coordinates
//! plus the side information some chips attach (gesture codes, the CST226
//! home key). Decoding is pure; it never touches the bus.

use crate::profile::{ChipFamily, DeviceProfile};
use core::fmt;
use heapless::Vec;

/// Capacity of the point list returned by the driver.
pub const MAX_TOUCH_POINTS: usize = 10;

/// Contact state of a finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchState {
    /// The finger is on the panel.
    Pressed,
    /// The finger has just been lifted.
    Released,
    /// The finger moved since the previous report.
    Move,
    /// The chip reported an event code with no defined meaning.
    Unknown,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPoint {
    /// Finger tracking id, stable while the finger stays down.
    pub id: u8,
    /// Horizontal coordinate.
    pub x: u16,
    /// Vertical coordinate.
    pub y: u16,
    /// Pressure or contact size, vendor scaled.
    pub pressure: u8,
    /// Contact state.
    pub state: TouchState,
}

/// Gesture codes of the self-capacitance parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Code `0x01`.
    SwipeUp,
    /// Code `0x02`.
    SwipeDown,
    /// Code `0x03`.
    SwipeLeft,
    /// Code `0x04`.
    SwipeRight,
    /// Code `0x05`.
    SingleClick,
    /// Code `0x0B`.
    DoubleClick,
    /// Code `0x0C`.
    LongPress,
    /// A vendor code without a name here.
    Other(u8),
}

impl Gesture {
    /// Maps a gesture register value; `0` means no gesture.
    pub fn from_code(code: u8) -> Option<Self> {
        let gesture = match code {
            0x00 => return None,
            0x01 => Gesture::SwipeUp,
            0x02 => Gesture::SwipeDown,
            0x03 => Gesture::SwipeLeft,
            0x04 => Gesture::SwipeRight,
            0x05 => Gesture::SingleClick,
            0x0B => Gesture::DoubleClick,
            0x0C => Gesture::LongPress,
            other => Gesture::Other(other),
        };
        Some(gesture)
    }
}

/// Points of one report.
pub type Points = Vec<TouchPoint, MAX_TOUCH_POINTS>;

/// Everything decoded from one report buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Points in sensor coordinates, in report order.
    pub points: Points,
    /// Gesture code, if the family reports one.
    pub gesture: Option<Gesture>,
    /// The report was a home key event rather than a touch.
    pub home_button: bool,
}

/// Reasons a report buffer is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer is too short for the header or the declared point count.
    Truncated { needed: usize, got: usize },
    /// A byte with a fixed value did not have it.
    BadSentinel,
    /// The report declares more points than the family tracks.
    TooManyPoints(u8),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Truncated { needed, got } => {
                write!(f, "report truncated: need {needed} bytes, got {got}")
            }
            FrameError::BadSentinel => write!(f, "report sentinel mismatch"),
            FrameError::TooManyPoints(count) => write!(f, "report declares {count} points"),
        }
    }
}

/// Decodes one raw report of the family described by `profile`.
pub fn decode(profile: &DeviceProfile, raw: &[u8]) -> Result<Frame, FrameError> {
    match profile.family {
        ChipFamily::Cst226 | ChipFamily::Cst328 => decode_cst_mutual(profile, raw),
        ChipFamily::CstSelfCap => decode_cst_self_cap(profile, raw),
        ChipFamily::Ztw622 => decode_zinitix(profile, raw),
        ChipFamily::Gt911 => decode_goodix(profile, raw),
    }
}

fn require(raw: &[u8], needed: usize) -> Result<(), FrameError> {
    if raw.len() < needed {
        return Err(FrameError::Truncated {
            needed,
            got: raw.len(),
        });
    }
    Ok(())
}

fn check_count(profile: &DeviceProfile, count: u8) -> Result<(), FrameError> {
    if count > profile.max_points || count as usize > MAX_TOUCH_POINTS {
        return Err(FrameError::TooManyPoints(count));
    }
    Ok(())
}

fn push(points: &mut Points, point: TouchPoint) -> Result<(), FrameError> {
    points
        .push(point)
        .map_err(|_| FrameError::TooManyPoints(MAX_TOUCH_POINTS as u8 + 1))
}

const CST_TRAILER: u8 = 0xAB;
const CST_FIRST_RECORD_LEN: usize = 7;
const CST_RECORD_LEN: usize = 5;

/// Offset of finger record `index`: the first record carries the two
/// header bytes (count, trailer) behind it.
fn cst_record_offset(index: usize) -> usize {
    if index == 0 {
        0
    } else {
        CST_FIRST_RECORD_LEN + CST_RECORD_LEN * (index - 1)
    }
}

fn decode_cst_mutual(profile: &DeviceProfile, raw: &[u8]) -> Result<Frame, FrameError> {
    require(raw, CST_FIRST_RECORD_LEN)?;

    if profile.family == ChipFamily::Cst226 && raw[0] == 0x83 && raw[1] == 0x17 && raw[5] == 0x80 {
        return Ok(Frame {
            home_button: true,
            ..Frame::default()
        });
    }
    if raw[6] != CST_TRAILER || raw[0] == CST_TRAILER {
        return Err(FrameError::BadSentinel);
    }

    let count = raw[5] & 0x7F;
    check_count(profile, count)?;
    let count = count as usize;
    if count > 0 {
        require(raw, cst_record_offset(count - 1) + CST_RECORD_LEN)?;
    }

    let mut frame = Frame::default();
    for index in 0..count {
        let offset = cst_record_offset(index);
        let record = &raw[offset..offset + CST_RECORD_LEN];
        push(
            &mut frame.points,
            TouchPoint {
                id: record[0] >> 4,
                x: (record[1] as u16) << 4 | (record[3] >> 4) as u16,
                y: (record[2] as u16) << 4 | (record[3] & 0x0F) as u16,
                pressure: record[4],
                state: cst_state(record[0] & 0x0F),
            },
        )?;
    }
    Ok(frame)
}

/// Low nibble of a CST mutual record: `0x06` marks a finger down, and a
/// first report after reset may still carry `0x00`.
fn cst_state(code: u8) -> TouchState {
    match code {
        0x00 | 0x06 => TouchState::Pressed,
        _ => TouchState::Unknown,
    }
}

const SELF_CAP_HEADER_LEN: usize = 3;
const SELF_CAP_RECORD_LEN: usize = 6;

fn decode_cst_self_cap(profile: &DeviceProfile, raw: &[u8]) -> Result<Frame, FrameError> {
    require(raw, SELF_CAP_HEADER_LEN)?;

    // The high nibble of the count register is reserved and reads zero.
    if raw[2] & 0xF0 != 0 {
        return Err(FrameError::BadSentinel);
    }
    let count = raw[2] & 0x0F;
    check_count(profile, count)?;

    let mut frame = Frame {
        gesture: Gesture::from_code(raw[1]),
        ..Frame::default()
    };
    for index in 0..count as usize {
        let offset = SELF_CAP_HEADER_LEN + SELF_CAP_RECORD_LEN * index;
        require(raw, offset + SELF_CAP_RECORD_LEN)?;
        let record = &raw[offset..offset + SELF_CAP_RECORD_LEN];
        let state = match record[0] >> 6 {
            0 => TouchState::Pressed,
            1 => TouchState::Released,
            2 => TouchState::Move,
            _ => TouchState::Unknown,
        };
        push(
            &mut frame.points,
            TouchPoint {
                id: record[2] >> 4,
                x: ((record[0] & 0x0F) as u16) << 8 | record[1] as u16,
                y: ((record[2] & 0x0F) as u16) << 8 | record[3] as u16,
                pressure: record[4],
                state,
            },
        )?;
    }
    Ok(frame)
}

const ZINITIX_HEADER_LEN: usize = 4;
const ZINITIX_RECORD_LEN: usize = 8;
const ZINITIX_STATUS_MUST_BE_ZERO: u16 = 1 << 13;

const SUB_EXIST: u8 = 1 << 0;
const SUB_DOWN: u8 = 1 << 1;
const SUB_MOVE: u8 = 1 << 2;
const SUB_UP: u8 = 1 << 3;

fn decode_zinitix(profile: &DeviceProfile, raw: &[u8]) -> Result<Frame, FrameError> {
    require(raw, ZINITIX_HEADER_LEN)?;

    let status = u16::from_le_bytes([raw[0], raw[1]]);
    if status & ZINITIX_STATUS_MUST_BE_ZERO != 0 {
        return Err(FrameError::BadSentinel);
    }
    if status == 0 {
        return Ok(Frame::default());
    }

    // One bit per finger slot with an event in this report.
    let finger_mask = raw[2];
    let slots = (u8::BITS - finger_mask.leading_zeros()) as u8;
    check_count(profile, slots)?;
    require(raw, ZINITIX_HEADER_LEN + ZINITIX_RECORD_LEN * slots as usize)?;

    let mut frame = Frame::default();
    for slot in 0..slots {
        if finger_mask & (1 << slot) == 0 {
            continue;
        }
        let offset = ZINITIX_HEADER_LEN + ZINITIX_RECORD_LEN * slot as usize;
        let record = &raw[offset..offset + ZINITIX_RECORD_LEN];
        let sub_status = record[5];
        let state = if sub_status & SUB_UP != 0 {
            TouchState::Released
        } else if sub_status & (SUB_EXIST | SUB_DOWN) == 0 {
            continue;
        } else if sub_status & SUB_MOVE != 0 {
            TouchState::Move
        } else {
            TouchState::Pressed
        };
        push(
            &mut frame.points,
            TouchPoint {
                id: slot,
                x: u16::from_le_bytes([record[0], record[1]]),
                y: u16::from_le_bytes([record[2], record[3]]),
                pressure: record[4],
                state,
            },
        )?;
    }
    Ok(frame)
}

const GOODIX_RECORD_LEN: usize = 8;
const GOODIX_BUFFER_READY: u8 = 0x80;

fn decode_goodix(profile: &DeviceProfile, raw: &[u8]) -> Result<Frame, FrameError> {
    require(raw, 1)?;

    let status = raw[0];
    if status & GOODIX_BUFFER_READY == 0 {
        return Err(FrameError::BadSentinel);
    }
    let count = status & 0x0F;
    check_count(profile, count)?;
    require(raw, 1 + GOODIX_RECORD_LEN * count as usize)?;

    let mut frame = Frame::default();
    for record in raw[1..].chunks_exact(GOODIX_RECORD_LEN).take(count as usize) {
        let size = u16::from_le_bytes([record[5], record[6]]);
        push(
            &mut frame.points,
            TouchPoint {
                id: record[0],
                x: u16::from_le_bytes([record[1], record[2]]),
                y: u16::from_le_bytes([record[3], record[4]]),
                pressure: size.min(u8::MAX as u16) as u8,
                state: TouchState::Pressed,
            },
        )?;
    }
    Ok(frame)
}
