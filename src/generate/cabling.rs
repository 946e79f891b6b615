use thiserror::Error;

/// Top-of-rack switches mounted in every rack
pub const TORS_PER_RACK: u32 = 2;

/// Uplink interfaces on each top-of-rack switch (`Ethernet1`, `Ethernet2`)
pub const UPLINKS_PER_TOR: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CablingError {
    #[error("rack {rack} is outside a row of {row_width} racks")]
    RackOutOfRange { rack: u32, row_width: u32 },
    #[error("top-of-rack slot {slot} is outside 1..={max}")]
    SlotOutOfRange { slot: u32, max: u32 },
}

/// End-of-row interfaces a row of `row_width` racks consumes
pub fn eor_ports_required(row_width: u32) -> u32 {
    row_width * TORS_PER_RACK * UPLINKS_PER_TOR
}

/// First end-of-row interface number for the ToR in `slot` of rack `rack` (both 1-based).
///
/// Slot 1 switches take `1..=2w` in rack order, slot 2 switches take
/// `2w+1..=4w`, so every ToR gets its own consecutive block.
pub fn uplink_start(row_width: u32, rack: u32, slot: u32) -> Result<u32, CablingError> {
    if rack == 0 || rack > row_width {
        return Err(CablingError::RackOutOfRange { rack, row_width });
    }
    if slot == 0 || slot > TORS_PER_RACK {
        return Err(CablingError::SlotOutOfRange { slot, max: TORS_PER_RACK });
    }
    Ok(UPLINKS_PER_TOR * (row_width * (slot - 1) + (rack - 1)) + 1)
}

/// Interface numbers on the end-of-row switch for each ToR uplink, in uplink order
pub fn uplink_ports(row_width: u32, rack: u32, slot: u32) -> Result<Vec<u32>, CablingError> {
    let start = uplink_start(row_width, rack, slot)?;
    Ok((start..start + UPLINKS_PER_TOR).collect())
}

/// Name of a numbered switch interface
pub fn interface_name(number: u32) -> String {
    format!("Ethernet{}", number)
}
