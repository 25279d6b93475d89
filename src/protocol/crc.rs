use crc::{Crc, CRC_16_IBM_3740, CRC_32_ISO_HDLC};

// CRC-16/IBM-3740 is CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, no reflection.
const HEADER_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
const PAYLOAD_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-16/CCITT-FALSE over header bytes (caller zeroes the CRC field).
pub fn header_crc16(data: &[u8]) -> u16 {
    HEADER_CRC.checksum(data)
}

/// CRC-32/ISO-HDLC over a payload. An empty payload is defined as 0.
pub fn payload_crc32(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }
    PAYLOAD_CRC.checksum(data)
}
