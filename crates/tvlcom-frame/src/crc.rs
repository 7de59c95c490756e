//! CRC16-CCITT (CCITT-FALSE): polynomial 0x1021, initial value 0xFFFF, no final XOR.

/// Generator polynomial.
pub const CRC16_POLY: u16 = 0x1021;

/// Initial register value.
pub const CRC16_INIT: u16 = 0xFFFF;

static CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Bit-at-a-time CRC. Reference form; [`crc16`] gives identical results faster.
pub fn crc16_bitwise(data: &[u8], init: u16) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Table-driven CRC of `data` starting from [`CRC16_INIT`].
pub fn crc16(data: &[u8]) -> u16 {
    crc16_update(CRC16_INIT, data)
}

/// Fold more bytes into a running CRC value.
pub fn crc16_update(value: u16, data: &[u8]) -> u16 {
    data.iter()
        .fold(value, |crc, &byte| crc16_update_byte(crc, byte))
}

/// Fold a single byte into a running CRC value.
#[inline]
pub fn crc16_update_byte(value: u16, byte: u8) -> u16 {
    let index = ((value >> 8) as u8 ^ byte) as usize;
    (value << 8) ^ CRC16_TABLE[index]
}

/// Running CRC accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    /// Start a new accumulator at [`CRC16_INIT`].
    pub const fn new() -> Self {
        Self { value: CRC16_INIT }
    }

    /// Fold one byte.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        self.value = crc16_update_byte(self.value, byte);
    }

    /// Fold a slice.
    pub fn update(&mut self, data: &[u8]) {
        self.value = crc16_update(self.value, data);
    }

    /// Current CRC value.
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Re-seed with [`CRC16_INIT`].
    pub fn reset(&mut self) {
        self.value = CRC16_INIT;
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16_bitwise(b"123456789", CRC16_INIT), 0x29B1);
    }

    #[test]
    fn empty_input_is_init() {
        assert_eq!(crc16(b""), 0xFFFF);
        assert_eq!(crc16_bitwise(b"", CRC16_INIT), 0xFFFF);
        assert_eq!(crc16_bitwise(b"", 0x1234), 0x1234);
    }

    #[test]
    fn table_matches_polynomial() {
        assert_eq!(CRC16_TABLE[0], 0x0000);
        assert_eq!(CRC16_TABLE[1], 0x1021);
        assert_eq!(CRC16_TABLE[255], 0x1EF0);
    }

    #[test]
    fn bitwise_and_table_agree() {
        // xorshift keeps the inputs deterministic without a rand dependency
        let mut state = 0x2545_F491u32;
        for len in 0..300usize {
            let data: Vec<u8> = (0..len)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    state as u8
                })
                .collect();
            assert_eq!(crc16(&data), crc16_bitwise(&data, CRC16_INIT), "len {len}");
        }
    }

    #[test]
    fn custom_init_agrees() {
        for init in [0x0000u16, 0x1D0F, 0xFFFF, 0x8000] {
            assert_eq!(
                crc16_update(init, b"TVLCOM"),
                crc16_bitwise(b"TVLCOM", init)
            );
        }
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = b"\x22\x07\x01\x01\x10\x03\x02hi";
        let mut crc = Crc16::new();
        for &byte in &data[..3] {
            crc.update_byte(byte);
        }
        crc.update(&data[3..]);
        assert_eq!(crc.value(), crc16(data));

        crc.reset();
        assert_eq!(crc.value(), CRC16_INIT);
    }
}
