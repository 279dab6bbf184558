#![forbid(unsafe_code)]
//! Byte-level codecs used by the compressed adjacency arena.

pub mod fixed {
    //! Fixed-width little-endian fields.

    const U32_LEN: usize = core::mem::size_of::<u32>();

    /// Appends a little-endian u32.
    pub fn put_u32_le(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    /// Reads a little-endian u32 at `off`.
    pub fn get_u32_le(src: &[u8], off: usize) -> u32 {
        let head = src.get(off..off + U32_LEN).unwrap_or_else(|| {
            panic!(
                "u32 field at {} overruns buffer of {} bytes",
                off,
                src.len()
            )
        });
        let mut bytes = [0u8; U32_LEN];
        bytes.copy_from_slice(head);
        u32::from_le_bytes(bytes)
    }

    /// Width of a u32 field in bytes.
    pub const fn u32_len() -> usize {
        U32_LEN
    }
}

pub mod var {
    //! Unsigned variable-byte integers, seven payload bits per byte.

    /// Encodes a u64 as an unsigned varint.
    pub fn encode_u64(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    /// Decodes a u64 varint from a slice, updating the offset.
    ///
    /// Truncated or overlong input is a corrupted arena and panics.
    #[inline]
    pub fn decode_u64(src: &[u8], off: &mut usize) -> u64 {
        let mut result = 0u64;
        let mut shift = 0u32;
        for i in 0..10 {
            let idx = *off;
            if idx >= src.len() {
                panic!("varint decode truncated at byte {}", i);
            }
            let byte = src[idx];
            *off += 1;
            let payload = (byte & 0x7f) as u64;
            if i == 9 && payload > 1 {
                panic!("varint overflow (more than 64 bits)");
            }
            result |= payload << shift;
            if (byte & 0x80) == 0 {
                return result;
            }
            shift += 7;
        }
        panic!("varint too long (exceeded 10 bytes)");
    }

    /// Number of bytes `encode_u64` emits for `v`.
    pub fn encoded_len(v: u64) -> usize {
        let bits = 64 - v.leading_zeros() as usize;
        bits.max(1).div_ceil(7)
    }
}

pub mod delta {
    //! Delta encoding of sorted id runs.

    use super::var;

    /// Appends the gaps between consecutive `sorted` values as varints.
    ///
    /// The first gap is taken relative to zero, so the first value is stored
    /// as-is. Returns the number of bytes written.
    pub fn encode_sorted(sorted: &[u64], out: &mut Vec<u8>) -> usize {
        let start = out.len();
        let mut previous = 0u64;
        for &value in sorted {
            debug_assert!(value >= previous, "run is not sorted: {value} < {previous}");
            var::encode_u64(value - previous, out);
            previous = value;
        }
        out.len() - start
    }
}

#[cfg(test)]
mod tests {
    use super::{delta, fixed, var};
    use proptest::prelude::*;

    #[test]
    fn varint_roundtrip_edges() {
        let mut buf = Vec::new();
        var::encode_u64(0, &mut buf);
        let mut off = 0;
        assert_eq!(var::decode_u64(&buf, &mut off), 0);
        assert_eq!(off, 1);

        buf.clear();
        var::encode_u64(u64::MAX, &mut buf);
        off = 0;
        assert_eq!(var::decode_u64(&buf, &mut off), u64::MAX);
        assert_eq!(off, buf.len());
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn encoded_len_matches_encoder() {
        for v in [0u64, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            var::encode_u64(v, &mut buf);
            assert_eq!(var::encoded_len(v), buf.len(), "value {v}");
        }
    }

    #[test]
    fn fixed_u32_reads_back() {
        let mut buf = vec![0xAA];
        fixed::put_u32_le(&mut buf, 0x0102_0304);
        assert_eq!(fixed::get_u32_le(&buf, 1), 0x0102_0304);
    }

    #[test]
    fn delta_run_stores_gaps() {
        let mut buf = Vec::new();
        let written = delta::encode_sorted(&[3, 3, 10, 300], &mut buf);
        assert_eq!(written, buf.len());
        let mut off = 0;
        let gaps: Vec<u64> = (0..4).map(|_| var::decode_u64(&buf, &mut off)).collect();
        assert_eq!(gaps, vec![3, 0, 7, 290]);
    }

    #[test]
    #[should_panic(expected = "varint decode truncated")]
    fn varint_decode_rejects_truncated() {
        let data = vec![0x80];
        let mut off = 0;
        let _ = var::decode_u64(&data, &mut off);
    }

    #[test]
    #[should_panic(expected = "overruns buffer")]
    fn fixed_read_past_end_panics() {
        let _ = fixed::get_u32_le(&[1, 2, 3], 0);
    }

    proptest! {
        #[test]
        fn varint_roundtrip_u64_prop(v in any::<u64>()) {
            let mut buf = Vec::new();
            var::encode_u64(v, &mut buf);
            let mut off = 0;
            prop_assert_eq!(var::decode_u64(&buf, &mut off), v);
            prop_assert_eq!(off, buf.len());
        }
    }
}
