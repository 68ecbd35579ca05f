//! Integration tests for buffer module

use oracle_proxy::buffer::{ReadBuffer, WriteBuffer};
use oracle_proxy::Error;

#[test]
fn test_signed_compressed_roundtrip() {
    for value in [0i64, 1, -1, 127, -128, 255, 256, -65_536, 1 << 40, i64::MAX, i64::MIN + 1, i64::MIN] {
        let mut write_buf = WriteBuffer::new();
        write_buf.write_sb8(value).unwrap();

        let mut read_buf = ReadBuffer::from_slice(write_buf.as_slice());
        assert_eq!(read_buf.read_sb8().unwrap(), value, "SB8 roundtrip failed for {}", value);
        assert_eq!(read_buf.remaining(), 0);
    }
}

#[test]
fn test_signed_compressed_hand_built() {
    // sign bit set, two magnitude bytes
    let mut buf = ReadBuffer::from_slice(&[0x82, 0x01, 0x2C]);
    assert_eq!(buf.read_sb8().unwrap(), -300);

    let mut buf = ReadBuffer::from_slice(&[0x81, 0x05]);
    assert_eq!(buf.read_sb4().unwrap(), -5);

    let mut buf = ReadBuffer::from_slice(&[0x00]);
    assert_eq!(buf.read_sb8().unwrap(), 0);
}

#[test]
fn test_compressed_width_is_checked() {
    let mut buf = ReadBuffer::from_slice(&[0x03, 0x01, 0x02, 0x03]);
    assert!(matches!(buf.read_ub2(), Err(Error::InvalidLengthIndicator(3))));
}

#[test]
fn test_unsigned_roundtrip() {
    for size in [0u32, 1, 253, 254, 255, 1000, 100_000, u32::MAX] {
        let mut write_buf = WriteBuffer::new();
        write_buf.write_ub4(size).unwrap();

        let mut read_buf = ReadBuffer::from_slice(write_buf.as_slice());
        assert_eq!(read_buf.read_ub4().unwrap(), size, "UB4 roundtrip failed for {}", size);
    }
}

#[test]
fn test_clr_boundaries() {
    for big_chunks in [false, true] {
        for len in [0usize, 1, 253, 254, 255, 300, 70_000] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut write_buf = WriteBuffer::new().with_big_chunks(big_chunks);
            write_buf.write_clr(&data).unwrap();

            let mut read_buf = ReadBuffer::from_slice(write_buf.as_slice()).with_big_chunks(big_chunks);
            let read = read_buf.read_clr().unwrap();
            assert_eq!(read.len(), len, "CLR length {} big_chunks={}", len, big_chunks);
            assert_eq!(&read[..], &data[..]);
            assert_eq!(read_buf.remaining(), 0);
        }
    }
}

#[test]
fn test_clr_null_indicators() {
    let mut buf = ReadBuffer::from_slice(&[0x00, 0xFF, 0x02, b'h', b'i']);
    assert!(buf.read_clr().unwrap().is_empty());
    assert!(buf.read_clr().unwrap().is_empty());
    assert_eq!(&buf.read_clr().unwrap()[..], b"hi");
}

#[test]
fn test_clr_chunked_hand_built() {
    let mut buf = ReadBuffer::from_slice(&[0xFE, 0x02, b'a', b'b', 0x01, b'c', 0x00]);
    assert_eq!(&buf.read_clr().unwrap()[..], b"abc");
}

#[test]
fn test_dlc_truncates_to_declared_length() {
    let mut buf = ReadBuffer::from_slice(&[0x01, 0x02, 0x03, b'a', b'b', b'c']);
    assert_eq!(&buf.read_dlc().unwrap()[..], b"ab");
    assert_eq!(buf.remaining(), 0);

    let mut write_buf = WriteBuffer::new();
    write_buf.write_dlc(b"").unwrap();
    assert_eq!(write_buf.as_slice(), &[0x00]);
}

#[test]
fn test_key_value() {
    let mut write_buf = WriteBuffer::new();
    write_buf.write_key_value(b"AUTH_SESSKEY", b"00FF", 0).unwrap();
    write_buf.write_key_value(b"AUTH_VFR_DATA", b"", 18453).unwrap();

    let mut read_buf = ReadBuffer::from_slice(write_buf.as_slice());
    let pairs = read_buf.read_key_values(2).unwrap();
    assert_eq!(pairs[0].key_str(), "AUTH_SESSKEY");
    assert_eq!(pairs[0].value_str(), "00FF");
    assert_eq!(pairs[1].code, 18453);
    assert!(pairs[1].value.is_empty());
}

#[test]
fn test_null_terminated() {
    let mut buf = ReadBuffer::from_slice(b"linux\0x86_64");
    assert_eq!(buf.read_null_terminated_string().unwrap(), "linux");
    assert_eq!(buf.read_null_terminated_string().unwrap(), "x86_64");
    assert_eq!(buf.remaining(), 0);
}

#[test]
fn test_truncated_read_reports_underflow() {
    let mut buf = ReadBuffer::from_slice(&[0x04, 0x01]);
    let err = buf.read_ub4().unwrap_err();
    assert!(err.is_truncated());
}
