//! Integration tests for ROWID and UROWID conversion

use oracle_proxy::buffer::{ReadBuffer, WriteBuffer};
use oracle_proxy::types::{RowId, URowId, ROWID_LENGTH};

#[test]
fn test_rowid_text_is_a_bijection() {
    let rbas = [0u32, 1, 63, 64, 73_196, 0x3FFF_FFFF];
    let partitions = [0u16, 1, 4, 0x0FFF];
    let blocks = [0u32, 151, 4096, 0x3FFF_FFFF];
    let slots = [0u16, 2, 63, 0x0FFF];

    let mut seen = std::collections::HashSet::new();
    for &rba in &rbas {
        for &partition in &partitions {
            for &block in &blocks {
                for &slot in &slots {
                    let rowid = RowId::new(rba, partition, block, slot);
                    let text = rowid.to_string();
                    assert_eq!(text.len(), ROWID_LENGTH);
                    assert_eq!(RowId::parse(&text).unwrap(), rowid);
                    assert!(seen.insert(text), "duplicate text for {:?}", rowid);
                }
            }
        }
    }
}

#[test]
fn test_known_rowid_breakdown() {
    let rowid = RowId::parse("AAAR3sAAEAAAACXAAA").unwrap();
    assert_eq!(rowid.rba, 73196);
    assert_eq!(rowid.partition_id, 4);
    assert_eq!(rowid.block_num, 151);
    assert_eq!(rowid.slot_num, 0);
}

#[test]
fn test_urowid_column_value() {
    let raw = [1u8, 0, 1, 0x1D, 0xEC, 0, 4, 0, 0, 0, 0x97, 0, 0];
    let mut buf = WriteBuffer::new();
    buf.write_ub4(raw.len() as u32).unwrap();
    buf.write_clr(&raw).unwrap();

    let mut reader = ReadBuffer::from_slice(buf.as_slice());
    let urowid = URowId::read(&mut reader).unwrap().unwrap();
    assert_eq!(urowid.to_string(), "AAAR3sAAEAAAACXAAA");
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_null_urowid() {
    let mut reader = ReadBuffer::from_slice(&[0x00]);
    assert_eq!(URowId::read(&mut reader).unwrap(), None);
}

#[test]
fn test_logical_urowid_is_star_prefixed() {
    let urowid = URowId::from_bytes(&[2, 0xC1, 0x02, 0xFF]).unwrap();
    assert!(matches!(urowid, URowId::Logical(_)));
    assert!(urowid.to_string().starts_with('*'));
}
