//! Call summary, status and warning messages
//!
//! Every server call ends with either a STATUS message or an ERROR
//! message. Despite its name the ERROR message is the full call summary:
//! it is also sent on success (return code 0) whenever the call touched a
//! cursor, and carries the cursor id, the row count, the ROWID of the last
//! row changed and any per-row bind errors of an array DML.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::constants::{error_code, ttc_version};
use crate::error::{OraError, Result};
use crate::session::Session;
use crate::types::RowId;

/// Length byte announcing a chunked list
const CHUNKED_LIST: u8 = 0xFE;

/// Error of one row of an array DML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BindError {
    /// Error code
    pub code: u32,
    /// Offset of the failing row
    pub row_offset: u32,
    /// Error text
    pub message: String,
}

/// Call summary sent in an ERROR message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// End of call status
    pub end_of_call_status: u32,
    /// End-to-end ECID sequence
    pub ecid_sequence: u16,
    /// Rows processed so far
    pub current_row: u64,
    /// Return code, 0 on success
    pub return_code: u32,
    /// Array element in error
    pub array_element_error: u16,
    /// Array element error number
    pub array_element_errno: u16,
    /// Cursor the call ran on
    pub cursor_id: u32,
    /// Position of the error in the SQL text
    pub error_position: u16,
    /// SQL command type
    pub sql_type: u8,
    /// Fatal error flag
    pub fatal: u8,
    /// Summary flags
    pub flags: u16,
    /// User cursor options
    pub user_cursor_options: u16,
    /// UPI parameter
    pub upi_param: u8,
    /// Warning flag
    pub warning: u8,
    /// Last ROWID affected
    pub rowid: RowId,
    /// Operating system error
    pub os_error: u32,
    /// Statement number
    pub statement_number: u8,
    /// Call number
    pub call_number: u8,
    /// Successful iterations of an array DML
    pub success_iterations: u32,
    /// Per-row errors of an array DML
    pub bind_errors: Vec<BindError>,
    /// Error text
    pub message: String,
}

impl Summary {
    /// Read the body of an ERROR message
    pub fn parse(buf: &mut ReadBuffer, caps: &Capabilities) -> Result<Self> {
        let mut summary = Summary::default();
        if caps.end_of_call_status {
            summary.end_of_call_status = buf.read_ub4()?;
        }
        if caps.ttc_at_least(ttc_version::V3) && caps.fast_session_propagate {
            summary.ecid_sequence = buf.read_ub2()?;
        }
        summary.current_row = buf.read_ub4()? as u64;
        summary.return_code = buf.read_ub2()? as u32;
        summary.array_element_error = buf.read_ub2()?;
        summary.array_element_errno = buf.read_ub2()?;
        summary.cursor_id = buf.read_ub2()? as u32;
        summary.error_position = buf.read_ub2()?;
        summary.sql_type = buf.read_u8()?;
        summary.fatal = buf.read_u8()?;
        if caps.ttc_at_least(ttc_version::V6) {
            summary.flags = buf.read_ub2()?;
            summary.user_cursor_options = buf.read_ub2()?;
        } else {
            summary.flags = buf.read_u8()? as u16;
            summary.user_cursor_options = buf.read_u8()? as u16;
        }
        summary.upi_param = buf.read_u8()?;
        summary.warning = buf.read_u8()?;

        let rba = buf.read_ub4()?;
        let partition_id = buf.read_ub2()?;
        // table id
        buf.skip(1)?;
        let block_num = buf.read_ub4()?;
        let slot_num = buf.read_ub2()?;
        summary.rowid = RowId::new(rba, partition_id, block_num, slot_num);

        summary.os_error = buf.read_ub4()?;
        summary.statement_number = buf.read_u8()?;
        summary.call_number = buf.read_u8()?;
        buf.skip_ub2()?;
        summary.success_iterations = buf.read_ub4()?;
        buf.skip_dlc()?;

        if caps.ttc_at_least(ttc_version::V7) {
            summary.read_bind_errors(buf, caps)?;
            summary.return_code = buf.read_ub4()?;
            summary.current_row = buf.read_ub8()?;
        } else {
            buf.skip_dlc()?;
            buf.skip_dlc()?;
            buf.skip_dlc()?;
        }

        if summary.return_code != 0 {
            summary.message = String::from_utf8_lossy(&buf.read_clr()?).trim_end().to_string();
        }
        if summary.return_code == error_code::ARRAY_DML_ERRORS {
            if let Some(first) = summary.bind_errors.first() {
                summary.return_code = first.code;
                summary.message = first.message.clone();
            }
        }
        Ok(summary)
    }

    /// Three lists: error codes, row offsets and error texts
    fn read_bind_errors(&mut self, buf: &mut ReadBuffer, caps: &Capabilities) -> Result<()> {
        let count = buf.read_ub2()? as usize;
        let codes = read_chunked_list(buf, caps, count, |buf| buf.read_ub2().map(u32::from))?;
        for (x, code) in codes.into_iter().enumerate() {
            self.bind_error(x).code = code;
        }

        let count = buf.read_ub4()? as usize;
        let offsets = read_chunked_list(buf, caps, count, |buf| buf.read_ub4())?;
        for (x, offset) in offsets.into_iter().enumerate() {
            self.bind_error(x).row_offset = offset;
        }

        let count = buf.read_ub2()? as usize;
        if count > 0 {
            buf.skip(1)?;
            for x in 0..count {
                buf.skip_ub2()?;
                let message = buf.read_clr()?;
                self.bind_error(x).message = String::from_utf8_lossy(&message).trim_end().to_string();
                buf.skip(2)?;
            }
        }
        Ok(())
    }

    fn bind_error(&mut self, index: usize) -> &mut BindError {
        if self.bind_errors.len() <= index {
            self.bind_errors.resize_with(index + 1, BindError::default);
        }
        &mut self.bind_errors[index]
    }

    /// Typed error of a failed call
    pub fn error(&self) -> Option<OraError> {
        (self.return_code != 0).then(|| OraError::with_message(self.return_code, self.message.clone()))
    }

    /// Whether the call reported "no data found"
    pub fn is_no_data_found(&self) -> bool {
        self.return_code == error_code::NO_DATA_FOUND
    }
}

/// A list whose elements may each be preceded by a chunk length
fn read_chunked_list<T>(
    buf: &mut ReadBuffer,
    caps: &Capabilities,
    count: usize,
    mut read: impl FnMut(&mut ReadBuffer) -> Result<T>,
) -> Result<Vec<T>> {
    let mut items = Vec::with_capacity(count);
    if count == 0 {
        return Ok(items);
    }
    let chunked = buf.read_u8()? == CHUNKED_LIST;
    for _ in 0..count {
        if chunked {
            if caps.big_clr_chunks {
                buf.skip_ub4()?;
            } else {
                buf.skip(1)?;
            }
        }
        items.push(read(buf)?);
    }
    if chunked {
        buf.skip(1)?;
    }
    Ok(items)
}

/// STATUS message ending a call without a summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    /// End of call status
    pub end_of_call_status: Option<u32>,
    /// End-to-end ECID sequence
    pub ecid_sequence: Option<u16>,
}

impl Status {
    /// Read a STATUS message and fold it into the session summary
    pub fn parse(buf: &mut ReadBuffer, session: &mut Session) -> Result<Self> {
        let mut status = Status::default();
        if session.caps.end_of_call_status {
            let eos = buf.read_ub4()?;
            if let Some(summary) = session.summary.as_mut() {
                summary.end_of_call_status = eos;
            }
            status.end_of_call_status = Some(eos);
        }
        if session.caps.fast_session_propagate {
            let sequence = buf.read_ub2()?;
            session.summary.get_or_insert_with(Summary::default).ecid_sequence = sequence;
            status.ecid_sequence = Some(sequence);
        }
        Ok(status)
    }
}

/// WARNING message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Warning code
    pub code: u16,
    /// Declared message length
    pub length: u16,
    /// Flags
    pub flags: u16,
    /// Warning text
    pub message: Option<String>,
}

impl Warning {
    /// Read a WARNING message
    pub fn parse(buf: &mut ReadBuffer) -> Result<Self> {
        let code = buf.read_ub2()?;
        let length = buf.read_ub2()?;
        let flags = buf.read_ub2()?;
        let message = if code != 0 && length > 0 {
            Some(String::from_utf8_lossy(&buf.read_clr()?).into_owned())
        } else {
            None
        };
        Ok(Self {
            code,
            length,
            flags,
            message,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::buffer::WriteBuffer;

    /// Summary body for TTC versions below 6
    pub(crate) fn write_summary(buf: &mut WriteBuffer, cursor_id: u16, return_code: u16, message: &str) {
        buf.write_ub4(1).unwrap(); // current row
        buf.write_ub2(return_code).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub2(cursor_id).unwrap();
        buf.write_ub2(0).unwrap(); // error position
        buf.write_u8(3).unwrap(); // sql type
        buf.write_u8(0).unwrap();
        buf.write_u8(0).unwrap(); // flags
        buf.write_u8(0).unwrap(); // user cursor options
        buf.write_u8(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub4(0).unwrap(); // rba
        buf.write_ub2(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub4(0).unwrap(); // block
        buf.write_ub2(0).unwrap(); // slot
        buf.write_ub4(0).unwrap(); // os error
        buf.write_u8(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub4(0).unwrap(); // success iterations
        buf.write_ub4(0).unwrap(); // DLC
        for _ in 0..3 {
            buf.write_ub4(0).unwrap();
        }
        if return_code != 0 {
            buf.write_clr(message.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_success_summary() {
        let mut buf = WriteBuffer::new();
        write_summary(&mut buf, 5, 0, "");
        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        let summary = Summary::parse(&mut reader, &Capabilities::new()).unwrap();
        assert_eq!(summary.cursor_id, 5);
        assert_eq!(summary.return_code, 0);
        assert!(summary.error().is_none());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_error_summary() {
        let mut buf = WriteBuffer::new();
        write_summary(&mut buf, 0, 942, "ORA-00942: table or view does not exist\n");
        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        let summary = Summary::parse(&mut reader, &Capabilities::new()).unwrap();
        assert_eq!(summary.return_code, 942);
        assert_eq!(summary.message, "ORA-00942: table or view does not exist");
        assert_eq!(summary.error().map(|e| e.code), Some(942));
    }

    #[test]
    fn test_array_dml_errors_promote_first_bind_error() {
        let mut caps = Capabilities::new();
        caps.ttc_version = 7;
        let mut buf = WriteBuffer::new();
        buf.write_ub4(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub2(6).unwrap(); // cursor
        buf.write_ub2(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub2(0).unwrap(); // flags
        buf.write_ub2(0).unwrap(); // user cursor options
        buf.write_u8(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub4(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_ub4(1).unwrap();
        buf.write_ub4(0).unwrap(); // DLC
        // error codes
        buf.write_ub2(1).unwrap();
        buf.write_u8(1).unwrap();
        buf.write_ub2(1).unwrap();
        // row offsets, chunked
        buf.write_ub4(1).unwrap();
        buf.write_u8(CHUNKED_LIST).unwrap();
        buf.write_u8(2).unwrap();
        buf.write_ub4(1).unwrap();
        buf.write_u8(0).unwrap();
        // messages
        buf.write_ub2(1).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_clr(b"ORA-00001: unique constraint violated").unwrap();
        buf.write_u8(0).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ub4(24381).unwrap();
        buf.write_ub8(2).unwrap();
        buf.write_clr(b"ORA-24381: error(s) in array DML").unwrap();

        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        let summary = Summary::parse(&mut reader, &caps).unwrap();
        assert_eq!(summary.return_code, 1);
        assert_eq!(summary.message, "ORA-00001: unique constraint violated");
        assert_eq!(summary.bind_errors[0].row_offset, 1);
        assert_eq!(summary.current_row, 2);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_status_creates_summary_with_fsap() {
        let mut session = Session::new();
        session.caps.end_of_call_status = true;
        session.caps.fast_session_propagate = true;
        let mut reader = ReadBuffer::from_slice(&[0x01, 0x05, 0x01, 0x02]);
        let status = Status::parse(&mut reader, &mut session).unwrap();
        assert_eq!(status.end_of_call_status, Some(5));
        assert_eq!(status.ecid_sequence, Some(2));
        assert_eq!(session.summary.map(|s| s.ecid_sequence), Some(2));
    }

    #[test]
    fn test_warning_with_text() {
        let mut buf = WriteBuffer::new();
        buf.write_ub2(24344).unwrap();
        buf.write_ub2(5).unwrap();
        buf.write_ub2(0).unwrap();
        buf.write_clr(b"oops!").unwrap();
        let mut reader = ReadBuffer::from_slice(buf.as_slice());
        let warning = Warning::parse(&mut reader).unwrap();
        assert_eq!(warning.code, 24344);
        assert_eq!(warning.message.as_deref(), Some("oops!"));
    }
}
