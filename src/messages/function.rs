//! Function call messages
//!
//! Every client call is a TTC function: message code 3, the function code
//! and a sequence number, then a body that depends on the function.
//! Transaction control, PING and LOGOFF carry nothing the proxy needs.

use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::constants::{DataKind, FunctionCode};
use crate::error::Result;
use crate::messages::{AuthRequest, Execute, Fetch, LobOp, Reexecute};
use crate::session::Session;
use crate::statement::Statement;

/// Decoded function body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "function", content = "body")]
pub enum FunctionBody {
    /// EXECUTE
    Execute(Execute),
    /// RE-EXECUTE
    Reexecute(Reexecute),
    /// RE-EXECUTE-AND-FETCH
    ReexecuteAndFetch(Reexecute),
    /// FETCH
    Fetch(Fetch),
    /// LOB operation
    LobOp(LobOp),
    /// Authentication phase one or two
    Auth(AuthRequest),
    /// A function whose body is not decoded
    Empty,
}

/// Decoded function call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    /// Function code
    pub code: FunctionCode,
    /// Sequence number
    pub sequence: u8,
    /// Body
    pub body: FunctionBody,
}

impl FunctionCall {
    /// Read a function call, positioned after its message code
    pub fn parse(buf: &mut ReadBuffer, session: &Session) -> Result<Self> {
        let code = FunctionCode::try_from(buf.read_u8()?)?;
        let sequence = buf.read_u8()?;
        let body = match code {
            FunctionCode::Execute => FunctionBody::Execute(Execute::parse(buf, session)?),
            FunctionCode::Reexecute => FunctionBody::Reexecute(Reexecute::parse(buf, session)?),
            FunctionCode::ReexecuteAndFetch => {
                FunctionBody::ReexecuteAndFetch(Reexecute::parse(buf, session)?)
            }
            FunctionCode::Fetch => FunctionBody::Fetch(Fetch::parse(buf, session)?),
            FunctionCode::LobOp => FunctionBody::LobOp(LobOp::parse(buf, &session.caps)?),
            FunctionCode::AuthPhaseOne | FunctionCode::AuthPhaseTwo => {
                FunctionBody::Auth(AuthRequest::parse(buf)?)
            }
            _ => FunctionBody::Empty,
        };
        tracing::trace!(?code, sequence, "function call");
        Ok(Self { code, sequence, body })
    }

    /// Kind of the server's answer
    pub fn response_kind(&self) -> DataKind {
        self.code.response_kind()
    }

    /// The statement the server's answer fills in
    pub fn statement(&self) -> Option<Statement> {
        match &self.body {
            FunctionBody::Execute(exec) => Some(exec.statement.clone()),
            FunctionBody::Reexecute(re) | FunctionBody::ReexecuteAndFetch(re) => re.statement.clone(),
            FunctionBody::Fetch(fetch) => fetch.statement.clone(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_commit_has_no_body() {
        let mut buf = ReadBuffer::from_slice(&[FunctionCode::Commit as u8, 7]);
        let call = FunctionCall::parse(&mut buf, &Session::new()).unwrap();
        assert_eq!(call.code, FunctionCode::Commit);
        assert_eq!(call.sequence, 7);
        assert_eq!(call.body, FunctionBody::Empty);
        assert_eq!(call.response_kind(), DataKind::MessageWithData);
        assert!(call.statement().is_none());
    }

    #[test]
    fn test_fetch_carries_open_statement() {
        let mut session = Session::new();
        let mut stmt = Statement::new("SELECT * FROM emp");
        stmt.cursor_id = 6;
        session.cursors.insert(stmt);

        let mut buf = ReadBuffer::from_slice(&[FunctionCode::Fetch as u8, 3, 0x01, 0x06, 0x01, 0x20]);
        let call = FunctionCall::parse(&mut buf, &session).unwrap();
        assert_eq!(call.statement().map(|s| s.cursor_id), Some(6));
    }

    #[test]
    fn test_version_request_answer_kind() {
        let mut buf = ReadBuffer::from_slice(&[FunctionCode::GetDbVersion as u8, 2]);
        let call = FunctionCall::parse(&mut buf, &Session::new()).unwrap();
        assert_eq!(call.response_kind(), DataKind::GetDbVersion);
    }

    #[test]
    fn test_unknown_function_code() {
        let mut buf = ReadBuffer::from_slice(&[0xFA, 1]);
        let err = FunctionCall::parse(&mut buf, &Session::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidFunctionCode(0xFA)));
    }
}
