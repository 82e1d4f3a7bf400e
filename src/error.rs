use std::ffi::NulError;
use std::fmt;

use thiserror::Error;

use crate::backend::Backend;
use crate::constants::{CCH_ERC_MAX, CCH_ERC_MSG_MAX, ERC_NO_ERROR};
use crate::device::string_from_buffer;
use crate::sys::Erc;

pub type Result<T> = std::result::Result<T, Error>;

/// Error code reported by `DmgrGetLastError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ErrorCode(pub Erc);

impl ErrorCode {
    pub const NONE: ErrorCode = ErrorCode(ERC_NO_ERROR);

    pub fn raw(self) -> Erc {
        self.0
    }

    pub fn is_error(self) -> bool {
        self.0 != ERC_NO_ERROR
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "erc {}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("`{call}` failed with {code} ({name}): {message}")]
    Adept {
        call: &'static str,
        code: ErrorCode,
        name: String,
        message: String,
    },
    #[error("connection selector contains an interior NUL byte")]
    InvalidSelector(#[from] NulError),
    #[error("register set has {addresses} addresses but a {data}-byte data buffer")]
    LengthMismatch { addresses: usize, data: usize },
    #[error("transfer of {len} bytes exceeds the native count range")]
    TransferTooLarge { len: usize },
}

impl Error {
    /// Code reported by the runtime, if the failure came from a native call.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Adept { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Symbolic name and description returned by `DmgrSzFromErc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription {
    pub code: ErrorCode,
    pub name: String,
    pub message: String,
}

pub(crate) fn describe<B: Backend + ?Sized>(
    backend: &B,
    code: ErrorCode,
) -> Option<ErrorDescription> {
    let mut name = [0u8; CCH_ERC_MAX];
    let mut message = [0u8; CCH_ERC_MSG_MAX];
    if !backend.dmgr_sz_from_erc(code.0, &mut name, &mut message) {
        return None;
    }
    Some(ErrorDescription {
        code,
        name: string_from_buffer(&name),
        message: string_from_buffer(&message),
    })
}

/// Turns the success flag of a native call into a [`Result`].
pub(crate) fn check<B: Backend + ?Sized>(backend: &B, call: &'static str, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(failure(backend, call))
    }
}

/// Builds the error for a failed `call`, draining the calling thread's error
/// slot.
pub(crate) fn failure<B: Backend + ?Sized>(backend: &B, call: &'static str) -> Error {
    let code = ErrorCode(backend.dmgr_get_last_error());
    let (name, message) = match describe(backend, code) {
        Some(description) => (description.name, description.message),
        None => (String::from("unknown"), String::new()),
    };
    tracing::debug!(call, %code, %name, "adept call failed");
    Error::Adept {
        call,
        code,
        name,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ERC_NOT_CONNECTED;

    #[test]
    fn adept_error_mentions_call_and_code() {
        let err = Error::Adept {
            call: "DeppGetReg",
            code: ErrorCode(ERC_NOT_CONNECTED),
            name: "ercNotConnected".into(),
            message: "interface not connected".into(),
        };
        let text = err.to_string();
        assert!(text.contains("DeppGetReg"));
        assert!(text.contains("3203"));
        assert_eq!(err.code(), Some(ErrorCode(ERC_NOT_CONNECTED)));
    }

    #[test]
    fn no_error_code_is_not_an_error() {
        assert!(!ErrorCode::NONE.is_error());
        assert!(ErrorCode(ERC_NOT_CONNECTED).is_error());
    }
}
