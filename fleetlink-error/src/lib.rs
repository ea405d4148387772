// Copyright 2025 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error type shared by the fleetlink crates. Every failure carries a [`Code`]
//! and a stack of messages, the oldest first; callers add context with
//! [`ResultExt::err_tip`] as the error travels up.

mod code;

use core::fmt;

pub use crate::code::Code;

#[macro_export]
macro_rules! make_err {
    ($code:expr, $($arg:tt)+) => {{
        $crate::Error::new($code, format!($($arg)+))
    }};
}

#[macro_export]
macro_rules! make_input_err {
    ($($arg:tt)+) => {{
        $crate::make_err!($crate::Code::InvalidArgument, $($arg)+)
    }};
}

/// Returns an `InvalidArgument` error from the enclosing function when
/// `$cond` holds.
#[macro_export]
macro_rules! error_if {
    ($cond:expr, $($arg:tt)+) => {{
        if $cond {
            Err($crate::make_input_err!($($arg)+))?;
        }
    }};
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Error {
    pub code: Code,
    pub messages: Vec<String>,
}

impl Error {
    pub fn new(code: Code, msg: String) -> Self {
        let messages = if msg.is_empty() { Vec::new() } else { vec![msg] };
        Self { code, messages }
    }

    #[must_use]
    pub fn append<S: ToString>(mut self, msg: S) -> Self {
        self.messages.push(msg.to_string());
        self
    }

    pub fn message_string(&self) -> String {
        self.messages.join(" : ")
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            return write!(f, "{}", self.code);
        }
        write!(f, "{}: {}", self.code, self.message_string())
    }
}

impl From<Code> for Error {
    fn from(code: Code) -> Self {
        Self::new(code, String::new())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.kind().into(), err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        let code = if err.is_io() {
            Code::Unavailable
        } else {
            Code::InvalidArgument
        };
        Self::new(code, err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(Code::Internal, err.to_string())
    }
}

macro_rules! invalid_argument_from {
    ($($err:ty),+ $(,)?) => {
        $(
            impl From<$err> for Error {
                fn from(err: $err) -> Self {
                    Self::new(Code::InvalidArgument, err.to_string())
                }
            }
        )+
    };
}

invalid_argument_from!(
    core::num::ParseIntError,
    core::num::TryFromIntError,
    http::Error,
    http::uri::InvalidUri,
    http::header::InvalidHeaderValue,
);

pub trait ResultExt<T> {
    /// Replaces the code and pushes a message, both computed from the
    /// error as it stands.
    fn err_tip_with_code<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        S: ToString,
        F: FnOnce(&Error) -> (Code, S);

    /// Pushes a context message and keeps the code.
    #[inline]
    fn err_tip<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        Self: Sized,
        S: ToString,
        F: FnOnce() -> S,
    {
        self.err_tip_with_code(|e| (e.code, tip_fn()))
    }
}

fn apply_tip<F, S>(mut error: Error, tip_fn: F) -> Error
where
    S: ToString,
    F: FnOnce(&Error) -> (Code, S),
{
    let (code, message) = tip_fn(&error);
    error.code = code;
    error.messages.push(message.to_string());
    error
}

impl<T, E: Into<Error>> ResultExt<T> for Result<T, E> {
    #[inline]
    fn err_tip_with_code<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        S: ToString,
        F: FnOnce(&Error) -> (Code, S),
    {
        self.map_err(|e| apply_tip(e.into(), tip_fn))
    }
}

/// A missing value starts out as `Internal`, the tip usually picks a
/// better code.
impl<T> ResultExt<T> for Option<T> {
    #[inline]
    fn err_tip_with_code<F, S>(self, tip_fn: F) -> Result<T, Error>
    where
        S: ToString,
        F: FnOnce(&Error) -> (Code, S),
    {
        self.ok_or_else(|| apply_tip(Code::Internal.into(), tip_fn))
    }
}
