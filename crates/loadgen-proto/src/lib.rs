#![forbid(unsafe_code)]

//! Wire format and demo domain types shared by the `loadgen-cli` demo
//! server and its matching `Caller` binding.

pub mod arithmetic;
pub mod framing;

pub use arithmetic::{evaluate, format_formula, ServerRequest, ServerResponse, OPERATORS};
pub use framing::{read_frame, read_frame_bytes, write_frame, write_frame_bytes, FramingError};
