//! Record Module
//!
//! On-disk format of a single key-value record. Each record lives in its own
//! file named after the key digest.
//!
//! ## File Format
//! ```text
//! ┌──────────────┬────────────────┬───────────┬─────────────────────┐
//! │ KeyLen (kw)  │ ValueLen (vw)  │ Key       │ Value               │
//! │ LE unsigned  │ LE unsigned    │ UTF-8     │ opaque bytes        │
//! └──────────────┴────────────────┴───────────┴─────────────────────┘
//!   kw = key_len_width (default 2)   vw = value_len_width (default 4)
//! ```
//!
//! No padding, no checksum. The value starts at `kw + vw + key_len`.

mod codec;

pub use codec::{
    decode_header, decode_len, encode_header, encode_len, read_header, FieldWidths,
    RecordHeader,
};
