//! Tessera Record - the on-disk fragment record formats.
//!
//! A fragment directory holds any number of signal records
//! (`signal_<frame>_<length>_<code>`, raw native-endian samples) and at most
//! one numbers record (`numbers`, a stream of `[frame][tag][payload]` entries).
//!
//! - [`signal_file`]: signal record names, reads and writes
//! - [`numbers_file`]: numbers record reads and writes
//! - [`fragment`]: exporting and removing whole fragment directories

pub mod error;
pub mod fragment;
pub mod numbers_file;
pub mod signal_file;

pub use error::{
    Error, ExportError, NumbersReadError, NumbersWriteError, Result, SignalReadError,
    SignalWriteError,
};
pub use fragment::{ChannelContent, FragmentContent, FragmentExporter};
pub use numbers_file::NumberEvents;
pub use signal_file::SignalFileInfo;
