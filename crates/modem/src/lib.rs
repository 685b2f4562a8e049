//! Hamburst Modem - burst-mode OFDM for amateur-radio digital text
//!
//! A short text payload plus callsign becomes roughly a second and a half
//! of baseband-real audio: Schmidl-Cox acquisition symbols, a
//! BCH-protected metadata preamble, and four differential-QPSK payload
//! symbols carrying a CRC-aided polar code. The decoder is a streaming
//! object fed int16 samples; it emits one status per symbol interval and
//! hands back the payload after `Done`.

pub mod base37;
pub mod correlator;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod font;
pub mod meta;
pub mod params;
pub mod theilsen;

pub use error::{ModemError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        decoder::{Decoder, StagedInfo},
        encoder::Encoder,
        error::{ModemError, Result},
        params::{Channel, ModemConfig, OperationMode, Status, SymbolGeometry},
    };
}
