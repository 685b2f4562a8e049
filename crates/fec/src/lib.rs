//! Hamburst FEC - channel coding for the burst OFDM modem
//!
//! Two code families protect a burst: the preamble metadata rides on a
//! BCH(255,71) block soft-decoded with order-2 ordered statistics, and the
//! payload rides on a length-2048 polar code decoded with a 16-lane
//! successive-cancellation list decoder and CRC-32 path selection.

pub mod bch;
pub mod error;
pub mod osd;
pub mod polar;
pub mod polar_tables;

pub use error::{FecError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        bch::BchEncoder,
        error::{FecError, Result},
        osd::OrderedStatisticsDecoder,
        polar::{PolarDecoder, PolarListDecoder},
        polar_tables::{FrozenTable, FROZEN_2048_1056, FROZEN_2048_1392, FROZEN_2048_712},
    };
}
