use crate::{PlayerId, SpotId};
use thiserror::Error;

/// Fatal setup and reference failures. Everything else the engine absorbs
/// with a logged fallback so a turn always completes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("unknown card spot {0:?}")]
    UnknownSpot(SpotId),
    #[error("stock ran out of cards while serving")]
    StockExhausted,
}
