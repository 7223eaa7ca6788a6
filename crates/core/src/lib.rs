//! Core Rummy decision engine. Keep this crate free of IO and platform
//! concerns; the orchestrator drives it through ticks and move
//! confirmations.

pub mod cards;
pub mod combo;
pub mod config;
pub mod discard;
pub mod error;
pub mod events;
pub mod meld;
pub mod player;
pub mod rng;
pub mod singles;
pub mod table;

pub use cards::*;
pub use combo::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use meld::*;
pub use player::*;
pub use rng::*;
pub use singles::*;
pub use table::*;
