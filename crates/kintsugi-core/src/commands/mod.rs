//! Command implementations behind the CLI surface.

pub mod download;
pub mod info;
pub mod unscramble;

mod util;
