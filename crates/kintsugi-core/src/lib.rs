pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod key;
pub mod reassemble;
pub mod site;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod testutil;
