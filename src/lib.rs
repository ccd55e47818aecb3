pub mod apply;
pub mod assemble;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod process;
pub mod report;
pub mod review;
pub mod vcs;

#[cfg(test)]
pub(crate) mod test_helpers;
