//! CLI for restful-filters
//!
//! - `serve`: demo service running the full filter chain
//! - `mask`: mask a request body or URI from the command line

pub mod mask;
pub mod serve;

use clap::{Parser, Subcommand};

/// HTTP request filters with sensitive-field masking for access logs
#[derive(Parser)]
#[command(name = "restful-filters")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the demo service
    Serve,

    /// Mask fields in stdin content or query parameters in a URI
    Mask(mask::MaskArgs),
}
