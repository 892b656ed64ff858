pub mod health;
pub mod movements;
pub mod parse;
pub mod validate;

use clap::Args;

/// Where the workout text comes from.
#[derive(Args, Debug)]
pub struct TextInput {
    /// Workout text (quote multi-line text or use --file)
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,
    /// Read workout text from a file ("-" for stdin)
    #[arg(long, short)]
    pub file: Option<String>,
}
