use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "klex",
    version = env!("CARGO_PKG_VERSION"),
    about = "klex - a hotstring text expansion tool",
    long_about = "klex expands short abbreviations into full text as you type, system-wide."
)]
pub struct Klex {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a hotstring
    Add {
        #[clap(help = "Abbreviation to type")]
        text: String,

        #[clap(help = "Replacement text (supports %t, %ds, %c, %p, %| tokens)")]
        replacement: String,

        #[clap(
            long,
            short,
            default_value = "space",
            help = "Trigger classes: enter, tab, space, instant, autocorrect (comma-separated)"
        )]
        triggers: String,

        #[clap(long, short, help = "Bundle to place the hotstring in")]
        bundle: Option<String>,
    },
    /// Delete a hotstring
    Delete {
        #[clap(help = "Abbreviation of the hotstring to delete")]
        text: String,
    },
    /// Update the replacement of an existing hotstring
    Update {
        #[clap(help = "Abbreviation of the hotstring to update")]
        text: String,

        #[clap(help = "New replacement text")]
        replacement: String,
    },
    /// List all hotstrings
    List,
    /// Start the expansion daemon
    Start,
    /// Stop the expansion daemon
    Stop,
    /// Check whether the daemon is running
    Status,
    /// Manage bundles
    Bundle {
        #[clap(subcommand)]
        action: BundleAction,
    },
    /// Show usage statistics
    Stats,
    // Hidden command used internally to run the daemon worker
    #[clap(hide = true)]
    DaemonWorker,
}

#[derive(Subcommand)]
pub enum BundleAction {
    /// Enable a bundle
    Enable { name: String },
    /// Disable a bundle
    Disable { name: String },
    /// List bundles and their state
    List,
}
