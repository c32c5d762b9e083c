use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(
        short = 's',
        long = "stdout",
        action,
        help = "Controls if it logs to stdout/stderr instead of to a file"
    )]
    pub is_to_std_out: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session for later commands
    Login {
        email: String,
        #[arg(long, env = "FLEETDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the signed in user
    Whoami,
    /// End the session locally and tell the server
    Logout,
    /// Send an authorized GET and print the response body
    Get {
        /// Path relative to the api base url, for example `/vehicles`
        path: String,
    },
}
