use clap::{Parser, Subcommand};

/// `Glitchary` - client for the call/response social feed.
#[derive(Parser, Debug)]
#[command(name = "glitchary")]
#[command(version)]
#[command(about = "Interact with a Glitchary feed from the terminal.", long_about = None)]
pub struct Cli {
    /// Act as the demo persona: no credential, writes stay local
    #[arg(long, global = true)]
    pub demo: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configuration and connection settings
    Status,

    /// Resolve the current session and print it
    Whoami,

    /// Create the backend profile for a signed-in actor without one
    CreateProfile {
        /// Public handle
        username: String,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        avatar_url: Option<String>,
    },

    /// Search posts and users
    Search {
        /// Free-text query
        query: String,
    },

    /// Toggle amplification of a post
    Amplify { post_id: String },

    /// Toggle the bookmark on a post
    Bookmark { post_id: String },

    /// Follow a user
    Follow { user_id: String },

    /// Stop following a user
    Unfollow { user_id: String },

    /// Reply to a post
    Comment {
        post_id: String,

        /// Reply text
        text: String,
    },

    /// Publish a new call
    Post {
        /// Prompt text of the call
        prompt: String,
    },

    /// Repost a response to a call as your own echo
    Echo { call_id: String, response_id: String },
}
