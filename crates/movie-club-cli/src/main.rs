use clap::{ArgAction, Parser, Subcommand};
use commands::config::ConfigAction;
use commands::{catalog, comments, config, movies, ratings, session};
use movie_club_config::PathManager;
use movie_club_core::SortMode;
use std::sync::Arc;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "movieclub")]
#[command(about = "Movie Club - rate, discuss and collect movies with your friends")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the collection
    #[command(long_about = "List every movie in the club collection with its average rating. Filter by genre and choose the order with --sort (newest, highest, lowest, comments).")]
    Movies {
        /// Only movies tagged with this genre
        #[arg(long)]
        genre: Option<String>,

        /// Sort order
        #[arg(long, default_value = "newest")]
        sort: SortMode,
    },
    /// Show one movie with its ratings
    Show {
        /// Movie id or slug
        movie: String,
    },
    /// Rate a movie from 0 to 10 (half points allowed)
    #[command(long_about = "Set your rating for a movie. Rating again replaces your earlier rating; you never have more than one rating per movie.")]
    Rate {
        /// Movie id or slug
        movie: String,

        /// Rating between 0 and 10
        value: f64,
    },
    /// Remove your rating from a movie
    Unrate {
        /// Movie id or slug
        movie: String,
    },
    /// Read, post or delete comments
    Comments {
        #[command(subcommand)]
        cmd: CommentCommands,
    },
    /// Search TMDB for movies to add
    Search {
        /// Title to search for
        title: String,

        /// Result page
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Add a movie from TMDB to the collection
    #[command(long_about = "Search TMDB for the title and add the match to the collection, uploading its poster and backdrop. When the title matches several movies, pick one with --id.")]
    Add {
        /// Title to search for
        title: String,

        /// TMDB id of the search result to add
        #[arg(long)]
        id: Option<u64>,

        /// Result page the id is on
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Sign in, creating your member record on first use
    SignIn {
        /// Display name (defaults to [identity] name in the config file)
        #[arg(long)]
        name: Option<String>,

        /// Avatar image URL
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Forget the signed-in member
    SignOut,
    /// Show the signed-in member
    Whoami,
    /// Manage configuration and credentials
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// List comments on a movie
    List {
        /// Movie id or slug
        movie: String,
    },
    /// Post a comment
    Add {
        /// Movie id or slug
        movie: String,

        /// Comment text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Delete one of your comments
    Delete {
        /// Movie id or slug
        movie: String,

        /// Comment key, as shown by 'comments list'
        key: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a new configuration file
    Init {
        /// Content store project id
        #[arg(long)]
        project_id: String,

        /// Dataset name
        #[arg(long)]
        dataset: Option<String>,

        /// Always read from the API host instead of the CDN
        #[arg(long, action = ArgAction::SetTrue)]
        no_cdn: bool,

        /// Display name used by sign-in
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Store the content store write token (prompts if not given)
    SetToken {
        #[arg(long)]
        token: Option<String>,
    },
    /// Store the TMDB API key (prompts if not given)
    SetTmdbKey {
        #[arg(long)]
        key: Option<String>,
    },
    /// Print the configuration file location
    Path,
}

impl From<ConfigCommands> for ConfigAction {
    fn from(cmd: ConfigCommands) -> Self {
        match cmd {
            ConfigCommands::Show { full } => ConfigAction::Show { full },
            ConfigCommands::Init { project_id, dataset, no_cdn, name, force } => {
                ConfigAction::Init { project_id, dataset, no_cdn, name, force }
            }
            ConfigCommands::SetToken { token } => ConfigAction::SetToken { token },
            ConfigCommands::SetTmdbKey { key } => ConfigAction::SetTmdbKey { key },
            ConfigCommands::Path => ConfigAction::Path,
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let paths = PathManager::default();
    let settings = commands::try_load_config(&paths).and_then(|c| c.logging).map(|mut logging| {
        logging.file = logging.file.map(|file| paths.resolve_log_file(&file));
        logging
    });
    logging::init_logging(cli.verbose, cli.quiet, settings.as_ref())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = Arc::new(output::Output::new(cli.output, cli.quiet));

    let result = match cli.command {
        Commands::Movies { genre, sort } => movies::list(genre, sort, &output).await,
        Commands::Show { movie } => movies::show(&movie, &output).await,
        Commands::Rate { movie, value } => ratings::rate(&movie, value, &output).await,
        Commands::Unrate { movie } => ratings::unrate(&movie, &output).await,
        Commands::Comments { cmd } => match cmd {
            CommentCommands::List { movie } => comments::list(&movie, &output).await,
            CommentCommands::Add { movie, text } => comments::add(&movie, &text.join(" "), &output).await,
            CommentCommands::Delete { movie, key } => comments::delete(&movie, &key, &output).await,
        },
        Commands::Search { title, page } => catalog::search(&title, page, &output).await,
        Commands::Add { title, id, page } => catalog::add(&title, id, page, &output).await,
        Commands::SignIn { name, image_url } => session::sign_in(name, image_url, &output).await,
        Commands::SignOut => session::sign_out(&output).await,
        Commands::Whoami => session::whoami(&output).await,
        Commands::Config { cmd } => config::run_config(cmd.into(), &output).await,
    };

    match result {
        // The notification already told the user what went wrong
        Err(report) if report.downcast_ref::<commands::AlreadyNotified>().is_some() => std::process::exit(1),
        other => other,
    }
}
