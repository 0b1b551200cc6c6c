use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

mod bibtex;
mod citekey;
mod commands;
mod config;
mod doi;
mod error;
mod library;
mod ris;
mod symbols;
mod sync;
mod ui;

use commands::articles::ArticleArgs;
use commands::export::SortKey;
use commands::search::{SearchOptions, SearchQuery};
use commands::Context;
use doi::{AuthorField, DoiClient};
use error::AppError;
use library::Library;
use sync::SyncOptions;
use ui::error_message;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to $REFERENCERC, then ~/.referencerc)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More diagnostics on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate universal citekeys
    Citekey {
        /// Last names of the first authors
        #[arg(short = 'A', long, required = true, num_args = 1.., value_delimiter = ',')]
        author: Vec<String>,

        /// Publication years, one per author
        #[arg(short = 'Y', long, required = true, num_args = 1.., value_delimiter = ',')]
        year: Vec<String>,

        /// DOIs, one per author
        #[arg(short = 'D', long, num_args = 1.., value_delimiter = ',')]
        doi: Vec<String>,

        /// Titles, used when there is no DOI
        #[arg(short = 'T', long, num_args = 1..)]
        title: Vec<String>,
    },

    /// Generate citekeys from crossref.org metadata
    SmartCitekey {
        #[arg(value_name = "DOI", required = true)]
        dois: Vec<String>,
    },

    /// Reformat BibTeX files with universal citekeys
    Format {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Write into the library instead of standard output
        #[arg(short = 'O', long)]
        output: bool,

        /// Remove each input after a successful conversion
        #[arg(short = 'C', long)]
        cleanup: bool,
    },

    /// Convert RIS files to BibTeX
    Ris {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Write into the library instead of standard output
        #[arg(short = 'O', long)]
        output: bool,

        /// Remove each input after a successful conversion
        #[arg(short = 'C', long)]
        cleanup: bool,
    },

    /// Create BibTeX entries from DOI metadata
    SmartBibtex {
        #[arg(value_name = "DOI", required = true)]
        dois: Vec<String>,

        /// Name list used as the BibTeX author
        #[arg(short = 'A', long, value_enum, default_value_t = AuthorField::Author)]
        author_field: AuthorField,

        /// Write into the library instead of standard output
        #[arg(short = 'O', long)]
        output: bool,
    },

    /// Move a local article into the library
    Move {
        file: PathBuf,

        #[command(flatten)]
        article: ArticleArgs,

        /// Store as supplementary material
        #[arg(short = 'S', long)]
        supplement: bool,

        /// Remove the input file afterwards
        #[arg(short = 'C', long)]
        cleanup: bool,
    },

    /// Download an article into the library
    Copy {
        /// Article URL (defaults to the clipboard)
        url: Option<String>,

        #[command(flatten)]
        article: ArticleArgs,

        /// Store as supplementary material
        #[arg(short = 'S', long)]
        supplement: bool,
    },

    /// Move a local article into the library using crossref.org metadata
    SmartMove {
        file: PathBuf,

        #[arg(short = 'D', long)]
        doi: String,

        /// Store as supplementary material
        #[arg(short = 'S', long)]
        supplement: bool,

        /// Remove the input file afterwards
        #[arg(short = 'C', long)]
        cleanup: bool,
    },

    /// Download an article into the library using crossref.org metadata
    SmartCopy {
        /// Article URL (defaults to the clipboard)
        url: Option<String>,

        #[arg(short = 'D', long)]
        doi: String,

        /// Store as supplementary material
        #[arg(short = 'S', long)]
        supplement: bool,
    },

    /// Search the library with regular expressions
    Search {
        #[arg(short = 'A', long, num_args = 1..)]
        author: Vec<String>,

        /// Only match the first author
        #[arg(short = 'F', long)]
        first: bool,

        #[arg(short = 'Y', long, num_args = 1..)]
        year: Vec<String>,

        /// Matched against titles and keywords
        #[arg(short = 'K', long, num_args = 1..)]
        keyword: Vec<String>,

        #[arg(short = 'J', long, num_args = 1..)]
        journal: Vec<String>,

        #[arg(short = 'D', long, num_args = 1..)]
        doi: Vec<String>,

        /// Open the directory of each match
        #[arg(short = 'O', long)]
        open: bool,

        /// Open the webpage of each match
        #[arg(short = 'W', long)]
        webpage: bool,

        /// Write the matches to a single BibTeX file
        #[arg(short = 'E', long, value_name = "PATH")]
        export: Option<PathBuf>,

        /// Newest years first
        #[arg(short = 'R', long)]
        reverse: bool,
    },

    /// Export the library as one sorted BibTeX file
    Export {
        #[arg(short = 'S', long, value_enum, default_value_t = SortKey::Citekey)]
        sort: SortKey,

        /// Output file (defaults to standard output)
        #[arg(short = 'E', long, value_name = "PATH")]
        export: Option<PathBuf>,
    },

    /// Mirror the library with a mounted directory
    Sync {
        directory: PathBuf,

        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Mirror the library with a remote host over ssh
    Scp {
        /// [user@]host:/path
        remote: String,

        /// Identity file handed to ssh
        #[arg(short = 'i', long, value_name = "FILE")]
        identity: Option<PathBuf>,

        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Open DOI webpages
    Open {
        #[arg(value_name = "DOI", required = true)]
        dois: Vec<String>,

        /// Also open the crossref.org API record
        #[arg(short = 'C', long)]
        crossref: bool,
    },
}

#[derive(Args)]
struct TransferArgs {
    /// Copy from the remote into the library
    #[arg(short = 'P', long)]
    pull: bool,

    /// Only list the files that would be copied
    #[arg(short = 'L', long)]
    list: bool,

    /// Copy even when the destination is up to date
    #[arg(short = 'C', long)]
    clobber: bool,

    /// Permission mode of copied files, in octal
    #[arg(short = 'M', long, default_value = "775", value_parser = sync::parse_mode)]
    mode: u32,
}

impl TransferArgs {
    fn options(&self, verbose: u8) -> SyncOptions {
        SyncOptions {
            pull: self.pull,
            list: self.list,
            verbose: verbose > 0,
            clobber: self.clobber,
            mode: self.mode,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn output_library(ctx: &Context, output: bool) -> Result<Option<Library>, AppError> {
    if output {
        ctx.library().map(Some)
    } else {
        Ok(None)
    }
}

async fn run(command: Commands, ctx: &Context) -> Result<(), AppError> {
    let verbose = ctx.verbose > 0;
    match command {
        Commands::Citekey {
            author,
            year,
            doi,
            title,
        } => commands::citekey::citekeys(&author, &year, &doi, &title),

        Commands::SmartCitekey { dois } => {
            let client = DoiClient::new()?;
            commands::citekey::smart_citekeys(&client, &dois).await
        }

        Commands::Format {
            files,
            output,
            cleanup,
        } => {
            let library = output_library(ctx, output)?;
            commands::format::format(library.as_ref(), &files, cleanup, verbose)
        }

        Commands::Ris {
            files,
            output,
            cleanup,
        } => {
            let library = output_library(ctx, output)?;
            commands::ris::convert(library.as_ref(), &files, cleanup, verbose)
        }

        Commands::SmartBibtex {
            dois,
            author_field,
            output,
        } => {
            let library = output_library(ctx, output)?;
            let client = DoiClient::new()?;
            commands::smart_bibtex::smart_bibtex(&client, library.as_ref(), &dois, author_field)
                .await
        }

        Commands::Move {
            file,
            article,
            supplement,
            cleanup,
        } => commands::articles::move_article(&ctx.library()?, &file, article, supplement, cleanup)
            .map(|_| ()),

        Commands::Copy {
            url,
            article,
            supplement,
        } => {
            let library = ctx.library()?;
            let client = DoiClient::new()?;
            commands::articles::copy_article(&client, &library, url, article, supplement)
                .await
                .map(|_| ())
        }

        Commands::SmartMove {
            file,
            doi,
            supplement,
            cleanup,
        } => {
            let library = ctx.library()?;
            let client = DoiClient::new()?;
            commands::articles::smart_move_article(&client, &library, &file, &doi, supplement, cleanup)
                .await
                .map(|_| ())
        }

        Commands::SmartCopy {
            url,
            doi,
            supplement,
        } => {
            let library = ctx.library()?;
            let client = DoiClient::new()?;
            commands::articles::smart_copy_article(&client, &library, url, &doi, supplement)
                .await
                .map(|_| ())
        }

        Commands::Search {
            author,
            first,
            year,
            keyword,
            journal,
            doi,
            open,
            webpage,
            export,
            reverse,
        } => {
            let query = SearchQuery {
                authors: author,
                first,
                years: year,
                keywords: keyword,
                journals: journal,
                dois: doi,
            };
            let options = SearchOptions {
                open,
                webpage,
                export,
                reverse,
            };
            commands::search::search(&ctx.library()?, &query, &options).map(|_| ())
        }

        Commands::Export { sort, export } => {
            commands::export::export(&ctx.library()?, sort, export.as_deref())
        }

        Commands::Sync {
            directory,
            transfer,
        } => commands::sync::sync_directory(&ctx.config()?, &directory, &transfer.options(ctx.verbose))
            .map(|_| ()),

        Commands::Scp {
            remote,
            identity,
            transfer,
        } => commands::sync::sync_scp(&ctx.config()?, &remote, identity, &transfer.options(ctx.verbose))
            .map(|_| ()),

        Commands::Open { dois, crossref } => commands::open::open_dois(&dois, crossref, verbose),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::new(cli.config, cli.verbose);
    if let Err(err) = run(cli.command, &ctx).await {
        error_message(&err.to_string());
        process::exit(1);
    }
}
