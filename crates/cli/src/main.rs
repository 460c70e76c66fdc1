use clap::{Parser, Subcommand};
use gateway_core::constants::{DEFAULT_CONTENT_TYPE, DEFAULT_LOCK_OWNER, DEFAULT_LOCK_TIMEOUT_SECS};
use gateway_core::{
    archive_name, export_zip, format_xml, validate_dita, Depth, GatewayConfig, WebDavClient,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "WebDAV authoring gateway CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List a collection
    Ls {
        /// Repository path (empty for the root)
        #[arg(default_value = "")]
        path: String,
        /// List every descendant instead of direct children
        #[arg(long)]
        recursive: bool,
    },
    /// Print a file as text
    Cat { path: String },
    /// Upload a local file, creating missing parent collections
    Put {
        /// Repository path to write
        path: String,
        /// Local file to upload
        file: PathBuf,
        #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,
        /// Lock token held on the target
        #[arg(long)]
        lock_token: Option<String>,
    },
    /// Create a collection
    Mkdir { path: String },
    /// Delete a file or collection
    Rm { path: String },
    /// Move a resource
    Mv { src: String, dst: String },
    /// Copy a resource
    Cp { src: String, dst: String },
    /// Take an exclusive write lock
    Lock {
        path: String,
        #[arg(long, default_value = DEFAULT_LOCK_OWNER)]
        owner: String,
        /// Lock lifetime in seconds
        #[arg(long, default_value_t = DEFAULT_LOCK_TIMEOUT_SECS)]
        timeout: u64,
    },
    /// Release a lock
    Unlock { path: String, token: String },
    /// Show the active lock on a resource
    Lockinfo { path: String },
    /// Export a folder as a zip archive
    Export {
        path: String,
        /// Output file (defaults to `<folder>.zip`)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Pretty-print a local XML file
    Format { file: PathBuf },
    /// Check a local file for DITA conventions
    Validate { file: PathBuf },
}

fn client() -> anyhow::Result<WebDavClient> {
    let config = GatewayConfig::from_lookup(|key| std::env::var(key).ok())?;
    Ok(WebDavClient::new(config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gateway_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Ls { path, recursive }) => {
            let depth = if recursive { Depth::Infinity } else { Depth::One };
            let entries = client()?.list(&path, depth).await?;
            if entries.is_empty() {
                println!("No entries found.");
            }
            for entry in entries {
                let marker = if entry.is_dir { "/" } else { "" };
                println!("{}{}", entry.path, marker);
            }
        }
        Some(Commands::Cat { path }) => {
            println!("{}", client()?.read_text(&path).await?);
        }
        Some(Commands::Put {
            path,
            file,
            content_type,
            lock_token,
        }) => {
            let body = std::fs::read(&file)?;
            client()?
                .write(&path, body.into(), Some(&content_type), lock_token.as_deref())
                .await?;
            println!("Wrote {} to {}", file.display(), path);
        }
        Some(Commands::Mkdir { path }) => {
            client()?.mkdir(&path).await?;
            println!("Created {}", path);
        }
        Some(Commands::Rm { path }) => {
            client()?.remove(&path).await?;
            println!("Deleted {}", path);
        }
        Some(Commands::Mv { src, dst }) => {
            client()?.move_to(&src, &dst).await?;
            println!("Moved {} to {}", src, dst);
        }
        Some(Commands::Cp { src, dst }) => {
            client()?.copy_to(&src, &dst).await?;
            println!("Copied {} to {}", src, dst);
        }
        Some(Commands::Lock {
            path,
            owner,
            timeout,
        }) => {
            let grant = client()?.acquire_lock(&path, &owner, timeout).await?;
            println!("{}", grant.token);
        }
        Some(Commands::Unlock { path, token }) => {
            client()?.release_lock(&path, &token).await?;
            println!("Unlocked {}", path);
        }
        Some(Commands::Lockinfo { path }) => {
            let info = client()?.lock_info(&path).await?;
            if info.locked {
                println!(
                    "Locked by {} (token {})",
                    info.owner.as_deref().unwrap_or("unknown owner"),
                    info.token.as_deref().unwrap_or("unknown")
                );
            } else {
                println!("Not locked");
            }
        }
        Some(Commands::Export { path, output }) => {
            let archive = export_zip(&client()?, &path).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(archive_name(&path)));
            std::fs::write(&output, &archive)?;
            println!("Wrote {} ({} bytes)", output.display(), archive.len());
        }
        Some(Commands::Format { file }) => {
            let body = std::fs::read(&file)?;
            print!("{}", format_xml(&body)?);
        }
        Some(Commands::Validate { file }) => {
            let report = validate_dita(&std::fs::read(&file)?);
            for error in &report.errors {
                eprintln!("error: {}", error);
            }
            for warning in &report.warnings {
                eprintln!("warning: {}", warning);
            }
            if !report.ok {
                anyhow::bail!("{} is not well-formed", file.display());
            }
            println!("{} ok ({} warnings)", file.display(), report.warnings.len());
        }
        None => {
            println!("Use 'gateway --help' for commands");
        }
    }

    Ok(())
}
