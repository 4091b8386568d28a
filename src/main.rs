use clap::Parser;
use ldapsync::config::{parse_log_level, CliArgs, Command};
use ldapsync::identity::{derive_email, derive_persistent_id, derive_username};
use ldapsync::sync::MemoryCacheStore;
use ldapsync::tokens::find_tokens;
use ldapsync::yaml::parse_entries_file;
use ldapsync::{expand, Config, DetailLog, Expansion, SyncMappingResolver, Tokenizer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Configure logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        parse_log_level(&args.log_level)
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };
    let detail_log = DetailLog::new(args.verbose || config.sync.detail_log);
    let tokenizer = Tokenizer::new(detail_log);

    match args.command {
        Command::Tokens { entries } => {
            for entry in parse_entries_file(&entries).await? {
                println!("{}", entry.dn);
                for (token, value) in tokenizer.tokenize_all(&entry)? {
                    println!("  {} = {}", token, value);
                }
            }
        }
        Command::Expand { entries, template } => {
            let requested = find_tokens(&template);
            for entry in parse_entries_file(&entries).await? {
                let tokens = tokenizer.tokenize(&entry, &requested)?;
                match expand(&tokens, &template) {
                    Expansion::Value(value) => println!("{}: {}", entry.dn, value),
                    Expansion::NoValue => println!("{}: (no value)", entry.dn),
                }
            }
        }
        Command::Derive { entries, server } => {
            let server = match server {
                Some(id) => config
                    .server(&id)
                    .ok_or_else(|| anyhow::anyhow!("Unknown server '{}'", id))?,
                None => {
                    config
                        .server_for(ldapsync::SyncDirection::ToLocalIdentity)
                        .ok_or_else(|| {
                            anyhow::anyhow!("No server configured for local identities")
                        })?
                        .1
                }
            };

            for entry in parse_entries_file(&entries).await? {
                println!("{}", entry.dn);
                println!("  username: {}", derive_username(&entry, server).unwrap_or_default());
                println!(
                    "  email: {}",
                    derive_email(&entry, server, &tokenizer)?.unwrap_or_default()
                );
                println!(
                    "  persistent_id: {}",
                    derive_persistent_id(&entry, server).unwrap_or_default()
                );
            }
        }
        Command::RequiredAttributes { direction, context } => {
            let resolver = SyncMappingResolver::new(Arc::new(config), Arc::new(MemoryCacheStore::new()));
            let attributes = resolver.required_source_attributes(direction, context);
            info!(
                "{} mappings active for {}",
                resolver.synced_keys(direction, &context.events()).len(),
                direction
            );
            for attribute in attributes {
                println!("{}", attribute);
            }
        }
    }

    Ok(())
}
