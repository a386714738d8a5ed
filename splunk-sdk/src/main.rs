use anyhow::Result;
use clap::{Parser, Subcommand};
use human_panic::setup_panic;
use splunk_sdk::prelude::{
    AccessControlList, ClientOptions, Collection, LoggingOpts, Perms, Properties, Sharing, Users,
};
use tracing::{debug, error};

/// Small command line client for the management API: read and write
/// configuration values, list users and change the ACL of any entity.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(flatten)]
    logging: LoggingOpts,

    #[clap(flatten)]
    client: ClientOptions,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one configuration value
    Get {
        config_file: String,
        stanza: String,
        key: String,
    },
    /// Write one configuration value
    Set {
        config_file: String,
        stanza: String,
        key: String,
        value: String,
    },
    /// List users and their roles
    Users,
    /// Change owner, sharing or permissions of an entity, keeping the rest
    Acl {
        /// Collection path, e.g. saved/searches
        path: String,
        name: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        sharing: Option<Sharing>,
        /// Role allowed to read; repeat for several
        #[arg(long = "read")]
        read: Vec<String>,
        /// Role allowed to write; repeat for several
        #[arg(long = "write")]
        write: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    setup_panic!();
    dotenvy::dotenv().ok();
    let opts = Cli::parse();

    let _guard = opts.logging.configure_logging();
    let error_code = match run_command(&opts).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Critical Error. {:?}", e);
            1
        }
    };

    std::process::exit(error_code);
}

async fn run_command(opts: &Cli) -> Result<()> {
    let client = opts.client.connect().await?;
    debug!("Connected to {}", client.base_url());

    match &opts.command {
        Command::Get {
            config_file,
            stanza,
            key,
        } => {
            let value = Properties::new(&client, config_file)
                .get_property(stanza, key)
                .await?;
            println!("{}", value);
        }
        Command::Set {
            config_file,
            stanza,
            key,
            value,
        } => {
            Properties::new(&client, config_file)
                .set_property(stanza, key, value)
                .await?;
        }
        Command::Users => {
            for user in Users::new(&client).list().await? {
                println!("{}\t{}", user.name, user.content.roles.join(","));
            }
        }
        Command::Acl {
            path,
            name,
            owner,
            sharing,
            read,
            write,
        } => {
            let acl = AccessControlList {
                owner: owner.clone().unwrap_or_default(),
                sharing: *sharing,
                perms: Perms {
                    read: read.clone(),
                    write: write.clone(),
                },
                ..Default::default()
            };
            Collection::<serde_json::Value>::new(&client, path, path)
                .update_acl(name, &acl)
                .await?;
        }
    }
    Ok(())
}
