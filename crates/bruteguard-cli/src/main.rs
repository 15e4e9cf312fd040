//! Bruteguard admin CLI.

mod client;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use client::{AdminClient, List};

/// Administer a running bruteguard server.
#[derive(Parser, Debug)]
#[command(name = "bruteguard-cli", version, about)]
struct Cli {
    /// Server base URL.
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "BRUTEGUARD_ADDRESS")]
    address: String,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 5, env = "BRUTEGUARD_TIMEOUT")]
    timeout: u64,

    /// Admin bearer token.
    #[arg(long, env = "BRUTEGUARD_ADMIN_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clear the login and address buckets (and the password bucket if given).
    Reset {
        #[arg(long)]
        login: String,
        #[arg(long)]
        ip: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Ask for a verdict on one authentication attempt.
    Auth {
        #[arg(long)]
        login: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        ip: String,
    },
    /// Manage the allow-list.
    #[command(subcommand)]
    Whitelist(ListCommand),
    /// Manage the deny-list.
    #[command(subcommand)]
    Blacklist(ListCommand),
}

#[derive(Subcommand, Debug)]
enum ListCommand {
    /// Add a subnet.
    Add(SubnetArgs),
    /// Remove a subnet.
    Remove(SubnetArgs),
    /// Print every subnet on the list.
    List,
}

#[derive(Args, Debug)]
struct SubnetArgs {
    /// Network address, or CIDR (e.g. 192.168.130.0/24) when --mask is omitted.
    #[arg(long)]
    ip: String,
    /// Prefix length (24) or dotted netmask (255.255.255.0).
    #[arg(long)]
    mask: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = AdminClient::new(&cli.address, Duration::from_secs(cli.timeout), cli.token)?;

    match cli.command {
        Command::Reset {
            login,
            ip,
            password,
        } => {
            client.reset(&login, &ip, password.as_deref()).await?;
            println!("reset");
        }
        Command::Auth {
            login,
            password,
            ip,
        } => {
            let ok = client.auth(&login, &password, &ip).await?;
            println!("ok: {ok}");
        }
        Command::Whitelist(cmd) => run_list(&client, List::White, cmd).await?,
        Command::Blacklist(cmd) => run_list(&client, List::Black, cmd).await?,
    }
    Ok(())
}

async fn run_list(client: &AdminClient, list: List, cmd: ListCommand) -> anyhow::Result<()> {
    match cmd {
        ListCommand::Add(args) => {
            client.add(list, &args.ip, args.mask.as_deref()).await?;
            println!("added");
        }
        ListCommand::Remove(args) => {
            client.remove(list, &args.ip, args.mask.as_deref()).await?;
            println!("removed");
        }
        ListCommand::List => {
            for subnet in client.list(list).await? {
                println!("{subnet}");
            }
        }
    }
    Ok(())
}
