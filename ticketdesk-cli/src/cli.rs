//! Command line arguments

use std::path::PathBuf;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use rust_decimal::Decimal;

/// Administer tickets, ticket products and orders.
#[derive(Debug, Parser)]
#[command(name = "ticketdesk", version)]
pub struct Cli {
    /// Base URL of the ticket desk API.
    #[arg(long, env = "TICKETDESK_URL")]
    pub url: String,

    /// Directory holding the session database.
    #[arg(long, env = "TICKETDESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Allow the refresh token to be sent to a plain HTTP API.
    #[arg(long, env = "TICKETDESK_ALLOW_INSECURE_REFRESH")]
    pub allow_insecure_refresh: bool,

    /// Timeout for each network call, in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log more (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session.
    Login {
        username: String,
        #[arg(long, env = "TICKETDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Delete the stored session.
    Logout,
    /// Manage tickets.
    #[command(subcommand)]
    Tickets(TicketsCommand),
    /// Manage ticket products.
    #[command(subcommand)]
    Products(ProductsCommand),
    /// Inspect orders.
    #[command(subcommand)]
    Orders(OrdersCommand),
}

#[derive(Debug, Subcommand)]
pub enum TicketsCommand {
    /// List active tickets.
    List,
    /// Create a ticket.
    Create { title: String },
    /// Rename a ticket.
    Update { id: i64, title: String },
    /// Delete a ticket.
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ProductsCommand {
    /// List active products, optionally of one ticket.
    List {
        #[arg(long)]
        ticket: Option<i64>,
    },
    /// Create a product.
    Create(ProductArgs),
    /// Soft-delete a product.
    Delete { id: i64 },
    /// Upload a file for a product.
    Upload {
        id: i64,
        file: PathBuf,
        /// Upload a sheet of credentials instead of the product file.
        #[arg(long)]
        infos: bool,
    },
    /// List the credentials uploaded for a product.
    Infos { id: i64 },
}

#[derive(Debug, Args)]
pub struct ProductArgs {
    pub name: String,
    #[arg(long)]
    pub ticket: i64,
    #[arg(long)]
    pub quantity: i64,
    /// Price in coins.
    #[arg(long)]
    pub price: Decimal,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub max_per_account: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    /// List orders, optionally of one account.
    List {
        #[arg(long)]
        account: Option<i64>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_product_create() {
        let cli = Cli::try_parse_from([
            "ticketdesk",
            "--url",
            "https://api.example.com",
            "products",
            "create",
            "VIP",
            "--ticket",
            "7",
            "--quantity",
            "5",
            "--price",
            "49.50",
        ])
        .unwrap();

        let Command::Products(ProductsCommand::Create(args)) = cli.command else {
            panic!("expected products create");
        };
        assert_eq!(args.ticket, 7);
        assert_eq!(args.price, Decimal::new(4950, 2));
        assert_eq!(args.max_per_account, None);
    }

    #[test]
    fn test_parse_upload_infos_with_global_flags() {
        let cli = Cli::try_parse_from([
            "ticketdesk",
            "--url",
            "https://api.example.com",
            "products",
            "upload",
            "3",
            "accounts.csv",
            "--infos",
            "--json",
            "-vv",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Products(ProductsCommand::Upload { id: 3, infos: true, .. })
        ));
    }
}
