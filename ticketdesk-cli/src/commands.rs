//! Command execution

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use ticketdesk_lib::TicketDeskClient;
use ticketdesk_lib::auth::LoginRedirect;
use ticketdesk_lib::error::RefreshError;
use ticketdesk_lib::model::TicketDraft;
use ticketdesk_lib::model::TicketProductDraft;

use crate::cli::Command;
use crate::cli::OrdersCommand;
use crate::cli::ProductArgs;
use crate::cli::ProductsCommand;
use crate::cli::TicketsCommand;

/// Tells the user to log in again once the session has been torn down.
pub struct PromptLogin;

impl LoginRedirect for PromptLogin {
    fn redirect_to_login(&self, cause: &RefreshError) {
        eprintln!("Session expired ({}). Run `ticketdesk login <username>` to sign in again.", cause);
    }
}

/// Runs one command against the API.
pub async fn run(client: &TicketDeskClient, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            client.login(&username, &password).await?;
            match client.role() {
                Some(role) => println!("Logged in as {} ({})", username, role),
                None => println!("Logged in as {}", username),
            }
        }
        Command::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Command::Tickets(command) => tickets(client, command, json).await?,
        Command::Products(command) => products(client, command, json).await?,
        Command::Orders(command) => orders(client, command, json).await?,
    }
    Ok(())
}

async fn tickets(client: &TicketDeskClient, command: TicketsCommand, json: bool) -> anyhow::Result<()> {
    match command {
        TicketsCommand::List => {
            let tickets = client.list_tickets().await?;
            print_list(&tickets, json, |t| format!("{}\t{}", t.id, t.title))?;
        }
        TicketsCommand::Create { title } => {
            client.create_ticket(&TicketDraft::new(title)).await?;
            println!("Ticket created");
        }
        TicketsCommand::Update { id, title } => {
            client
                .update_ticket(&TicketDraft::new(title).with_id(id))
                .await?;
            println!("Ticket {} updated", id);
        }
        TicketsCommand::Delete { id } => {
            client.delete_ticket(id).await?;
            println!("Ticket {} deleted", id);
        }
    }
    Ok(())
}

async fn products(client: &TicketDeskClient, command: ProductsCommand, json: bool) -> anyhow::Result<()> {
    match command {
        ProductsCommand::List { ticket } => {
            let products = match ticket {
                Some(ticket) => client.list_ticket_products_for(ticket).await?,
                None => client.list_ticket_products().await?,
            };
            print_list(&products, json, |p| {
                let ticket = p
                    .ticket
                    .as_ref()
                    .map(|t| t.title.as_str())
                    .unwrap_or("N/A");
                format!("{}\t{}\t{} coins\tqty {}\t{}", p.id, p.name, p.price, p.quantity, ticket)
            })?;
        }
        ProductsCommand::Create(args) => {
            client.create_ticket_product(&product_draft(args)).await?;
            println!("Ticket product created");
        }
        ProductsCommand::Delete { id } => {
            client.delete_ticket_product(id).await?;
            println!("Ticket product {} deleted", id);
        }
        ProductsCommand::Upload { id, file, infos } => {
            let (name, contents) = read_upload(&file)?;
            if infos {
                client.upload_ticket_product_infos(id, &name, contents).await?;
            } else {
                client.upload_ticket_product(id, &name, contents).await?;
            }
            println!("Uploaded {}", file.display());
        }
        ProductsCommand::Infos { id } => {
            let infos = client.list_ticket_product_infos(id).await?;
            print_list(&infos, json, |i| {
                format!(
                    "{}\t{}\t{}\t{}",
                    i.id,
                    i.uid.as_deref().unwrap_or("-"),
                    i.mail.as_deref().unwrap_or("-"),
                    if i.is_sold { "sold" } else { "available" }
                )
            })?;
        }
    }
    Ok(())
}

async fn orders(client: &TicketDeskClient, command: OrdersCommand, json: bool) -> anyhow::Result<()> {
    match command {
        OrdersCommand::List { account } => {
            let orders = match account {
                Some(account) => client.list_account_orders(account).await?,
                None => client.list_orders().await?,
            };
            print_list(&orders, json, |o| {
                let field = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                format!(
                    "{}\taccount {}\tproduct {}\tqty {}",
                    o.id,
                    field(o.account_id),
                    field(o.ticket_product_id),
                    field(o.quantity)
                )
            })?;
        }
    }
    Ok(())
}

fn product_draft(args: ProductArgs) -> TicketProductDraft {
    TicketProductDraft {
        id: None,
        name: args.name,
        description: args.description,
        quantity: args.quantity,
        price: args.price,
        ticket_id: args.ticket,
        max_purchase_per_account: args.max_per_account,
    }
}

fn read_upload(path: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let contents = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", path.display()))?;
    Ok((name, contents))
}

fn print_list<T: Serialize>(items: &[T], json: bool, line: impl Fn(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("(none)");
    }
    for item in items {
        println!("{}", line(item));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_product_draft_from_args() {
        let draft = product_draft(ProductArgs {
            name: "VIP".to_string(),
            ticket: 7,
            quantity: 5,
            price: Decimal::new(4950, 2),
            description: None,
            max_per_account: Some(2),
        });

        assert_eq!(draft.id, None);
        assert_eq!(draft.ticket_id, 7);
        assert_eq!(draft.max_purchase_per_account, Some(2));
    }

    #[test]
    fn test_read_upload_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.csv");
        fs::write(&path, "uid,pass\n").unwrap();

        let (name, contents) = read_upload(&path).unwrap();
        assert_eq!(name, "accounts.csv");
        assert_eq!(contents, b"uid,pass\n");
    }

    #[test]
    fn test_read_upload_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_upload(&dir.path().join("missing.csv")).is_err());
    }
}
