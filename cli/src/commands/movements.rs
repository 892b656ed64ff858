use std::path::Path;

use clap::Subcommand;
use wodparse_core::MovementDictionary;
use wodparse_core::similar::SimilarNameFinder;

use crate::util::{EXIT_OK, api_request, format_json, local_parser, print_error};

#[derive(Subcommand)]
pub enum MovementCommands {
    /// Ranked dictionary search (e.g. "pull up")
    Search {
        query: String,
        /// Query the API instead of the local catalog
        #[arg(long)]
        remote: bool,
    },
    /// Similar names for a possibly misspelled movement
    Suggest {
        query: String,
        /// Maximum suggestions
        #[arg(long, default_value_t = 3)]
        limit: usize,
        /// Query the API instead of the local catalog
        #[arg(long)]
        remote: bool,
    },
}

pub async fn run(
    api_url: &str,
    catalog: Option<&Path>,
    command: MovementCommands,
    raw: bool,
) -> i32 {
    match command {
        MovementCommands::Search { query, remote: true } => {
            api_request(
                api_url,
                reqwest::Method::GET,
                "/v1/movements/search",
                None,
                &[("q", query)],
                raw,
            )
            .await
        }
        MovementCommands::Search { query, remote: false } => {
            search_local(catalog, &query, raw).await
        }
        MovementCommands::Suggest {
            query,
            limit,
            remote: true,
        } => {
            api_request(
                api_url,
                reqwest::Method::GET,
                "/v1/movements/suggest",
                None,
                &[("q", query), ("limit", limit.to_string())],
                raw,
            )
            .await
        }
        MovementCommands::Suggest {
            query,
            limit,
            remote: false,
        } => suggest_local(catalog, &query, limit, raw).await,
    }
}

async fn search_local(catalog: Option<&Path>, query: &str, raw: bool) -> i32 {
    let parser = match local_parser(catalog) {
        Ok(parser) => parser,
        Err(message) => return print_error(&message, None),
    };
    match parser.dictionary().search(query).await {
        Ok(movements) => {
            println!("{}", format_json(&movements, raw));
            EXIT_OK
        }
        Err(e) => print_error(&format!("Movement search failed: {e}"), None),
    }
}

async fn suggest_local(catalog: Option<&Path>, query: &str, limit: usize, raw: bool) -> i32 {
    let parser = match local_parser(catalog) {
        Ok(parser) => parser,
        Err(message) => return print_error(&message, None),
    };
    let names = match parser.dictionary().known_names().await {
        Ok(names) => names,
        Err(e) => return print_error(&format!("Movement lookup failed: {e}"), None),
    };
    let suggestions = SimilarNameFinder::new(limit).find(query, names.iter().map(String::as_str));
    println!("{}", format_json(&suggestions, raw));
    EXIT_OK
}
