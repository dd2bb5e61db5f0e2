//! simtraci CLI Client
//!
//! Command-line interface for poking a running simtraci server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use simtraci::handler::person::PersonVar;
use simtraci::protocol::{Response, TraciCmd, TypedValue};
use simtraci::TraciClient;

/// simtraci CLI
#[derive(Parser, Debug)]
#[command(name = "simtraci-cli")]
#[command(about = "CLI for a simtraci simulation server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the server's API version and identifier
    Version,

    /// Advance the simulation
    Step {
        /// Target simulation time; omitted means a single step
        #[arg(short, long, default_value = "0")]
        target: f64,
    },

    /// Read a person variable
    GetPerson {
        /// Variable name, e.g. POS_2D or SPEED
        variable: String,

        /// Person id
        id: String,
    },

    /// Number of persons in the simulation
    Count,

    /// Set a person's desired speed
    SetSpeed {
        /// Person id
        id: String,

        /// Speed in m/s
        speed: f64,
    },

    /// Upload and load a scenario file
    SendFile {
        /// Scenario file to upload
        path: PathBuf,
    },

    /// Ask the server to close this session
    Close,
}

fn main() {
    let args = Args::parse();

    let client = match TraciClient::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(client, args.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(mut client: TraciClient, command: Commands) -> simtraci::Result<()> {
    match command {
        Commands::Version => {
            let info = client.get_version()?;
            println!("API version {}: {}", info.api_version, info.identifier);
        }
        Commands::Step { target } => {
            let response = client.next_step(target)?;
            print_status(&response);
            for result in response.subscriptions() {
                println!("  {} {:?}", result.element_id, result.values);
            }
        }
        Commands::GetPerson { variable, id } => {
            let var = parse_person_var(&variable)?;
            let value = client.get(TraciCmd::GetPersonValue, var.id(), &id)?;
            println!("{}", format_value(&value));
        }
        Commands::Count => {
            let value = client.get(TraciCmd::GetPersonValue, PersonVar::Count.id(), "")?;
            println!("{}", format_value(&value));
        }
        Commands::SetSpeed { id, speed } => {
            let response = client.set(
                TraciCmd::SetPersonState,
                PersonVar::Speed.id(),
                &id,
                TypedValue::Double(speed),
            )?;
            print_status(&response);
        }
        Commands::SendFile { path } => {
            let response = client.send_file(&path)?;
            print_status(&response);
        }
        Commands::Close => {
            print_status(&client.close()?);
        }
    }
    Ok(())
}

fn parse_person_var(name: &str) -> simtraci::Result<PersonVar> {
    let upper = name.to_ascii_uppercase();
    PersonVar::ALL
        .iter()
        .copied()
        .find(|v| v.name() == upper)
        .ok_or_else(|| simtraci::TraciError::Protocol(format!("unknown person variable '{}'", name)))
}

fn print_status(response: &Response) {
    if response.description().is_empty() {
        println!("{:?}", response.result());
    } else {
        println!("{:?}: {}", response.result(), response.description());
    }
}

fn format_value(value: &TypedValue) -> String {
    match value {
        TypedValue::Pos2D(p) => format!("({}, {})", p.x, p.y),
        TypedValue::Pos3D(p) => format!("({}, {}, {})", p.x, p.y, p.z),
        TypedValue::Double(v) => v.to_string(),
        TypedValue::Integer(v) => v.to_string(),
        TypedValue::String(s) => s.clone(),
        TypedValue::StringList(items) => items.join(" "),
        other => format!("{:?}", other),
    }
}
