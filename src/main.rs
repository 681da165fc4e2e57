use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use serial_keygen::{Generator, SerialKey, Status, Verifier, WideCharPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keygen for the "KeygenMe again (LINUX)" crackme.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// The username to register.
    username: Option<String>,

    /// Verify an existing serial against the username instead of
    /// generating a fresh one.
    #[arg(long, value_name = "SERIAL")]
    check: Option<String>,

    /// Fold characters above U+00FF to their low byte instead of
    /// refusing them.
    #[arg(long)]
    truncate: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("serial_keygen=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("serial_keygen=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Asks for a username on stdin. Returns `None` when the user aborts the
/// prompt (end of input or a read failure), which callers treat as a
/// clean cancellation rather than an error.
fn prompt_username() -> Option<String> {
    println!("--- [ keygenme serial solver ] ---");
    print!("[?] Username: ");
    if io::stdout().flush().is_err() {
        return None;
    }

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_owned()),
    }
}

fn print_key(username: &str, serial: &SerialKey) {
    println!("{}", "-".repeat(30));
    println!("[*] Target user: {username}");
    println!("[+] Serial key:  {serial}");
    println!("{}", "-".repeat(30));
}

fn check_serial(username: &str, candidate: &str, policy: WideCharPolicy) -> ExitCode {
    let verifier = Verifier::new(policy);
    match verifier.verify(username, candidate) {
        Status::Valid => {
            println!("[+] Serial is valid for {username}.");
            ExitCode::SUCCESS
        }
        Status::Invalid => {
            println!("[!] Serial does not match {username}.");
            ExitCode::FAILURE
        }
        Status::Blocked => {
            println!("[!] Username {username} has been blocked.");
            ExitCode::FAILURE
        }
        Status::Malformed => {
            println!("[!] Not a serial: expected eight hex digits.");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let policy = if cli.truncate {
        WideCharPolicy::Truncate
    } else {
        WideCharPolicy::Reject
    };
    tracing::debug!(?policy, "starting up");

    let username = match cli.username {
        Some(name) => name,
        None => {
            tracing::debug!("no username argument, falling back to the prompt");
            match prompt_username() {
                Some(name) => name,
                None => {
                    println!();
                    println!("[!] Cancelled.");
                    return ExitCode::SUCCESS;
                }
            }
        }
    };

    if let Some(candidate) = cli.check {
        tracing::debug!(%username, "verifying a candidate serial");
        return check_serial(&username, &candidate, policy);
    }

    match Generator::new(policy).generate(&username) {
        Ok(serial) => {
            print_key(&username, &serial);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("generation failed: {err}");
            eprintln!("[!] {err}");
            ExitCode::FAILURE
        }
    }
}
