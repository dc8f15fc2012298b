mod clipboard;
mod display;

use std::process::ExitCode;

use merged_prs::{GitHub, parse_args, resolve_token};

use crate::display::{ListStyle, display_prs, display_search_error};

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let (args, display_mode) = match parse_args(std::env::args()) {
        Ok(result) => result,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    let forge = GitHub::with_api_url(&args.api_url)?;
    let token = resolve_token(args.token.clone())?;
    let copy = args.copy;
    let mut session = args.into_session(&token);

    session.search(&forge).await?;

    if let Some(err) = session.error() {
        display_search_error(err, &mut std::io::stderr())?;
        return Ok(ExitCode::FAILURE);
    }

    let mut stdout = std::io::stdout().lock();
    display_prs(
        session.results(),
        display_mode,
        &ListStyle::detect(),
        &mut stdout,
    )?;

    if copy {
        clipboard::copy_to_clipboard(&session.markdown())?;
        eprintln!(
            "Copied markdown for {} pull requests",
            session.results().len()
        );
    }

    Ok(ExitCode::SUCCESS)
}
