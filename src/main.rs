use std::io;

use color_eyre::Result;
use tracing_subscriber::prelude::*;

use crate::{
    config::{Limits, RcFile},
    input::{InputError, LineReader},
    process::child::ForkExec,
    state::{Flow, ShellError, State},
};

#[macro_use]
extern crate tracing;

pub mod builtins;
pub mod cmd;
pub mod config;
pub mod history;
pub mod input;
pub mod parse;
pub mod prelude;
pub mod process;
pub mod state;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let (writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(".", "logs"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_error::ErrorLayer::default())
        .init();

    color_eyre::install()?;

    let limits = Limits::load(&config::config_path())?;
    let rc = RcFile::load(&config::rc_path(), &limits)?;

    let mut state = State::new(rc, limits, Box::new(ForkExec));

    debug!(
        limits = ?state.limits,
        prompt = %state.prompt,
        dirs = ?state.resolver.dirs(),
        "loaded configuration"
    );

    let mut input = LineReader::stdin(state.limits.max_line);
    let mut stdout = io::stdout();

    loop {
        state.render(&mut stdout)?;

        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                trace!("end of input");
                break;
            }
            Err(InputError::Io(err)) => return Err(err.into()),
            Err(err) => {
                report(&err.into());
                continue;
            }
        };

        match state.handle_line(&line, &mut stdout) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(err) => report(&err),
        }
    }

    Ok(())
}

fn report(err: &ShellError) {
    warn!(%err, "line failed");
    eprintln!("{err}");
}
