//! tasklane-demo: a small CLI built on tasklane.
//!
//! ```text
//! tasklane-demo greet [--name=<who>] [--shout]
//! tasklane-demo sum --n=<number> [--n=<number> ...]
//! tasklane-demo run --cmd=<shell command> [--timeout=<seconds>]
//! ```
//!
//! Set `TASKLANE_LOG` (e.g. `TASKLANE_LOG=debug`) to see the dispatch trace on
//! stderr.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tasklane::validator::{ArrayList, Boolean, Numeric, Text};
use tasklane::{Arguments, CliContext, DispatchError, Dispatcher};
use tasklane_console::{execute, exit, Console, ExecOptions};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TASKLANE_LOG";
const USAGE: &str = "Usage: tasklane-demo <command> [--key=value ...]\n";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let mut cli = match Dispatcher::from_env() {
        Ok(cli) => cli,
        Err(e) => {
            Console::new().error(&format!("{}\n{}", e, USAGE))?;
            exit(2)
        }
    };

    let status = Rc::new(Cell::new(0));
    register(&mut cli, status.clone())?;
    cli.run()?;

    exit(status.get())
}

fn register(cli: &mut Dispatcher, status: Rc<Cell<i32>>) -> tasklane::Result<()> {
    cli.set_resource("console", &[], |_| Ok(Console::new()))?;

    cli.task("greet")
        .desc("Print a greeting")
        .param("name", "world", Text::new(64), "Who to greet", false)
        .param("shout", Value::Null, Boolean, "Uppercase the greeting", true)
        .inject("console")?
        .action(greet);

    cli.task("sum")
        .desc("Add up numbers")
        .param("n", Value::Null, ArrayList::new(Numeric, 0), "Numbers to add", false)
        .inject("console")?
        .action(sum);

    cli.task("run")
        .desc("Run a shell command, streaming its output")
        .param("cmd", Value::Null, Text::new(0), "Command line", false)
        .param("timeout", Value::Null, Numeric, "Timeout in seconds", true)
        .inject("console")?
        .action(run);

    let catalog: Vec<(String, String)> = cli
        .tasks()
        .map(|t| (t.name().to_string(), t.description().to_string()))
        .collect();
    cli.set_resource("catalog", &[], move |_| Ok(catalog.clone()))?;

    cli.init().inject("cli")?.inject("console")?.action(|args| {
        let context = args.resource::<CliContext>("cli")?;
        tracing::info!(command = %context.command, flags = context.args.len(), "starting");
        args.resource::<Console>("console")?
            .title(&format!("tasklane-demo {}", context.command))?;
        Ok(())
    });

    cli.shutdown().inject("console")?.action(|args| {
        args.resource::<Console>("console")?.success("Done.\n")?;
        Ok(())
    });

    cli.error()
        .inject("error")?
        .inject("console")?
        .inject("catalog")?
        .action(move |args| {
            status.set(1);
            let error = args.resource::<DispatchError>("error")?;
            let console = args.resource::<Console>("console")?;
            console.error(&format!("{}\n", error))?;

            if let DispatchError::NoCommandFound(_) = *error {
                let catalog = args.resource::<Vec<(String, String)>>("catalog")?;
                let mut help = String::from(USAGE);
                help.push_str("\nCommands:\n");
                for (name, description) in catalog.iter() {
                    help.push_str(&format!("  {:<8} {}\n", name, description));
                }
                console.log(&help)?;
            }
            Ok(())
        });

    Ok(())
}

fn greet(args: &Arguments) -> anyhow::Result<()> {
    let name: String = args.param("name")?;
    // A bare `--shout` arrives as an empty value.
    let shout = matches!(args.str("shout"), Some("" | "true" | "1"));
    let console = args.resource::<Console>("console")?;

    let mut greeting = format!("Hello, {}!", name);
    if shout {
        greeting = greeting.to_uppercase();
    }
    console.log(&format!("{}\n", greeting))?;
    Ok(())
}

fn sum(args: &Arguments) -> anyhow::Result<()> {
    let values: Vec<String> = match args.param::<Vec<String>>("n") {
        Ok(values) => values,
        Err(_) => vec![args.param::<String>("n")?],
    };
    let console = args.resource::<Console>("console")?;

    let mut total = 0.0;
    for value in &values {
        total += value
            .trim()
            .parse::<f64>()
            .with_context(|| format!("not a number: {}", value))?;
    }
    console.info(&format!("{}\n", total))?;
    Ok(())
}

fn run(args: &Arguments) -> anyhow::Result<()> {
    let command: String = args.param("cmd")?;
    let console = args.resource::<Console>("console")?;

    let mut options = ExecOptions::new().on_progress(|chunk| {
        let _ = console.log(chunk);
    });
    if let Some(seconds) = args.str("timeout").filter(|s| !s.is_empty()) {
        let seconds: f64 = seconds.trim().parse()?;
        options = options.timeout(Duration::try_from_secs_f64(seconds)?);
    }

    let result = execute(&command, options)?;
    if !result.success() {
        anyhow::bail!("`{}` exited with status {}", command, result.exit_code);
    }
    Ok(())
}
