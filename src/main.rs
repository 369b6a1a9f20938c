use clap::Parser;
use miette::Result;
use tdk::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(&global);

    match cli.command {
        Commands::Init(args) => tdk::cli::commands::init::run(args),
        Commands::Dir(cmd) => tdk::cli::commands::dir::run(cmd, &global),
        Commands::Schema(cmd) => tdk::cli::commands::schema::run(cmd, &global),
        Commands::Listing(cmd) => tdk::cli::commands::listing::run(cmd, &global),
        Commands::Completions(args) => tdk::cli::commands::completions::run(args),
    }
}

/// Log to stderr; `TDK_LOG` overrides the level picked from -q/-v
fn init_tracing(global: &GlobalOpts) {
    let filter = EnvFilter::try_from_env("TDK_LOG").unwrap_or_else(|_| {
        let level = if global.quiet {
            "error"
        } else if global.verbose {
            "debug"
        } else {
            "warn"
        };
        EnvFilter::new(level)
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
