use std::{process, sync::Arc};

use titlekeeper::{
    cache::{CacheConfig, MemoryCache},
    config::{self, ResolveArgs, Settings},
    error::AppError,
    events::Dispatcher,
    infra::telemetry,
    resolver::{CachedResolver, FrontmatterResolver},
    surface::FileRef,
};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    debug!(features = ?settings.features.enabled, "Settings loaded");

    match cli_args.command.unwrap_or(config::Command::Config) {
        config::Command::Resolve(args) => run_resolve(&settings, args),
        config::Command::Config => {
            println!("{settings:#?}");
            Ok(())
        }
    }
}

fn run_resolve(settings: &Settings, args: ResolveArgs) -> Result<(), AppError> {
    let dispatcher = Arc::new(Dispatcher::new());
    let cache = MemoryCache::new(&CacheConfig::from(&settings.cache));

    let mut source = FrontmatterResolver::new().with_key(args.title_key);
    if let Some(root) = args.root {
        source = source.with_root(root);
    }

    let resolver = CachedResolver::new(Arc::new(source), cache, Arc::clone(&dispatcher));
    resolver.attach();

    let mut failures = 0usize;
    for file in &args.files {
        let Some(path) = file.to_str() else {
            return Err(AppError::validation(format!(
                "path `{}` is not valid UTF-8",
                file.display()
            )));
        };

        let basename = FileRef::new(path).basename;
        let title = match resolver.resolve(path) {
            Ok(resolution) => resolution.display_or(&basename).to_string(),
            Err(error) => {
                warn!(path, error = %error, "Falling back to basename");
                failures += 1;
                basename
            }
        };
        println!("{path}\t{title}");
    }

    info!(
        target = "titlekeeper::resolve",
        files = args.files.len(),
        failures,
        "Resolve complete"
    );
    Ok(())
}
