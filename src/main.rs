use std::{io::Write, path::PathBuf, process, sync::Arc};

use tokio::sync::mpsc;

use sports_uploader::{
    portal::api::PortalApi,
    processors::decision::{DecisionRequest, RouteDecision, RouteTooLong},
    upload::console::ConsoleSink,
    util::{
        facilities::DependenciesBuilder,
        logging::{self, LogLevel},
    },
    App,
};

fn prompt(route: RouteTooLong) -> RouteDecision {
    print!(
        "Route is {:.0}m, longer than the {:.0}m target. [t]runcate, [k]eep full, [a]bort? ",
        route.detailed_distance_m, route.nominal_target_m
    );
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return RouteDecision::Abort;
    }

    match answer.trim().chars().next() {
        Some('k' | 'K') => RouteDecision::KeepFull,
        Some('a' | 'A') => RouteDecision::Abort,
        _ => RouteDecision::Truncate,
    }
}

async fn answer_from_stdin(mut requests: mpsc::Receiver<DecisionRequest>) {
    while let Some(request) = requests.recv().await {
        let route = request.route;
        let decision = tokio::task::spawn_blocking(move || prompt(route))
            .await
            .unwrap_or(RouteDecision::Abort);

        request.respond(decision);
    }
}

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| "config.toml".to_string()));
    let secrets_path = PathBuf::from(args.next().unwrap_or_else(|| "secrets.toml".to_string()));

    if std::env::var_os("SPORTS_UPLOADER_QUIET").is_some() {
        logging::set_global_logging(false);
    } else if std::env::var_os("SPORTS_UPLOADER_VERBOSE").is_some() {
        logging::set_global_level(LogLevel::VERBOSE);
    }

    let app = match App::from_files(&config_path, &secrets_path) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    let cancel = app.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Stopping after the current step...");
            cancel.cancel();
        }
    });

    let (decisions, requests) = app.decision_source();
    if let Some(requests) = requests {
        tokio::spawn(answer_from_stdin(requests));
    }

    let console = Arc::new(ConsoleSink);
    let facilities = DependenciesBuilder::new()
        .with_portal(Arc::new(PortalApi::new(app.config().portal.clone())))
        .with_log_sink(console.clone())
        .with_progress_sink(console)
        .with_decisions(decisions)
        .build();

    let outcome = app.run_in_background(facilities).await;
    println!("{:?}: {}", outcome.state, outcome.message);

    // A stdin prompt may still be pending; do not wait for it
    process::exit(if outcome.success { 0 } else { 1 });
}
