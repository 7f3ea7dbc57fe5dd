use clap::Parser;

fn main() {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let cli = django_upgrade_lab::Cli::parse();
    django_upgrade_lab::init_tracing(cli.verbose);

    let json = cli.json;
    if let Err(err) = django_upgrade_lab::run(cli) {
        if json {
            let payload = serde_json::json!({
                "error": { "message": format!("{err:#}") }
            });
            eprintln!("{payload}");
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(1);
    }
}
