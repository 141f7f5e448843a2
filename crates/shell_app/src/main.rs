mod app;
mod cli;
mod config;

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return,
        Err(err) => {
            eprintln!("error: {err:#}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    if let Err(err) = app::run(args).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
