use presenced::{config, init, service};

#[tokio::main]
async fn main() {
    let config = config::load_config(config::get_config_path().as_ref());
    init::init(&config);

    if let Err(err) = service::run(config).await {
        tracing::error!("Setup failed: {:?}", err);
        std::process::exit(1);
    }
}
