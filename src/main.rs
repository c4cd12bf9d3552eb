use liso::config::Config;
use liso::server::{signal, Server};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let mut server = Server::bind(&cfg)?;
    signal::spawn(server.shutdown_handle())?;

    server.run()
}
