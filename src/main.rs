mod app;
mod capture;
mod classify;
mod config;
mod controller;
mod speech;
mod surface;
mod view;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    app::run().await
}
