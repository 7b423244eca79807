#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracker_server::start_server().await
}
