#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quorum_counter::server::run().await
}
