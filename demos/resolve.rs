use ipfs_gateway_client::{ClientConfig, GatewayClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let command = args.next();
    let input = args.next();

    let client = GatewayClient::new(ClientConfig::default())?;
    client.init().await;

    if command.as_deref() != Some("read") {
        println!("Expected `read` for first argument");
        return Ok(());
    }
    let Some(address) = input else {
        println!("Expected `ipfs://{{cid}}` for second argument");
        return Ok(());
    };

    println!("{:-<60}", "");
    for (host, result) in client.gateway_health() {
        println!("  {} - {:?}ms", host, result.speed);
    }
    println!("{:-<60}", "");
    println!("Fetching {}", client.transform_address(&address)?);

    let data = client.read(&address).await?;
    println!("{}", String::from_utf8_lossy(&data));

    Ok(())
}
