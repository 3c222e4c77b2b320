// Prints the OpenAPI document so clients can be generated without a running server.
use anyhow::Result;

fn main() -> Result<()> {
    let spec = passwordless::api::openapi();
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
