/// User-Agent sent to the node by both transports
pub fn user_agent() -> String {
    format!(
        "luna-miner/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}
