use env_logger::Env;
use log::{error, info};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match memstress::run() {
        Ok(summary) => info!("{:?}", summary),
        Err(e) => error!("memstress could not start: {}", e),
    }
}
