use crate::core::config::data::{Config, DEFAULT_BASE_URL};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset, using {DEFAULT_BASE_URL})"),
        }
        match self.request_timeout_secs {
            Some(secs) => println!("  request-timeout: {secs}s"),
            None => println!("  request-timeout: (unset)"),
        }
    }
}
