use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub token_file: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, token_file: PathBuf) -> Self {
        Self {
            api_url,
            token_file,
        }
    }
}
